//! The mounted-volume engine (spec.md §3/§4.3), grounded on `adf_vol.c`'s
//! `adfVolMount`/`adfVolCreate`/`adfVolUnMount`/`adfVolRemount`/
//! `adfVolReadBlock`/`adfVolWriteBlock`.
//!
//! A [`Volume`] borrows an already-opened [`Device`] for as long as it stays
//! mounted; dropping (or explicitly [`Volume::unmount`]ing) it releases the
//! borrow. Only one volume can be mounted against a device at a time, which
//! matches spec.md §1's "no concurrency model" posture without needing a
//! runtime lock.

mod bitmap;
mod dir;
pub(crate) mod dircache;
pub(crate) mod file;
pub(crate) mod link;

pub use bitmap::{Bitmap, BitmapBlockSlot};
pub use file::{FileHandle, OpenMode};

use crate::block::{BitmapExtBlock, BootBlock, EntryBlock, FileExtBlock, OfsDataBlock, RootBlock};
use crate::config::Config;
use crate::constants::*;
use crate::date::AmigaDate;
use crate::device::Device;
use crate::error::{AdfError, Result};
use crate::types::{FsFlags, FsType};
use std::collections::HashSet;
use std::string::String;
use std::vec::Vec;

/// A mounted AFFS volume: a block range on a [`Device`] plus the root block,
/// filesystem mode, and allocation bitmap derived from it (spec.md §3).
pub struct Volume<'a> {
    device: &'a mut Device,
    pub(crate) partition_index: usize,
    pub(crate) first_block: u32,
    pub(crate) last_block: u32,
    pub(crate) root_block: u32,
    pub(crate) fs_type: FsType,
    pub(crate) fs_flags: FsFlags,
    pub(crate) name: String,
    /// Current-directory cursor for relative path resolution (spec.md §2).
    pub(crate) cwd: u32,
    pub(crate) bitmap: Option<Bitmap>,
    pub(crate) read_write: bool,
    /// Volume-level configuration (checksum leniency, dir-cache mode on
    /// format). Distinct from the `Config` passed to `Device::open`, which
    /// governs device-level access tracing.
    pub config: Config,
}

impl<'a> Volume<'a> {
    /// `adfVolMount`: read the boot block, locate the root block, reject
    /// unsupported filesystems, and load the allocation bitmap.
    pub fn mount(device: &'a mut Device, partition_index: usize, config: Config) -> Result<Self> {
        let partition = device
            .partitions
            .get(partition_index)
            .cloned()
            .ok_or(AdfError::PartitionOutOfRange(partition_index))?;
        let first_block = partition.first_block;
        let last_block = partition.last_block;
        let read_write = device.read_write;

        let mut boot_buf = [0u8; BOOT_BLOCK_SIZE];
        device.read_sectors(first_block, 2, &mut boot_buf)?;
        let boot = BootBlock::parse(&boot_buf)?;

        let root_block = if boot.root_block >= first_block && boot.root_block <= last_block {
            boot.root_block
        } else {
            (first_block + last_block + 1) / 2
        };

        let mut root_buf = [0u8; BLOCK_SIZE];
        device.read_sectors(root_block, 1, &mut root_buf)?;
        let root = RootBlock::parse_at(&root_buf, root_block)?;

        let mut vol = Self {
            device,
            partition_index,
            first_block,
            last_block,
            root_block,
            fs_type: boot.fs_type(),
            fs_flags: boot.fs_flags(),
            name: String::from_utf8_lossy(root.name()).into_owned(),
            cwd: root_block,
            bitmap: None,
            read_write,
            config,
        };

        let bitmap = Bitmap::load(&mut vol)?;
        vol.bitmap = Some(bitmap);
        Ok(vol)
    }

    /// `adfVolCreate`: write a fresh boot block, root block, and bitmap over
    /// `partition_index`, producing an empty, freshly-mounted volume.
    pub fn format(
        device: &'a mut Device,
        partition_index: usize,
        name: &str,
        fs_type: FsType,
        config: Config,
    ) -> Result<Self> {
        if !device.read_write {
            return Err(AdfError::ReadOnly);
        }
        let partition = device
            .partitions
            .get(partition_index)
            .cloned()
            .ok_or(AdfError::PartitionOutOfRange(partition_index))?;
        let first_block = partition.first_block;
        let last_block = partition.last_block;
        let root_block = (first_block + last_block + 1) / 2;
        let dircache = config.use_dir_cache;

        let mut bitmap = Bitmap::create(first_block, last_block, &[first_block, first_block + 1, root_block]);

        let slot_count = bitmap.slot_count();
        let bm_sectors = bitmap.allocate(slot_count as u32)?;
        bitmap.assign_sectors(&bm_sectors);

        let extra = bm_sectors.len().saturating_sub(BM_PAGES_ROOT_SIZE);
        let ext_block_count = extra.div_ceil(BM_PAGES_EXT_SIZE);
        let ext_sectors = if ext_block_count > 0 {
            bitmap.allocate(ext_block_count as u32)?
        } else {
            Vec::new()
        };

        let dircache_sector = if dircache {
            Some(bitmap.allocate(1)?[0])
        } else {
            None
        };

        let mut name_buf = [0u8; MAX_NAME_LEN];
        let name_len = name.len().min(MAX_NAME_LEN);
        name_buf[..name_len].copy_from_slice(&name.as_bytes()[..name_len]);

        let now = AmigaDate::now();
        let mut bm_pages = [0u32; BM_PAGES_ROOT_SIZE];
        for (i, &sector) in bm_sectors.iter().take(BM_PAGES_ROOT_SIZE).enumerate() {
            bm_pages[i] = sector;
        }

        let root = RootBlock {
            block_type: T_HEADER,
            hash_table_size: HASH_TABLE_SIZE as i32,
            checksum: 0,
            hash_table: [0u32; HASH_TABLE_SIZE],
            bm_flag: BM_VALID,
            bm_pages,
            bm_ext: ext_sectors.first().copied().unwrap_or(0),
            creation_date: now,
            name_len: name_len as u8,
            disk_name: name_buf,
            last_modified: now,
            extension: dircache_sector.unwrap_or(0),
            sec_type: ST_ROOT,
        };

        let fs_flags_byte = (match fs_type {
            FsType::Ffs => DOSFS_FFS,
            FsType::Ofs => DOSFS_OFS,
        }) | if dircache { DOSFS_DIRCACHE | DOSFS_INTL } else { 0 };

        let mut vol = Self {
            device,
            partition_index,
            first_block,
            last_block,
            root_block,
            fs_type,
            fs_flags: FsFlags::from_dos_type(fs_flags_byte),
            name: name.to_string(),
            cwd: root_block,
            bitmap: None,
            read_write: true,
            config,
        };

        vol.write_boot_block(&BootBlock::write(fs_flags_byte, root_block))?;
        vol.write_root_block(&root)?;
        bitmap.flush(&mut vol)?;

        for (i, &ext_sector) in ext_sectors.iter().enumerate() {
            let start = BM_PAGES_ROOT_SIZE + i * BM_PAGES_EXT_SIZE;
            let end = (start + BM_PAGES_EXT_SIZE).min(bm_sectors.len());
            let mut pointers = [0u32; BM_PAGES_EXT_SIZE];
            pointers[..end - start].copy_from_slice(&bm_sectors[start..end]);
            let next = ext_sectors.get(i + 1).copied().unwrap_or(0);
            let ext_block = BitmapExtBlock { pointers, next };
            vol.write_block(ext_sector, &ext_block.write())?;
        }

        if let Some(dc_sector) = dircache_sector {
            let dc = crate::block::DirCacheBlock::empty(dc_sector, root_block);
            vol.write_block(dc_sector, &dc.write())?;
        }

        vol.bitmap = Some(bitmap);
        Ok(vol)
    }

    /// `adfVolUnMount`: flush the bitmap and stamp the root block, then
    /// release the borrowed device.
    pub fn unmount(mut self) -> Result<()> {
        self.sync()
    }

    /// Flush the allocation bitmap and update the root block's modification
    /// date without releasing the device borrow.
    pub fn sync(&mut self) -> Result<()> {
        let mut root = self.read_root_block()?;
        root.last_modified = AmigaDate::now();
        self.write_root_block(&root)?;
        if let Some(mut bitmap) = self.bitmap.take() {
            bitmap.flush(self)?;
            self.bitmap = Some(bitmap);
        }
        Ok(())
    }

    /// `adfVolRemount`: switch an already-mounted volume between read-only
    /// and read-write, refusing to go read-write on a read-only device.
    pub fn remount(&mut self, read_write: bool) -> Result<()> {
        if read_write && !self.device.read_write {
            return Err(AdfError::ReadOnly);
        }
        self.read_write = read_write;
        Ok(())
    }

    /// Volume (disk) name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sector of this volume's root block.
    #[inline]
    pub const fn root_block_number(&self) -> u32 {
        self.root_block
    }

    /// Whether this mount is writable.
    #[inline]
    pub const fn is_read_write(&self) -> bool {
        self.read_write
    }

    /// Number of free blocks, if the bitmap has been loaded (always true
    /// after a successful `mount`/`format`).
    pub fn free_blocks(&self) -> u32 {
        self.bitmap.as_ref().map(Bitmap::count_free).unwrap_or(0)
    }

    /// `adfVolReadBlock`: read one 512-byte logical block, bounds-checked
    /// against `[first_block, last_block]`.
    pub fn read_block(&mut self, block: u32) -> Result<[u8; BLOCK_SIZE]> {
        if block < self.first_block || block > self.last_block {
            return Err(AdfError::BlockOutOfRange {
                block,
                first: self.first_block,
                last: self.last_block,
            });
        }
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_sectors(block, 1, &mut buf)?;
        Ok(buf)
    }

    /// `adfVolWriteBlock`: write one 512-byte logical block, refusing if the
    /// volume is mounted read-only or the block is out of range.
    pub fn write_block(&mut self, block: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        if !self.read_write {
            return Err(AdfError::ReadOnly);
        }
        if block < self.first_block || block > self.last_block {
            return Err(AdfError::BlockOutOfRange {
                block,
                first: self.first_block,
                last: self.last_block,
            });
        }
        self.device.write_sectors(block, 1, buf)
    }

    fn write_boot_block(&mut self, buf: &[u8; BOOT_BLOCK_SIZE]) -> Result<()> {
        if !self.read_write {
            return Err(AdfError::ReadOnly);
        }
        self.device.write_sectors(self.first_block, 2, buf)
    }

    pub(crate) fn read_root_block(&mut self) -> Result<RootBlock> {
        let buf = self.read_block(self.root_block)?;
        RootBlock::parse_at(&buf, self.root_block)
    }

    fn write_root_block(&mut self, root: &RootBlock) -> Result<()> {
        let buf = root.write();
        self.write_block(self.root_block, &buf)
    }

    pub(crate) fn read_entry(&mut self, block: u32) -> Result<EntryBlock> {
        let buf = self.read_block(block)?;
        EntryBlock::parse_at(&buf, block)
    }

    pub(crate) fn write_entry(&mut self, block: u32, entry: &EntryBlock) -> Result<()> {
        let buf = entry.write();
        self.write_block(block, &buf)
    }

    /// Force a full bitmap rebuild by walking the entire directory tree and
    /// data-block chains, rather than trusting the on-disk bitmap content.
    /// Per spec.md §9 Open Question (a), this is never invoked implicitly —
    /// `mount` only warns when `bmFlag` isn't `ADF_BM_VALID`.
    pub fn rebuild_bitmap(&mut self) -> Result<()> {
        let root = self.read_root_block()?;
        let mut bm_sectors: Vec<u32> = root.bm_pages.iter().copied().filter(|&p| p != 0).collect();
        let mut ext_sectors = Vec::new();
        let mut ext = root.bm_ext;
        while ext != 0 {
            let buf = self.read_block(ext)?;
            let extb = BitmapExtBlock::parse(&buf);
            bm_sectors.extend(extb.pointers.iter().copied().filter(|&p| p != 0));
            ext_sectors.push(ext);
            ext = extb.next;
        }

        let mut used = HashSet::new();
        used.insert(self.first_block);
        used.insert(self.first_block + 1);
        used.insert(self.root_block);
        used.extend(bm_sectors.iter().copied());
        used.extend(ext_sectors.iter().copied());

        self.collect_used_blocks(self.root_block, &mut used)?;

        let reserved: Vec<u32> = used.into_iter().collect();
        let mut bitmap = Bitmap::create(self.first_block, self.last_block, &reserved);
        bitmap.assign_sectors(&bm_sectors);
        self.bitmap = Some(bitmap);
        self.sync()
    }

    fn collect_used_blocks(&mut self, dir_block: u32, used: &mut HashSet<u32>) -> Result<()> {
        if !used.insert(dir_block) {
            return Ok(());
        }
        let entry = self.read_entry(dir_block)?;

        if entry.extension != 0 {
            let mut dc = entry.extension;
            while dc != 0 && used.insert(dc) {
                let buf = self.read_block(dc)?;
                let dcb = crate::block::DirCacheBlock::parse_at(&buf, dc)?;
                dc = dcb.next_dircache;
            }
        }

        let hash_table = entry.hash_table;
        for head in hash_table {
            let mut block = head;
            while block != 0 && !used.contains(&block) {
                let child = self.read_entry(block)?;
                used.insert(block);
                if child.is_dir() && !child.is_link() {
                    self.collect_used_blocks(block, used)?;
                } else if child.is_file() && !child.is_link() {
                    self.collect_file_blocks(&child, used)?;
                }
                block = child.next_same_hash;
            }
        }
        Ok(())
    }

    fn collect_file_blocks(&mut self, entry: &EntryBlock, used: &mut HashSet<u32>) -> Result<()> {
        match self.fs_type {
            FsType::Ofs => {
                let mut block = entry.first_data;
                while block != 0 && used.insert(block) {
                    let buf = self.read_block(block)?;
                    let data = OfsDataBlock::parse_at(&buf, block)?;
                    block = data.next_data;
                }
            }
            FsType::Ffs => {
                for i in 0..entry.high_seq.max(0) as usize {
                    let b = entry.data_block(i);
                    if b != 0 {
                        used.insert(b);
                    }
                }
                let mut ext = entry.extension;
                while ext != 0 && used.insert(ext) {
                    let buf = self.read_block(ext)?;
                    let extb = FileExtBlock::parse_at(&buf, ext)?;
                    for i in 0..extb.high_seq.max(0) as usize {
                        let b = extb.data_block(i);
                        if b != 0 {
                            used.insert(b);
                        }
                    }
                    ext = extb.extension;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;

    fn open_floppy() -> Device {
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_DD_SECTORS));
        Device::open(driver, "test.adf", true, Config::default()).unwrap()
    }

    #[test]
    fn test_format_then_mount_round_trip() {
        let mut device = open_floppy();
        {
            let vol = Volume::format(&mut device, 0, "Workbench", FsType::Ffs, Config::default()).unwrap();
            vol.unmount().unwrap();
        }

        let vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        assert_eq!(vol.name(), "Workbench");
        assert!(vol.free_blocks() > 0);
    }

    #[test]
    fn test_write_block_rejected_when_read_only() {
        let mut device = open_floppy();
        {
            let vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
            vol.unmount().unwrap();
        }

        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.remount(false).unwrap();
        let buf = [0u8; BLOCK_SIZE];
        assert!(matches!(vol.write_block(vol.root_block, &buf), Err(AdfError::ReadOnly)));
    }

    #[test]
    fn test_read_block_out_of_range() {
        let mut device = open_floppy();
        let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
        assert!(matches!(
            vol.read_block(vol.last_block + 1),
            Err(AdfError::BlockOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rebuild_bitmap_matches_free_count() {
        let mut device = open_floppy();
        let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ffs, Config::default()).unwrap();
        let before = vol.free_blocks();
        vol.rebuild_bitmap().unwrap();
        assert_eq!(vol.free_blocks(), before);
    }
}
