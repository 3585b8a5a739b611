//! Open file handles and the OFS/FFS write/truncate algorithm (spec.md §4.6).
//!
//! Builds on the read-path algorithm of the teacher's (now-standalone)
//! `crate::file::FileReader`: the block-pointer-table walk it performs over
//! a generic [`crate::types::BlockDevice`] is reproduced here directly
//! against a mutably-borrowed [`Volume`], since the write half needs to
//! allocate and splice new data/extension blocks as it goes.

use super::Volume;
use crate::block::{EntryBlock, FileExtBlock, OfsDataBlock};
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AdfError, Result};
use crate::types::FsType;
use std::io::SeekFrom;
use std::vec::Vec;

/// How [`FileHandle::open`] should position the cursor and whether it may
/// discard existing content (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Position at the start; writes are rejected unless the volume permits them.
    Read,
    /// Discard existing content and position at the start.
    Truncate,
    /// Keep existing content and position at the end.
    Append,
}

/// A handle onto one file's contents, borrowing its [`Volume`] for as long
/// as it stays open.
pub struct FileHandle<'v, 'a> {
    vol: &'v mut Volume<'a>,
    header_block: u32,
    pos: u32,
    size: u32,
}

impl<'v, 'a> FileHandle<'v, 'a> {
    pub(crate) fn open(vol: &'v mut Volume<'a>, header_block: u32, mode: OpenMode) -> Result<Self> {
        let entry = vol.read_entry(header_block)?;
        if !entry.is_file() {
            return Err(AdfError::NotAFile);
        }
        if mode != OpenMode::Read && !vol.read_write {
            return Err(AdfError::ReadOnly);
        }

        let mut handle = Self {
            vol,
            header_block,
            pos: 0,
            size: entry.byte_size,
        };

        match mode {
            OpenMode::Read => {}
            OpenMode::Append => handle.pos = handle.size,
            OpenMode::Truncate => handle.truncate(0)?,
        }

        Ok(handle)
    }

    /// Block number of this file's header.
    #[inline]
    pub const fn header_block(&self) -> u32 {
        self.header_block
    }

    /// Current file length in bytes.
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Current cursor position.
    #[inline]
    pub const fn tell(&self) -> u32 {
        self.pos
    }

    /// Reposition the cursor, per `std::io::Seek` semantics.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u32> {
        let base = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => self.size as i64 + delta,
        };
        if base < 0 {
            return Err(AdfError::InvalidState("seek before start of file"));
        }
        self.pos = base as u32;
        Ok(self.pos)
    }

    /// Read up to `buf.len()` bytes starting at the cursor, advancing it.
    /// Returns `0` at end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let payload = self.vol.fs_type.data_block_size();
        let data_start = data_offset(self.vol.fs_type);
        let mut total = 0;

        while total < buf.len() && self.pos < self.size {
            let index = self.pos / payload as u32;
            let in_block = (self.pos % payload as u32) as usize;
            let sector = self.get_data_block(index, false)?;
            if sector == 0 {
                break;
            }
            let block_buf = self.vol.read_block(sector)?;

            let remaining_file = (self.size - self.pos) as usize;
            let to_read = (payload - in_block).min(buf.len() - total).min(remaining_file);
            buf[total..total + to_read]
                .copy_from_slice(&block_buf[data_start + in_block..data_start + in_block + to_read]);

            total += to_read;
            self.pos += to_read as u32;
        }

        Ok(total)
    }

    /// Read the whole remaining file into a freshly-allocated buffer.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = std::vec![0u8; (self.size - self.pos) as usize];
        let mut total = 0;
        while total < out.len() {
            let n = self.read(&mut out[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        out.truncate(total);
        Ok(out)
    }

    /// Write `buf` at the cursor, extending the file and allocating new
    /// data/extension blocks as needed (spec.md §4.6 steps 1-2).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.vol.read_write {
            return Err(AdfError::ReadOnly);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let fs_type = self.vol.fs_type;
        let payload = fs_type.data_block_size();
        let data_start = data_offset(fs_type);

        let first_index = self.pos / payload as u32;
        let mut last_index = first_index;
        let mut written = 0usize;

        while written < buf.len() {
            let index = self.pos / payload as u32;
            last_index = index;
            let in_block = (self.pos % payload as u32) as usize;

            let existing = self.get_data_block(index, false)?;
            let sector = if existing != 0 {
                existing
            } else {
                let sector = self.alloc_block()?;
                self.set_data_block(index, sector)?;
                sector
            };

            let mut block_buf = if existing != 0 {
                self.vol.read_block(sector)?
            } else {
                [0u8; BLOCK_SIZE]
            };

            let to_write = (payload - in_block).min(buf.len() - written);
            block_buf[data_start + in_block..data_start + in_block + to_write]
                .copy_from_slice(&buf[written..written + to_write]);
            self.vol.write_block(sector, &block_buf)?;

            written += to_write;
            self.pos += to_write as u32;
        }

        self.size = self.size.max(self.pos);

        if matches!(fs_type, FsType::Ofs) {
            self.fixup_ofs_headers(first_index.saturating_sub(1), last_index)?;
        }

        Ok(written)
    }

    /// Rewrite the seqNum/dataSize/nextData/checksum of every OFS data
    /// block from `from` to `to` inclusive, reflecting the file's current
    /// size (spec.md §4.6 step 2).
    fn fixup_ofs_headers(&mut self, from: u32, to: u32) -> Result<()> {
        let payload = OFS_DATA_SIZE as u32;
        for index in from..=to {
            let sector = self.get_data_block(index, false)?;
            if sector == 0 {
                continue;
            }
            let block_start = index * payload;
            let data_size = self.size.saturating_sub(block_start).min(payload);
            let next_sector = self.get_data_block(index + 1, false)?;

            let mut buf = self.vol.read_block(sector)?;
            OfsDataBlock::write_header(&mut buf, self.header_block, index + 1, data_size, next_sector);
            self.vol.write_block(sector, &buf)?;
        }
        Ok(())
    }

    /// Free data blocks and extension blocks beyond `new_size`, rewriting
    /// the header (spec.md §4.6 "Truncate").
    pub fn truncate(&mut self, new_size: u32) -> Result<()> {
        if !self.vol.read_write {
            return Err(AdfError::ReadOnly);
        }

        let payload = self.vol.fs_type.data_block_size() as u32;
        let old_block_count = self.size.div_ceil(payload);
        let new_block_count = new_size.div_ceil(payload);

        for index in new_block_count..old_block_count {
            let sector = self.get_data_block(index, false)?;
            if sector != 0 {
                if let Some(bitmap) = self.vol.bitmap.as_mut() {
                    bitmap.free(&[sector]);
                }
                self.clear_data_block(index)?;
            }
        }

        let keep_containers = if new_block_count == 0 {
            1
        } else {
            (new_block_count as usize - 1) / MAX_DATABLK + 1
        };
        self.trim_extensions(keep_containers)?;

        self.size = new_size;
        self.pos = self.pos.min(self.size);

        if matches!(self.vol.fs_type, FsType::Ofs) && new_block_count > 0 {
            self.fixup_ofs_headers(new_block_count - 1, new_block_count - 1)?;
        }

        self.flush()
    }

    /// Write `byteSize` (and, for OFS, `firstData`) back to the header block
    /// and refresh the dir-cache summary for this entry.
    pub fn flush(&mut self) -> Result<()> {
        let mut entry = self.vol.read_entry(self.header_block)?;
        entry.byte_size = self.size;
        if matches!(self.vol.fs_type, FsType::Ofs) {
            entry.first_data = self.get_data_block(0, false)?;
        }
        entry.date = AmigaDate::now();
        let parent = entry.parent;
        self.vol.write_entry(self.header_block, &entry)?;
        super::dircache::on_update(self.vol, parent, self.header_block)
    }

    /// Flush and release the borrow on the volume.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    fn alloc_block(&mut self) -> Result<u32> {
        let bitmap = self
            .vol
            .bitmap
            .as_mut()
            .ok_or(AdfError::InvalidState("bitmap not loaded"))?;
        Ok(bitmap.allocate(1)?.remove(0))
    }

    /// Locate the `c`-th container (0 = the header block itself, 1.. =
    /// extension blocks), allocating and linking new extension blocks when
    /// `create` is set and the chain doesn't reach that far.
    fn container_sector(&mut self, c: usize, create: bool) -> Result<u32> {
        if c == 0 {
            return Ok(self.header_block);
        }

        let mut prev_sector = self.header_block;
        let mut prev_is_header = true;
        let mut cur = self.vol.read_entry(self.header_block)?.extension;

        for _ in 1..c {
            if cur == 0 {
                if !create {
                    return Ok(0);
                }
                cur = self.alloc_extension(prev_sector, prev_is_header)?;
            }
            prev_sector = cur;
            prev_is_header = false;
            let buf = self.vol.read_block(cur)?;
            cur = FileExtBlock::parse_at(&buf, cur)?.extension;
        }

        if cur == 0 {
            if !create {
                return Ok(0);
            }
            cur = self.alloc_extension(prev_sector, prev_is_header)?;
        }

        Ok(cur)
    }

    fn alloc_extension(&mut self, prev_sector: u32, prev_is_header: bool) -> Result<u32> {
        let new_sector = self.alloc_block()?;
        let ext = FileExtBlock::new(new_sector, self.header_block);
        self.vol.write_block(new_sector, &ext.write())?;

        if prev_is_header {
            let mut entry = self.vol.read_entry(prev_sector)?;
            entry.extension = new_sector;
            self.vol.write_entry(prev_sector, &entry)?;
        } else {
            let buf = self.vol.read_block(prev_sector)?;
            let mut prev_ext = FileExtBlock::parse_at(&buf, prev_sector)?;
            prev_ext.extension = new_sector;
            self.vol.write_block(prev_sector, &prev_ext.write())?;
        }

        Ok(new_sector)
    }

    fn get_data_block(&mut self, index: u32, create: bool) -> Result<u32> {
        let container_idx = (index / MAX_DATABLK as u32) as usize;
        let slot = (index % MAX_DATABLK as u32) as usize;
        let container = self.container_sector(container_idx, create)?;
        if container == 0 {
            return Ok(0);
        }
        if container_idx == 0 {
            Ok(self.vol.read_entry(container)?.data_block(slot))
        } else {
            let buf = self.vol.read_block(container)?;
            Ok(FileExtBlock::parse_at(&buf, container)?.data_block(slot))
        }
    }

    fn set_data_block(&mut self, index: u32, block: u32) -> Result<()> {
        let container_idx = (index / MAX_DATABLK as u32) as usize;
        let slot = (index % MAX_DATABLK as u32) as usize;
        let container = self.container_sector(container_idx, true)?;
        if container_idx == 0 {
            let mut entry = self.vol.read_entry(container)?;
            entry.set_data_block(slot, block);
            entry.high_seq = entry.high_seq.max(slot as i32 + 1);
            self.vol.write_entry(container, &entry)
        } else {
            let buf = self.vol.read_block(container)?;
            let mut ext = FileExtBlock::parse_at(&buf, container)?;
            ext.set_data_block(slot, block);
            ext.high_seq = ext.high_seq.max(slot as i32 + 1);
            self.vol.write_block(container, &ext.write())
        }
    }

    fn clear_data_block(&mut self, index: u32) -> Result<()> {
        let container_idx = (index / MAX_DATABLK as u32) as usize;
        let slot = (index % MAX_DATABLK as u32) as usize;
        let container = self.container_sector(container_idx, false)?;
        if container == 0 {
            return Ok(());
        }
        if container_idx == 0 {
            let mut entry = self.vol.read_entry(container)?;
            entry.set_data_block(slot, 0);
            entry.high_seq = entry.high_seq.min(slot as i32);
            self.vol.write_entry(container, &entry)
        } else {
            let buf = self.vol.read_block(container)?;
            let mut ext = FileExtBlock::parse_at(&buf, container)?;
            ext.set_data_block(slot, 0);
            ext.high_seq = ext.high_seq.min(slot as i32);
            self.vol.write_block(container, &ext.write())
        }
    }

    /// Free every extension block past the `keep_containers`-th (container
    /// 0, the header, is never freed here).
    fn trim_extensions(&mut self, keep_containers: usize) -> Result<()> {
        let keep_containers = keep_containers.max(1);
        let last_keep = self.container_sector(keep_containers - 1, false)?;
        if last_keep == 0 {
            return Ok(());
        }

        let next = if keep_containers == 1 {
            self.vol.read_entry(self.header_block)?.extension
        } else {
            let buf = self.vol.read_block(last_keep)?;
            FileExtBlock::parse_at(&buf, last_keep)?.extension
        };

        let mut to_free = Vec::new();
        let mut cur = next;
        while cur != 0 {
            let buf = self.vol.read_block(cur)?;
            let ext = FileExtBlock::parse_at(&buf, cur)?;
            to_free.push(cur);
            cur = ext.extension;
        }

        if to_free.is_empty() {
            return Ok(());
        }

        if keep_containers == 1 {
            let mut entry = self.vol.read_entry(self.header_block)?;
            entry.extension = 0;
            self.vol.write_entry(self.header_block, &entry)?;
        } else {
            let buf = self.vol.read_block(last_keep)?;
            let mut ext = FileExtBlock::parse_at(&buf, last_keep)?;
            ext.extension = 0;
            self.vol.write_block(last_keep, &ext.write())?;
        }

        if let Some(bitmap) = self.vol.bitmap.as_mut() {
            bitmap.free(&to_free);
        }
        Ok(())
    }
}

#[inline]
const fn data_offset(fs_type: FsType) -> usize {
    match fs_type {
        FsType::Ofs => OfsDataBlock::HEADER_SIZE,
        FsType::Ffs => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::{Device, MemoryDevice};
    use crate::types::FsType;

    fn formatted(fs_type: FsType) -> Device {
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_DD_SECTORS));
        let mut device = Device::open(driver, "test.adf", true, Config::default()).unwrap();
        {
            let vol = Volume::format(&mut device, 0, "Empty", fs_type, Config::default()).unwrap();
            vol.unmount().unwrap();
        }
        device
    }

    fn sizes() -> [usize; 7] {
        [0, 1, 487, 488, 489, 10000, 80000]
    }

    fn round_trip(fs_type: FsType) {
        let mut device = formatted(fs_type);
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();

        for (i, &n) in sizes().iter().enumerate() {
            let name = std::format!("f{i}");
            let header = vol.create_header_block(vol.root_block, name.as_bytes(), ST_FILE).unwrap();
            let content: Vec<u8> = (0..n).map(|b| (b % 251) as u8).collect();

            {
                let mut handle = FileHandle::open(&mut vol, header, OpenMode::Truncate).unwrap();
                let written = handle.write(&content).unwrap();
                assert_eq!(written, n);
                handle.close().unwrap();
            }

            let mut handle = FileHandle::open(&mut vol, header, OpenMode::Read).unwrap();
            assert_eq!(handle.size() as usize, n);
            let read_back = handle.read_to_vec().unwrap();
            assert_eq!(read_back, content, "size {n} mismatch for {fs_type:?}");
        }
    }

    #[test]
    fn test_ofs_round_trip_sizes() {
        round_trip(FsType::Ofs);
    }

    #[test]
    fn test_ffs_round_trip_sizes() {
        round_trip(FsType::Ffs);
    }

    #[test]
    fn test_truncate_frees_blocks() {
        // A 1 MiB write needs ~2048 data blocks, more than a DD floppy's
        // ~1750 total blocks; use the larger HD floppy geometry instead.
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_HD_SECTORS));
        let mut device = Device::open(driver, "test.adf", true, Config::default()).unwrap();
        {
            let vol = Volume::format(&mut device, 0, "Empty", FsType::Ffs, Config::default()).unwrap();
            vol.unmount().unwrap();
        }
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let header = vol.create_header_block(vol.root_block, b"big", ST_FILE).unwrap();

        let content = std::vec![0xAAu8; 1024 * 1024];
        let free_before = vol.free_blocks();
        {
            let mut handle = FileHandle::open(&mut vol, header, OpenMode::Truncate).unwrap();
            handle.write(&content).unwrap();
            handle.close().unwrap();
        }
        let free_after_write = vol.free_blocks();
        assert_eq!(free_before - free_after_write, content.len().div_ceil(FFS_DATA_SIZE) as u32);

        {
            let mut handle = FileHandle::open(&mut vol, header, OpenMode::Read).unwrap();
            assert_eq!(handle.size() as usize, content.len());
        }

        let mut handle = FileHandle::open(&mut vol, header, OpenMode::Read).unwrap();
        handle.truncate(100).unwrap();
        assert_eq!(handle.size(), 100);
        drop(handle);

        let expected_freed = (content.len().div_ceil(FFS_DATA_SIZE) - 100usize.div_ceil(FFS_DATA_SIZE)) as u32;
        assert_eq!(vol.free_blocks(), free_after_write + expected_freed);
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let mut device = formatted(FsType::Ofs);
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let header = vol.create_header_block(vol.root_block, b"log", ST_FILE).unwrap();

        {
            let mut handle = FileHandle::open(&mut vol, header, OpenMode::Truncate).unwrap();
            handle.write(b"hello ").unwrap();
            handle.close().unwrap();
        }
        {
            let mut handle = FileHandle::open(&mut vol, header, OpenMode::Append).unwrap();
            handle.write(b"world").unwrap();
            handle.close().unwrap();
        }

        let mut handle = FileHandle::open(&mut vol, header, OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"hello world");
    }
}
