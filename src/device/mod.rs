//! Block-device abstraction and device classification (spec.md §2, §4.2, §6).
//!
//! Grounded on `adf_dev.c` (open/create/close/read/write lifecycle) and
//! `adf_dev_driver_dump.c`/`adf_dev_driver_ramdisk.c` (concrete drivers).
//! The original's driver dispatch is a struct of function pointers
//! (`struct AdfDeviceDriver`); spec.md §9 asks for a small vtable-style
//! value instead of inheritance, which a `Box<dyn DeviceDriver>` gives us
//! directly.

pub mod rdb;
pub mod types;

use crate::config::{AccessKind, Config};
use crate::constants::{BLOCK_SIZE, RDSK_ID};
use crate::error::{AdfError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub use rdb::RdbInfo;
pub use types::{DeviceKind, Geometry, PartitionInfo};

/// The block-device driver interface from spec.md §6: `openDev`/`closeDev`/
/// `readSectors`/`writeSectors`/`isNative`/`isDevice`, modeled as a trait
/// object rather than a vtable struct, plus a `createDev` counterpart on
/// each concrete driver. All I/O is in whole 512-byte blocks.
pub trait DeviceDriver: std::fmt::Debug {
    /// Total number of 512-byte blocks backing this container.
    fn size_blocks(&self) -> u32;

    /// Read `count` consecutive blocks starting at `first_block` into `out`
    /// (`out.len() == count as usize * 512`).
    fn read_sectors(&mut self, first_block: u32, count: u32, out: &mut [u8]) -> Result<()>;

    /// Write `count` consecutive blocks starting at `first_block` from `data`
    /// (`data.len() == count as usize * 512`).
    fn write_sectors(&mut self, first_block: u32, count: u32, data: &[u8]) -> Result<()>;

    /// Whether this driver talks to real Amiga-native hardware (always
    /// `false` for the portable drivers this crate ships).
    fn is_native(&self) -> bool {
        false
    }

    /// Flush any buffered writes to the backing store.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// File-backed driver for ADF/HDF dump images (grounded in
/// `adfDeviceDriverDump`/`adf_dev_driver_dump.c`).
#[derive(Debug)]
pub struct ImageFileDevice {
    file: File,
    size_blocks: u32,
}

impl ImageFileDevice {
    /// Open an existing image file.
    pub fn open(path: impl AsRef<Path>, read_write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(read_write)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            size_blocks: (len / BLOCK_SIZE as u64) as u32,
        })
    }

    /// Create (`createDev`) a new, zero-filled image file of `size_blocks`
    /// blocks, grounded in `adfCreateDumpDevice`.
    pub fn create(path: impl AsRef<Path>, size_blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_blocks as u64 * BLOCK_SIZE as u64)?;
        Ok(Self { file, size_blocks })
    }

    /// `isDevice`: true if `name` names a regular file that exists.
    pub fn is_device(name: impl AsRef<Path>) -> bool {
        name.as_ref().is_file()
    }
}

impl DeviceDriver for ImageFileDevice {
    fn size_blocks(&self) -> u32 {
        self.size_blocks
    }

    fn read_sectors(&mut self, first_block: u32, count: u32, out: &mut [u8]) -> Result<()> {
        let need = count as usize * BLOCK_SIZE;
        if out.len() < need {
            return Err(AdfError::BufferTooSmall);
        }
        self.file
            .seek(SeekFrom::Start(first_block as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(&mut out[..need])?;
        Ok(())
    }

    fn write_sectors(&mut self, first_block: u32, count: u32, data: &[u8]) -> Result<()> {
        let need = count as usize * BLOCK_SIZE;
        if data.len() < need {
            return Err(AdfError::BufferTooSmall);
        }
        self.file
            .seek(SeekFrom::Start(first_block as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(&data[..need])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// In-memory driver for tests and scratch images (grounded in
/// `adf_dev_driver_ramdisk.c`; supersedes the teacher's read-only
/// `MockDevice` test helper as a first-class type).
#[derive(Debug)]
pub struct MemoryDevice {
    data: std::vec::Vec<u8>,
}

impl MemoryDevice {
    /// Wrap an existing in-memory image. `data.len()` must be a multiple of 512.
    pub fn new(data: std::vec::Vec<u8>) -> Self {
        Self { data }
    }

    /// Create (`createDev`) a new, zero-filled in-memory image of `size_blocks` blocks.
    pub fn create(size_blocks: u32) -> Self {
        Self {
            data: std::vec![0u8; size_blocks as usize * BLOCK_SIZE],
        }
    }

    /// Borrow the raw backing bytes, e.g. to persist a formatted image to disk.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl DeviceDriver for MemoryDevice {
    fn size_blocks(&self) -> u32 {
        (self.data.len() / BLOCK_SIZE) as u32
    }

    fn read_sectors(&mut self, first_block: u32, count: u32, out: &mut [u8]) -> Result<()> {
        let start = first_block as usize * BLOCK_SIZE;
        let len = count as usize * BLOCK_SIZE;
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or(AdfError::BlockOutOfRange {
                block: first_block,
                first: 0,
                last: self.size_blocks().saturating_sub(1),
            })?;
        out[..len].copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_sectors(&mut self, first_block: u32, count: u32, data: &[u8]) -> Result<()> {
        let start = first_block as usize * BLOCK_SIZE;
        let len = count as usize * BLOCK_SIZE;
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or(AdfError::BlockOutOfRange {
                block: first_block,
                first: 0,
                last: self.size_blocks().saturating_sub(1),
            })?;
        self.data[start..end].copy_from_slice(&data[..len]);
        Ok(())
    }
}

/// Stub for the "host raw block device" variant spec.md §1/§6 names as an
/// external collaborator: declared so callers can see the shape of the
/// interface, but portable raw-device access is out of reach of a
/// cross-platform library and left to a caller-supplied implementation of
/// [`DeviceDriver`].
#[derive(Debug)]
pub struct RawDevice;

impl DeviceDriver for RawDevice {
    fn size_blocks(&self) -> u32 {
        0
    }

    fn read_sectors(&mut self, _first_block: u32, _count: u32, _out: &mut [u8]) -> Result<()> {
        Err(AdfError::NotImplemented(
            "raw host block device access is not portable; supply your own DeviceDriver",
        ))
    }

    fn write_sectors(&mut self, _first_block: u32, _count: u32, _data: &[u8]) -> Result<()> {
        Err(AdfError::NotImplemented(
            "raw host block device access is not portable; supply your own DeviceDriver",
        ))
    }

    fn is_native(&self) -> bool {
        true
    }
}

/// An opened container: a driver plus the geometry/classification derived
/// from it (spec.md §2/§4.2). Mounting a volume borrows this mutably.
#[derive(Debug)]
pub struct Device {
    driver: std::boxed::Box<dyn DeviceDriver>,
    /// Display name for diagnostics (path, or a caller-supplied label for
    /// in-memory devices).
    pub name: std::string::String,
    /// Total blocks backing the container.
    pub size_blocks: u32,
    /// Derived or RDB-supplied geometry.
    pub geometry: Geometry,
    /// Whether the device was opened for writing.
    pub read_write: bool,
    /// Floppy / hardfile / harddisk classification.
    pub kind: DeviceKind,
    /// Present iff sector 0 carries an `RDSK` signature.
    pub rdb: Option<RdbInfo>,
    /// One entry per mountable volume (the whole device for floppy/hardfile,
    /// one per RDB partition for harddisk).
    pub partitions: std::vec::Vec<PartitionInfo>,
    /// Runtime configuration (callbacks, checksum leniency).
    pub config: Config,
}

impl Device {
    /// `openDev`: probe geometry, read sector 0 for an RDB signature, and
    /// classify the device (spec.md §4.2).
    pub fn open(
        mut driver: std::boxed::Box<dyn DeviceDriver>,
        name: impl Into<std::string::String>,
        read_write: bool,
        mut config: Config,
    ) -> Result<Self> {
        let size_blocks = driver.size_blocks();

        let mut sector0 = [0u8; BLOCK_SIZE];
        driver.read_sectors(0, 1, &mut sector0)?;
        config.report_access(AccessKind::Read, 0);

        if &sector0[0..4] == RDSK_ID {
            let rdb = rdb::mount_rdb(driver.as_mut(), &mut config)?;
            let geometry = Geometry {
                cylinders: rdb.rdsk.cylinders as u32,
                heads: rdb.rdsk.heads as u32,
                sectors: rdb.rdsk.sectors as u32,
            };
            let partitions = rdb.partitions.clone();
            return Ok(Self {
                driver,
                name: name.into(),
                size_blocks,
                geometry,
                read_write,
                kind: DeviceKind::Harddisk,
                rdb: Some(rdb),
                partitions,
                config,
            });
        }

        if let Some(geometry) = types::lookup_floppy_geometry(size_blocks) {
            let partitions = std::vec![PartitionInfo {
                first_block: 0,
                last_block: size_blocks - 1,
                name: std::string::String::new(),
                dos_type_hint: None,
            }];
            // A floppy-shaped image could still (unusually) carry an RDB;
            // that case was already handled above. No RDB => plain floppy.
            return Ok(Self {
                driver,
                name: name.into(),
                size_blocks,
                geometry,
                read_write,
                kind: DeviceKind::Floppy,
                rdb: None,
                partitions,
                config,
            });
        }

        // Hardfile: scan downward from size_blocks/2 for a root block.
        let root_block = find_hardfile_root_block(driver.as_mut(), size_blocks, &mut config)?;
        let last_block = 2 * root_block - 1;
        let partitions = std::vec![PartitionInfo {
            first_block: 0,
            last_block,
            name: std::string::String::new(),
            dos_type_hint: None,
        }];

        Ok(Self {
            driver,
            name: name.into(),
            size_blocks,
            geometry: Geometry {
                cylinders: size_blocks,
                heads: 1,
                sectors: 1,
            },
            read_write,
            kind: DeviceKind::Hardfile,
            rdb: None,
            partitions,
            config,
        })
    }

    /// `closeDev`: flush the underlying driver. Dropping the `Device` also
    /// drops the driver (and, for `ImageFileDevice`, the `File`).
    pub fn close(mut self) -> Result<()> {
        self.driver.flush()
    }

    /// Read `count` blocks starting at `first_block`, tracing through `Config`.
    pub fn read_sectors(&mut self, first_block: u32, count: u32, out: &mut [u8]) -> Result<()> {
        self.driver.read_sectors(first_block, count, out)?;
        self.config.report_access(AccessKind::Read, first_block);
        Ok(())
    }

    /// Write `count` blocks starting at `first_block`, tracing through `Config`.
    pub fn write_sectors(&mut self, first_block: u32, count: u32, data: &[u8]) -> Result<()> {
        if !self.read_write {
            return Err(AdfError::ReadOnly);
        }
        self.driver.write_sectors(first_block, count, data)?;
        self.config.report_access(AccessKind::Write, first_block);
        Ok(())
    }

    /// Number of mountable volumes this device carries.
    #[inline]
    pub fn volume_count(&self) -> usize {
        self.partitions.len()
    }
}

/// Scan downward from `size_blocks / 2` for a block whose primaryType is
/// `T_HEADER` and secondaryType is `ROOT`, stopping at sector 1
/// (spec.md §4.2, grounded in `adf_dev_hdfile.c`'s `adfMountHdFile`).
fn find_hardfile_root_block(
    driver: &mut dyn DeviceDriver,
    size_blocks: u32,
    config: &mut Config,
) -> Result<u32> {
    use crate::block::RootBlock;

    let mut candidate = size_blocks / 2;
    let mut buf = [0u8; BLOCK_SIZE];

    while candidate >= 1 {
        if driver.read_sectors(candidate, 1, &mut buf).is_ok() {
            match RootBlock::parse_at(&buf, candidate) {
                Ok(_) => return Ok(candidate),
                Err(AdfError::ChecksumMismatch { .. }) if config.ignore_checksum_errors => {
                    return Ok(candidate);
                }
                _ => {}
            }
        }
        candidate -= 1;
    }

    Err(AdfError::InvalidState(
        "no root block found while scanning hardfile image",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_device_read_write_round_trip() {
        let mut dev = MemoryDevice::create(10);
        let mut buf = [0xABu8; BLOCK_SIZE];
        dev.write_sectors(3, 1, &buf).unwrap();
        let mut out = [0u8; BLOCK_SIZE];
        dev.read_sectors(3, 1, &mut out).unwrap();
        assert_eq!(out, buf);
        buf[0] = 0;
        assert_ne!(out, buf);
    }

    #[test]
    fn test_memory_device_out_of_range() {
        let mut dev = MemoryDevice::create(2);
        let mut out = [0u8; BLOCK_SIZE];
        assert!(matches!(
            dev.read_sectors(5, 1, &mut out),
            Err(AdfError::BlockOutOfRange { .. })
        ));
    }

    #[test]
    fn test_open_classifies_floppy() {
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_DD_SECTORS));
        let device = Device::open(driver, "test.adf", true, Config::default()).unwrap();
        assert_eq!(device.kind, DeviceKind::Floppy);
        assert_eq!(device.partitions.len(), 1);
        assert_eq!(device.partitions[0].last_block, crate::FLOPPY_DD_SECTORS - 1);
    }

}
