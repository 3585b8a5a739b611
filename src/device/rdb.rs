//! Rigid Disk Block parsing and partition-chain walking (spec.md §4.2, §6).
//!
//! Grounded on `adf_dev_hd.c`'s `adfMountHd`/`adfReadRDSKblock`/
//! `adfReadPARTblock`/`adfReadFSHDblock`/`adfReadLSEGblock`. The original
//! collects partitions into a temporary singly-linked list before copying
//! them into `dev->volList[]`; this is a redesign target per spec.md §9, so
//! we walk directly into a `Vec`.

use crate::block::{BadbBlock, FshdBlock, LsegBlock, PartBlock, RdskBlock};
use crate::config::Config;
use crate::constants::{BLOCK_SIZE, MAX_PARTITIONS};
use crate::device::types::PartitionInfo;
use crate::device::DeviceDriver;
use crate::error::{AdfError, Result};

/// Everything read from the RDB chain at device-open time.
#[derive(Debug, Clone)]
pub struct RdbInfo {
    /// The decoded `RDSK` block itself.
    pub rdsk: RdskBlock,
    /// Partitions discovered by walking `rdsk.partition_list`.
    pub partitions: std::vec::Vec<PartitionInfo>,
}

fn read_block(driver: &mut dyn DeviceDriver, block: u32) -> Result<[u8; BLOCK_SIZE]> {
    let mut buf = [0u8; BLOCK_SIZE];
    driver.read_sectors(block, 1, &mut buf)?;
    Ok(buf)
}

/// Read and decode the RDB chain starting at sector 0 (already confirmed to
/// carry the "RDSK" signature by the caller).
pub fn mount_rdb(driver: &mut dyn DeviceDriver, config: &mut Config) -> Result<RdbInfo> {
    let buf = read_block(driver, 0)?;
    let rdsk = RdskBlock::parse(&buf)?;

    let mut partitions = std::vec::Vec::new();
    let mut next = rdsk.partition_list;
    let mut seen = 0usize;

    while next != -1 {
        if seen >= MAX_PARTITIONS {
            return Err(AdfError::TooManyPartitions);
        }
        seen += 1;

        let buf = read_block(driver, next as u32)?;
        let part = PartBlock::parse_at(&buf, next as u32)?;

        let cyl_blocks = rdsk.cyl_blocks as u32;
        let first_block = cyl_blocks * part.low_cyl as u32;
        let last_block = cyl_blocks * (part.high_cyl as u32 + 1) - 1;

        partitions.push(PartitionInfo {
            first_block,
            last_block,
            name: String::from_utf8_lossy(part.name()).into_owned(),
            dos_type_hint: Some(part.dos_type),
        });

        next = part.next;
    }

    validate_fshd_chain(driver, config, rdsk.file_sys_hdr_list);
    validate_badb_chain(driver, config, rdsk.bad_block_list);

    Ok(RdbInfo { rdsk, partitions })
}

/// Walk the FSHD/LSEG chain purely to validate it reads back without error,
/// per spec.md §4.2 ("their contents are not required for filesystem I/O").
/// Failures are reported through `Config::report_warn`, never propagated.
fn validate_fshd_chain(driver: &mut dyn DeviceDriver, config: &mut Config, fshd_head: i32) {
    let mut next = fshd_head;
    let mut seen = 0usize;

    while next != -1 {
        if seen >= MAX_PARTITIONS {
            config.report_warn("FSHD chain exceeds partition cap, stopping validation");
            return;
        }
        seen += 1;

        let fshd = match read_block(driver, next as u32).and_then(|b| FshdBlock::parse_at(&b, next as u32)) {
            Ok(f) => f,
            Err(e) => {
                config.report_warn(&std::format!("FSHD block {next} unreadable: {e}"));
                return;
            }
        };

        validate_lseg_chain(driver, config, fshd.seg_list_block);
        next = fshd.next;
    }
}

fn validate_lseg_chain(driver: &mut dyn DeviceDriver, config: &mut Config, lseg_head: i32) {
    let mut next = lseg_head;
    let mut seen = 0usize;

    while next != -1 {
        if seen >= MAX_PARTITIONS {
            config.report_warn("LSEG chain exceeds partition cap, stopping validation");
            return;
        }
        seen += 1;

        let lseg = match read_block(driver, next as u32).and_then(|b| LsegBlock::parse_at(&b, next as u32)) {
            Ok(l) => l,
            Err(e) => {
                config.report_warn(&std::format!("LSEG block {next} unreadable: {e}"));
                return;
            }
        };
        next = lseg.next;
    }
}

/// Walk and validate the bad-block list, if present. Never fails the mount.
pub fn validate_badb_chain(driver: &mut dyn DeviceDriver, config: &mut Config, badb_head: i32) {
    let mut next = badb_head;
    let mut seen = 0usize;

    while next != -1 {
        if seen >= MAX_PARTITIONS {
            config.report_warn("BADB chain exceeds partition cap, stopping validation");
            return;
        }
        seen += 1;

        let badb = match read_block(driver, next as u32).and_then(|b| BadbBlock::parse_at(&b, next as u32)) {
            Ok(b) => b,
            Err(e) => {
                config.report_warn(&std::format!("BADB block {next} unreadable: {e}"));
                return;
            }
        };
        next = badb.next;
    }
}
