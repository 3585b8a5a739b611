//! # amiga-ffs
//!
//! Read and write access to Amiga Fast File System (OFS/FFS) volumes, on
//! plain ADF floppy images, HDF hardfile images, and RDB-partitioned hard
//! disk images.
//!
//! This crate started life as a read-only, zero-allocation AFFS reader. The
//! mutation surface (directory/bitmap/file writes, formatting, links, RDB
//! partition mounting) needs a host filesystem and heap allocation, so the
//! public engine (`device`, `volume`, `path`) is `std`-only. The block codec
//! and hashing primitives in `block`, `checksum`, `hash`, `date` and `utf8`
//! don't touch the filesystem or allocate, and can be reused on their own by
//! anything that already has a 512-byte buffer in hand.
//!
//! ## Example
//!
//! ```ignore
//! use amiga_ffs::device::{Device, MemoryDevice};
//! use amiga_ffs::volume::Volume;
//! use amiga_ffs::config::Config;
//!
//! let device = MemoryDevice::new(vec![0u8; 880 * 512]);
//! let mut device = Device::open(Box::new(device), "disk.adf", true, Config::default())?;
//! let mut volume = Volume::mount(&mut device, 0, Config::default())?;
//!
//! for entry in volume.list_dir("/")? {
//!     println!("{}", entry.name_str().unwrap_or("?"));
//! }
//! # Ok::<(), amiga_ffs::error::AdfError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod date;
pub mod device;
pub mod dir;
pub mod error;
pub mod file;
pub mod hash;
pub mod path;
pub mod symlink;
pub mod types;
pub mod utf8;
pub mod volume;

pub use block::*;
pub use checksum::{bitmap_sum, boot_sum, normal_sum, normal_sum_slice, read_u16_be};
pub use config::Config;
pub use constants::*;
pub use date::AmigaDate;
pub use device::{Device, ImageFileDevice, MemoryDevice};
pub use dir::{DirEntry, DirIter};
pub use error::{AdfError, Result};
pub use file::FileReader;
pub use hash::{ascii_to_upper, hash_name, intl_to_upper, names_equal};
pub use path::PathApi;
pub use symlink::{
    MAX_SYMLINK_LEN, max_utf8_len, read_symlink_target, read_symlink_target_with_block_size,
    write_symlink_target,
};
pub use types::*;
pub use volume::Volume;
