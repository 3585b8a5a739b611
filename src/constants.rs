//! Constants for AFFS filesystem.

/// Logical block size in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Boot block size (2 blocks).
pub const BOOT_BLOCK_SIZE: usize = 1024;

/// Hash table size (entries per directory).
pub const HASH_TABLE_SIZE: usize = 72;

/// Maximum data block pointers per file header or extension block.
pub const MAX_DATABLK: usize = 72;

/// Maximum filename length.
pub const MAX_NAME_LEN: usize = 30;

/// Maximum comment length.
pub const MAX_COMMENT_LEN: usize = 79;

/// Bitmap pages in root block.
pub const BM_PAGES_ROOT_SIZE: usize = 25;

/// Bitmap pages in extension block.
pub const BM_PAGES_EXT_SIZE: usize = 127;

/// Bitmap map entries.
pub const BM_MAP_SIZE: usize = 127;

/// Standard floppy disk sector count (DD: 880KB).
pub const FLOPPY_DD_SECTORS: u32 = 1760;

/// Standard floppy disk sector count (HD: 1.76MB).
pub const FLOPPY_HD_SECTORS: u32 = 3520;

/// Sectors per track (DD).
pub const SECTORS_PER_TRACK_DD: u32 = 11;

/// Sectors per track (HD).
pub const SECTORS_PER_TRACK_HD: u32 = 22;

/// Number of heads.
pub const HEADS: u32 = 2;

/// Number of cylinders (tracks).
pub const CYLINDERS: u32 = 80;

// Filesystem type flags (in dosType[3])
/// Original File System.
pub const DOSFS_OFS: u8 = 0;
/// Fast File System.
pub const DOSFS_FFS: u8 = 1;
/// International mode (case-insensitive for international characters).
pub const DOSFS_INTL: u8 = 2;
/// Directory cache mode.
pub const DOSFS_DIRCACHE: u8 = 4;

// Block types
/// Header block type.
pub const T_HEADER: i32 = 2;
/// Data block type (OFS only).
pub const T_DATA: i32 = 8;
/// List/extension block type.
pub const T_LIST: i32 = 16;
/// Directory cache block type.
pub const T_DIRC: i32 = 33;

// Secondary types
/// Root block secondary type.
pub const ST_ROOT: i32 = 1;
/// Directory secondary type.
pub const ST_DIR: i32 = 2;
/// Soft link secondary type.
pub const ST_LSOFT: i32 = 3;
/// Hard link to directory secondary type.
pub const ST_LDIR: i32 = 4;
/// File secondary type.
pub const ST_FILE: i32 = -3;
/// Hard link to file secondary type.
pub const ST_LFILE: i32 = -4;

// Access flags
/// Delete protected.
pub const ACC_DELETE: u32 = 1 << 0;
/// Execute protected.
pub const ACC_EXECUTE: u32 = 1 << 1;
/// Write protected.
pub const ACC_WRITE: u32 = 1 << 2;
/// Read protected.
pub const ACC_READ: u32 = 1 << 3;
/// Archived.
pub const ACC_ARCHIVE: u32 = 1 << 4;
/// Pure (re-entrant).
pub const ACC_PURE: u32 = 1 << 5;
/// Script.
pub const ACC_SCRIPT: u32 = 1 << 6;
/// Hidden.
pub const ACC_HOLD: u32 = 1 << 7;

/// Valid bitmap flag value.
pub const BM_VALID: i32 = -1;

/// OFS data block payload size.
pub const OFS_DATA_SIZE: usize = 488;

/// FFS data block payload size (full block).
pub const FFS_DATA_SIZE: usize = 512;

/// OFS data block header size (type, headerKey, seqNum, dataSize, nextData, checksum).
pub const OFS_DATA_HEADER_SIZE: usize = 24;

/// Offset of a symlink's inline Latin-1 target string within an entry block.
pub const SYMLINK_OFFSET: usize = 24;

/// Size, in bytes, of the fixed fields that follow the symlink data region
/// (comment, dates, name, parent/extension/sectype) at the tail of a block.
pub const FILE_LOCATION: usize = 200;

/// Checksum offset used by most header-style blocks (root, entry, file ext, OFS data).
pub const CHECKSUM_OFFSET: usize = 20;

/// Checksum offset used by bitmap and bitmap-extension blocks.
pub const BITMAP_CHECKSUM_OFFSET: usize = 0;

/// Checksum offset used by the RDB block family (RDSK/PART/FSHD/LSEG/BADB).
pub const RDB_CHECKSUM_OFFSET: usize = 8;

/// Length, in bytes, covered by the RDB block family's checksum (first 64 longwords).
pub const RDB_CHECKSUM_LEN: usize = 256;

// Block types (continued)
/// File/directory extension block type (file extension, dir cache).
pub const T_LIST_EXT: i32 = 16;
/// Bitmap extension block "type" marker used only for clarity; bitmap blocks have no primaryType.
pub const T_DATA_FFS: i32 = 0;

/// Directory cache secondary type (stored in the block's own header, informational only).
pub const ST_DIRCACHE: i32 = -1;

/// Number of bitmap pointers stored directly in the root block (`bmPages[]`).
pub const BM_PAGES_ROOT: usize = BM_PAGES_ROOT_SIZE;

/// Number of bitmap pointers stored in a bitmap extension block.
pub const BM_PAGES_EXT: usize = BM_PAGES_EXT_SIZE;

/// Maximum number of RDB partitions this crate will enumerate (Open Question (b)).
pub const MAX_PARTITIONS: usize = 255;

/// RDB `RDSK` block signature.
pub const RDSK_ID: [u8; 4] = *b"RDSK";
/// RDB `PART` block signature.
pub const PART_ID: [u8; 4] = *b"PART";
/// RDB `FSHD` block signature.
pub const FSHD_ID: [u8; 4] = *b"FSHD";
/// RDB `LSEG` block signature.
pub const LSEG_ID: [u8; 4] = *b"LSEG";
/// RDB `BADB` block signature.
pub const BADB_ID: [u8; 4] = *b"BADB";

/// `SummedLongs` value (in 32-bit words) of the checksummed region of every RDB block.
pub const RDB_SUMMED_LONGS: u32 = 64;

/// Logical sector size used by the RDB family's `blockSize` field (stored as a longword count).
pub const RDB_BLOCK_SIZE_LONGS: u32 = (BLOCK_SIZE / 4) as u32;

/// Signature used by the Amiga Professional File System; present only to be recognized and
/// refused at mount time (spec Non-goal: no PFS read/write support).
pub const PFS_ID_PREFIX: &[u8; 3] = b"PFS";
