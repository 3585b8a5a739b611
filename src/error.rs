//! Error types for the volume engine.

use std::string::String;
use thiserror::Error;

/// Error type for all volume, device and codec operations.
#[derive(Debug, Error)]
pub enum AdfError {
    /// The underlying device failed a read.
    #[error("block read error at block {0}")]
    BlockReadError(u32),
    /// The underlying device failed a write.
    #[error("block write error at block {0}")]
    BlockWriteError(u32),
    /// I/O error from a host-backed device (image file).
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid DOS type signature in a boot block.
    #[error("invalid DOS type signature")]
    InvalidDosType,
    /// Invalid primary block type for the context it was read in.
    #[error("invalid block type: expected {expected}, found {found}")]
    InvalidBlockType {
        /// Expected `T_*` constant.
        expected: i32,
        /// Block type actually found.
        found: i32,
    },
    /// Invalid secondary type for the context it was read in.
    #[error("invalid secondary type: {0}")]
    InvalidSecType(i32),
    /// Checksum verification failed for a block.
    #[error("checksum mismatch at block {block}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Block number.
        block: u32,
        /// Checksum stored on disk.
        expected: u32,
        /// Checksum recomputed from the block contents.
        computed: u32,
    },
    /// Block number out of the volume's valid range.
    #[error("block {block} out of range [{first}, {last}]")]
    BlockOutOfRange {
        /// Requested block.
        block: u32,
        /// First valid block.
        first: u32,
        /// Last valid block.
        last: u32,
    },
    /// Entry not found while resolving a path or directory lookup.
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    /// A path component could not be found while a later one is still expected.
    #[error("path not found: {0}")]
    PathNotFound(String),
    /// Name too long (max 30 characters).
    #[error("name too long (max {MAX_NAME_LEN} characters)", MAX_NAME_LEN = crate::MAX_NAME_LEN)]
    NameTooLong,
    /// Comment too long (max 79 characters).
    #[error("comment too long (max {MAX_COMMENT_LEN} characters)", MAX_COMMENT_LEN = crate::MAX_COMMENT_LEN)]
    CommentTooLong,
    /// Invalid filesystem state (corrupt or inconsistent metadata).
    #[error("invalid filesystem state: {0}")]
    InvalidState(&'static str),
    /// End of file reached.
    #[error("end of file")]
    EndOfFile,
    /// Not a file entry.
    #[error("not a file")]
    NotAFile,
    /// Not a directory entry.
    #[error("not a directory")]
    NotADirectory,
    /// Not a symlink entry.
    #[error("not a symlink")]
    NotASymlink,
    /// Buffer too small for the requested data.
    #[error("buffer too small")]
    BufferTooSmall,
    /// Invalid data block sequence while walking an OFS data chain.
    #[error("invalid data block sequence")]
    InvalidDataSequence,
    /// Symlink target too long to fit in a single block.
    #[error("symlink target too long")]
    SymlinkTooLong,
    /// The volume (or device) is mounted read-only.
    #[error("volume is read-only")]
    ReadOnly,
    /// The volume is out of free blocks.
    #[error("volume is full")]
    VolumeFull,
    /// An entry with this name already exists in the target directory.
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    /// Directory is not empty and cannot be removed.
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// A filesystem other than OFS/FFS (e.g. PFS) was found; unsupported.
    #[error("unsupported filesystem type: {0:?}")]
    UnsupportedFileSystem([u8; 4]),
    /// No `RDSK` block found / RDB signature mismatch.
    #[error("no rigid disk block found")]
    NoRigidDiskBlock,
    /// More partitions than the crate is willing to enumerate (see Open Questions).
    #[error("too many partitions (possible corrupt PART chain)")]
    TooManyPartitions,
    /// Partition index out of range.
    #[error("partition index {0} out of range")]
    PartitionOutOfRange(usize),
    /// A hard-link chain looped back on itself (see Open Questions).
    #[error("hard link cycle detected")]
    LinkCycle,
    /// Device geometry could not be determined and was not supplied.
    #[error("unknown device geometry")]
    UnknownGeometry,
    /// Requested operation is not implemented for this block/device variant.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

/// Result type for volume engine operations.
pub type Result<T> = core::result::Result<T, AdfError>;
