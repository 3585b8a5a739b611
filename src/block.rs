//! Block structure parsing and encoding (spec.md §4.1, §3).
//!
//! Each struct's `parse`/`write` pair is the idiomatic-Rust equivalent of the
//! original's table-driven endian swap: field access through named struct
//! members already gives the compile-time-checked layout a descriptor table
//! would provide at runtime.

use crate::checksum::{
    boot_sum, normal_sum, normal_sum_slice, read_i32_be, read_u32_be, read_u32_be_slice,
    write_i32_be, write_u32_be, write_normal_sum,
};
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AdfError, Result};
use crate::types::{EntryType, FsFlags, FsType};

/// Parsed boot block.
#[derive(Debug, Clone)]
pub struct BootBlock {
    /// DOS type bytes ("DOS\x00" - "DOS\x07").
    pub dos_type: [u8; 4],
    /// Checksum.
    pub checksum: u32,
    /// Root block number.
    pub root_block: u32,
}

impl BootBlock {
    /// Parse boot block from raw data (1024 bytes).
    pub fn parse(buf: &[u8; BOOT_BLOCK_SIZE]) -> Result<Self> {
        let dos_type = [buf[0], buf[1], buf[2], buf[3]];

        if &dos_type[0..3] == crate::constants::PFS_ID_PREFIX {
            return Err(AdfError::UnsupportedFileSystem(dos_type));
        }
        if &dos_type[0..3] != b"DOS" {
            return Err(AdfError::InvalidDosType);
        }

        let checksum = read_u32_be_slice(buf, 4);
        let root_block = read_u32_be_slice(buf, 8);

        // Boot code (if present) is checksummed; an unformatted/blank boot
        // block has byte 12 == 0 and is not checksum-verified.
        if buf[12] != 0 {
            let calculated = boot_sum(buf);
            if checksum != calculated {
                return Err(AdfError::ChecksumMismatch {
                    block: 0,
                    expected: checksum,
                    computed: calculated,
                });
            }
        }

        Ok(Self {
            dos_type,
            checksum,
            root_block,
        })
    }

    /// Build and checksum a boot block buffer for a freshly formatted volume.
    pub fn write(fs_flags: u8, root_block: u32) -> [u8; BOOT_BLOCK_SIZE] {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        buf[0] = b'D';
        buf[1] = b'O';
        buf[2] = b'S';
        buf[3] = fs_flags;
        write_u32_be(&mut buf, 8, root_block);
        // Checksum left at 0: no boot code is written, matching adfVolCreate's
        // "do not checksum an empty boot block" behavior (byte 12 stays 0).
        buf
    }

    /// Get filesystem type (OFS or FFS).
    #[inline]
    pub const fn fs_type(&self) -> FsType {
        if (self.dos_type[3] & DOSFS_FFS) != 0 {
            FsType::Ffs
        } else {
            FsType::Ofs
        }
    }

    /// Get filesystem flags.
    #[inline]
    pub const fn fs_flags(&self) -> FsFlags {
        FsFlags::from_dos_type(self.dos_type[3])
    }
}

/// Parsed root block.
#[derive(Debug, Clone)]
pub struct RootBlock {
    /// Block type (should be T_HEADER).
    pub block_type: i32,
    /// Hash table size (always 72).
    pub hash_table_size: i32,
    /// Checksum.
    pub checksum: u32,
    /// Hash table entries.
    pub hash_table: [u32; HASH_TABLE_SIZE],
    /// Bitmap valid flag (-1 = valid).
    pub bm_flag: i32,
    /// Bitmap block pointers.
    pub bm_pages: [u32; BM_PAGES_ROOT_SIZE],
    /// Bitmap extension block.
    pub bm_ext: u32,
    /// Creation date.
    pub creation_date: AmigaDate,
    /// Disk name length.
    pub name_len: u8,
    /// Disk name (up to 30 chars).
    pub disk_name: [u8; MAX_NAME_LEN],
    /// Last modification date.
    pub last_modified: AmigaDate,
    /// Directory cache extension (FFS only).
    pub extension: u32,
    /// Secondary type (should be ST_ROOT).
    pub sec_type: i32,
}

impl RootBlock {
    /// Parse root block from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse root block, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let block_type = read_i32_be(buf, 0);
        if block_type != T_HEADER {
            return Err(AdfError::InvalidBlockType {
                expected: T_HEADER,
                found: block_type,
            });
        }

        let sec_type = read_i32_be(buf, 508);
        if sec_type != ST_ROOT {
            return Err(AdfError::InvalidSecType(sec_type));
        }

        let checksum = read_u32_be(buf, CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let hash_table_size = read_i32_be(buf, 12);

        let mut hash_table = [0u32; HASH_TABLE_SIZE];
        for (i, entry) in hash_table.iter_mut().enumerate() {
            *entry = read_u32_be(buf, 24 + i * 4);
        }

        let bm_flag = read_i32_be(buf, 0x138);

        let mut bm_pages = [0u32; BM_PAGES_ROOT_SIZE];
        for (i, page) in bm_pages.iter_mut().enumerate() {
            *page = read_u32_be(buf, 0x13C + i * 4);
        }

        let bm_ext = read_u32_be(buf, 0x1A0);

        let creation_date = AmigaDate::new(
            read_i32_be(buf, 0x1A4),
            read_i32_be(buf, 0x1A8),
            read_i32_be(buf, 0x1AC),
        );

        let name_len = buf[0x1B0].min(MAX_NAME_LEN as u8);
        let mut disk_name = [0u8; MAX_NAME_LEN];
        disk_name[..name_len as usize].copy_from_slice(&buf[0x1B1..0x1B1 + name_len as usize]);

        let last_modified = AmigaDate::new(
            read_i32_be(buf, 0x1D8),
            read_i32_be(buf, 0x1DC),
            read_i32_be(buf, 0x1E0),
        );

        let extension = read_u32_be(buf, 0x1F8);

        Ok(Self {
            block_type,
            hash_table_size,
            checksum,
            hash_table,
            bm_flag,
            bm_pages,
            bm_ext,
            creation_date,
            name_len,
            disk_name,
            last_modified,
            extension,
            sec_type,
        })
    }

    /// Encode this root block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_HEADER);
        write_i32_be(&mut buf, 12, self.hash_table_size);

        for (i, &entry) in self.hash_table.iter().enumerate() {
            write_u32_be(&mut buf, 24 + i * 4, entry);
        }

        write_i32_be(&mut buf, 0x138, self.bm_flag);
        for (i, &page) in self.bm_pages.iter().enumerate() {
            write_u32_be(&mut buf, 0x13C + i * 4, page);
        }
        write_u32_be(&mut buf, 0x1A0, self.bm_ext);

        write_i32_be(&mut buf, 0x1A4, self.creation_date.days);
        write_i32_be(&mut buf, 0x1A8, self.creation_date.mins);
        write_i32_be(&mut buf, 0x1AC, self.creation_date.ticks);

        let name_len = self.name_len.min(MAX_NAME_LEN as u8);
        buf[0x1B0] = name_len;
        buf[0x1B1..0x1B1 + name_len as usize]
            .copy_from_slice(&self.disk_name[..name_len as usize]);

        write_i32_be(&mut buf, 0x1D8, self.last_modified.days);
        write_i32_be(&mut buf, 0x1DC, self.last_modified.mins);
        write_i32_be(&mut buf, 0x1E0, self.last_modified.ticks);

        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 508, ST_ROOT);

        write_normal_sum(&mut buf, CHECKSUM_OFFSET);
        buf
    }

    /// Get disk name as string slice.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.disk_name[..self.name_len as usize]
    }

    /// Check if bitmap is valid.
    #[inline]
    pub const fn bitmap_valid(&self) -> bool {
        self.bm_flag == BM_VALID
    }
}

/// Parsed entry block (file header or directory).
#[derive(Debug, Clone)]
pub struct EntryBlock {
    /// Block type (should be T_HEADER).
    pub block_type: i32,
    /// This block's sector number.
    pub header_key: u32,
    /// High sequence (number of data blocks in this header for files).
    pub high_seq: i32,
    /// First data block (files only).
    pub first_data: u32,
    /// Checksum.
    pub checksum: u32,
    /// Hash table (directories) or data block pointers (files).
    pub hash_table: [u32; HASH_TABLE_SIZE],
    /// Access flags.
    pub access: u32,
    /// File size in bytes (files only).
    pub byte_size: u32,
    /// Comment length.
    pub comment_len: u8,
    /// Comment (up to 79 chars).
    pub comment: [u8; MAX_COMMENT_LEN],
    /// Last modification date.
    pub date: AmigaDate,
    /// Name length.
    pub name_len: u8,
    /// Entry name (up to 30 chars).
    pub name: [u8; MAX_NAME_LEN],
    /// Real entry (for hard links).
    pub real_entry: u32,
    /// Next link in chain.
    pub next_link: u32,
    /// Next entry with same hash.
    pub next_same_hash: u32,
    /// Parent directory block.
    pub parent: u32,
    /// Extension block (file ext or dir cache).
    pub extension: u32,
    /// Secondary type.
    pub sec_type: i32,
}

impl EntryBlock {
    /// Parse entry block from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse entry block, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let block_type = read_i32_be(buf, 0);
        if block_type != T_HEADER {
            return Err(AdfError::InvalidBlockType {
                expected: T_HEADER,
                found: block_type,
            });
        }

        let checksum = read_u32_be(buf, CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let header_key = read_u32_be(buf, 4);
        let high_seq = read_i32_be(buf, 8);
        let first_data = read_u32_be(buf, 16);

        let mut hash_table = [0u32; HASH_TABLE_SIZE];
        for (i, entry) in hash_table.iter_mut().enumerate() {
            *entry = read_u32_be(buf, 24 + i * 4);
        }

        let access = read_u32_be(buf, 0x140);
        let byte_size = read_u32_be(buf, 0x144);

        let comment_len = buf[0x148].min(MAX_COMMENT_LEN as u8);
        let mut comment = [0u8; MAX_COMMENT_LEN];
        comment[..comment_len as usize].copy_from_slice(&buf[0x149..0x149 + comment_len as usize]);

        let date = AmigaDate::new(
            read_i32_be(buf, 0x1A4),
            read_i32_be(buf, 0x1A8),
            read_i32_be(buf, 0x1AC),
        );

        let name_len = buf[0x1B0].min(MAX_NAME_LEN as u8);
        let mut name = [0u8; MAX_NAME_LEN];
        name[..name_len as usize].copy_from_slice(&buf[0x1B1..0x1B1 + name_len as usize]);

        let real_entry = read_u32_be(buf, 0x1D4);
        let next_link = read_u32_be(buf, 0x1D8);
        let next_same_hash = read_u32_be(buf, 0x1F0);
        let parent = read_u32_be(buf, 0x1F4);
        let extension = read_u32_be(buf, 0x1F8);
        let sec_type = read_i32_be(buf, 0x1FC);

        Ok(Self {
            block_type,
            header_key,
            high_seq,
            first_data,
            checksum,
            hash_table,
            access,
            byte_size,
            comment_len,
            comment,
            date,
            name_len,
            name,
            real_entry,
            next_link,
            next_same_hash,
            parent,
            extension,
            sec_type,
        })
    }

    /// Encode this entry block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_HEADER);
        write_u32_be(&mut buf, 4, self.header_key);
        write_i32_be(&mut buf, 8, self.high_seq);
        write_u32_be(&mut buf, 16, self.first_data);

        for (i, &entry) in self.hash_table.iter().enumerate() {
            write_u32_be(&mut buf, 24 + i * 4, entry);
        }

        write_u32_be(&mut buf, 0x140, self.access);
        write_u32_be(&mut buf, 0x144, self.byte_size);

        let comment_len = self.comment_len.min(MAX_COMMENT_LEN as u8);
        buf[0x148] = comment_len;
        buf[0x149..0x149 + comment_len as usize]
            .copy_from_slice(&self.comment[..comment_len as usize]);

        write_i32_be(&mut buf, 0x1A4, self.date.days);
        write_i32_be(&mut buf, 0x1A8, self.date.mins);
        write_i32_be(&mut buf, 0x1AC, self.date.ticks);

        let name_len = self.name_len.min(MAX_NAME_LEN as u8);
        buf[0x1B0] = name_len;
        buf[0x1B1..0x1B1 + name_len as usize].copy_from_slice(&self.name[..name_len as usize]);

        write_u32_be(&mut buf, 0x1D4, self.real_entry);
        write_u32_be(&mut buf, 0x1D8, self.next_link);
        write_u32_be(&mut buf, 0x1F0, self.next_same_hash);
        write_u32_be(&mut buf, 0x1F4, self.parent);
        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 0x1FC, self.sec_type);

        write_normal_sum(&mut buf, CHECKSUM_OFFSET);
        buf
    }

    /// Get entry name as byte slice.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// Get comment as byte slice.
    #[inline]
    pub fn comment(&self) -> &[u8] {
        &self.comment[..self.comment_len as usize]
    }

    /// Get entry type.
    #[inline]
    pub fn entry_type(&self) -> Option<EntryType> {
        EntryType::from_sec_type(self.sec_type)
    }

    /// Check if this is a directory.
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.sec_type == ST_DIR || self.sec_type == ST_LDIR
    }

    /// Check if this is a file.
    #[inline]
    pub const fn is_file(&self) -> bool {
        self.sec_type == ST_FILE || self.sec_type == ST_LFILE
    }

    /// Check if this is a hard link (file or dir).
    #[inline]
    pub const fn is_link(&self) -> bool {
        self.sec_type == ST_LFILE || self.sec_type == ST_LDIR
    }

    /// Get data block pointer at index (for files).
    /// Index 0 is the first data block; the on-disk array is stored in reverse.
    #[inline]
    pub const fn data_block(&self, index: usize) -> u32 {
        if index < MAX_DATABLK {
            self.hash_table[MAX_DATABLK - 1 - index]
        } else {
            0
        }
    }

    /// Set data block pointer at index (for files).
    #[inline]
    pub fn set_data_block(&mut self, index: usize, block: u32) {
        if index < MAX_DATABLK {
            self.hash_table[MAX_DATABLK - 1 - index] = block;
        }
    }
}

/// Parsed file extension block.
#[derive(Debug, Clone)]
pub struct FileExtBlock {
    /// Block type (should be T_LIST).
    pub block_type: i32,
    /// This block's sector number.
    pub header_key: u32,
    /// High sequence (number of data blocks in this ext block).
    pub high_seq: i32,
    /// Checksum.
    pub checksum: u32,
    /// Data block pointers.
    pub data_blocks: [u32; MAX_DATABLK],
    /// Parent (file header block).
    pub parent: u32,
    /// Next extension block.
    pub extension: u32,
    /// Secondary type (should be ST_FILE).
    pub sec_type: i32,
}

impl FileExtBlock {
    /// Parse file extension block from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse file extension block, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let block_type = read_i32_be(buf, 0);
        if block_type != T_LIST {
            return Err(AdfError::InvalidBlockType {
                expected: T_LIST,
                found: block_type,
            });
        }

        let checksum = read_u32_be(buf, CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let header_key = read_u32_be(buf, 4);
        let high_seq = read_i32_be(buf, 8);

        let mut data_blocks = [0u32; MAX_DATABLK];
        for (i, blk) in data_blocks.iter_mut().enumerate() {
            *blk = read_u32_be(buf, 24 + i * 4);
        }

        let parent = read_u32_be(buf, 0x1F4);
        let extension = read_u32_be(buf, 0x1F8);
        let sec_type = read_i32_be(buf, 0x1FC);

        Ok(Self {
            block_type,
            header_key,
            high_seq,
            checksum,
            data_blocks,
            parent,
            extension,
            sec_type,
        })
    }

    /// Encode this file extension block into a fresh, checksummed buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_LIST);
        write_u32_be(&mut buf, 4, self.header_key);
        write_i32_be(&mut buf, 8, self.high_seq);

        for (i, &blk) in self.data_blocks.iter().enumerate() {
            write_u32_be(&mut buf, 24 + i * 4, blk);
        }

        write_u32_be(&mut buf, 0x1F4, self.parent);
        write_u32_be(&mut buf, 0x1F8, self.extension);
        write_i32_be(&mut buf, 0x1FC, self.sec_type);

        write_normal_sum(&mut buf, CHECKSUM_OFFSET);
        buf
    }

    /// Get data block pointer at index.
    #[inline]
    pub const fn data_block(&self, index: usize) -> u32 {
        if index < MAX_DATABLK {
            self.data_blocks[MAX_DATABLK - 1 - index]
        } else {
            0
        }
    }

    /// Set data block pointer at index.
    #[inline]
    pub fn set_data_block(&mut self, index: usize, block: u32) {
        if index < MAX_DATABLK {
            self.data_blocks[MAX_DATABLK - 1 - index] = block;
        }
    }

    /// Build a zeroed file extension block header for a new block.
    pub fn new(header_key: u32, parent: u32) -> Self {
        Self {
            block_type: T_LIST,
            header_key,
            high_seq: 0,
            checksum: 0,
            data_blocks: [0u32; MAX_DATABLK],
            parent,
            extension: 0,
            sec_type: ST_FILE,
        }
    }
}

/// Parsed OFS data block header.
#[derive(Debug, Clone, Copy)]
pub struct OfsDataBlock {
    /// Block type (should be T_DATA).
    pub block_type: i32,
    /// File header block pointer.
    pub header_key: u32,
    /// Sequence number (1-based).
    pub seq_num: u32,
    /// Data size in this block.
    pub data_size: u32,
    /// Next data block.
    pub next_data: u32,
    /// Checksum.
    pub checksum: u32,
}

impl OfsDataBlock {
    /// OFS data block header size.
    pub const HEADER_SIZE: usize = OFS_DATA_HEADER_SIZE;

    /// Parse OFS data block header from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse OFS data block header, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let block_type = read_i32_be(buf, 0);
        if block_type != T_DATA {
            return Err(AdfError::InvalidBlockType {
                expected: T_DATA,
                found: block_type,
            });
        }

        let checksum = read_u32_be(buf, CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        Ok(Self {
            block_type,
            header_key: read_u32_be(buf, 4),
            seq_num: read_u32_be(buf, 8),
            data_size: read_u32_be(buf, 12),
            next_data: read_u32_be(buf, 16),
            checksum,
        })
    }

    /// Write the 24-byte OFS data header into `buf`, leaving the payload
    /// (bytes 24..512) untouched, then checksum the whole block.
    pub fn write_header(
        buf: &mut [u8; BLOCK_SIZE],
        header_key: u32,
        seq_num: u32,
        data_size: u32,
        next_data: u32,
    ) {
        write_i32_be(buf, 0, T_DATA);
        write_u32_be(buf, 4, header_key);
        write_u32_be(buf, 8, seq_num);
        write_u32_be(buf, 12, data_size);
        write_u32_be(buf, 16, next_data);
        write_normal_sum(buf, CHECKSUM_OFFSET);
    }

    /// Get data portion of the block.
    #[inline]
    pub fn data(buf: &[u8; BLOCK_SIZE]) -> &[u8] {
        &buf[Self::HEADER_SIZE..]
    }

    /// Get mutable data portion of the block.
    #[inline]
    pub fn data_mut(buf: &mut [u8; BLOCK_SIZE]) -> &mut [u8] {
        &mut buf[Self::HEADER_SIZE..]
    }
}

/// Parsed bitmap block: 127 32-bit free/used words, checksummed at offset 0.
#[derive(Debug, Clone)]
pub struct BitmapBlock {
    /// Checksum (offset 0).
    pub checksum: u32,
    /// Free/used bitmap words (1 = free).
    pub map: [u32; BM_MAP_SIZE],
}

impl BitmapBlock {
    /// Parse a bitmap block from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse a bitmap block, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let checksum = read_u32_be(buf, BITMAP_CHECKSUM_OFFSET);
        let calculated = crate::checksum::bitmap_sum(buf);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let mut map = [0u32; BM_MAP_SIZE];
        for (i, word) in map.iter_mut().enumerate() {
            *word = read_u32_be(buf, 4 + i * 4);
        }

        Ok(Self { checksum, map })
    }

    /// Encode this bitmap block into a fresh, checksummed buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, &word) in self.map.iter().enumerate() {
            write_u32_be(&mut buf, 4 + i * 4, word);
        }
        crate::checksum::write_bitmap_sum(&mut buf);
        buf
    }

    /// An all-free bitmap block.
    pub fn free() -> Self {
        Self {
            checksum: 0,
            map: [u32::MAX; BM_MAP_SIZE],
        }
    }
}

/// Parsed bitmap extension block: up to 127 more bitmap block pointers, chained via `next`.
#[derive(Debug, Clone)]
pub struct BitmapExtBlock {
    /// Further bitmap block pointers (0 = unused slot).
    pub pointers: [u32; BM_PAGES_EXT_SIZE],
    /// Next bitmap extension block (0 = end of chain).
    pub next: u32,
}

impl BitmapExtBlock {
    /// Parse a bitmap extension block from raw data. Unlike other blocks, this
    /// block type carries no type tag or checksum of its own in the original
    /// format; it is only ever reached via a validated `bmExt`/`next` chain.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Self {
        let mut pointers = [0u32; BM_PAGES_EXT_SIZE];
        for (i, ptr) in pointers.iter_mut().enumerate() {
            *ptr = read_u32_be(buf, i * 4);
        }
        let next = read_u32_be(buf, BM_PAGES_EXT_SIZE * 4);
        Self { pointers, next }
    }

    /// Encode this bitmap extension block into a fresh buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, &ptr) in self.pointers.iter().enumerate() {
            write_u32_be(&mut buf, i * 4, ptr);
        }
        write_u32_be(&mut buf, BM_PAGES_EXT_SIZE * 4, self.next);
        buf
    }
}

/// One compact directory-cache record (spec.md §4.5), variable-length on disk.
#[derive(Debug, Clone)]
pub struct DirCacheEntry {
    /// Header block of the entry this record summarizes.
    pub header: u32,
    /// Parent directory block.
    pub parent: u32,
    /// Secondary type.
    pub sec_type: i32,
    /// File size (0 for directories).
    pub size: u32,
    /// Protection/access bits.
    pub access: u32,
    /// Last modification date.
    pub date: AmigaDate,
    /// Entry name.
    pub name: std::vec::Vec<u8>,
    /// Entry comment.
    pub comment: std::vec::Vec<u8>,
}

/// Parsed directory cache block: a sequence of variable-length `DirCacheEntry`
/// records plus a chain pointer, linked from a directory's `extension` field.
#[derive(Debug, Clone)]
pub struct DirCacheBlock {
    /// This block's own sector.
    pub header_key: u32,
    /// Owning directory's sector.
    pub parent: u32,
    /// Number of records packed in this block.
    pub records: i32,
    /// Next dir-cache block in the chain (0 = end).
    pub next_dircache: u32,
    /// Checksum.
    pub checksum: u32,
    /// Raw record bytes (opaque; records are variable-length and packed
    /// back-to-back starting at offset 24, the same layout ADFlib uses).
    pub entries: std::vec::Vec<u8>,
}

impl DirCacheBlock {
    const HEADER_SIZE: usize = 24;

    /// Parse a directory cache block from raw data.
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::parse_at(buf, 0)
    }

    /// Parse a directory cache block, recording `block` in any checksum error raised.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        let block_type = read_i32_be(buf, 0);
        if block_type != T_DIRC {
            return Err(AdfError::InvalidBlockType {
                expected: T_DIRC,
                found: block_type,
            });
        }

        let checksum = read_u32_be(buf, CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let header_key = read_u32_be(buf, 4);
        let parent = read_u32_be(buf, 8);
        let records = read_i32_be(buf, 12);
        let next_dircache = read_u32_be(buf, 16);

        Ok(Self {
            header_key,
            parent,
            records,
            next_dircache,
            checksum,
            entries: buf[Self::HEADER_SIZE..].to_vec(),
        })
    }

    /// Encode this directory cache block into a fresh, checksummed buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        write_i32_be(&mut buf, 0, T_DIRC);
        write_u32_be(&mut buf, 4, self.header_key);
        write_u32_be(&mut buf, 8, self.parent);
        write_i32_be(&mut buf, 12, self.records);
        write_u32_be(&mut buf, 16, self.next_dircache);

        let n = self.entries.len().min(BLOCK_SIZE - Self::HEADER_SIZE);
        buf[Self::HEADER_SIZE..Self::HEADER_SIZE + n].copy_from_slice(&self.entries[..n]);

        write_normal_sum(&mut buf, CHECKSUM_OFFSET);
        buf
    }

    /// An empty dir-cache block for a freshly created directory.
    pub fn empty(header_key: u32, parent: u32) -> Self {
        Self {
            header_key,
            parent,
            records: 0,
            next_dircache: 0,
            checksum: 0,
            entries: std::vec::Vec::new(),
        }
    }
}

/// Parsed Rigid Disk Block (`RDSK`), sector 0 of a partitioned hard disk image.
///
/// Field layout follows the fields spec.md §4.2/§6 depends on (geometry,
/// partition/filesystem-header chain heads); the full ADFlib struct carries
/// additional vendor/product bookkeeping fields not needed for mounting and
/// not reproduced here (see `DESIGN.md`).
#[derive(Debug, Clone)]
pub struct RdskBlock {
    /// Number of checksummed 32-bit words (should be 64).
    pub size: i32,
    /// Checksum.
    pub checksum: u32,
    /// Vendor-specific host ID.
    pub host_id: i32,
    /// Bytes per block (should be 512).
    pub block_bytes: i32,
    /// Sector of the bad-block list, or -1.
    pub bad_block_list: i32,
    /// Sector of the head of the partition (`PART`) chain, or -1.
    pub partition_list: i32,
    /// Sector of the head of the filesystem-header (`FSHD`) chain, or -1.
    pub file_sys_hdr_list: i32,
    /// Number of cylinders.
    pub cylinders: i32,
    /// Sectors per track.
    pub sectors: i32,
    /// Number of heads/surfaces.
    pub heads: i32,
    /// Blocks per cylinder (sectors * heads).
    pub cyl_blocks: i32,
    /// Lowest RDB-reserved block.
    pub rdb_block_lo: i32,
    /// Highest RDB-reserved block.
    pub rdb_block_hi: i32,
    /// Lowest cylinder usable by partitions.
    pub lo_cylinder: i32,
    /// Highest cylinder usable by partitions.
    pub hi_cylinder: i32,
}

impl RdskBlock {
    /// Checksum offset and length for the whole RDB block family.
    const CHECKSUM_OFFSET: usize = RDB_CHECKSUM_OFFSET;
    const CHECKSUM_LEN: usize = RDB_CHECKSUM_LEN;

    /// Parse an `RDSK` block from sector 0 (512 bytes; only the first 256 are checksummed).
    pub fn parse(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if &buf[0..4] != RDSK_ID {
            return Err(AdfError::NoRigidDiskBlock);
        }

        let region = &buf[..Self::CHECKSUM_LEN];
        let checksum = read_u32_be_slice(region, Self::CHECKSUM_OFFSET);
        let calculated = normal_sum_slice(region, Self::CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block: 0,
                expected: checksum,
                computed: calculated,
            });
        }

        Ok(Self {
            size: read_i32_be(buf, 4),
            checksum,
            host_id: read_i32_be(buf, 12),
            block_bytes: read_i32_be(buf, 16),
            bad_block_list: read_i32_be(buf, 24),
            partition_list: read_i32_be(buf, 28),
            file_sys_hdr_list: read_i32_be(buf, 32),
            cylinders: read_i32_be(buf, 64),
            sectors: read_i32_be(buf, 68),
            heads: read_i32_be(buf, 72),
            cyl_blocks: read_i32_be(buf, 144),
            rdb_block_lo: read_i32_be(buf, 128),
            rdb_block_hi: read_i32_be(buf, 132),
            lo_cylinder: read_i32_be(buf, 136),
            hi_cylinder: read_i32_be(buf, 140),
        })
    }

    /// Encode this RDSK block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&RDSK_ID);
        write_i32_be(&mut buf, 4, RDB_SUMMED_LONGS as i32);
        write_i32_be(&mut buf, 12, self.host_id);
        write_i32_be(&mut buf, 16, self.block_bytes);
        write_i32_be(&mut buf, 24, self.bad_block_list);
        write_i32_be(&mut buf, 28, self.partition_list);
        write_i32_be(&mut buf, 32, self.file_sys_hdr_list);
        write_i32_be(&mut buf, 64, self.cylinders);
        write_i32_be(&mut buf, 68, self.sectors);
        write_i32_be(&mut buf, 72, self.heads);
        write_i32_be(&mut buf, 144, self.cyl_blocks);
        write_i32_be(&mut buf, 128, self.rdb_block_lo);
        write_i32_be(&mut buf, 132, self.rdb_block_hi);
        write_i32_be(&mut buf, 136, self.lo_cylinder);
        write_i32_be(&mut buf, 140, self.hi_cylinder);

        let sum = normal_sum_slice(&buf[..Self::CHECKSUM_LEN], Self::CHECKSUM_OFFSET);
        write_u32_be(&mut buf, Self::CHECKSUM_OFFSET, sum);
        buf
    }
}

/// Parsed partition (`PART`) block: one entry in the RDB partition chain.
#[derive(Debug, Clone)]
pub struct PartBlock {
    /// Checksum.
    pub checksum: u32,
    /// Next `PART` block sector, or -1 at the end of the chain.
    pub next: i32,
    /// Number of heads/surfaces for this partition's own geometry view.
    pub surfaces: i32,
    /// Logical block size in 32-bit words (spec.md: fixed at 128 = 512 bytes).
    pub block_size: i32,
    /// Sectors per track.
    pub blocks_per_track: i32,
    /// Lowest cylinder of this partition.
    pub low_cyl: i32,
    /// Highest cylinder of this partition.
    pub high_cyl: i32,
    /// Partition name length.
    pub name_len: u8,
    /// Partition name (up to 31 chars, BCPL-style length-prefixed).
    pub name: [u8; 31],
    /// DOS type bytes, e.g. `DOS\x00`/`DOS\x01`/`PFS\x00`.
    pub dos_type: [u8; 4],
}

impl PartBlock {
    const CHECKSUM_OFFSET: usize = RDB_CHECKSUM_OFFSET;
    const CHECKSUM_LEN: usize = RDB_CHECKSUM_LEN;

    /// Parse a `PART` block.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        if &buf[0..4] != PART_ID {
            return Err(AdfError::InvalidState("PART id not found"));
        }

        let region = &buf[..Self::CHECKSUM_LEN];
        let checksum = read_u32_be_slice(region, Self::CHECKSUM_OFFSET);
        let calculated = normal_sum_slice(region, Self::CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        let name_len = buf[36].min(31);
        let mut name = [0u8; 31];
        name[..name_len as usize].copy_from_slice(&buf[37..37 + name_len as usize]);

        Ok(Self {
            checksum,
            next: read_i32_be(buf, 16),
            surfaces: read_i32_be(buf, 24),
            block_size: read_i32_be(buf, 20),
            blocks_per_track: read_i32_be(buf, 28),
            low_cyl: read_i32_be(buf, 128),
            high_cyl: read_i32_be(buf, 132),
            name_len,
            name,
            dos_type: [buf[156], buf[157], buf[158], buf[159]],
        })
    }

    /// Encode this PART block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&PART_ID);
        write_i32_be(&mut buf, 16, self.next);
        write_i32_be(&mut buf, 20, self.block_size);
        write_i32_be(&mut buf, 24, self.surfaces);
        write_i32_be(&mut buf, 28, self.blocks_per_track);
        write_i32_be(&mut buf, 128, self.low_cyl);
        write_i32_be(&mut buf, 132, self.high_cyl);

        let name_len = self.name_len.min(31);
        buf[36] = name_len;
        buf[37..37 + name_len as usize].copy_from_slice(&self.name[..name_len as usize]);
        buf[156..160].copy_from_slice(&self.dos_type);

        let sum = normal_sum_slice(&buf[..Self::CHECKSUM_LEN], Self::CHECKSUM_OFFSET);
        write_u32_be(&mut buf, Self::CHECKSUM_OFFSET, sum);
        buf
    }

    /// Partition name as a byte slice.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// `(type & 1)` selects FFS vs OFS, mirroring `Volume`'s own flag bit.
    #[inline]
    pub const fn is_pfs(&self) -> bool {
        self.dos_type[0] == PFS_ID_PREFIX[0]
            && self.dos_type[1] == PFS_ID_PREFIX[1]
            && self.dos_type[2] == PFS_ID_PREFIX[2]
    }
}

/// Parsed filesystem header (`FSHD`) block. Read only to validate the
/// FSHD/LSEG chain (spec.md §4.2); its DOS-type payload is informational.
#[derive(Debug, Clone)]
pub struct FshdBlock {
    /// Checksum.
    pub checksum: u32,
    /// Next `FSHD` block, or -1 at the end of the chain.
    pub next: i32,
    /// DOS type this filesystem handler implements.
    pub dos_type: [u8; 4],
    /// Sector of the head of this filesystem's `LSEG` chain.
    pub seg_list_block: i32,
}

impl FshdBlock {
    const CHECKSUM_OFFSET: usize = RDB_CHECKSUM_OFFSET;
    const CHECKSUM_LEN: usize = RDB_CHECKSUM_LEN;

    /// Parse an `FSHD` block.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        if &buf[0..4] != FSHD_ID {
            return Err(AdfError::InvalidState("FSHD id not found"));
        }

        let region = &buf[..Self::CHECKSUM_LEN];
        let checksum = read_u32_be_slice(region, Self::CHECKSUM_OFFSET);
        let calculated = normal_sum_slice(region, Self::CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        Ok(Self {
            checksum,
            next: read_i32_be(buf, 16),
            dos_type: [buf[32], buf[33], buf[34], buf[35]],
            seg_list_block: read_i32_be(buf, 36),
        })
    }

    /// Encode this FSHD block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&FSHD_ID);
        write_i32_be(&mut buf, 16, self.next);
        buf[32..36].copy_from_slice(&self.dos_type);
        write_i32_be(&mut buf, 36, self.seg_list_block);

        let sum = normal_sum_slice(&buf[..Self::CHECKSUM_LEN], Self::CHECKSUM_OFFSET);
        write_u32_be(&mut buf, Self::CHECKSUM_OFFSET, sum);
        buf
    }
}

/// Parsed load-segment (`LSEG`) block: one link in a filesystem handler's
/// code chain. Only read to validate chain integrity (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct LsegBlock {
    /// Checksum.
    pub checksum: u32,
    /// Next `LSEG` block, or -1 at the end of the chain.
    pub next: i32,
}

impl LsegBlock {
    const CHECKSUM_OFFSET: usize = RDB_CHECKSUM_OFFSET;

    /// Parse an `LSEG` block.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        if &buf[0..4] != LSEG_ID {
            return Err(AdfError::InvalidState("LSEG id not found"));
        }

        let checksum = read_u32_be(buf, Self::CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, Self::CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        Ok(Self {
            checksum,
            next: read_i32_be(buf, 16),
        })
    }

    /// Encode this LSEG block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&LSEG_ID);
        write_i32_be(&mut buf, 16, self.next);
        write_normal_sum(&mut buf, Self::CHECKSUM_OFFSET);
        buf
    }
}

/// Parsed bad-block-list (`BADB`) block. Only read to validate chain
/// integrity (spec.md §4.2); its bad-sector entries are not interpreted.
#[derive(Debug, Clone)]
pub struct BadbBlock {
    /// Checksum.
    pub checksum: u32,
    /// Next `BADB` block, or -1 at the end of the chain.
    pub next: i32,
}

impl BadbBlock {
    const CHECKSUM_OFFSET: usize = RDB_CHECKSUM_OFFSET;

    /// Parse a `BADB` block.
    pub fn parse_at(buf: &[u8; BLOCK_SIZE], block: u32) -> Result<Self> {
        if &buf[0..4] != BADB_ID {
            return Err(AdfError::InvalidState("BADB id not found"));
        }

        let checksum = read_u32_be(buf, Self::CHECKSUM_OFFSET);
        let calculated = normal_sum(buf, Self::CHECKSUM_OFFSET);
        if checksum != calculated {
            return Err(AdfError::ChecksumMismatch {
                block,
                expected: checksum,
                computed: calculated,
            });
        }

        Ok(Self {
            checksum,
            next: read_i32_be(buf, 16),
        })
    }

    /// Encode this BADB block into a fresh, checksummed 512-byte buffer.
    pub fn write(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&BADB_ID);
        write_i32_be(&mut buf, 16, self.next);
        write_normal_sum(&mut buf, Self::CHECKSUM_OFFSET);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_block_rejects_pfs_before_generic_dos_type() {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        buf[0..3].copy_from_slice(b"PFS");
        assert!(matches!(
            BootBlock::parse(&buf),
            Err(AdfError::UnsupportedFileSystem(t)) if &t[0..3] == b"PFS"
        ));
    }

    #[test]
    fn test_boot_block_rejects_unknown_dos_type() {
        let mut buf = [0u8; BOOT_BLOCK_SIZE];
        buf[0..3].copy_from_slice(b"XXX");
        assert!(matches!(BootBlock::parse(&buf), Err(AdfError::InvalidDosType)));
    }

    #[test]
    fn test_rdsk_block_round_trip() {
        let rdsk = RdskBlock {
            size: RDB_SUMMED_LONGS as i32,
            checksum: 0,
            host_id: 7,
            block_bytes: BLOCK_SIZE as i32,
            bad_block_list: -1,
            partition_list: 1,
            file_sys_hdr_list: 2,
            cylinders: 80,
            sectors: 32,
            heads: 2,
            cyl_blocks: 64,
            rdb_block_lo: 0,
            rdb_block_hi: 63,
            lo_cylinder: 2,
            hi_cylinder: 79,
        };
        let buf = rdsk.write();
        let parsed = RdskBlock::parse(&buf).unwrap();
        assert_eq!(parsed.partition_list, 1);
        assert_eq!(parsed.cyl_blocks, 64);
        assert_eq!(parsed.lo_cylinder, 2);
    }

    #[test]
    fn test_part_block_round_trip() {
        let mut part = PartBlock {
            checksum: 0,
            next: -1,
            surfaces: 2,
            block_size: RDB_BLOCK_SIZE_LONGS as i32,
            blocks_per_track: 32,
            low_cyl: 2,
            high_cyl: 79,
            name_len: 4,
            name: [0u8; 31],
            dos_type: [b'D', b'O', b'S', 0],
        };
        part.name[..4].copy_from_slice(b"Work");
        let buf = part.write();
        let parsed = PartBlock::parse_at(&buf, 1).unwrap();
        assert_eq!(parsed.name(), b"Work");
        assert_eq!(parsed.low_cyl, 2);
        assert!(!parsed.is_pfs());
    }

    #[test]
    fn test_fshd_lseg_badb_round_trip() {
        let fshd = FshdBlock {
            checksum: 0,
            next: -1,
            dos_type: [b'D', b'O', b'S', 0],
            seg_list_block: 3,
        };
        let buf = fshd.write();
        assert_eq!(FshdBlock::parse_at(&buf, 2).unwrap().seg_list_block, 3);

        let lseg = LsegBlock {
            checksum: 0,
            next: -1,
        };
        let buf = lseg.write();
        assert_eq!(LsegBlock::parse_at(&buf, 3).unwrap().next, -1);

        let badb = BadbBlock {
            checksum: 0,
            next: -1,
        };
        let buf = badb.write();
        assert_eq!(BadbBlock::parse_at(&buf, 4).unwrap().next, -1);
    }

    #[test]
    fn test_root_block_round_trip() {
        let mut rb = RootBlock {
            block_type: T_HEADER,
            hash_table_size: HASH_TABLE_SIZE as i32,
            checksum: 0,
            hash_table: [0u32; HASH_TABLE_SIZE],
            bm_flag: BM_VALID,
            bm_pages: [0u32; BM_PAGES_ROOT_SIZE],
            bm_ext: 0,
            creation_date: AmigaDate::new(100, 200, 300),
            name_len: 5,
            disk_name: [0u8; MAX_NAME_LEN],
            last_modified: AmigaDate::new(400, 500, 600),
            extension: 0,
            sec_type: ST_ROOT,
        };
        rb.disk_name[..5].copy_from_slice(b"Empty");
        rb.bm_pages[0] = 881;

        let buf = rb.write();
        let parsed = RootBlock::parse(&buf).expect("root block should round-trip");
        assert_eq!(parsed.name(), b"Empty");
        assert_eq!(parsed.bm_pages[0], 881);
        assert!(parsed.bitmap_valid());
    }

    #[test]
    fn test_checksum_detects_bit_flip() {
        let rb = RootBlock {
            block_type: T_HEADER,
            hash_table_size: HASH_TABLE_SIZE as i32,
            checksum: 0,
            hash_table: [0u32; HASH_TABLE_SIZE],
            bm_flag: BM_VALID,
            bm_pages: [0u32; BM_PAGES_ROOT_SIZE],
            bm_ext: 0,
            creation_date: AmigaDate::default(),
            name_len: 0,
            disk_name: [0u8; MAX_NAME_LEN],
            last_modified: AmigaDate::default(),
            extension: 0,
            sec_type: ST_ROOT,
        };
        let mut buf = rb.write();
        buf[100] ^= 0x01;
        assert!(matches!(
            RootBlock::parse(&buf),
            Err(AdfError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_entry_block_round_trip() {
        let mut eb = EntryBlock {
            block_type: T_HEADER,
            header_key: 42,
            high_seq: 2,
            first_data: 43,
            checksum: 0,
            hash_table: [0u32; HASH_TABLE_SIZE],
            access: 0,
            byte_size: 1234,
            comment_len: 0,
            comment: [0u8; MAX_COMMENT_LEN],
            date: AmigaDate::new(1, 2, 3),
            name_len: 5,
            name: [0u8; MAX_NAME_LEN],
            real_entry: 0,
            next_link: 0,
            next_same_hash: 0,
            parent: 880,
            extension: 0,
            sec_type: ST_FILE,
        };
        eb.name[..5].copy_from_slice(b"hello");
        eb.set_data_block(0, 100);
        eb.set_data_block(1, 101);

        let buf = eb.write();
        let parsed = EntryBlock::parse(&buf).unwrap();
        assert_eq!(parsed.name(), b"hello");
        assert_eq!(parsed.byte_size, 1234);
        assert_eq!(parsed.data_block(0), 100);
        assert_eq!(parsed.data_block(1), 101);
        assert!(parsed.is_file());
    }

    #[test]
    fn test_bitmap_block_round_trip() {
        let mut bb = BitmapBlock::free();
        bb.map[0] &= !0b111; // mark first three blocks used
        let buf = bb.write();
        let parsed = BitmapBlock::parse(&buf).unwrap();
        assert_eq!(parsed.map[0], bb.map[0]);
    }

    #[test]
    fn test_ofs_data_block_write_header() {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[OfsDataBlock::HEADER_SIZE..OfsDataBlock::HEADER_SIZE + 4]
            .copy_from_slice(b"data");
        OfsDataBlock::write_header(&mut buf, 50, 1, 488, 0);
        let parsed = OfsDataBlock::parse(&buf).unwrap();
        assert_eq!(parsed.header_key, 50);
        assert_eq!(parsed.seq_num, 1);
        assert_eq!(OfsDataBlock::data(&buf)[..4], *b"data");
    }
}
