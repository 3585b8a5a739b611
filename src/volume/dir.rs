//! Mutable directory hash-chain operations (spec.md §4.5), built on top of
//! the read-only [`crate::dir::DirIter`] this crate started with.

use super::Volume;
use crate::block::EntryBlock;
use crate::constants::*;
use crate::date::AmigaDate;
use crate::error::{AdfError, Result};
use crate::hash::{hash_name, names_equal};
use std::string::String;
use std::string::ToString;
use std::vec::Vec;

impl Volume<'_> {
    /// Read a directory's 72-slot hash table, whether it's a plain
    /// [`EntryBlock`] directory or the volume's root (a distinct on-disk
    /// layout past the hash table itself, sharing only that byte range).
    fn dir_hash_table(&mut self, dir_block: u32) -> Result<[u32; HASH_TABLE_SIZE]> {
        if dir_block == self.root_block {
            Ok(self.read_root_block()?.hash_table)
        } else {
            Ok(self.read_entry(dir_block)?.hash_table)
        }
    }

    /// Write a single hash-table slot back, routing to the root block's own
    /// writer when `dir_block` is the root so the rest of its layout (bitmap
    /// pointers, disk name) isn't reinterpreted as entry-block fields.
    fn set_dir_hash_slot(&mut self, dir_block: u32, hash: usize, value: u32) -> Result<()> {
        if dir_block == self.root_block {
            let mut root = self.read_root_block()?;
            root.hash_table[hash] = value;
            self.write_root_block(&root)
        } else {
            let mut dir = self.read_entry(dir_block)?;
            dir.hash_table[hash] = value;
            self.write_entry(dir_block, &dir)
        }
    }

    /// Look up `name` directly under `dir_block`, without following links.
    pub(crate) fn find_in_dir(&mut self, dir_block: u32, name: &[u8]) -> Result<Option<(u32, EntryBlock)>> {
        let hash_table = self.dir_hash_table(dir_block)?;
        let hash = hash_name(name, self.fs_flags.intl);
        let mut block = hash_table[hash];
        while block != 0 {
            let entry = self.read_entry(block)?;
            if names_equal(entry.name(), name, self.fs_flags.intl) {
                return Ok(Some((block, entry)));
            }
            block = entry.next_same_hash;
        }
        Ok(None)
    }

    /// Splice a freshly-written entry at the head of its name's hash chain.
    pub(crate) fn insert_into_chain(&mut self, dir_block: u32, entry_block: u32, name: &[u8]) -> Result<()> {
        let hash = hash_name(name, self.fs_flags.intl);
        let head = self.dir_hash_table(dir_block)?[hash];

        let mut entry = self.read_entry(entry_block)?;
        entry.next_same_hash = head;
        entry.parent = dir_block;
        self.write_entry(entry_block, &entry)?;

        self.set_dir_hash_slot(dir_block, hash, entry_block)
    }

    /// Unlink `entry_block` from `dir_block`'s hash table, fixing up either
    /// the table slot or the preceding chain link.
    pub(crate) fn remove_from_chain(&mut self, dir_block: u32, entry_block: u32) -> Result<()> {
        let entry = self.read_entry(entry_block)?;
        let hash = hash_name(entry.name(), self.fs_flags.intl);
        let hash_table = self.dir_hash_table(dir_block)?;

        if hash_table[hash] == entry_block {
            return self.set_dir_hash_slot(dir_block, hash, entry.next_same_hash);
        }

        let mut prev = hash_table[hash];
        while prev != 0 {
            let mut prev_entry = self.read_entry(prev)?;
            if prev_entry.next_same_hash == entry_block {
                prev_entry.next_same_hash = entry.next_same_hash;
                return self.write_entry(prev, &prev_entry);
            }
            prev = prev_entry.next_same_hash;
        }

        Err(AdfError::InvalidState("entry missing from its own hash chain"))
    }

    /// Move `entry_block` from `old_parent` to `new_parent` under `new_name`,
    /// re-hashing it into the new parent's table.
    pub(crate) fn rename_in_parent(
        &mut self,
        old_parent: u32,
        new_parent: u32,
        entry_block: u32,
        new_name: &[u8],
    ) -> Result<()> {
        if new_name.is_empty() || new_name.len() > MAX_NAME_LEN {
            return Err(AdfError::NameTooLong);
        }
        if let Some((existing_block, _)) = self.find_in_dir(new_parent, new_name)? {
            if existing_block != entry_block {
                return Err(AdfError::AlreadyExists(
                    String::from_utf8_lossy(new_name).to_string(),
                ));
            }
        }

        self.remove_from_chain(old_parent, entry_block)?;

        let mut entry = self.read_entry(entry_block)?;
        let mut name = [0u8; MAX_NAME_LEN];
        name[..new_name.len()].copy_from_slice(new_name);
        entry.name = name;
        entry.name_len = new_name.len() as u8;
        entry.date = AmigaDate::now();
        self.write_entry(entry_block, &entry)?;

        self.insert_into_chain(new_parent, entry_block, new_name)
    }

    /// Allocate a fresh header block, wire up a minimal [`EntryBlock`] for
    /// it, and splice it into `parent`'s hash chain and dir-cache.
    pub(crate) fn create_header_block(&mut self, parent: u32, name: &[u8], sec_type: i32) -> Result<u32> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(AdfError::NameTooLong);
        }
        if self.find_in_dir(parent, name)?.is_some() {
            return Err(AdfError::AlreadyExists(String::from_utf8_lossy(name).to_string()));
        }

        let block = {
            let bitmap = self
                .bitmap
                .as_mut()
                .ok_or(AdfError::InvalidState("bitmap not loaded"))?;
            bitmap.allocate(1)?.remove(0)
        };

        let mut packed_name = [0u8; MAX_NAME_LEN];
        packed_name[..name.len()].copy_from_slice(name);

        let entry = EntryBlock {
            block_type: T_HEADER,
            header_key: block,
            high_seq: 0,
            first_data: 0,
            checksum: 0,
            hash_table: [0u32; HASH_TABLE_SIZE],
            access: 0,
            byte_size: 0,
            comment_len: 0,
            comment: [0u8; MAX_COMMENT_LEN],
            date: AmigaDate::now(),
            name_len: name.len() as u8,
            name: packed_name,
            real_entry: 0,
            next_link: 0,
            next_same_hash: 0,
            parent,
            extension: 0,
            sec_type,
        };

        self.write_entry(block, &entry)?;
        self.insert_into_chain(parent, block, name)?;
        super::dircache::on_create(self, parent, block)?;
        Ok(block)
    }

    /// Unlink a header block from its parent and dir-cache, and release its
    /// sector back to the bitmap. Does not touch the entry's own data/ext
    /// blocks — callers free those first (see `path::PathApi::remove`).
    pub(crate) fn delete_header_block(&mut self, parent: u32, block: u32) -> Result<()> {
        self.remove_from_chain(parent, block)?;
        super::dircache::on_delete(self, parent, block)?;
        if let Some(bitmap) = self.bitmap.as_mut() {
            bitmap.free(&[block]);
        }
        Ok(())
    }

    /// List every live entry directly under `dir_block`.
    pub(crate) fn list_dir_entries(&mut self, dir_block: u32) -> Result<Vec<crate::dir::DirEntry>> {
        let hash_table = self.dir_hash_table(dir_block)?;
        let mut out = Vec::new();
        for head in hash_table {
            let mut block = head;
            while block != 0 {
                let entry = self.read_entry(block)?;
                if let Some(de) = crate::dir::DirEntry::from_entry_block(block, &entry) {
                    out.push(de);
                }
                block = entry.next_same_hash;
            }
        }
        Ok(out)
    }
}
