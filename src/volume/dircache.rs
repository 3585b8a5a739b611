//! Directory-cache sidecar maintenance (spec.md §4.5, `DOSFS_DIRCACHE`).
//!
//! A directory's `extension` field, when dir-cache mode is on, points to a
//! chain of [`crate::block::DirCacheBlock`]s holding compact summaries of its
//! children — enough for a file requester to list a folder without opening
//! each child's own header block. Entry points here are no-ops when the
//! mounted volume wasn't formatted with `DOSFS_DIRCACHE`.

use super::Volume;
use crate::block::{DirCacheBlock, EntryBlock};
use crate::constants::BLOCK_SIZE;
use crate::error::Result;

const HEADER_SIZE: usize = 24;

/// Read `dir_block`'s dir-cache chain head, routing through the root
/// block's own layout when `dir_block` is the volume root — it shares the
/// `extension` field's byte offset with a plain entry block but diverges
/// everywhere else, so a full `EntryBlock` round trip isn't safe to write.
fn dir_extension(vol: &mut Volume, dir_block: u32) -> Result<u32> {
    if dir_block == vol.root_block {
        Ok(vol.read_root_block()?.extension)
    } else {
        Ok(vol.read_entry(dir_block)?.extension)
    }
}

fn set_dir_extension(vol: &mut Volume, dir_block: u32, sector: u32) -> Result<()> {
    if dir_block == vol.root_block {
        let mut root = vol.read_root_block()?;
        root.extension = sector;
        vol.write_root_block(&root)
    } else {
        let mut dir = vol.read_entry(dir_block)?;
        dir.extension = sector;
        vol.write_entry(dir_block, &dir)
    }
}

fn encode_record(entry: &EntryBlock, header_block: u32) -> std::vec::Vec<u8> {
    let mut out = std::vec::Vec::with_capacity(32 + 2 + entry.name_len as usize + entry.comment_len as usize);
    out.extend_from_slice(&header_block.to_be_bytes());
    out.extend_from_slice(&entry.parent.to_be_bytes());
    out.extend_from_slice(&entry.sec_type.to_be_bytes());
    out.extend_from_slice(&entry.byte_size.to_be_bytes());
    out.extend_from_slice(&entry.access.to_be_bytes());
    out.extend_from_slice(&entry.date.days.to_be_bytes());
    out.extend_from_slice(&entry.date.mins.to_be_bytes());
    out.extend_from_slice(&entry.date.ticks.to_be_bytes());
    out.push(entry.name_len);
    out.extend_from_slice(&entry.name()[..entry.name_len as usize]);
    out.push(entry.comment_len);
    out.extend_from_slice(&entry.comment()[..entry.comment_len as usize]);
    out
}

/// `(header_block, record_len)` for the record starting at `offset`, if any.
fn record_at(entries: &[u8], offset: usize) -> Option<(u32, usize)> {
    if offset + 33 > entries.len() {
        return None;
    }
    let header = u32::from_be_bytes(entries[offset..offset + 4].try_into().unwrap());
    let name_len = entries[offset + 32] as usize;
    let comment_offset = offset + 33 + name_len;
    if comment_offset >= entries.len() {
        return None;
    }
    let comment_len = entries[comment_offset] as usize;
    let total = 33 + name_len + 1 + comment_len;
    if offset + total > entries.len() {
        return None;
    }
    Some((header, total))
}

/// Append a freshly-built record to the last block of `dir_block`'s
/// dir-cache chain, allocating a new chain block if none exists yet or the
/// last one is full.
pub(crate) fn on_create(vol: &mut Volume, dir_block: u32, new_block: u32) -> Result<()> {
    if !vol.fs_flags.dircache {
        return Ok(());
    }
    let entry = vol.read_entry(new_block)?;
    let record = encode_record(&entry, new_block);

    let mut extension = dir_extension(vol, dir_block)?;
    if extension == 0 {
        let sector = {
            let bitmap = vol
                .bitmap
                .as_mut()
                .ok_or(crate::error::AdfError::InvalidState("bitmap not loaded"))?;
            bitmap.allocate(1)?.remove(0)
        };
        let dc = DirCacheBlock::empty(sector, dir_block);
        vol.write_block(sector, &dc.write())?;
        set_dir_extension(vol, dir_block, sector)?;
        extension = sector;
    }

    let mut block_sector = extension;
    loop {
        let buf = vol.read_block(block_sector)?;
        let mut dc = DirCacheBlock::parse_at(&buf, block_sector)?;
        let capacity = BLOCK_SIZE - HEADER_SIZE;
        if dc.entries.len() + record.len() <= capacity {
            dc.entries.extend_from_slice(&record);
            dc.records += 1;
            vol.write_block(block_sector, &dc.write())?;
            return Ok(());
        }
        if dc.next_dircache != 0 {
            block_sector = dc.next_dircache;
            continue;
        }

        let sector = {
            let bitmap = vol
                .bitmap
                .as_mut()
                .ok_or(crate::error::AdfError::InvalidState("bitmap not loaded"))?;
            bitmap.allocate(1)?.remove(0)
        };
        dc.next_dircache = sector;
        vol.write_block(block_sector, &dc.write())?;

        let mut next = DirCacheBlock::empty(sector, dir_block);
        next.entries.extend_from_slice(&record);
        next.records = 1;
        vol.write_block(sector, &next.write())?;
        return Ok(());
    }
}

/// Remove the record for `removed_block` from `dir_block`'s dir-cache chain.
pub(crate) fn on_delete(vol: &mut Volume, dir_block: u32, removed_block: u32) -> Result<()> {
    if !vol.fs_flags.dircache {
        return Ok(());
    }
    let mut block_sector = dir_extension(vol, dir_block)?;
    while block_sector != 0 {
        let buf = vol.read_block(block_sector)?;
        let mut dc = DirCacheBlock::parse_at(&buf, block_sector)?;

        let mut offset = 0;
        let mut found = None;
        while let Some((header, len)) = record_at(&dc.entries, offset) {
            if header == removed_block {
                found = Some((offset, len));
                break;
            }
            offset += len;
        }

        if let Some((offset, len)) = found {
            dc.entries.drain(offset..offset + len);
            dc.records -= 1;
            vol.write_block(block_sector, &dc.write())?;
            return Ok(());
        }

        block_sector = dc.next_dircache;
    }
    Ok(())
}

/// Update the cached name/size/date for `header_block` after a rename,
/// truncate, or comment change. A no-op if dir-cache mode is off or the
/// record can't be found (it will simply be stale until the next rebuild).
pub(crate) fn on_update(vol: &mut Volume, dir_block: u32, header_block: u32) -> Result<()> {
    if !vol.fs_flags.dircache {
        return Ok(());
    }
    on_delete(vol, dir_block, header_block)?;
    on_create(vol, dir_block, header_block)
}

/// Free every block in a directory's dir-cache chain. Called when the
/// directory itself is deleted.
pub(crate) fn free_chain(vol: &mut Volume, dir_block: u32) -> Result<()> {
    let mut block_sector = dir_extension(vol, dir_block)?;
    while block_sector != 0 {
        let buf = vol.read_block(block_sector)?;
        let dc = DirCacheBlock::parse_at(&buf, block_sector)?;
        if let Some(bitmap) = vol.bitmap.as_mut() {
            bitmap.free(&[block_sector]);
        }
        block_sector = dc.next_dircache;
    }
    Ok(())
}
