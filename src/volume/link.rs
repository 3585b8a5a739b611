//! Hard and soft link maintenance (spec.md §4.7).
//!
//! AFFS has no separate inode table: the header block created first for a
//! name *is* the content (its `hash_table` holds data-block pointers or a
//! directory's children). A hard link is just another header block, of
//! secondary type `ST_LFILE`/`ST_LDIR`, whose `real_entry` names the header
//! that actually holds the content; `next_link` threads every link sharing
//! one target into a singly-linked list rooted at the target's own
//! `next_link` field.
//!
//! Deleting the target while links remain promotes the first remaining link
//! into its place (see [`promote_and_delete`]) — the name used to create the
//! entry stops resolving, while names created via `next_link` continue to.

use super::Volume;
use crate::block::EntryBlock;
use crate::checksum::write_normal_sum;
use crate::constants::*;
use crate::error::{AdfError, Result};
use crate::symlink::write_symlink_target;

/// Follow a possible chain of hard links to the header block that actually
/// holds content, bounded by the volume's total block count to guard
/// against a corrupt cyclic `real_entry` chain (Open Question (c)).
pub(crate) fn resolve(vol: &mut Volume, block: u32) -> Result<(u32, EntryBlock)> {
    let limit = (vol.last_block - vol.first_block + 1).max(1);
    let mut current = block;
    for _ in 0..limit {
        let entry = vol.read_entry(current)?;
        if !entry.is_link() {
            return Ok((current, entry));
        }
        current = entry.real_entry;
    }
    Err(AdfError::LinkCycle)
}

/// Create a hard link named `name` under `parent`, pointing at `target`
/// (resolved first, so links never chain to other links).
pub(crate) fn create_hard_link(vol: &mut Volume, parent: u32, name: &[u8], target: u32) -> Result<u32> {
    let (real_block, real_entry) = resolve(vol, target)?;
    let sec_type = if real_entry.is_dir() { ST_LDIR } else { ST_LFILE };

    let link_block = vol.create_header_block(parent, name, sec_type)?;

    let mut target_entry = vol.read_entry(real_block)?;
    let mut link_entry = vol.read_entry(link_block)?;
    link_entry.real_entry = real_block;
    link_entry.next_link = target_entry.next_link;
    vol.write_entry(link_block, &link_entry)?;

    target_entry.next_link = link_block;
    vol.write_entry(real_block, &target_entry)
}

/// Create a soft link named `name` under `parent` whose target is the
/// literal path string `target`, stored inline at `SYMLINK_OFFSET`.
pub(crate) fn create_soft_link(vol: &mut Volume, parent: u32, name: &[u8], target: &str) -> Result<u32> {
    let block = vol.create_header_block(parent, name, ST_LSOFT)?;
    let mut buf = vol.read_block(block)?;
    write_symlink_target(&mut buf, target)?;
    write_normal_sum(&mut buf, CHECKSUM_OFFSET);
    vol.write_block(block, &buf)?;
    Ok(block)
}

/// Remove `link_block` (a hard-link entry) from its target's `next_link`
/// chain and delete its own header block. The target and its content are
/// untouched.
pub(crate) fn unlink_link_entry(vol: &mut Volume, link_block: u32) -> Result<()> {
    let entry = vol.read_entry(link_block)?;
    let target = entry.real_entry;

    let mut target_entry = vol.read_entry(target)?;
    if target_entry.next_link == link_block {
        target_entry.next_link = entry.next_link;
        vol.write_entry(target, &target_entry)?;
    } else {
        let mut prev = target_entry.next_link;
        while prev != 0 {
            let mut prev_entry = vol.read_entry(prev)?;
            if prev_entry.next_link == link_block {
                prev_entry.next_link = entry.next_link;
                vol.write_entry(prev, &prev_entry)?;
                break;
            }
            prev = prev_entry.next_link;
        }
    }

    vol.delete_header_block(entry.parent, link_block)
}

/// Delete a real (non-link) entry that still has hard links attached,
/// promoting the first remaining link (`target.next_link`) into its place:
/// its content (data/child pointers) and, for a directory, its children's
/// `parent` pointers move onto the promoted block, and every other
/// remaining link's `real_entry` is retargeted at it.
pub(crate) fn promote_and_delete(vol: &mut Volume, target_block: u32) -> Result<()> {
    let target = vol.read_entry(target_block)?;
    let promoted_block = target.next_link;
    if promoted_block == 0 {
        return vol.delete_header_block(target.parent, target_block);
    }

    let mut promoted = vol.read_entry(promoted_block)?;
    let rest_of_chain = promoted.next_link;

    promoted.sec_type = target.sec_type;
    promoted.real_entry = 0;
    promoted.next_link = rest_of_chain;
    promoted.hash_table = target.hash_table;
    promoted.byte_size = target.byte_size;
    promoted.first_data = target.first_data;
    promoted.high_seq = target.high_seq;
    promoted.extension = target.extension;
    vol.write_entry(promoted_block, &promoted)?;

    if target.is_dir() {
        for &child_block in target.hash_table.iter() {
            let mut block = child_block;
            while block != 0 {
                let mut child = vol.read_entry(block)?;
                child.parent = promoted_block;
                let next = child.next_same_hash;
                vol.write_entry(block, &child)?;
                block = next;
            }
        }
    }

    let mut cur = rest_of_chain;
    while cur != 0 {
        let mut link_entry = vol.read_entry(cur)?;
        link_entry.real_entry = promoted_block;
        let next = link_entry.next_link;
        vol.write_entry(cur, &link_entry)?;
        cur = next;
    }

    vol.delete_header_block(target.parent, target_block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::{Device, MemoryDevice};
    use crate::volume::file::{FileHandle, OpenMode};

    fn mounted_empty() -> (Device,) {
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_DD_SECTORS));
        let mut device = Device::open(driver, "links.adf", true, Config::default()).unwrap();
        Volume::format(&mut device, 0, "Links", crate::types::FsType::Ffs, Config::default())
            .unwrap()
            .unmount()
            .unwrap();
        (device,)
    }

    #[test]
    fn test_hard_link_shares_content() {
        let (mut device,) = mounted_empty();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let root = vol.root_block;

        let original = vol.create_header_block(root, b"original", ST_FILE).unwrap();
        {
            let mut handle = FileHandle::open(&mut vol, original, OpenMode::Truncate).unwrap();
            handle.write(b"shared bytes").unwrap();
            handle.close().unwrap();
        }

        let link_block = create_hard_link(&mut vol, root, b"alias", original).unwrap();
        let (resolved_block, _) = resolve(&mut vol, link_block).unwrap();
        assert_eq!(resolved_block, original);

        let mut handle = FileHandle::open(&mut vol, resolved_block, OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"shared bytes");
    }

    #[test]
    fn test_delete_target_promotes_first_link() {
        let (mut device,) = mounted_empty();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let root = vol.root_block;

        let original = vol.create_header_block(root, b"original", ST_FILE).unwrap();
        {
            let mut handle = FileHandle::open(&mut vol, original, OpenMode::Truncate).unwrap();
            handle.write(b"content").unwrap();
            handle.close().unwrap();
        }
        let link_a = create_hard_link(&mut vol, root, b"alias-a", original).unwrap();
        let link_b = create_hard_link(&mut vol, root, b"alias-b", original).unwrap();

        promote_and_delete(&mut vol, original).unwrap();

        let (resolved_a, entry_a) = resolve(&mut vol, link_a).unwrap();
        assert_eq!(resolved_a, link_a);
        assert!(!entry_a.is_link());

        let (resolved_b, _) = resolve(&mut vol, link_b).unwrap();
        assert_eq!(resolved_b, link_a);

        let mut handle = FileHandle::open(&mut vol, link_a, OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"content");
    }

    #[test]
    fn test_unlink_leaves_target_intact() {
        let (mut device,) = mounted_empty();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let root = vol.root_block;

        let original = vol.create_header_block(root, b"original", ST_FILE).unwrap();
        let link_block = create_hard_link(&mut vol, root, b"alias", original).unwrap();

        unlink_link_entry(&mut vol, link_block).unwrap();

        let target = vol.read_entry(original).unwrap();
        assert_eq!(target.next_link, 0);
    }

    #[test]
    fn test_soft_link_round_trip() {
        let (mut device,) = mounted_empty();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let root = vol.root_block;

        let block = create_soft_link(&mut vol, root, b"shortcut", "/Work/Tools").unwrap();
        let buf = vol.read_block(block).unwrap();
        let mut out = [0u8; 64];
        let len = crate::symlink::read_symlink_target(&buf, &mut out);
        assert_eq!(&out[..len], b"/Work/Tools");
    }
}
