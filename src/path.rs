//! Slash-separated path resolution over a mounted [`Volume`] (spec.md §2,
//! §4.7). An Amiga path like `Work:Tools/mount` has no on-disk existence of
//! its own — every lookup walks the hash-chained directories one component
//! at a time, the way the teacher's [`crate::dir::DirIter::find`] walked a
//! single directory's chain. [`PathApi`] generalizes that walk across an
//! entire path and layers file, directory and link mutation on top.

use crate::constants::*;
use crate::dir::DirEntry;
use crate::error::{AdfError, Result};
use crate::symlink::{read_symlink_target, MAX_SYMLINK_LEN};
use crate::types::EntryType;
use crate::volume::{dircache, file, link, FileHandle, OpenMode, Volume};
use std::string::{String, ToString};
use std::vec::Vec;

/// Path-based operations over a mounted volume: resolution, listing,
/// file/directory creation and removal, renaming, and hard/soft links.
///
/// Paths are slash-separated; a leading `/` resolves from the volume root,
/// otherwise from the volume's current directory ([`Volume::change_dir`]
/// below). `.` and `..` are recognized components.
pub trait PathApi<'a> {
    /// List the entries directly under `path` (which must resolve to a directory).
    fn list_dir(&mut self, path: &str) -> Result<Vec<DirEntry>>;

    /// Look up `path` and return its directory-entry metadata.
    fn stat(&mut self, path: &str) -> Result<DirEntry>;

    /// Create a new, empty directory at `path`. The parent must already exist.
    fn create_dir(&mut self, path: &str) -> Result<u32>;

    /// Open (or, in [`OpenMode::Truncate`], create) the file at `path`.
    fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle<'_, 'a>>;

    /// Remove the entry at `path`. Directories must be empty.
    fn remove(&mut self, path: &str) -> Result<()>;

    /// Move/rename the entry at `from` to `to`, which may live under a
    /// different parent directory.
    fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Create a hard link at `path` pointing at the already-existing entry `target`.
    fn create_hard_link(&mut self, path: &str, target: &str) -> Result<u32>;

    /// Create a soft (symbolic) link at `path` whose target is the literal string `target`.
    fn create_soft_link(&mut self, path: &str, target: &str) -> Result<u32>;

    /// Read the literal target string of the soft link at `path`.
    fn read_soft_link(&mut self, path: &str) -> Result<String>;

    /// Change the volume's current directory to `path`.
    fn change_dir(&mut self, path: &str) -> Result<()>;
}

impl<'a> PathApi<'a> for Volume<'a> {
    fn list_dir(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        let dir_block = self.resolve_dir(path)?;
        self.list_dir_entries(dir_block)
    }

    fn stat(&mut self, path: &str) -> Result<DirEntry> {
        let (_, name) = split_parent_name(path);
        if name.is_empty() {
            // The root's own layout diverges from a plain entry block past
            // the hash table, so its metadata comes from `RootBlock` rather
            // than the generic `EntryBlock` interpretation `resolve_entry` uses.
            let root_block = self.root_block;
            let root = self.read_root_block()?;
            return Ok(DirEntry::from_root_block(root_block, &root));
        }
        let (block, entry) = self.resolve_entry(path)?;
        DirEntry::from_entry_block(block, &entry).ok_or(AdfError::InvalidSecType(entry.sec_type))
    }

    fn create_dir(&mut self, path: &str) -> Result<u32> {
        let (parent_path, name) = split_parent_name(path);
        let parent_block = self.resolve_dir(&parent_path)?;
        self.create_header_block(parent_block, &name, ST_DIR)
    }

    fn open_file(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle<'_, 'a>> {
        let (parent_path, name) = split_parent_name(path);
        let parent_block = self.resolve_dir(&parent_path)?;

        let header_block = match self.find_in_dir(parent_block, &name)? {
            Some((block, entry)) if entry.is_link() => {
                let (real_block, real_entry) = link::resolve(self, block)?;
                if !real_entry.is_file() {
                    return Err(AdfError::NotAFile);
                }
                real_block
            }
            Some((block, entry)) => {
                if !entry.is_file() {
                    return Err(AdfError::NotAFile);
                }
                block
            }
            None if mode == OpenMode::Read => {
                return Err(AdfError::PathNotFound(String::from_utf8_lossy(&name).to_string()));
            }
            None => self.create_header_block(parent_block, &name, ST_FILE)?,
        };

        file::FileHandle::open(self, header_block, mode)
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let (block, entry) = self.resolve_entry(path)?;
        match entry.entry_type() {
            Some(EntryType::SoftLink) => self.delete_header_block(entry.parent, block),
            Some(EntryType::HardLinkFile) | Some(EntryType::HardLinkDir) => {
                link::unlink_link_entry(self, block)
            }
            Some(EntryType::File) => {
                if entry.next_link != 0 {
                    link::promote_and_delete(self, block)
                } else {
                    let mut handle = file::FileHandle::open(self, block, OpenMode::Read)?;
                    handle.truncate(0)?;
                    self.delete_header_block(entry.parent, block)
                }
            }
            Some(EntryType::Dir) => {
                if !self.list_dir_entries(block)?.is_empty() {
                    return Err(AdfError::DirectoryNotEmpty);
                }
                if entry.next_link != 0 {
                    link::promote_and_delete(self, block)
                } else {
                    dircache::free_chain(self, block)?;
                    self.delete_header_block(entry.parent, block)
                }
            }
            Some(EntryType::Root) | None => Err(AdfError::InvalidState("cannot remove the root directory")),
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let (old_block, old_entry) = self.resolve_entry(from)?;
        let (new_parent_path, new_name) = split_parent_name(to);
        let new_parent_block = self.resolve_dir(&new_parent_path)?;
        self.rename_in_parent(old_entry.parent, new_parent_block, old_block, &new_name)
    }

    fn create_hard_link(&mut self, path: &str, target: &str) -> Result<u32> {
        let (target_block, _) = self.resolve_entry(target)?;
        let (parent_path, name) = split_parent_name(path);
        let parent_block = self.resolve_dir(&parent_path)?;
        link::create_hard_link(self, parent_block, &name, target_block)
    }

    fn create_soft_link(&mut self, path: &str, target: &str) -> Result<u32> {
        let (parent_path, name) = split_parent_name(path);
        let parent_block = self.resolve_dir(&parent_path)?;
        link::create_soft_link(self, parent_block, &name, target)
    }

    fn read_soft_link(&mut self, path: &str) -> Result<String> {
        let (block, entry) = self.resolve_entry(path)?;
        if entry.sec_type != ST_LSOFT {
            return Err(AdfError::NotASymlink);
        }
        let buf = self.read_block(block)?;
        let mut out = [0u8; MAX_SYMLINK_LEN * 2];
        let len = read_symlink_target(&buf, &mut out);
        Ok(String::from_utf8_lossy(&out[..len]).into_owned())
    }

    fn change_dir(&mut self, path: &str) -> Result<()> {
        let block = self.resolve_dir(path)?;
        self.set_cwd(block);
        Ok(())
    }
}

impl Volume<'_> {
    /// Resolve `path` to a directory block, following `.`/`..` and any
    /// hard links to directories encountered along the way.
    fn resolve_dir(&mut self, path: &str) -> Result<u32> {
        let (absolute, components) = split_components(path);
        let mut current = if absolute { self.root_block } else { self.cwd };
        for component in components {
            current = self.step_into_dir(current, &component)?;
        }
        Ok(current)
    }

    fn step_into_dir(&mut self, dir_block: u32, component: &[u8]) -> Result<u32> {
        if component == b"." {
            return Ok(dir_block);
        }
        if component == b".." {
            let entry = self.read_entry(dir_block)?;
            return Ok(if dir_block == self.root_block { self.root_block } else { entry.parent });
        }

        let (block, entry) = self
            .find_in_dir(dir_block, component)?
            .ok_or_else(|| AdfError::PathNotFound(String::from_utf8_lossy(component).to_string()))?;

        if entry.is_link() {
            let (real_block, real_entry) = link::resolve(self, block)?;
            if !real_entry.is_dir() {
                return Err(AdfError::NotADirectory);
            }
            Ok(real_block)
        } else {
            if !entry.is_dir() {
                return Err(AdfError::NotADirectory);
            }
            Ok(block)
        }
    }

    /// Resolve `path` to its own entry, without following a trailing hard
    /// link (callers needing the real content resolve separately).
    fn resolve_entry(&mut self, path: &str) -> Result<(u32, crate::block::EntryBlock)> {
        let (parent_path, name) = split_parent_name(path);
        if name.is_empty() {
            let root = self.root_block;
            let entry = self.read_entry(root)?;
            return Ok((root, entry));
        }
        let parent_block = self.resolve_dir(&parent_path)?;
        self.find_in_dir(parent_block, &name)?
            .ok_or_else(|| AdfError::PathNotFound(String::from_utf8_lossy(&name).to_string()))
    }

    fn set_cwd(&mut self, block: u32) {
        self.cwd = block;
    }
}

/// Split `path` into `(is_absolute, components)`, dropping empty segments
/// produced by leading/doubled/trailing slashes.
fn split_components(path: &str) -> (bool, Vec<Vec<u8>>) {
    let absolute = path.starts_with('/');
    let components = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.as_bytes().to_vec())
        .collect();
    (absolute, components)
}

/// Split `path` into its parent directory path and final component name.
/// A top-level absolute path (e.g. `/Work`) keeps its leading slash on the
/// parent side so the recursive `resolve_dir` call still resolves from the
/// volume root rather than the current directory.
fn split_parent_name(path: &str) -> (String, Vec<u8>) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), path[1..].as_bytes().to_vec()),
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].as_bytes().to_vec()),
        None => (String::new(), path.as_bytes().to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::{Device, MemoryDevice};
    use crate::types::FsType;

    fn formatted() -> Device {
        let driver = std::boxed::Box::new(MemoryDevice::create(crate::FLOPPY_DD_SECTORS));
        let mut device = Device::open(driver, "paths.adf", true, Config::default()).unwrap();
        Volume::format(&mut device, 0, "Paths", FsType::Ffs, Config::default())
            .unwrap()
            .unmount()
            .unwrap();
        device
    }

    #[test]
    fn test_create_nested_dirs_and_list() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();

        vol.create_dir("/Work").unwrap();
        vol.create_dir("/Work/Tools").unwrap();

        let top = vol.list_dir("/").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name_str(), Some("Work"));

        let nested = vol.list_dir("/Work/Tools").unwrap();
        assert!(nested.is_empty());
    }

    #[test]
    fn test_open_file_creates_and_reads_back() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_dir("/Work").unwrap();

        {
            let mut handle = vol.open_file("/Work/readme.txt", OpenMode::Truncate).unwrap();
            handle.write(b"hello amiga").unwrap();
            handle.close().unwrap();
        }

        let mut handle = vol.open_file("/Work/readme.txt", OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"hello amiga");
    }

    #[test]
    fn test_remove_file_and_empty_dir() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_dir("/Work").unwrap();
        {
            let mut handle = vol.open_file("/Work/scratch", OpenMode::Truncate).unwrap();
            handle.write(b"temp").unwrap();
            handle.close().unwrap();
        }

        vol.remove("/Work/scratch").unwrap();
        assert!(vol.list_dir("/Work").unwrap().is_empty());

        vol.remove("/Work").unwrap();
        assert!(vol.list_dir("/").unwrap().is_empty());
    }

    #[test]
    fn test_remove_non_empty_dir_fails() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_dir("/Work").unwrap();
        vol.create_dir("/Work/Tools").unwrap();

        assert!(matches!(vol.remove("/Work"), Err(AdfError::DirectoryNotEmpty)));
    }

    #[test]
    fn test_rename_across_directories() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_dir("/A").unwrap();
        vol.create_dir("/B").unwrap();
        {
            let mut handle = vol.open_file("/A/note", OpenMode::Truncate).unwrap();
            handle.write(b"hi").unwrap();
            handle.close().unwrap();
        }

        vol.rename("/A/note", "/B/note2").unwrap();

        assert!(vol.list_dir("/A").unwrap().is_empty());
        let moved = vol.list_dir("/B").unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].name_str(), Some("note2"));
    }

    #[test]
    fn test_soft_link_round_trip() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_soft_link("/shortcut", "/Work/Tools").unwrap();
        assert_eq!(vol.read_soft_link("/shortcut").unwrap(), "/Work/Tools");
    }

    #[test]
    fn test_change_dir_then_relative_path() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        vol.create_dir("/Work").unwrap();
        vol.change_dir("/Work").unwrap();
        vol.create_dir("Tools").unwrap();

        let nested = vol.list_dir("Tools").unwrap();
        assert!(nested.is_empty());

        vol.change_dir("..").unwrap();
        let top = vol.list_dir(".").unwrap();
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_hard_link_via_path() {
        let mut device = formatted();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        {
            let mut handle = vol.open_file("/original", OpenMode::Truncate).unwrap();
            handle.write(b"payload").unwrap();
            handle.close().unwrap();
        }
        vol.create_hard_link("/alias", "/original").unwrap();

        let mut handle = vol.open_file("/alias", OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"payload");
    }
}
