//! In-memory allocation bitmap (spec.md §4.4).
//!
//! Grounded on `adf_bitm.c`'s `adfReadBitmap`/`adfWriteNewBitmap`/
//! `adfGetFreeBlocks`/`adfSetBlockFree`. Per spec.md §9's redesign note,
//! the original's three parallel arrays (`bmPages`, `bmBlocks`, dirty flags)
//! collapse here into one `Vec<BitmapBlockSlot>`.

use super::Volume;
use crate::block::{BitmapBlock, BitmapExtBlock};
use crate::constants::BM_MAP_SIZE;
use crate::error::Result;

const BITS_PER_SLOT: u32 = BM_MAP_SIZE as u32 * 32;

/// One on-disk bitmap block, its sector, and whether it needs flushing.
#[derive(Debug, Clone)]
pub struct BitmapBlockSlot {
    /// Sector this block lives at (0 for a not-yet-placed slot during format).
    pub sector: u32,
    /// 127 32-bit free/used words, 1 = free.
    pub words: [u32; BM_MAP_SIZE],
    /// Set whenever a bit in `words` changes since the last flush.
    pub dirty: bool,
}

/// The allocation bitmap for a mounted volume.
#[derive(Debug)]
pub struct Bitmap {
    slots: std::vec::Vec<BitmapBlockSlot>,
    /// First block representable by bit 0 (boot blocks are never representable).
    first_data_block: u32,
    /// Total number of representable data blocks.
    block_count: u32,
    /// Rotating search cursor for `allocate`, in bit units.
    cursor: u32,
}

impl Bitmap {
    #[inline]
    fn bit_index(&self, block: u32) -> u32 {
        block - self.first_data_block
    }

    #[inline]
    fn is_free(&self, bit: u32) -> bool {
        let slot = (bit / BITS_PER_SLOT) as usize;
        let word = ((bit % BITS_PER_SLOT) / 32) as usize;
        let mask = 1u32 << (bit % 32);
        self.slots[slot].words[word] & mask != 0
    }

    fn set_bit(&mut self, bit: u32, free: bool) {
        let slot = (bit / BITS_PER_SLOT) as usize;
        let word = ((bit % BITS_PER_SLOT) / 32) as usize;
        let mask = 1u32 << (bit % 32);
        if free {
            self.slots[slot].words[word] |= mask;
        } else {
            self.slots[slot].words[word] &= !mask;
        }
        self.slots[slot].dirty = true;
    }

    /// Read the bitmap chain (`bmPages` then the `bmExt` chain) for a
    /// freshly-mounted volume.
    pub(crate) fn load(vol: &mut Volume) -> Result<Self> {
        let root = vol.read_root_block()?;
        if !root.bitmap_valid() {
            vol.config
                .report_warn("root block bmFlag is not VALID; proceeding without reconstruction (see Volume::rebuild_bitmap)");
        }

        let mut pointers: std::vec::Vec<u32> =
            root.bm_pages.iter().copied().filter(|&p| p != 0).collect();

        let mut ext = root.bm_ext;
        while ext != 0 {
            let buf = vol.read_block(ext)?;
            let extb = BitmapExtBlock::parse(&buf);
            pointers.extend(extb.pointers.iter().copied().filter(|&p| p != 0));
            ext = extb.next;
        }

        let mut slots = std::vec::Vec::with_capacity(pointers.len());
        for sector in pointers {
            let buf = vol.read_block(sector)?;
            let bb = BitmapBlock::parse_at(&buf, sector)?;
            slots.push(BitmapBlockSlot {
                sector,
                words: bb.map,
                dirty: false,
            });
        }

        let first_data_block = vol.first_block + 2;
        let block_count = (vol.last_block - vol.first_block + 1).saturating_sub(2);

        Ok(Self {
            slots,
            first_data_block,
            block_count,
            cursor: 0,
        })
    }

    /// Build a brand-new, fully-free bitmap for a volume about to be
    /// formatted, then mark `reserved` blocks (boot, root, the bitmap's own
    /// future sectors, optional dir-cache block) used. Sector assignment
    /// for the slots themselves happens in [`Volume::format`], which
    /// allocates the needed sectors from this same bitmap before the first
    /// flush — mirroring `adfCreateBitmap`'s two-pass approach.
    pub(crate) fn create(first_block: u32, last_block: u32, reserved: &[u32]) -> Self {
        let block_count = (last_block - first_block + 1).saturating_sub(2);
        let first_data_block = first_block + 2;
        let slot_count = (block_count as usize).div_ceil(BITS_PER_SLOT as usize).max(1);

        let mut bitmap = Self {
            slots: std::vec![
                BitmapBlockSlot {
                    sector: 0,
                    words: [u32::MAX; BM_MAP_SIZE],
                    dirty: true,
                };
                slot_count
            ],
            first_data_block,
            block_count,
            cursor: 0,
        };

        // Blocks past block_count don't exist; keep their bits permanently used.
        let total_bits = slot_count as u32 * BITS_PER_SLOT;
        for bit in block_count..total_bits {
            bitmap.set_bit(bit, false);
        }

        for &block in reserved {
            bitmap.mark_used(block);
        }

        bitmap
    }

    /// Number of blocks currently marked free.
    pub fn count_free(&self) -> u32 {
        self.slots
            .iter()
            .flat_map(|s| s.words.iter())
            .map(|w| w.count_ones())
            .sum()
    }

    /// Mark a single block used unconditionally (format-time bookkeeping).
    fn mark_used(&mut self, block: u32) {
        if block < self.first_data_block {
            return;
        }
        let bit = self.bit_index(block);
        if bit < self.block_count {
            self.set_bit(bit, false);
        }
    }

    /// Allocate `count` free blocks, marking them used. Returns the
    /// allocated block numbers in ascending order. The search rotates from
    /// the last allocation point, mirroring `adfGetFreeBlocks`' cursor.
    pub fn allocate(&mut self, count: u32) -> Result<std::vec::Vec<u32>> {
        let total_bits = self.slots.len() as u32 * BITS_PER_SLOT;
        let mut found = std::vec::Vec::with_capacity(count as usize);

        let mut scanned = 0u32;
        let mut bit = self.cursor;
        while found.len() < count as usize && scanned < total_bits {
            if bit < self.block_count && self.is_free(bit) {
                self.set_bit(bit, false);
                found.push(self.first_data_block + bit);
            }
            bit = (bit + 1) % total_bits.max(1);
            scanned += 1;
        }

        if found.len() < count as usize {
            // Undo partial allocation so the bitmap reflects "nothing happened".
            for &block in &found {
                self.set_bit(self.bit_index(block), true);
            }
            return Err(crate::error::AdfError::VolumeFull);
        }

        self.cursor = bit;
        Ok(found)
    }

    /// Free previously-allocated blocks.
    pub fn free(&mut self, blocks: &[u32]) {
        for &block in blocks {
            if block < self.first_data_block {
                continue;
            }
            let bit = self.bit_index(block);
            if bit < self.block_count {
                self.set_bit(bit, true);
            }
        }
    }

    /// Slot sectors, in root/extension-chain order — used by `Volume::format`
    /// to know where to place freshly-allocated bitmap blocks before the
    /// first flush.
    pub(crate) fn assign_sectors(&mut self, sectors: &[u32]) {
        for (slot, &sector) in self.slots.iter_mut().zip(sectors) {
            slot.sector = sector;
        }
    }

    pub(crate) fn slot_sectors(&self) -> std::vec::Vec<u32> {
        self.slots.iter().map(|s| s.sector).collect()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Recompute checksums and write every dirty bitmap block back to disk.
    pub(crate) fn flush(&mut self, vol: &mut Volume) -> Result<()> {
        for slot in &mut self.slots {
            if !slot.dirty {
                continue;
            }
            let block = BitmapBlock {
                checksum: 0,
                map: slot.words,
            };
            let buf = block.write();
            vol.write_block(slot.sector, &buf)?;
            slot.dirty = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free_round_trip() {
        let mut bitmap = Bitmap::create(0, 4000, &[0, 1, 2]);
        let free_before = bitmap.count_free();

        let blocks = bitmap.allocate(10).unwrap();
        assert_eq!(blocks.len(), 10);
        assert_eq!(bitmap.count_free(), free_before - 10);

        bitmap.free(&blocks);
        assert_eq!(bitmap.count_free(), free_before);
    }

    #[test]
    fn test_reserved_blocks_not_allocatable() {
        let mut bitmap = Bitmap::create(0, 4000, &[2]);
        let total = bitmap.count_free();
        let all = bitmap.allocate(total).unwrap();
        assert!(!all.contains(&2));
    }

    #[test]
    fn test_allocate_more_than_available_fails() {
        let mut bitmap = Bitmap::create(0, 100, &[]);
        let total = bitmap.count_free();
        assert!(bitmap.allocate(total + 1).is_err());
        assert_eq!(bitmap.count_free(), total);
    }
}
