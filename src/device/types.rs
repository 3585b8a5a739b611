//! Device geometry table and classification (spec.md §4.2).

/// Physical/logical geometry of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Number of cylinders (tracks per head).
    pub cylinders: u32,
    /// Number of heads (surfaces).
    pub heads: u32,
    /// Sectors per track.
    pub sectors: u32,
}

impl Geometry {
    /// Total number of 512-byte blocks this geometry describes.
    #[inline]
    pub const fn total_blocks(self) -> u32 {
        self.cylinders * self.heads * self.sectors
    }

    /// Blocks per cylinder (heads * sectors), used to convert cylinder
    /// ranges to block ranges for RDB partitions.
    #[inline]
    pub const fn cyl_blocks(self) -> u32 {
        self.heads * self.sectors
    }
}

/// Known floppy geometries, keyed by total sector count. Mirrors
/// ADFlib's `adfDevMedia[]` table (`adf_dev_type.c`).
pub const GEOMETRY_TABLE: &[(u32, Geometry)] = &[
    (
        crate::FLOPPY_DD_SECTORS,
        Geometry {
            cylinders: crate::CYLINDERS,
            heads: crate::HEADS,
            sectors: crate::SECTORS_PER_TRACK_DD,
        },
    ),
    (
        crate::FLOPPY_HD_SECTORS,
        Geometry {
            cylinders: crate::CYLINDERS,
            heads: crate::HEADS,
            sectors: crate::SECTORS_PER_TRACK_HD,
        },
    ),
];

/// Look up a known floppy geometry for an exact block count.
pub fn lookup_floppy_geometry(size_blocks: u32) -> Option<Geometry> {
    GEOMETRY_TABLE
        .iter()
        .find(|(blocks, _)| *blocks == size_blocks)
        .map(|(_, geo)| *geo)
}

/// How a device was classified (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// A plain floppy dump with a known geometry, no RDB.
    Floppy,
    /// A single-volume hardfile image, no RDB.
    Hardfile,
    /// A multi-volume hard disk image with an RDB partition table.
    Harddisk,
}

/// A mountable volume region discovered on a device, either the whole
/// device (floppy/hardfile) or one RDB `PART` entry (harddisk).
#[derive(Debug, Clone)]
pub struct PartitionInfo {
    /// First block of this partition, in device coordinates.
    pub first_block: u32,
    /// Last block of this partition (inclusive), in device coordinates.
    pub last_block: u32,
    /// Partition name (from the RDB `PART` block, or empty for floppy/hardfile).
    pub name: std::string::String,
    /// DOS type bytes read from the partition's boot block, once mounted.
    /// `None` until the boot block has actually been read.
    pub dos_type_hint: Option<[u8; 4]>,
}
