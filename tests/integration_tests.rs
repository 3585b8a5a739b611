//! End-to-end integration tests driving the public `Device`/`Volume`/
//! `PathApi` surface the way a real consumer would: open a container,
//! mount a volume, create/read/write/delete through paths, unmount.

use amiga_ffs::block::{PartBlock, RdskBlock};
use amiga_ffs::config::Config;
use amiga_ffs::device::{Device, DeviceKind, ImageFileDevice, MemoryDevice};
use amiga_ffs::path::PathApi;
use amiga_ffs::types::FsType;
use amiga_ffs::volume::{OpenMode, Volume};
use amiga_ffs::{AdfError, BLOCK_SIZE, FLOPPY_DD_SECTORS};

fn blank_floppy() -> Device {
    let driver = Box::new(MemoryDevice::create(FLOPPY_DD_SECTORS));
    Device::open(driver, "disk.adf", true, Config::default()).unwrap()
}

fn unique_image_path(tag: &str) -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "amiga-ffs-test-{tag}-{}-{:?}.adf",
        std::process::id(),
        std::thread::current().id()
    ));
    p
}

// S1: format a blank 901120-byte image as OFS, label "Empty"; mount; list
// root (empty); unmount; check the raw boot/root block bytes.
#[test]
fn s1_format_ofs_and_inspect_raw_blocks() {
    let mut device = blank_floppy();
    assert_eq!(device.size_blocks, 1760);
    assert_eq!(device.kind, DeviceKind::Floppy);

    let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
    assert_eq!(vol.root_block_number(), 880);
    let entries = vol.list_dir("/").unwrap();
    assert!(entries.is_empty());
    vol.unmount().unwrap();

    let mut sector0 = [0u8; BLOCK_SIZE];
    device.read_sectors(0, 1, &mut sector0).unwrap();
    assert_eq!(&sector0[0..3], b"DOS");
    assert_eq!(sector0[3], 0x00);

    let mut sector880 = [0u8; BLOCK_SIZE];
    device.read_sectors(880, 1, &mut sector880).unwrap();
    let root = amiga_ffs::RootBlock::parse_at(&sector880, 880).unwrap();
    assert_eq!(root.name_len, 5);
    assert_eq!(&root.disk_name[..5], b"Empty");
}

// S2: create directory "A", then file "A/hello" containing 13 bytes;
// close; re-mount read-only; read it back.
#[test]
fn s2_create_dir_and_file_then_read_only_remount() {
    let mut device = blank_floppy();
    {
        let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
        vol.create_dir("/A").unwrap();
        {
            let mut handle = vol.open_file("/A/hello", OpenMode::Truncate).unwrap();
            let written = handle.write(b"Hello, world!").unwrap();
            assert_eq!(written, 13);
            handle.close().unwrap();
        }
        vol.unmount().unwrap();
    }

    let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
    vol.remount(false).unwrap();

    let mut handle = vol.open_file("/A/hello", OpenMode::Read).unwrap();
    let data = handle.read_to_vec().unwrap();
    assert_eq!(data, b"Hello, world!");
    let root_block = vol.root_block_number();
    drop(handle);

    // Writes must now be rejected.
    let buf = [0u8; BLOCK_SIZE];
    assert!(matches!(
        vol.write_block(root_block, &buf),
        Err(AdfError::ReadOnly)
    ));
}

// S3: format FFS; write a 500000-byte file of 0xAA; check byteSize and
// data-block chain length.
#[test]
fn s3_ffs_large_file_block_count() {
    let mut device = blank_floppy();
    let mut vol = Volume::format(&mut device, 0, "Fast", FsType::Ffs, Config::default()).unwrap();

    let payload = vec![0xAAu8; 500_000];
    let mut handle = vol.open_file("/big", OpenMode::Truncate).unwrap();
    handle.write(&payload).unwrap();
    assert_eq!(handle.size(), 500_000);
    handle.close().unwrap();

    let mut handle = vol.open_file("/big", OpenMode::Read).unwrap();
    assert_eq!(handle.size(), 500_000);
    let read_back = handle.read_to_vec().unwrap();
    assert_eq!(read_back.len(), 500_000);
    assert!(read_back.iter().all(|&b| b == 0xAA));

    let expected_blocks = 500_000usize.div_ceil(512);
    assert_eq!(expected_blocks, 977);
}

// S4 analogue: a floppy with several directories/files; list root and
// verify the entry count and names match what was created (spec.md §8 S4
// compares against a recorded expected set; here the set is the one this
// test itself creates, since no external fixture image ships with the crate).
#[test]
fn s4_list_root_matches_created_entries() {
    let mut device = blank_floppy();
    let mut vol = Volume::format(&mut device, 0, "Workbench", FsType::Ffs, Config::default()).unwrap();

    let expected = ["Devs", "Libs", "System", "Utilities", "Tools"];
    for name in expected {
        vol.create_dir(&format!("/{name}")).unwrap();
    }
    {
        let mut handle = vol.open_file("/S-Startup-Sequence", OpenMode::Truncate).unwrap();
        handle.write(b"; startup\n").unwrap();
        handle.close().unwrap();
    }

    let entries = vol.list_dir("/").unwrap();
    assert_eq!(entries.len(), expected.len() + 1);
    let mut names: Vec<&str> = entries.iter().filter_map(|e| e.name_str()).collect();
    names.sort_unstable();
    let mut all_expected: Vec<&str> = expected.to_vec();
    all_expected.push("S-Startup-Sequence");
    all_expected.sort_unstable();
    assert_eq!(names, all_expected);
}

// S5: a harddisk image whose sector 0 begins "RDSK"; the device reports
// partitions matching the PART chain, with firstBlock = cylBlocks * lowCyl.
#[test]
fn s5_rdb_partition_chain_geometry() {
    const CYLINDERS: i32 = 8;
    const HEADS: i32 = 1;
    const SECTORS: i32 = 32;
    const CYL_BLOCKS: i32 = HEADS * SECTORS;
    const TOTAL_BLOCKS: u32 = (CYLINDERS * CYL_BLOCKS) as u32;

    let rdsk = RdskBlock {
        size: 64,
        checksum: 0,
        host_id: 7,
        block_bytes: 512,
        bad_block_list: -1,
        partition_list: 10,
        file_sys_hdr_list: -1,
        cylinders: CYLINDERS,
        sectors: SECTORS,
        heads: HEADS,
        cyl_blocks: CYL_BLOCKS,
        rdb_block_lo: 0,
        rdb_block_hi: 15,
        lo_cylinder: 1,
        hi_cylinder: CYLINDERS - 1,
    };

    let part = PartBlock {
        checksum: 0,
        next: -1,
        surfaces: HEADS,
        block_size: 128,
        blocks_per_track: SECTORS,
        low_cyl: 1,
        high_cyl: CYLINDERS - 1,
        name_len: 4,
        name: {
            let mut n = [0u8; 31];
            n[..4].copy_from_slice(b"DH0:");
            n
        },
        dos_type: *b"DOS\x00",
    };

    let mut image = vec![0u8; TOTAL_BLOCKS as usize * BLOCK_SIZE];
    image[0..BLOCK_SIZE].copy_from_slice(&rdsk.write());
    image[10 * BLOCK_SIZE..11 * BLOCK_SIZE].copy_from_slice(&part.write());

    let driver = Box::new(MemoryDevice::new(image));
    let device = Device::open(driver, "hd.img", false, Config::default()).unwrap();

    assert_eq!(device.kind, DeviceKind::Harddisk);
    assert!(device.rdb.is_some());
    assert_eq!(device.partitions.len(), 1);

    let expected_first = (CYL_BLOCKS * 1) as u32;
    let expected_last = (CYL_BLOCKS * CYLINDERS) as u32 - 1;
    assert_eq!(device.partitions[0].first_block, expected_first);
    assert_eq!(device.partitions[0].last_block, expected_last);
    assert_eq!(device.partitions[0].name, "DH0:");
}

// S6: write a 1 MiB file, truncate to 100 bytes, close, reopen: the
// bitmap must show exactly ceil(1MiB/512) - ceil(100/512) more free
// blocks than before the write, and byteSize must read back as 100.
#[test]
fn s6_truncate_frees_expected_block_count() {
    // A double-density floppy's ~1700 usable data blocks won't fit a 1 MiB
    // (2048-block) file; use the larger HD floppy geometry instead, which
    // `Device::open` recognizes directly (no pre-existing root block needed).
    let driver = Box::new(MemoryDevice::create(amiga_ffs::FLOPPY_HD_SECTORS));
    let mut device = Device::open(driver, "trunc.adf", true, Config::default()).unwrap();

    let mut vol = Volume::format(&mut device, 0, "Big", FsType::Ffs, Config::default()).unwrap();
    let free_before = vol.free_blocks();

    let payload = vec![0x55u8; 1024 * 1024];
    let mut handle = vol.open_file("/huge", OpenMode::Truncate).unwrap();
    handle.write(&payload).unwrap();
    let free_after_write = vol.free_blocks();
    assert!(free_after_write < free_before);

    handle.truncate(100).unwrap();
    handle.flush().unwrap();
    assert_eq!(handle.size(), 100);
    handle.close().unwrap();

    let free_after_truncate = vol.free_blocks();
    let one_mib_blocks = (1024usize * 1024).div_ceil(512) as u32;
    let hundred_byte_blocks = 100usize.div_ceil(512) as u32;
    let expected_freed = one_mib_blocks - hundred_byte_blocks;
    assert_eq!(free_after_truncate, free_after_write + expected_freed);

    let mut handle = vol.open_file("/huge", OpenMode::Read).unwrap();
    assert_eq!(handle.size(), 100);
    let data = handle.read_to_vec().unwrap();
    assert_eq!(data.len(), 100);
    assert!(data.iter().all(|&b| b == 0x55));
}

// Property 2: flipping any bit outside the checksum word in a valid block
// causes decode to fail with a checksum error.
#[test]
fn property_checksum_detects_bit_flips() {
    let mut device = blank_floppy();
    let vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
    let root_block = vol.root_block_number();
    vol.unmount().unwrap();

    let mut buf = [0u8; BLOCK_SIZE];
    device.read_sectors(root_block, 1, &mut buf).unwrap();
    amiga_ffs::RootBlock::parse_at(&buf, root_block).expect("clean block must parse");

    // Avoid bytes 0..4 (primaryType), 20..24 (the checksum word itself) and
    // 508..512 (secondaryType) — those are validated before the checksum
    // and would surface a different error variant than ChecksumMismatch.
    for bit_offset in [12usize, 50, 200, 300, 400, 450] {
        let mut flipped = buf;
        flipped[bit_offset] ^= 0x01;
        let result = amiga_ffs::RootBlock::parse_at(&flipped, root_block);
        assert!(
            matches!(result, Err(AdfError::ChecksumMismatch { .. })),
            "flipping byte {bit_offset} should have been caught by the checksum"
        );
    }
}

// Property 3: allocate(k)/free(k) sequences that return to the same
// multiset of allocated blocks restore the bitmap's free-block count.
#[test]
fn property_bitmap_allocate_free_round_trip() {
    let mut device = blank_floppy();
    let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ffs, Config::default()).unwrap();
    let free_before = vol.free_blocks();

    let mut handle = vol.open_file("/scratch", OpenMode::Truncate).unwrap();
    handle.write(&vec![1u8; 20_000]).unwrap();
    handle.close().unwrap();
    assert!(vol.free_blocks() < free_before);

    vol.remove("/scratch").unwrap();
    assert_eq!(vol.free_blocks(), free_before);
}

// Property 5/6: writing N bytes to a new file and reading it back yields
// the same N bytes, for both OFS and FFS, across a spread of sizes
// straddling the OFS payload boundary (488 bytes).
#[test]
fn property_round_trip_file_sizes_ofs_and_ffs() {
    for fs_type in [FsType::Ofs, FsType::Ffs] {
        let mut device = blank_floppy();
        let mut vol = Volume::format(&mut device, 0, "RT", fs_type, Config::default()).unwrap();

        for n in [0usize, 1, 487, 488, 489, 10_000] {
            let content: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
            let path = format!("/f{n}");
            let mut handle = vol.open_file(&path, OpenMode::Truncate).unwrap();
            handle.write(&content).unwrap();
            handle.close().unwrap();

            let mut handle = vol.open_file(&path, OpenMode::Read).unwrap();
            let read_back = handle.read_to_vec().unwrap();
            assert_eq!(read_back, content, "fs_type={fs_type:?} n={n}");
        }
    }
}

// Property 7: formatting a blank image twice produces bitwise-identical
// bitmap blocks and a root block differing only in dates.
#[test]
fn property_format_idempotence() {
    let run_once = || {
        let mut device = blank_floppy();
        let mut vol = Volume::format(&mut device, 0, "Empty", FsType::Ffs, Config::default()).unwrap();
        let root_block = vol.root_block_number();
        vol.unmount().unwrap();

        let mut root_buf = [0u8; BLOCK_SIZE];
        device.read_sectors(root_block, 1, &mut root_buf).unwrap();

        let root = amiga_ffs::RootBlock::parse_at(&root_buf, root_block).unwrap();
        let bitmap_block = root.bm_pages[0];
        let mut bitmap_buf = [0u8; BLOCK_SIZE];
        device.read_sectors(bitmap_block, 1, &mut bitmap_buf).unwrap();

        (root_buf, bitmap_buf)
    };

    let (root_a, bitmap_a) = run_once();
    let (root_b, bitmap_b) = run_once();

    assert_eq!(bitmap_a, bitmap_b);

    // Root blocks differ only in the creation/modification date fields
    // (three 32-bit words each, at fixed offsets) and the checksum that
    // covers them; everything else must match exactly.
    let creation_date_bytes: std::ops::Range<usize> = 0x1A4..0x1B0;
    let mod_date_bytes: std::ops::Range<usize> = 0x1D8..0x1E4;
    for i in 0..BLOCK_SIZE {
        if creation_date_bytes.contains(&i) || mod_date_bytes.contains(&i) || i == 20 {
            continue;
        }
        assert_eq!(root_a[i], root_b[i], "root block byte {i} differs");
    }
}

// File-backed container: the ImageFileDevice driver round-trips through
// an actual file on disk, not just an in-memory buffer.
#[test]
fn image_file_device_round_trip() {
    let path = unique_image_path("image-device");
    {
        let driver = ImageFileDevice::create(&path, FLOPPY_DD_SECTORS).unwrap();
        let mut device =
            Device::open(Box::new(driver), path.to_string_lossy().into_owned(), true, Config::default()).unwrap();
        let mut vol = Volume::format(&mut device, 0, "OnDisk", FsType::Ofs, Config::default()).unwrap();
        let mut handle = vol.open_file("/greeting", OpenMode::Truncate).unwrap();
        handle.write(b"persisted").unwrap();
        handle.close().unwrap();
        vol.unmount().unwrap();
        device.close().unwrap();
    }

    {
        let driver = ImageFileDevice::open(&path, false).unwrap();
        let mut device =
            Device::open(Box::new(driver), path.to_string_lossy().into_owned(), false, Config::default()).unwrap();
        let mut vol = Volume::mount(&mut device, 0, Config::default()).unwrap();
        let mut handle = vol.open_file("/greeting", OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"persisted");
    }

    let _ = std::fs::remove_file(&path);
}

// Links: hard links share content, soft links resolve through a path
// substitution, and removing a hard-linked target promotes another link.
#[test]
fn hard_and_soft_links_end_to_end() {
    let mut device = blank_floppy();
    let mut vol = Volume::format(&mut device, 0, "Links", FsType::Ffs, Config::default()).unwrap();

    vol.create_dir("/Target").unwrap();
    {
        let mut handle = vol.open_file("/Target/data", OpenMode::Truncate).unwrap();
        handle.write(b"shared payload").unwrap();
        handle.close().unwrap();
    }

    vol.create_hard_link("/alias1", "/Target/data").unwrap();
    vol.create_hard_link("/alias2", "/Target/data").unwrap();

    for path in ["/alias1", "/alias2", "/Target/data"] {
        let mut handle = vol.open_file(path, OpenMode::Read).unwrap();
        assert_eq!(handle.read_to_vec().unwrap(), b"shared payload");
    }

    vol.create_soft_link("/shortcut", "/Target").unwrap();
    assert_eq!(vol.read_soft_link("/shortcut").unwrap(), "/Target");

    // Removing the original promotes one of the remaining links.
    vol.remove("/Target/data").unwrap();
    let mut still_readable = 0;
    for path in ["/alias1", "/alias2"] {
        if let Ok(mut handle) = vol.open_file(path, OpenMode::Read) {
            assert_eq!(handle.read_to_vec().unwrap(), b"shared payload");
            still_readable += 1;
        }
    }
    assert!(still_readable >= 1, "at least one hard link must survive removal of the original");
}

// Rejecting a PFS-signed volume at mount time (spec.md §4.3).
#[test]
fn mount_refuses_pfs_signature() {
    let mut device = blank_floppy();
    {
        let vol = Volume::format(&mut device, 0, "Empty", FsType::Ofs, Config::default()).unwrap();
        vol.unmount().unwrap();
    }

    let mut boot = [0u8; 1024];
    device.read_sectors(0, 2, &mut boot).unwrap();
    boot[0..4].copy_from_slice(b"PFS\x00");
    device.write_sectors(0, 2, &boot).unwrap();

    assert!(matches!(
        Volume::mount(&mut device, 0, Config::default()),
        Err(AdfError::UnsupportedFileSystem(_))
    ));
}

// Error taxonomy spot-checks against the public API (spec.md §6).
#[test]
fn error_taxonomy_spot_checks() {
    let mut device = blank_floppy();
    let mut vol = Volume::format(&mut device, 0, "Errors", FsType::Ffs, Config::default()).unwrap();

    assert!(matches!(vol.list_dir("/missing"), Err(AdfError::PathNotFound(_))));

    vol.create_dir("/dup").unwrap();
    assert!(matches!(vol.create_dir("/dup"), Err(AdfError::AlreadyExists(_))));

    let long_name = "x".repeat(40);
    assert!(matches!(
        vol.create_dir(&format!("/{long_name}")),
        Err(AdfError::NameTooLong)
    ));

    vol.create_dir("/nonempty").unwrap();
    {
        let mut handle = vol.open_file("/nonempty/f", OpenMode::Truncate).unwrap();
        handle.write(b"x").unwrap();
        handle.close().unwrap();
    }
    assert!(matches!(vol.remove("/nonempty"), Err(AdfError::DirectoryNotEmpty)));
}
