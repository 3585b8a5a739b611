#![no_main]

use amiga_ffs::config::Config;
use amiga_ffs::device::{Device, MemoryDevice};
use amiga_ffs::path::PathApi;
use amiga_ffs::types::EntryType;
use amiga_ffs::volume::{OpenMode, Volume};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Need at least 2 blocks (boot) + 1 block (root) to have a shot at mounting.
    if data.len() < 1536 {
        return;
    }

    let num_blocks = (data.len() / 512) as u32;
    let mut buf = data[..(num_blocks as usize) * 512].to_vec();
    buf.resize((num_blocks as usize) * 512, 0);

    let driver = MemoryDevice::new(buf);
    let mut device = match Device::open(
        std::boxed::Box::new(driver),
        "fuzz",
        false,
        Config::default(),
    ) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut volume = match Volume::mount(&mut device, 0, Config::default()) {
        Ok(v) => v,
        Err(_) => return,
    };

    let entries = match volume.list_dir("/") {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries {
        let _ = entry.name_str();

        let path = std::format!("/{}", entry.name_str().unwrap_or(""));
        match entry.entry_type {
            EntryType::File | EntryType::HardLinkFile => {
                if let Ok(mut handle) = volume.open_file(&path, OpenMode::Read) {
                    let mut read_buf = [0u8; 1024];
                    let _ = handle.read(&mut read_buf);
                }
            }
            EntryType::Dir | EntryType::HardLinkDir => {
                let _ = volume.list_dir(&path);
            }
            EntryType::SoftLink => {
                let _ = volume.read_soft_link(&path);
            }
            EntryType::Root => {}
        }
    }
});
