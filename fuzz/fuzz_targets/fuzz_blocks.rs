#![no_main]

use amiga_ffs::{BootBlock, EntryBlock, FileExtBlock, OfsDataBlock, RootBlock};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() >= 1024 {
        let boot_buf: &[u8; 1024] = data[..1024].try_into().unwrap();
        let _ = BootBlock::parse(boot_buf);
    }

    if data.len() >= 512 {
        let block_buf: &[u8; 512] = data[..512].try_into().unwrap();

        let _ = RootBlock::parse(block_buf);
        let _ = EntryBlock::parse(block_buf);
        let _ = FileExtBlock::parse(block_buf);
        let _ = OfsDataBlock::parse(block_buf);
    }
});
