#![no_main]

use amiga_ffs::{bitmap_sum, boot_sum, normal_sum_slice};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() >= 512 {
        let block_buf: &[u8; 512] = data[..512].try_into().unwrap();

        for offset in [0, 4, 8, 12, 16, 20, 24, 508].iter() {
            let _ = normal_sum_slice(block_buf, *offset);
        }

        let _ = bitmap_sum(block_buf);
    }

    if data.len() >= 1024 {
        let boot_buf: &[u8; 1024] = data[..1024].try_into().unwrap();
        let _ = boot_sum(boot_buf);
    }
});
