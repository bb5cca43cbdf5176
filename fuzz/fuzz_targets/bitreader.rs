#![no_main]

use bitstream::{BitReader, Bits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let bits = Bits::from_bytes(data);
    let mut reader = BitReader::new(&bits);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 6;
        let arg = usize::from(data[idx] / 6);
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_bit();
            }
            1 => {
                let _ = reader.read_bits(arg % 65);
            }
            2 => {
                let _ = reader.take(arg);
            }
            3 => {
                let _ = reader.peek_bits(arg % 65);
            }
            4 => {
                let _ = reader.read_compact(u64::from(data[idx.saturating_sub(1)]) + 1);
            }
            _ => {
                let start = reader.position();
                let _ = reader.skip(arg);
                assert_eq!(
                    reader.consumed_since(start).len() + reader.bits_remaining(),
                    bits.len() - start
                );
            }
        }
    }
});
