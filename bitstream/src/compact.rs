//! Compact bounded integers.
//!
//! A compact integer is an unsigned value known to lie in `0..max`. It is
//! written least significant bit first, one bit per power of two, and
//! stops as soon as no further bit could keep the value below `max`. The
//! width is therefore `ceil(log2(max))` bits or one fewer, depending on the
//! value.

use crate::error::{BitError, BitResult};
use crate::reader::BitReader;
use crate::writer::BitWriter;

impl BitReader<'_> {
    /// Reads a compact integer bounded by `max` (exclusive).
    ///
    /// `max` of 0 or 1 reads zero bits and yields 0.
    pub fn read_compact(&mut self, max: u64) -> BitResult<u64> {
        let mut value = 0u64;
        let mut mask = 1u64;
        while mask != 0 && lies_below(value, mask, max) {
            if self.read_bit()? {
                value += mask;
            }
            mask <<= 1;
        }
        Ok(value)
    }
}

impl BitWriter {
    /// Writes `value` as a compact integer bounded by `max` (exclusive).
    ///
    /// # Errors
    ///
    /// Returns [`BitError::CompactOutOfRange`] if `value >= max` and `max > 1`,
    /// or if `value != 0` with `max <= 1`.
    pub fn write_compact(&mut self, value: u64, max: u64) -> BitResult<()> {
        if value >= max.max(1) {
            return Err(BitError::CompactOutOfRange { value, max });
        }
        let mut written = 0u64;
        let mut mask = 1u64;
        while mask != 0 && lies_below(written, mask, max) {
            let bit = value & mask != 0;
            if bit {
                written += mask;
            }
            self.write_bool(bit);
            mask <<= 1;
        }
        Ok(())
    }
}

/// Returns the number of bits `value` occupies as a compact integer below `max`.
///
/// # Errors
///
/// Returns [`BitError::CompactOutOfRange`] under the same rule as
/// [`BitWriter::write_compact`].
pub fn compact_len(value: u64, max: u64) -> BitResult<usize> {
    if value >= max.max(1) {
        return Err(BitError::CompactOutOfRange { value, max });
    }
    let mut written = 0u64;
    let mut mask = 1u64;
    let mut len = 0;
    while mask != 0 && lies_below(written, mask, max) {
        written += value & mask;
        mask <<= 1;
        len += 1;
    }
    Ok(len)
}

fn lies_below(value: u64, mask: u64, max: u64) -> bool {
    value.checked_add(mask).is_some_and(|sum| sum < max)
}
