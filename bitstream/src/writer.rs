//! Bit-level writer that accumulates an owned [`Bits`] sequence.

use crate::bits::Bits;
use crate::error::BitResult;

/// A bit-level writer for encoding packed binary data.
///
/// Writes are appended in wire order. Call [`finish`](Self::finish) to get the
/// accumulated sequence; no byte alignment is applied.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bits: Bits,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with room for `bits` bits.
    #[must_use]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bits: Bits::with_capacity(bits),
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bits.len()
    }

    /// Writes a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.bits.push(value);
    }

    /// Writes the low `bits` bits of `value`, least significant first.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`](crate::BitError::InvalidBitCount) if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`](crate::BitError::ValueOutOfRange) if `value`
    /// doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: usize) -> BitResult<()> {
        self.bits.push_uint(value, bits)
    }

    /// Appends an existing bit sequence verbatim.
    pub fn write_slice(&mut self, bits: &Bits) {
        self.bits.extend_from_bits(bits);
    }

    /// Returns everything written so far.
    #[must_use]
    pub const fn as_bits(&self) -> &Bits {
        &self.bits
    }

    /// Finishes writing and returns the accumulated bits.
    #[must_use]
    pub fn finish(self) -> Bits {
        self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitError;

    #[test]
    fn empty_writer() {
        let writer = BitWriter::new();
        assert_eq!(writer.bits_written(), 0);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn write_single_bit_true() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        assert_eq!(writer.bits_written(), 1);
        let bits = writer.finish();
        assert_eq!(bits.as_bytes(), &[0b0000_0001]);
    }

    #[test]
    fn write_bits_lsb_first() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1010, 4).unwrap();
        assert_eq!(writer.as_bits().to_string(), "0101");
    }

    #[test]
    fn write_bits_zero() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 0).unwrap();
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn write_bits_multiple_bytes() {
        let mut writer = BitWriter::new();
        writer.write_bits(0xABCD, 16).unwrap();
        assert_eq!(writer.finish().into_bytes(), vec![0xCD, 0xAB]);
    }

    #[test]
    fn write_bits_across_byte_boundary() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1111, 4).unwrap();
        writer.write_bits(0b1010_1010, 8).unwrap();
        assert_eq!(writer.finish().into_bytes(), vec![0b1010_1111, 0b0000_1010]);
    }

    #[test]
    fn write_bits_invalid_count() {
        let mut writer = BitWriter::new();
        assert!(matches!(
            writer.write_bits(0, 65),
            Err(BitError::InvalidBitCount {
                bits: 65,
                max_bits: 64
            })
        ));
    }

    #[test]
    fn write_bits_value_out_of_range() {
        let mut writer = BitWriter::new();
        assert!(matches!(
            writer.write_bits(256, 8),
            Err(BitError::ValueOutOfRange {
                value: 256,
                bits: 8
            })
        ));
        assert_eq!(writer.bits_written(), 0);
    }

    #[test]
    fn write_bits_64_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(u64::MAX, 64).unwrap();
        assert_eq!(writer.finish().into_bytes(), vec![0xFF; 8]);
    }

    #[test]
    fn write_slice_appends_verbatim() {
        let mut writer = BitWriter::new();
        writer.write_bool(true);
        writer.write_slice(&"0011".parse().unwrap());
        assert_eq!(writer.finish().to_string(), "10011");
    }
}
