//! Bit-level cursor with bounded operations.

use crate::bits::Bits;
use crate::error::{BitError, BitResult};

/// A cursor over a borrowed [`Bits`] sequence.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input. Everything before
/// [`position`](Self::position) has been consumed; [`remainder`](Self::remainder)
/// is exactly what is left, so consumed + remainder always equals the input.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a Bits,
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit of `bits`.
    #[must_use]
    pub const fn new(bits: &'a Bits) -> Self {
        Self { bits, pos: 0 }
    }

    /// Returns the number of bits remaining to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the whole underlying sequence.
    #[must_use]
    pub const fn source(&self) -> &'a Bits {
        self.bits
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        let bit = self.bits.get(self.pos).ok_or(BitError::InsufficientBits {
            requested: 1,
            available: 0,
        })?;
        self.pos += 1;
        Ok(bit)
    }

    /// Reads up to 64 bits as a little-endian unsigned integer.
    ///
    /// The first bit read is the least significant bit of the result.
    pub fn read_bits(&mut self, bits: usize) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for i in 0..bits {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Consumes `n` bits and returns them as an owned sequence.
    pub fn take(&mut self, n: usize) -> BitResult<Bits> {
        let out = self.peek(n)?;
        self.pos += n;
        Ok(out)
    }

    /// Returns the next `n` bits without consuming them.
    pub fn peek(&self, n: usize) -> BitResult<Bits> {
        self.ensure_bits(n)?;
        self.bits.slice(self.pos..self.pos + n)
    }

    /// Returns the next `n` bits as an integer without consuming them.
    pub fn peek_bits(&self, n: usize) -> BitResult<u64> {
        self.clone().read_bits(n)
    }

    /// Skips `n` bits.
    pub fn skip(&mut self, n: usize) -> BitResult<()> {
        self.ensure_bits(n)?;
        self.pos += n;
        Ok(())
    }

    /// Returns a copy of every bit not yet consumed.
    #[must_use]
    pub fn remainder(&self) -> Bits {
        self.bits
            .slice(self.pos..self.bits.len())
            .unwrap_or_default()
    }

    /// Returns the bits consumed since `start` (a previous [`position`](Self::position)).
    #[must_use]
    pub fn consumed_since(&self, start: usize) -> Bits {
        self.bits.slice(start..self.pos).unwrap_or_default()
    }

    /// Returns the bits from `start` to the end of the input, consumed or not.
    #[must_use]
    pub fn remainder_from(&self, start: usize) -> Bits {
        self.bits
            .slice(start.min(self.bits.len())..self.bits.len())
            .unwrap_or_default()
    }

    /// Consumes and returns everything that is left.
    pub fn take_rest(&mut self) -> Bits {
        let rest = self.remainder();
        self.pos = self.bits.len();
        rest
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::InsufficientBits {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Bits {
        s.parse().unwrap()
    }

    #[test]
    fn empty_reader() {
        let empty = Bits::new();
        let reader = BitReader::new(&empty);
        assert!(reader.is_empty());
        assert_eq!(reader.bits_remaining(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn read_from_empty_fails() {
        let empty = Bits::new();
        let mut reader = BitReader::new(&empty);
        assert!(matches!(
            reader.read_bit(),
            Err(BitError::InsufficientBits { .. })
        ));
    }

    #[test]
    fn read_bits_is_little_endian() {
        let input = bits("1101");
        let mut reader = BitReader::new(&input);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1011);
    }

    #[test]
    fn read_bits_across_bytes() {
        let input = Bits::from_bytes(&[0x34, 0x12]);
        let mut reader = BitReader::new(&input);
        assert_eq!(reader.read_bits(12).unwrap(), 0x234);
        assert_eq!(reader.bits_remaining(), 4);
        assert_eq!(reader.read_bits(4).unwrap(), 0x1);
    }

    #[test]
    fn take_fails_without_consuming() {
        let input = bits("101");
        let mut reader = BitReader::new(&input);
        let err = reader.take(4).unwrap_err();
        assert_eq!(
            err,
            BitError::InsufficientBits {
                requested: 4,
                available: 3
            }
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn peek_does_not_consume() {
        let input = bits("0110");
        let mut reader = BitReader::new(&input);
        assert_eq!(reader.peek(2).unwrap(), bits("01"));
        assert_eq!(reader.peek_bits(2).unwrap(), 0b10);
        assert_eq!(reader.take(3).unwrap(), bits("011"));
        assert_eq!(reader.remainder(), bits("0"));
    }

    #[test]
    fn consumed_plus_remainder_is_input() {
        let input = bits("1100101");
        let mut reader = BitReader::new(&input);
        reader.read_bits(3).unwrap();
        reader.skip(1).unwrap();
        let joined = reader.consumed_since(0) + reader.remainder();
        assert_eq!(joined, input);
        assert_eq!(reader.remainder_from(2), bits("00101"));
    }

    #[test]
    fn take_rest_exhausts() {
        let input = bits("10011");
        let mut reader = BitReader::new(&input);
        reader.read_bit().unwrap();
        assert_eq!(reader.take_rest(), bits("0011"));
        assert!(reader.is_empty());
        assert_eq!(reader.take_rest(), Bits::new());
    }

    #[test]
    fn read_too_many_bits_at_once() {
        let input = Bits::from_bytes(&[0; 9]);
        let mut reader = BitReader::new(&input);
        assert!(matches!(
            reader.read_bits(65),
            Err(BitError::InvalidBitCount { bits: 65, .. })
        ));
    }
}
