//! Owned little-endian bit sequences.

use std::fmt;
use std::ops::{Add, AddAssign, Range};
use std::str::FromStr;

use crate::error::{BitError, BitResult};

/// An owned, growable sequence of bits.
///
/// Bits are stored least-significant first within each byte, so the first bit
/// of the sequence is bit 0 of byte 0. Storage bits beyond `len` are always
/// zero, which keeps the derived equality, ordering and hashing exact.
///
/// The textual form (`Display`/`FromStr`) lists bits in sequence order, e.g.
/// the 4-bit little-endian encoding of 1 is `"1000"`.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bits {
    bytes: Vec<u8>,
    len: usize,
}

impl Bits {
    /// Creates an empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty sequence with room for `bits` bits.
    #[must_use]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    /// Creates a sequence holding every bit of `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            len: bytes.len() * 8,
        }
    }

    /// Creates a sequence holding the low `bits` bits of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64` and
    /// [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn from_uint(value: u64, bits: usize) -> BitResult<Self> {
        let mut out = Self::with_capacity(bits);
        out.push_uint(value, bits)?;
        Ok(out)
    }

    /// Returns the number of bits in the sequence.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the sequence holds no bits.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some((self.bytes[index / 8] >> (index % 8)) & 1 == 1)
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: bool) {
        let bit_idx = self.len % 8;
        if bit_idx == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << bit_idx;
            }
        }
        self.len += 1;
    }

    /// Appends the low `bits` bits of `value`, least significant first.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn push_uint(&mut self, value: u64, bits: usize) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::ValueOutOfRange { value, bits });
        }
        for i in 0..bits {
            self.push((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Appends every bit of `other`.
    pub fn extend_from_bits(&mut self, other: &Self) {
        if self.len % 8 == 0 {
            // Byte-aligned: the tail invariant of `other` carries over.
            self.bytes.truncate(self.len / 8);
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
            return;
        }
        for bit in other {
            self.push(bit);
        }
    }

    /// Returns a copy of the bits in `range`.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidRange`] if the range is reversed or extends
    /// past the end of the sequence.
    pub fn slice(&self, range: Range<usize>) -> BitResult<Self> {
        if range.start > range.end || range.end > self.len {
            return Err(BitError::InvalidRange {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        let mut out = Self::with_capacity(range.len());
        if range.start % 8 == 0 {
            let first = range.start / 8;
            let last = range.end.div_ceil(8);
            out.bytes.extend_from_slice(&self.bytes[first..last]);
            out.len = range.len();
            out.clear_tail();
            return Ok(out);
        }
        for index in range {
            out.push((self.bytes[index / 8] >> (index % 8)) & 1 == 1);
        }
        Ok(out)
    }

    /// Returns `true` if the sequence begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.len <= self.len && prefix.iter().zip(self.iter()).all(|(a, b)| a == b)
    }

    /// Interprets the first (up to) 64 bits as a little-endian unsigned integer.
    #[must_use]
    pub fn to_uint(&self) -> u64 {
        self.iter()
            .take(64)
            .enumerate()
            .fold(0u64, |acc, (i, bit)| acc | (u64::from(bit) << i))
    }

    /// Returns the backing bytes. The last byte is zero-padded above `len`.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the sequence and returns the zero-padded backing bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Iterates over the bits in sequence order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            bits: self,
            front: 0,
        }
    }

    fn clear_tail(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
    }
}

/// Iterator over the bits of a [`Bits`] sequence.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    bits: &'a Bits,
    front: usize,
}

impl Iterator for Iter<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let bit = self.bits.get(self.front)?;
        self.front += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bits.len - self.front;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Bits {
    type Item = bool;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl Extend<bool> for Bits {
    fn extend<I: IntoIterator<Item = bool>>(&mut self, iter: I) {
        for bit in iter {
            self.push(bit);
        }
    }
}

impl Add<&Bits> for Bits {
    type Output = Self;

    fn add(mut self, rhs: &Self) -> Self {
        self.extend_from_bits(rhs);
        self
    }
}

impl Add for Bits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self + &rhs
    }
}

impl AddAssign<&Bits> for Bits {
    fn add_assign(&mut self, rhs: &Self) {
        self.extend_from_bits(rhs);
    }
}

impl AddAssign for Bits {
    fn add_assign(&mut self, rhs: Self) {
        self.extend_from_bits(&rhs);
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits(\"{self}\")")
    }
}

impl FromStr for Bits {
    type Err = BitError;

    /// Parses a bit string such as `"0110_1"`. Underscores and whitespace are
    /// accepted as separators.
    fn from_str(s: &str) -> BitResult<Self> {
        let mut out = Self::with_capacity(s.len());
        for (position, ch) in s.chars().enumerate() {
            match ch {
                '0' => out.push(false),
                '1' => out.push(true),
                '_' => {}
                c if c.is_whitespace() => {}
                found => return Err(BitError::InvalidDigit { found, position }),
            }
        }
        Ok(out)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Bits;
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for Bits {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    struct BitsVisitor;

    impl Visitor<'_> for BitsVisitor {
        type Value = Bits;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string of '0' and '1' characters")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Bits, E> {
            v.parse().map_err(E::custom)
        }
    }

    impl<'de> Deserialize<'de> for Bits {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_str(BitsVisitor)
        }
    }
}
