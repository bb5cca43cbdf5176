//! Error types for bitstream operations.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Errors that can occur during bit-level encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// Attempted to read more bits than remain in the sequence.
    InsufficientBits {
        /// Number of bits requested.
        requested: usize,
        /// Number of bits available.
        available: usize,
    },

    /// Invalid bit count for the operation.
    InvalidBitCount {
        /// The invalid bit count provided.
        bits: usize,
        /// Maximum allowed bits for this operation.
        max_bits: usize,
    },

    /// Value exceeds the range representable by the specified number of bits.
    ValueOutOfRange {
        /// The value that was out of range.
        value: u64,
        /// Number of bits available.
        bits: usize,
    },

    /// Value is not below the bound of a compact integer.
    CompactOutOfRange {
        /// The value that was out of range.
        value: u64,
        /// Exclusive upper bound.
        max: u64,
    },

    /// A slice range does not lie within the sequence.
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },

    /// A textual bit string contained something other than `0`, `1` or a separator.
    InvalidDigit {
        /// The offending character.
        found: char,
        /// Character offset in the input.
        position: usize,
    },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBits {
                requested,
                available,
            } => {
                write!(
                    f,
                    "attempted to read {requested} bits but only {available} bits available"
                )
            }
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "invalid bit count {bits}, maximum allowed is {max_bits}")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "value {value} cannot be represented in {bits} bits")
            }
            Self::CompactOutOfRange { value, max } => {
                write!(f, "compact value {value} is not below its bound {max}")
            }
            Self::InvalidRange { start, end, len } => {
                write!(f, "bit range {start}..{end} is outside a sequence of {len} bits")
            }
            Self::InvalidDigit { found, position } => {
                write!(f, "invalid bit digit {found:?} at position {position}")
            }
        }
    }
}

impl std::error::Error for BitError {}
