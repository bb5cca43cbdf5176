//! Error types for decoding and encoding.

use std::fmt;

use bitstream::{BitError, BitReader, BitResult, Bits};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding or encoding a replication stream.
///
/// Decode errors carry the bits that were left when decoding stopped, so a
/// caller can show exactly where the stream stopped making sense.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Bit-level failure, usually running out of input.
    Bitstream {
        error: BitError,
        /// Unconsumed input at the failure; empty for encode failures.
        remaining: Bits,
    },

    /// The stream violates the framing or value format.
    Malformed {
        reason: MalformedReason,
        remaining: Bits,
    },

    /// A property identifier did not resolve to a decodable property.
    UnknownProperty {
        class: String,
        key: Bits,
        /// Name from the schema when the key resolved but has no type.
        name: Option<String>,
        remaining: Bits,
    },

    /// Re-encoding a decoded node did not reproduce the bits it was decoded from.
    RoundTrip {
        layer: &'static str,
        consumed: Bits,
        encoded: Bits,
    },

    /// A decoded tree cannot be written back to the wire.
    Unencodable { reason: EncodeReason },

    /// Protocol configuration is unusable.
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// An error raised inside a channel or property.
    Context {
        context: ErrorContext,
        source: Box<CodecError>,
    },
}

/// Where an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    Channel(u16),
    Property { class: String, name: String },
}

/// Specific framing or format violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// A string's declared size does not match its NUL-terminated content.
    StringSize { declared: u32, found: usize },
    /// A string declares more bytes than the decode limit.
    StringTooLong { declared: u32, max: usize },
    /// A list declares more elements than the decode limit.
    ListTooLong { len: usize, max: usize },
    /// Values are nested deeper than the decode limit.
    TooDeep { max: usize },
    /// A recursive type appeared outside any tagged type.
    UnboundRecursion,
    /// A struct field or RPC parameter has no type.
    UntypedField { name: String },
    /// The packet-data selector re-read as `11`.
    InvalidSelector,
    /// The marker after a `10` selector was not `11`.
    InvalidMarker { found: Bits },
    /// The packet ended before its terminating bit.
    MissingTerminator,
    /// Re-encoding the packet body produced a different length than was consumed.
    LengthMismatch { parsed: usize, consumed: usize },
    /// The bits after the terminator are not exactly the byte padding.
    TrailingBits { expected: usize, found: usize },
}

/// Why a decoded tree cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeReason {
    /// A string contains a character outside Latin-1.
    NonLatin1 { found: char },
    /// A vector component does not fit its declared precision.
    VectorComponent { value: i32, bits: u8 },
    /// A rotator component is outside the 16-bit rotation range.
    RotatorComponent { value: i32 },
    /// A list is longer than its 16-bit length prefix allows.
    ListTooLong { len: usize },
    /// A bootstrap string is longer than its 16-bit length prefix allows.
    StringTooLong { len: usize },
}

impl CodecError {
    /// Returns the unconsumed input at the point of failure, if recorded.
    #[must_use]
    pub fn remaining(&self) -> Option<&Bits> {
        match self {
            Self::Bitstream { remaining, .. }
            | Self::Malformed { remaining, .. }
            | Self::UnknownProperty { remaining, .. } => Some(remaining),
            Self::Context { source, .. } => source.remaining(),
            Self::RoundTrip { .. } | Self::Unencodable { .. } | Self::InvalidConfig { .. } => None,
        }
    }

    /// Returns `true` for round-trip verification failures, which are never recovered.
    #[must_use]
    pub fn is_round_trip(&self) -> bool {
        match self {
            Self::RoundTrip { .. } => true,
            Self::Context { source, .. } => source.is_round_trip(),
            _ => false,
        }
    }

    /// Returns the innermost error, skipping context layers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn malformed(reason: MalformedReason, reader: &BitReader<'_>) -> Self {
        Self::Malformed {
            reason,
            remaining: reader.remainder(),
        }
    }

    pub(crate) fn within(self, context: ErrorContext) -> Self {
        Self::Context {
            context,
            source: Box::new(self),
        }
    }
}

/// Attaches the reader's remainder to bit-level failures.
pub(crate) trait AtReader<T> {
    fn at(self, reader: &BitReader<'_>) -> CodecResult<T>;
}

impl<T> AtReader<T> for BitResult<T> {
    fn at(self, reader: &BitReader<'_>) -> CodecResult<T> {
        self.map_err(|error| CodecError::Bitstream {
            error,
            remaining: reader.remainder(),
        })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream { error, .. } => write!(f, "bitstream error: {error}"),
            Self::Malformed { reason, .. } => write!(f, "malformed stream: {reason}"),
            Self::UnknownProperty {
                class, key, name, ..
            } => match name {
                Some(name) => write!(f, "property {name} ({key}) of class {class} has no type"),
                None => write!(f, "unknown property {key} for class {class}"),
            },
            Self::RoundTrip {
                layer,
                consumed,
                encoded,
            } => write!(
                f,
                "{layer} re-encoded differently:\nin : {consumed}\nout: {encoded}"
            ),
            Self::Unencodable { reason } => write!(f, "cannot encode: {reason}"),
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid protocol config {field}: {reason}")
            }
            Self::Context { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "channel {channel}"),
            Self::Property { class, name } => write!(f, "{class}.{name}"),
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringSize { declared, found } => write!(
                f,
                "string size ({found}) was not equal to expected size ({declared})"
            ),
            Self::StringTooLong { declared, max } => {
                write!(f, "string declares {declared} bytes, limit is {max}")
            }
            Self::ListTooLong { len, max } => {
                write!(f, "list declares {len} elements, limit is {max}")
            }
            Self::TooDeep { max } => write!(f, "values nested deeper than {max}"),
            Self::UnboundRecursion => write!(f, "recursive type outside a tagged type"),
            Self::UntypedField { name } => write!(f, "field {name} has no type"),
            Self::InvalidSelector => write!(f, "unexpected packet-data selector 11"),
            Self::InvalidMarker { found } => {
                write!(f, "unexpected marker {found} after selector 10")
            }
            Self::MissingTerminator => write!(f, "packet ended before its terminating bit"),
            Self::LengthMismatch { parsed, consumed } => write!(
                f,
                "parsed bits ({parsed}) do not match consumed bits ({consumed})"
            ),
            Self::TrailingBits { expected, found } => write!(
                f,
                "left over bits at the end of the packet: expected {expected} padding bits, found {found}"
            ),
        }
    }
}

impl fmt::Display for EncodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonLatin1 { found } => write!(f, "character {found:?} is not Latin-1"),
            Self::VectorComponent { value, bits } => {
                write!(f, "vector component {value} does not fit precision {bits}")
            }
            Self::RotatorComponent { value } => {
                write!(f, "rotator component {value} is outside the 16-bit range")
            }
            Self::ListTooLong { len } => write!(f, "list of {len} elements exceeds 65535"),
            Self::StringTooLong { len } => write!(f, "string of {len} bytes exceeds 65535"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream { error, .. } => Some(error),
            Self::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<BitError> for CodecError {
    fn from(error: BitError) -> Self {
        Self::Bitstream {
            error,
            remaining: Bits::new(),
        }
    }
}

impl From<EncodeReason> for CodecError {
    fn from(reason: EncodeReason) -> Self {
        Self::Unencodable { reason }
    }
}
