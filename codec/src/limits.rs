//! Limits for value decoding.

/// Bounds enforced while decoding property values.
///
/// The wire format lets a few length fields claim far more data than a packet
/// can hold; these limits turn such claims into errors before any work is done.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DecodeLimits {
    /// Maximum declared size of a string, terminator included.
    pub max_string_bytes: usize,
    /// Maximum element count of a length-prefixed list.
    pub max_list_len: usize,
    /// Maximum nesting of composite values.
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_string_bytes: 64 * 1024,
            max_list_len: 4096,
            max_depth: 64,
        }
    }
}

impl DecodeLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_string_bytes: 256,
            max_list_len: 64,
            max_depth: 8,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_string_bytes: usize::MAX,
            max_list_len: usize::MAX,
            max_depth: usize::MAX,
        }
    }
}
