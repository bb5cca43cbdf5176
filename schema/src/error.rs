//! Schema validation errors.

use std::fmt;

use bitstream::Bits;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur when building or validating a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A property key is neither `id_size` nor `id_size - 1` bits wide.
    InvalidKeyWidth {
        class: String,
        key: Bits,
        id_size: usize,
    },

    /// A short key is a prefix of a full-width key, so the full key can never resolve.
    ShadowedKey {
        class: String,
        short: Bits,
        full: Bits,
    },

    /// A multiple-choice key does not match the declared choice width.
    InvalidChoiceWidth {
        property: String,
        key: Bits,
        size: usize,
    },

    /// A member id is above the class's highest member id.
    MemberOutOfRange { member_id: u32, max_member_id: u32 },

    /// Two tag cases of a tagged property use the same tag.
    DuplicateTag { property: String, tag: u16 },

    /// `id_size` override of zero.
    InvalidIdSize { class: String },

    /// A `recurse` type appears outside any tagged type.
    UnboundRecursion { property: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyWidth {
                class,
                key,
                id_size,
            } => write!(
                f,
                "class {class}: key {key} is {} bits, expected {id_size} or {}",
                key.len(),
                id_size.saturating_sub(1)
            ),
            Self::ShadowedKey { class, short, full } => {
                write!(f, "class {class}: short key {short} shadows key {full}")
            }
            Self::InvalidChoiceWidth {
                property,
                key,
                size,
            } => write!(
                f,
                "property {property}: choice key {key} is not {size} bits wide"
            ),
            Self::MemberOutOfRange {
                member_id,
                max_member_id,
            } => write!(
                f,
                "member id {member_id} exceeds the highest member id {max_member_id}"
            ),
            Self::DuplicateTag { property, tag } => {
                write!(f, "property {property}: tag {tag:#06x} appears twice")
            }
            Self::InvalidIdSize { class } => write!(f, "class {class}: id size must be non-zero"),
            Self::UnboundRecursion { property } => {
                write!(f, "property {property}: recursive type outside a tagged type")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
