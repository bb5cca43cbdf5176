//! Property definitions and the closed set of value shapes.

use std::collections::BTreeMap;

use bitstream::Bits;

/// A named property of a class, a struct field, or an RPC parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyDef {
    pub name: String,
    /// Wire shape of the value. `None` means the property is known by name
    /// but cannot be decoded.
    #[cfg_attr(feature = "serde", serde(rename = "type", default))]
    pub ty: Option<PropertyType>,
}

impl PropertyDef {
    /// Creates a decodable property.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }

    /// Creates a property whose value shape is unknown.
    #[must_use]
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }
}

/// One case of a [`PropertyType::Tagged`] value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCase {
    pub tag: u16,
    pub value: PropertyType,
}

/// The wire shape of a property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum PropertyType {
    /// 32-bit little-endian unsigned integer.
    Int,

    /// 32-bit IEEE-754 float.
    Float,

    /// Single bit.
    Bool,

    /// Zero bits; presence alone means `true`.
    Flag,

    /// Opaque run of `size` bits.
    FixedBits { size: usize },

    /// 32-bit length, then that many Latin-1 bytes ending in NUL.
    Str,

    /// `size` bits looked up in a label table.
    MultipleChoice {
        size: usize,
        values: BTreeMap<Bits, String>,
    },

    /// Fields in declared order, back to back.
    Struct { fields: Vec<PropertyDef> },

    /// RPC parameters, each preceded by a presence bit.
    ParamList { params: Vec<PropertyDef> },

    /// 8-bit element index, then one element.
    Array { element: Box<PropertyType> },

    /// 16-bit count, then that many elements.
    List { element: Box<PropertyType> },

    /// 16-bit tag selecting the value's shape; `default` covers unlisted tags.
    Tagged {
        cases: Vec<TagCase>,
        default: Box<PropertyType>,
    },

    /// Compressed vector.
    #[cfg_attr(feature = "serde", serde(rename = "fvector"))]
    FVector,

    /// Compressed rotator.
    #[cfg_attr(feature = "serde", serde(rename = "frotator"))]
    FRotator,

    /// The innermost enclosing [`PropertyType::Tagged`] type, for recursive records.
    Recurse,
}

impl PropertyType {
    /// Shorthand for [`PropertyType::FixedBits`].
    #[must_use]
    pub const fn bits(size: usize) -> Self {
        Self::FixedBits { size }
    }

    /// Shorthand for [`PropertyType::Array`].
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Shorthand for [`PropertyType::List`].
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    /// Shorthand for [`PropertyType::Struct`].
    #[must_use]
    pub fn structure(fields: impl IntoIterator<Item = PropertyDef>) -> Self {
        Self::Struct {
            fields: fields.into_iter().collect(),
        }
    }

    /// Shorthand for [`PropertyType::ParamList`].
    #[must_use]
    pub fn params(params: impl IntoIterator<Item = PropertyDef>) -> Self {
        Self::ParamList {
            params: params.into_iter().collect(),
        }
    }

    /// The field-record shape used by game-mode replication info: lists of
    /// lists of nested records under two tags, 64 opaque bits, a float, or an
    /// int otherwise.
    #[must_use]
    pub fn field_record() -> Self {
        let nested = Self::list(Self::list(Self::Recurse));
        Self::Tagged {
            cases: vec![
                TagCase {
                    tag: 0x0170,
                    value: nested.clone(),
                },
                TagCase {
                    tag: 0x016F,
                    value: nested,
                },
                TagCase {
                    tag: 0x046C,
                    value: Self::bits(64),
                },
                TagCase {
                    tag: 0x049B,
                    value: Self::Float,
                },
            ],
            default: Box::new(Self::Int),
        }
    }

    /// Returns the shape selected by `tag`, if this is a tagged type.
    #[must_use]
    pub fn tag_case(&self, tag: u16) -> Option<&Self> {
        match self {
            Self::Tagged { cases, default } => Some(
                cases
                    .iter()
                    .find(|case| case.tag == tag)
                    .map_or(default.as_ref(), |case| &case.value),
            ),
            _ => None,
        }
    }
}
