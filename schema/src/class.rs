//! Class schemas and validation.

use std::collections::BTreeMap;

use bitstream::{BitWriter, Bits};

use crate::error::{SchemaError, SchemaResult};
use crate::property::{PropertyDef, PropertyType};

/// Key width used when a class declares no properties.
pub const DEFAULT_ID_SIZE: usize = 6;

/// The replicated properties of one class, keyed by their wire identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassSchema {
    pub name: String,
    /// Pinned identifier width; derived from `props` when absent.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub id_size: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub props: BTreeMap<Bits, PropertyDef>,
}

impl ClassSchema {
    /// Creates a class with no properties.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_size: None,
            props: BTreeMap::new(),
        }
    }

    /// Creates a class schema builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ClassSchemaBuilder {
        ClassSchemaBuilder {
            class: Self::new(name),
        }
    }

    /// Width in bits of a full property identifier.
    ///
    /// The pinned override wins; otherwise the widest key, or
    /// [`DEFAULT_ID_SIZE`] for a class without properties.
    ///
    /// The widest key rather than the first: compact member keys are one bit
    /// shorter below the split point, and the short-then-extended lookup only
    /// reaches every key when the full width is the longer one.
    #[must_use]
    pub fn id_size(&self) -> usize {
        self.id_size.unwrap_or_else(|| {
            self.props
                .keys()
                .map(Bits::len)
                .max()
                .unwrap_or(DEFAULT_ID_SIZE)
        })
    }

    /// Looks up a property by its wire key.
    #[must_use]
    pub fn prop(&self, key: &Bits) -> Option<&PropertyDef> {
        self.props.get(key)
    }

    /// Validates schema invariants.
    ///
    /// Keys must be `id_size` or `id_size - 1` bits wide and no short key may
    /// be a prefix of a full key. Nested multiple-choice tables must match
    /// their declared width, and tags of a tagged type must be unique.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.id_size == Some(0) {
            return Err(SchemaError::InvalidIdSize {
                class: self.name.clone(),
            });
        }
        let id_size = self.id_size();
        for (key, def) in &self.props {
            if key.len() != id_size && key.len() + 1 != id_size {
                return Err(SchemaError::InvalidKeyWidth {
                    class: self.name.clone(),
                    key: key.clone(),
                    id_size,
                });
            }
            if key.len() == id_size {
                let short = key.slice(0..id_size - 1).unwrap_or_default();
                if self.props.contains_key(&short) {
                    return Err(SchemaError::ShadowedKey {
                        class: self.name.clone(),
                        short,
                        full: key.clone(),
                    });
                }
            }
            if let Some(ty) = &def.ty {
                validate_type(&def.name, ty, false)?;
            }
        }
        Ok(())
    }
}

/// Builder for [`ClassSchema`].
#[derive(Debug)]
pub struct ClassSchemaBuilder {
    class: ClassSchema,
}

impl ClassSchemaBuilder {
    /// Pins the identifier width.
    #[must_use]
    pub const fn id_size(mut self, bits: usize) -> Self {
        self.class.id_size = Some(bits);
        self
    }

    /// Adds a property under an explicit wire key.
    #[must_use]
    pub fn prop(mut self, key: Bits, def: PropertyDef) -> Self {
        self.class.props.insert(key, def);
        self
    }

    /// Adds a property under the key derived from its replication member id.
    pub fn member(
        self,
        member_id: u32,
        max_member_id: u32,
        def: PropertyDef,
    ) -> SchemaResult<Self> {
        let key = member_key(member_id, max_member_id)?;
        Ok(self.prop(key, def))
    }

    /// Builds the class after validation.
    pub fn build(self) -> SchemaResult<ClassSchema> {
        self.class.validate()?;
        Ok(self.class)
    }
}

/// Derives the wire key of a class member from its replication index.
///
/// Members are written as compact integers bounded by the member count, so
/// the key is `ceil(log2(max_member_id + 1))` bits or one fewer.
pub fn member_key(member_id: u32, max_member_id: u32) -> SchemaResult<Bits> {
    if member_id > max_member_id {
        return Err(SchemaError::MemberOutOfRange {
            member_id,
            max_member_id,
        });
    }
    let mut writer = BitWriter::new();
    writer
        .write_compact(u64::from(member_id), u64::from(max_member_id) + 1)
        .map_err(|_| SchemaError::MemberOutOfRange {
            member_id,
            max_member_id,
        })?;
    Ok(writer.finish())
}

fn validate_type(property: &str, ty: &PropertyType, in_tagged: bool) -> SchemaResult<()> {
    match ty {
        PropertyType::MultipleChoice { size, values } => {
            if let Some(key) = values.keys().find(|key| key.len() != *size) {
                return Err(SchemaError::InvalidChoiceWidth {
                    property: property.to_string(),
                    key: key.clone(),
                    size: *size,
                });
            }
        }
        PropertyType::Struct { fields } | PropertyType::ParamList { params: fields } => {
            for field in fields {
                if let Some(ty) = &field.ty {
                    validate_type(&field.name, ty, in_tagged)?;
                }
            }
        }
        PropertyType::Array { element } | PropertyType::List { element } => {
            validate_type(property, element, in_tagged)?;
        }
        PropertyType::Tagged { cases, default } => {
            for (i, case) in cases.iter().enumerate() {
                if cases[..i].iter().any(|earlier| earlier.tag == case.tag) {
                    return Err(SchemaError::DuplicateTag {
                        property: property.to_string(),
                        tag: case.tag,
                    });
                }
                validate_type(property, &case.value, true)?;
            }
            validate_type(property, default, true)?;
        }
        PropertyType::Recurse => {
            if !in_tagged {
                return Err(SchemaError::UnboundRecursion {
                    property: property.to_string(),
                });
            }
        }
        PropertyType::Int
        | PropertyType::Float
        | PropertyType::Bool
        | PropertyType::Flag
        | PropertyType::FixedBits { .. }
        | PropertyType::Str
        | PropertyType::FVector
        | PropertyType::FRotator => {}
    }
    Ok(())
}
