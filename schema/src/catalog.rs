//! Schema catalogs: the mapping from wire class ids to class schemas.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::class::ClassSchema;
use crate::error::SchemaResult;

/// Source of class schemas for the codec.
///
/// A catalog is read-only; the decoder asks it once per unseen class id and
/// keeps its own copy.
pub trait SchemaCatalog {
    /// Returns the schema for `class_id`, if the catalog knows it.
    fn lookup(&self, class_id: u32) -> Option<ClassSchema>;
}

impl<C: SchemaCatalog + ?Sized> SchemaCatalog for Arc<C> {
    fn lookup(&self, class_id: u32) -> Option<ClassSchema> {
        (**self).lookup(class_id)
    }
}

impl<C: SchemaCatalog + ?Sized> SchemaCatalog for &C {
    fn lookup(&self, class_id: u32) -> Option<ClassSchema> {
        (**self).lookup(class_id)
    }
}

impl<C: SchemaCatalog + ?Sized> SchemaCatalog for Box<C> {
    fn lookup(&self, class_id: u32) -> Option<ClassSchema> {
        (**self).lookup(class_id)
    }
}

/// In-memory catalog keyed by wire class id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Catalog {
    classes: BTreeMap<u32, ClassSchema>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            classes: BTreeMap::new(),
        }
    }

    /// Adds or replaces a class, returning `self` for chaining.
    #[must_use]
    pub fn with_class(mut self, class_id: u32, class: ClassSchema) -> Self {
        self.insert(class_id, class);
        self
    }

    /// Adds or replaces a class, returning the previous schema.
    pub fn insert(&mut self, class_id: u32, class: ClassSchema) -> Option<ClassSchema> {
        self.classes.insert(class_id, class)
    }

    /// Returns the schema for `class_id` without cloning.
    #[must_use]
    pub fn get(&self, class_id: u32) -> Option<&ClassSchema> {
        self.classes.get(&class_id)
    }

    /// Number of classes in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if the catalog holds no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over `(class_id, schema)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ClassSchema)> {
        self.classes.iter().map(|(id, class)| (*id, class))
    }

    /// Validates every class in the catalog.
    pub fn validate(&self) -> SchemaResult<()> {
        self.classes.values().try_for_each(ClassSchema::validate)
    }
}

impl SchemaCatalog for Catalog {
    fn lookup(&self, class_id: u32) -> Option<ClassSchema> {
        self.classes.get(&class_id).cloned()
    }
}

impl FromIterator<(u32, ClassSchema)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (u32, ClassSchema)>>(iter: I) -> Self {
        Self {
            classes: iter.into_iter().collect(),
        }
    }
}

/// Converts a replication dump's class index into the id seen on the wire.
///
/// Returns `None` if the doubled id does not fit in 32 bits.
#[must_use]
pub const fn wire_class_id(replication_index: u32) -> Option<u32> {
    replication_index.checked_mul(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PropertyDef, PropertyType};

    fn pawn() -> ClassSchema {
        ClassSchema::builder("TgPawn")
            .prop("0000".parse().unwrap(), PropertyDef::new("Health", PropertyType::Int))
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_clones_schema() {
        let catalog = Catalog::new().with_class(0x32, pawn());
        assert_eq!(catalog.lookup(0x32), Some(pawn()));
        assert_eq!(catalog.lookup(0x33), None);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn shared_and_borrowed_catalogs() {
        fn find(catalog: &impl SchemaCatalog, id: u32) -> Option<String> {
            catalog.lookup(id).map(|class| class.name)
        }
        let catalog = Catalog::new().with_class(2, pawn());
        assert_eq!(find(&&catalog, 2).as_deref(), Some("TgPawn"));
        let shared = Arc::new(catalog);
        assert_eq!(find(&Arc::clone(&shared), 2).as_deref(), Some("TgPawn"));
        let boxed: Box<dyn SchemaCatalog> = Box::new(Catalog::new());
        assert_eq!(find(&boxed, 2), None);
    }

    #[test]
    fn wire_ids_are_doubled() {
        assert_eq!(wire_class_id(25), Some(50));
        assert_eq!(wire_class_id(u32::MAX), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_catalog() {
        let json = r#"{
            "50": {
                "name": "TgPawn",
                "props": {
                    "0000": {"name": "Health", "type": {"type": "int"}},
                    "1000": {"name": "r_Loc", "type": {"type": "fvector"}},
                    "0100": {"name": "m_Pointer", "type": {"type": "fixed_bits", "size": 11}},
                    "1100": {"name": "m_Unknown"}
                }
            },
            "8": {"name": "TgPlayerController", "id_size": 8}
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        catalog.validate().unwrap();
        let pawn = catalog.get(50).unwrap();
        assert_eq!(pawn.props.len(), 4);
        assert_eq!(pawn.id_size(), 4);
        assert_eq!(
            pawn.prop(&"0100".parse().unwrap()).unwrap().ty,
            Some(PropertyType::bits(11))
        );
        assert_eq!(catalog.get(8).unwrap().id_size(), 8);
    }
}
