//! Class schemas and schema catalogs for the urep replication codec.
//!
//! This crate defines what the decoder knows about replicated classes:
//! - Property definitions and their wire shapes ([`PropertyType`])
//! - Class schemas keyed by wire property identifiers ([`ClassSchema`])
//! - The [`SchemaCatalog`] seam and an in-memory [`Catalog`]
//! - Member-key and class-id derivation from replication dumps
//! - Deterministic catalog hashing
//!
//! # Design Principles
//!
//! - **Data, not reflection** - Catalogs are produced offline and loaded as values.
//! - **Closed shapes** - Every decodable value is one [`PropertyType`] variant.
//! - **Deterministic hashing** - The catalog hash is stable given the same definition.

mod catalog;
mod class;
mod error;
mod hash;
mod property;

pub use catalog::{wire_class_id, Catalog, SchemaCatalog};
pub use class::{member_key, ClassSchema, ClassSchemaBuilder, DEFAULT_ID_SIZE};
pub use error::{SchemaError, SchemaResult};
pub use hash::catalog_hash;
pub use property::{PropertyDef, PropertyType, TagCase};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = PropertyType::Int;
        let _ = PropertyDef::untyped("x");
        let _ = catalog_hash(&Catalog::new());
        let _ = wire_class_id(1);
        let _: SchemaResult<()> = Ok(());
    }

    #[test]
    fn catalog_of_built_classes() {
        let pawn = ClassSchema::builder("TgPawn")
            .member(0, 3, PropertyDef::new("Health", PropertyType::Int))
            .unwrap()
            .member(3, 3, PropertyDef::new("r_Loc", PropertyType::FVector))
            .unwrap()
            .build()
            .unwrap();
        let id = wire_class_id(25).unwrap();
        let catalog: Catalog = [(id, pawn)].into_iter().collect();
        let found = catalog.lookup(50).unwrap();
        assert_eq!(found.id_size(), 2);
        catalog.validate().unwrap();
    }
}
