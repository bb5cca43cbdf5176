//! Deterministic catalog hashing.

use blake3::Hasher;

use bitstream::Bits;

use crate::{Catalog, ClassSchema, PropertyDef, PropertyType};

/// Computes a deterministic fingerprint of a catalog.
///
/// Classes are visited in ascending id order and properties in key order, so
/// the hash only depends on the catalog's contents.
#[must_use]
pub fn catalog_hash(catalog: &Catalog) -> u64 {
    let mut hasher = Hasher::new();
    write_len(&mut hasher, catalog.len());
    for (class_id, class) in catalog.iter() {
        write_u32(&mut hasher, class_id);
        write_class(&mut hasher, class);
    }

    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

fn write_class(hasher: &mut Hasher, class: &ClassSchema) {
    write_str(hasher, &class.name);
    match class.id_size {
        Some(bits) => {
            write_u8(hasher, 1);
            write_len(hasher, bits);
        }
        None => write_u8(hasher, 0),
    }
    write_len(hasher, class.props.len());
    for (key, def) in &class.props {
        write_bits(hasher, key);
        write_def(hasher, def);
    }
}

fn write_def(hasher: &mut Hasher, def: &PropertyDef) {
    write_str(hasher, &def.name);
    match &def.ty {
        Some(ty) => {
            write_u8(hasher, 1);
            write_type(hasher, ty);
        }
        None => write_u8(hasher, 0),
    }
}

fn write_type(hasher: &mut Hasher, ty: &PropertyType) {
    match ty {
        PropertyType::Int => write_u8(hasher, 0),
        PropertyType::Float => write_u8(hasher, 1),
        PropertyType::Bool => write_u8(hasher, 2),
        PropertyType::Flag => write_u8(hasher, 3),
        PropertyType::FixedBits { size } => {
            write_u8(hasher, 4);
            write_len(hasher, *size);
        }
        PropertyType::Str => write_u8(hasher, 5),
        PropertyType::MultipleChoice { size, values } => {
            write_u8(hasher, 6);
            write_len(hasher, *size);
            write_len(hasher, values.len());
            for (key, label) in values {
                write_bits(hasher, key);
                write_str(hasher, label);
            }
        }
        PropertyType::Struct { fields } => {
            write_u8(hasher, 7);
            write_defs(hasher, fields);
        }
        PropertyType::ParamList { params } => {
            write_u8(hasher, 8);
            write_defs(hasher, params);
        }
        PropertyType::Array { element } => {
            write_u8(hasher, 9);
            write_type(hasher, element);
        }
        PropertyType::List { element } => {
            write_u8(hasher, 10);
            write_type(hasher, element);
        }
        PropertyType::Tagged { cases, default } => {
            write_u8(hasher, 11);
            write_len(hasher, cases.len());
            for case in cases {
                hasher.update(&case.tag.to_le_bytes());
                write_type(hasher, &case.value);
            }
            write_type(hasher, default);
        }
        PropertyType::FVector => write_u8(hasher, 12),
        PropertyType::FRotator => write_u8(hasher, 13),
        PropertyType::Recurse => write_u8(hasher, 14),
    }
}

fn write_defs(hasher: &mut Hasher, defs: &[PropertyDef]) {
    write_len(hasher, defs.len());
    for def in defs {
        write_def(hasher, def);
    }
}

fn write_bits(hasher: &mut Hasher, bits: &Bits) {
    write_len(hasher, bits.len());
    hasher.update(bits.as_bytes());
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}

fn write_len(hasher: &mut Hasher, value: usize) {
    hasher.update(&(value as u64).to_le_bytes());
}
