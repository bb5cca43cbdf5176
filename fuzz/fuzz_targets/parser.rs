#![no_main]

use codec::{Encode, ParseOptions, Parser};
use libfuzzer_sys::fuzz_target;
use schema::{wire_class_id, Catalog, ClassSchema, PropertyDef, PropertyType};

fn catalog() -> Catalog {
    let pawn = ClassSchema::builder("TgPawn")
        .member(0, 3, PropertyDef::new("r_nHealth", PropertyType::Int))
        .and_then(|b| b.member(1, 3, PropertyDef::new("r_sName", PropertyType::Str)))
        .and_then(|b| b.member(2, 3, PropertyDef::new("r_vLoc", PropertyType::FVector)))
        .and_then(|b| b.member(3, 3, PropertyDef::new("r_Record", PropertyType::field_record())))
        .and_then(schema::ClassSchemaBuilder::build)
        .unwrap();
    Catalog::new().with_class(wire_class_id(21).unwrap(), pawn)
}

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new(catalog());

    // Split the input into datagrams so channel state carries across packets.
    let mut idx = 0usize;
    while idx < data.len() && idx < 4096 {
        let len = (usize::from(data[idx]) % 120).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(data.len());
        let frame = bitstream::Bits::from_bytes(&data[idx..end]);
        idx = end;

        if let Ok(parsed) = parser.parse(&frame, &ParseOptions::best_effort()) {
            if parsed.is_complete() {
                let encoded = parsed.packet.to_bits(parser.config()).unwrap();
                assert_eq!(encoded, frame);
            }
        }
    }
});
