use std::hint::black_box;

use bitstream::{BitWriter, Bits};
use codec::{Encode, FVector, Parser, PropertyValue, ProtocolConfig, StringValue};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use schema::{member_key, wire_class_id, Catalog, ClassSchema, PropertyDef, PropertyType};

const MAX_MEMBER: u32 = 2;

fn catalog() -> Catalog {
    let pawn = ClassSchema::builder("TgPawn")
        .member(0, MAX_MEMBER, PropertyDef::new("r_nHealth", PropertyType::Int))
        .and_then(|b| b.member(1, MAX_MEMBER, PropertyDef::new("r_sName", PropertyType::Str)))
        .and_then(|b| b.member(2, MAX_MEMBER, PropertyDef::new("r_vLoc", PropertyType::FVector)))
        .and_then(schema::ClassSchemaBuilder::build)
        .expect("bench schema");
    Catalog::new().with_class(wire_class_id(21).expect("class id"), pawn)
}

/// One packet opening `channels` pawns with three properties each.
fn capture(channels: u16) -> Bits {
    let config = ProtocolConfig::default();
    let property = |member: u32, value: PropertyValue| {
        member_key(member, MAX_MEMBER).expect("key") + value.to_bits(&config).expect("value")
    };
    let mut writer = BitWriter::new();
    writer.write_bits(1, 14).expect("sequence");
    for channel in 1..=channels {
        let body = Bits::from_uint(u64::from(wire_class_id(21).expect("class id")), 32).expect("id")
            + FVector::new(12, 100, -200, i32::from(channel)).to_bits(&config).expect("location")
            + property(0, PropertyValue::Int(u32::from(channel)))
            + property(1, PropertyValue::Str(StringValue::new("bench pawn")))
            + property(2, PropertyValue::FVector(FVector::new(4, 1, 2, 3)));
        writer.write_bits(0, 3).expect("selector");
        writer.write_bits(u64::from(channel), 10).expect("channel");
        writer.write_bits(body.len() as u64, 12).expect("size");
        writer.write_slice(&body);
    }
    writer.write_bool(true);
    let padding = 8 - writer.bits_written() % 8;
    writer.write_bits(0, padding).expect("padding");
    writer.finish()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_decode");
    for channels in [1_u16, 8, 32] {
        let input = capture(channels);
        group.throughput(Throughput::Bytes(input.as_bytes().len() as u64));
        group.bench_function(format!("new_objects/{channels}"), |b| {
            b.iter_batched(
                || Parser::new(catalog()),
                |mut parser| black_box(parser.parse_packet(black_box(&input)).expect("decode")),
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("verified/{channels}"), |b| {
            b.iter_batched(
                || Parser::new(catalog()),
                |mut parser| black_box(parser.parse_verified(black_box(&input)).expect("decode")),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
