//! Property value codecs.
//!
//! Every value shape of [`PropertyType`] is decoded by one `match` in
//! [`decode_value`]; encoding is driven by the decoded [`PropertyValue`] alone.

use bitstream::{BitReader, BitWriter, Bits};
use schema::{PropertyDef, PropertyType};

use crate::config::{DecodeOptions, ProtocolConfig};
use crate::encode::{verified, Encode};
use crate::error::{AtReader, CodecError, CodecResult, EncodeReason, MalformedReason};
use crate::limits::DecodeLimits;
use crate::vector::{FRotator, FVector};

/// Label of a multiple-choice key missing from its table.
pub const UNKNOWN_CHOICE: &str = "Unknown";

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "snake_case")
)]
pub enum PropertyValue {
    Int(u32),
    Float(f32),
    Bool(bool),
    Flag,
    Bits(Bits),
    Str(StringValue),
    Choice { key: Bits, label: String },
    Struct(Vec<Field>),
    Params(Vec<Param>),
    Array { index: u8, element: Box<PropertyValue> },
    List(Vec<PropertyValue>),
    Tagged { tag: u16, value: Box<PropertyValue> },
    #[cfg_attr(feature = "serde", serde(rename = "fvector"))]
    FVector(FVector),
    #[cfg_attr(feature = "serde", serde(rename = "frotator"))]
    FRotator(FRotator),
}

/// A decoded string together with its declared size.
///
/// `size` is the byte count on the wire including the terminator, or zero for
/// an empty string without a terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringValue {
    pub size: u32,
    pub text: String,
}

impl StringValue {
    /// Creates a string whose size matches its text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let size = if text.is_empty() {
            0
        } else {
            u32::try_from(text.chars().count() + 1).unwrap_or(u32::MAX)
        };
        Self { size, text }
    }
}

/// A named struct field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    pub value: PropertyValue,
}

/// An RPC parameter; `None` when the sender left it out.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub value: Option<PropertyValue>,
}

/// Decode state threaded through nested values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueContext<'a> {
    pub config: &'a ProtocolConfig,
    pub options: DecodeOptions,
    depth: usize,
    tagged: Option<&'a PropertyType>,
}

impl<'a> ValueContext<'a> {
    pub(crate) const fn new(config: &'a ProtocolConfig, options: DecodeOptions) -> Self {
        Self {
            config,
            options,
            depth: 0,
            tagged: None,
        }
    }

    const fn limits(&self) -> &'a DecodeLimits {
        &self.config.limits
    }

    fn nested(self, reader: &BitReader<'_>) -> CodecResult<Self> {
        let depth = self.depth + 1;
        if depth > self.limits().max_depth {
            return Err(CodecError::malformed(
                MalformedReason::TooDeep {
                    max: self.limits().max_depth,
                },
                reader,
            ));
        }
        Ok(Self { depth, ..self })
    }
}

/// Decodes one value of shape `ty`.
pub(crate) fn decode_value<'a>(
    reader: &mut BitReader<'_>,
    ty: &'a PropertyType,
    ctx: ValueContext<'a>,
) -> CodecResult<PropertyValue> {
    verified(reader, ctx.options, ctx.config, "value", |reader| {
        decode_unverified(reader, ty, ctx)
    })
}

fn decode_unverified<'a>(
    reader: &mut BitReader<'_>,
    ty: &'a PropertyType,
    ctx: ValueContext<'a>,
) -> CodecResult<PropertyValue> {
    match ty {
        PropertyType::Int => Ok(PropertyValue::Int(read_u32(reader)?)),
        PropertyType::Float => Ok(PropertyValue::Float(f32::from_bits(read_u32(reader)?))),
        PropertyType::Bool => Ok(PropertyValue::Bool(reader.read_bit().at(reader)?)),
        PropertyType::Flag => Ok(PropertyValue::Flag),
        PropertyType::FixedBits { size } => Ok(PropertyValue::Bits(reader.take(*size).at(reader)?)),
        PropertyType::Str => decode_string(reader, ctx.limits()).map(PropertyValue::Str),
        PropertyType::MultipleChoice { size, values } => {
            let key = reader.take(*size).at(reader)?;
            let label = values
                .get(&key)
                .map_or_else(|| UNKNOWN_CHOICE.to_string(), Clone::clone);
            Ok(PropertyValue::Choice { key, label })
        }
        PropertyType::Struct { fields } => {
            let ctx = ctx.nested(reader)?;
            let mut decoded = Vec::with_capacity(fields.len());
            for def in fields {
                let ty = field_type(def, reader)?;
                let value = decode_value(reader, ty, ctx)?;
                decoded.push(Field {
                    name: def.name.clone(),
                    value,
                });
            }
            Ok(PropertyValue::Struct(decoded))
        }
        PropertyType::ParamList { params } => {
            let ctx = ctx.nested(reader)?;
            let mut decoded = Vec::with_capacity(params.len());
            for def in params {
                let value = if reader.read_bit().at(reader)? {
                    let ty = field_type(def, reader)?;
                    Some(decode_value(reader, ty, ctx)?)
                } else {
                    None
                };
                decoded.push(Param {
                    name: def.name.clone(),
                    value,
                });
            }
            Ok(PropertyValue::Params(decoded))
        }
        PropertyType::Array { element } => {
            let ctx = ctx.nested(reader)?;
            let index = reader.read_bits(8).at(reader)?;
            let element = decode_value(reader, element, ctx)?;
            Ok(PropertyValue::Array {
                index: u8::try_from(index).unwrap_or(u8::MAX),
                element: Box::new(element),
            })
        }
        PropertyType::List { element } => {
            let ctx = ctx.nested(reader)?;
            let len = usize::try_from(reader.read_bits(16).at(reader)?).unwrap_or(usize::MAX);
            if len > ctx.limits().max_list_len {
                return Err(CodecError::malformed(
                    MalformedReason::ListTooLong {
                        len,
                        max: ctx.limits().max_list_len,
                    },
                    reader,
                ));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(reader, element, ctx)?);
            }
            Ok(PropertyValue::List(items))
        }
        PropertyType::Tagged { default, .. } => {
            let ctx = ValueContext {
                tagged: Some(ty),
                ..ctx.nested(reader)?
            };
            let tag = u16::try_from(reader.read_bits(16).at(reader)?).unwrap_or(u16::MAX);
            let case = ty.tag_case(tag).unwrap_or(default.as_ref());
            let value = decode_value(reader, case, ctx)?;
            Ok(PropertyValue::Tagged {
                tag,
                value: Box::new(value),
            })
        }
        PropertyType::FVector => FVector::decode(reader).map(PropertyValue::FVector),
        PropertyType::FRotator => FRotator::decode(reader).map(PropertyValue::FRotator),
        PropertyType::Recurse => match ctx.tagged {
            Some(tagged) => decode_unverified(reader, tagged, ctx),
            None => Err(CodecError::malformed(
                MalformedReason::UnboundRecursion,
                reader,
            )),
        },
    }
}

fn field_type<'a>(def: &'a PropertyDef, reader: &BitReader<'_>) -> CodecResult<&'a PropertyType> {
    def.ty.as_ref().ok_or_else(|| {
        CodecError::malformed(
            MalformedReason::UntypedField {
                name: def.name.clone(),
            },
            reader,
        )
    })
}

fn read_u32(reader: &mut BitReader<'_>) -> CodecResult<u32> {
    let value = reader.read_bits(32).at(reader)?;
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Decodes a size-prefixed, NUL-terminated Latin-1 string.
///
/// A size that disagrees with the terminator position is an error whose
/// remainder starts at the size field.
pub(crate) fn decode_string(
    reader: &mut BitReader<'_>,
    limits: &DecodeLimits,
) -> CodecResult<StringValue> {
    let start = reader.position();
    let size = read_u32(reader)?;
    if size == 0 {
        return Ok(StringValue {
            size,
            text: String::new(),
        });
    }
    if usize::try_from(size).map_or(true, |size| size > limits.max_string_bytes) {
        return Err(rewound(
            reader,
            start,
            MalformedReason::StringTooLong {
                declared: size,
                max: limits.max_string_bytes,
            },
        ));
    }
    let mut text = String::new();
    let mut terminated = false;
    while reader.bits_remaining() >= 8 {
        let byte = reader.read_bits(8).at(reader)?;
        if byte == 0 {
            terminated = true;
            break;
        }
        text.push(char::from(u8::try_from(byte).unwrap_or(u8::MAX)));
    }
    let found = text.chars().count() + 1;
    if !terminated || u32::try_from(found).map_or(true, |found| found != size) {
        return Err(rewound(
            reader,
            start,
            MalformedReason::StringSize {
                declared: size,
                found,
            },
        ));
    }
    Ok(StringValue { size, text })
}

fn rewound(reader: &BitReader<'_>, start: usize, reason: MalformedReason) -> CodecError {
    CodecError::Malformed {
        reason,
        remaining: reader.remainder_from(start),
    }
}

fn write_string(writer: &mut BitWriter, value: &StringValue) -> CodecResult<()> {
    writer.write_bits(u64::from(value.size), 32)?;
    if value.size == 0 {
        return Ok(());
    }
    for ch in value.text.chars() {
        let byte = u8::try_from(u32::from(ch))
            .map_err(|_| EncodeReason::NonLatin1 { found: ch })?;
        writer.write_bits(u64::from(byte), 8)?;
    }
    writer.write_bits(0, 8)?;
    Ok(())
}

impl Encode for PropertyValue {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        match self {
            Self::Int(value) => writer.write_bits(u64::from(*value), 32)?,
            Self::Float(value) => writer.write_bits(u64::from(value.to_bits()), 32)?,
            Self::Bool(value) => writer.write_bool(*value),
            Self::Flag => {}
            Self::Bits(bits) | Self::Choice { key: bits, .. } => writer.write_slice(bits),
            Self::Str(value) => write_string(writer, value)?,
            Self::Struct(fields) => {
                for field in fields {
                    field.value.encode(writer, config)?;
                }
            }
            Self::Params(params) => {
                for param in params {
                    writer.write_bool(param.value.is_some());
                    if let Some(value) = &param.value {
                        value.encode(writer, config)?;
                    }
                }
            }
            Self::Array { index, element } => {
                writer.write_bits(u64::from(*index), 8)?;
                element.encode(writer, config)?;
            }
            Self::List(items) => {
                let len = u16::try_from(items.len())
                    .map_err(|_| EncodeReason::ListTooLong { len: items.len() })?;
                writer.write_bits(u64::from(len), 16)?;
                for item in items {
                    item.encode(writer, config)?;
                }
            }
            Self::Tagged { tag, value } => {
                writer.write_bits(u64::from(*tag), 16)?;
                value.encode(writer, config)?;
            }
            Self::FVector(vector) => vector.encode(writer, config)?,
            Self::FRotator(rotator) => rotator.encode(writer, config)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bits(s: &str) -> Bits {
        s.parse().unwrap()
    }

    fn string_bits(size: u32, bytes: &[u8]) -> Bits {
        let mut writer = BitWriter::new();
        writer.write_bits(u64::from(size), 32).unwrap();
        for byte in bytes {
            writer.write_bits(u64::from(*byte), 8).unwrap();
        }
        writer.finish()
    }

    fn decode_all(ty: &PropertyType, input: &Bits) -> CodecResult<(PropertyValue, Bits)> {
        let config = ProtocolConfig::for_testing();
        let mut reader = BitReader::new(input);
        let value = decode_value(
            &mut reader,
            ty,
            ValueContext::new(&config, DecodeOptions::verified()),
        )?;
        Ok((value, reader.remainder()))
    }

    #[test]
    fn int_is_little_endian() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x1234_5678, 32).unwrap();
        let input = writer.finish();
        let (value, rest) = decode_all(&PropertyType::Int, &input).unwrap();
        assert_eq!(value, PropertyValue::Int(0x1234_5678));
        assert!(rest.is_empty());
    }

    #[test]
    fn float_is_bit_exact() {
        let nan_bits = 0x7FC0_0001_u32;
        let mut writer = BitWriter::new();
        writer.write_bits(u64::from(nan_bits), 32).unwrap();
        let input = writer.finish();
        let (value, _) = decode_all(&PropertyType::Float, &input).unwrap();
        let config = ProtocolConfig::default();
        assert_eq!(value.to_bits(&config).unwrap(), input);
    }

    #[test]
    fn flag_consumes_nothing() {
        let input = bits("1");
        let (value, rest) = decode_all(&PropertyType::Flag, &input).unwrap();
        assert_eq!(value, PropertyValue::Flag);
        assert_eq!(rest, input);
    }

    #[test]
    fn empty_strings_keep_their_size() {
        let (zero, _) = decode_all(&PropertyType::Str, &string_bits(0, &[])).unwrap();
        assert_eq!(zero, PropertyValue::Str(StringValue::new("")));
        let (one, _) = decode_all(&PropertyType::Str, &string_bits(1, &[0])).unwrap();
        assert_eq!(
            one,
            PropertyValue::Str(StringValue {
                size: 1,
                text: String::new()
            })
        );
    }

    #[test]
    fn string_latin1() {
        let input = string_bits(4, &[b'T', 0xE9, b'a', 0]);
        let (value, rest) = decode_all(&PropertyType::Str, &input).unwrap();
        assert_eq!(value, PropertyValue::Str(StringValue::new("Téa")));
        assert!(rest.is_empty());
    }

    #[test]
    fn string_size_mismatch_rewinds() {
        let input = string_bits(5, &[b'a', b'b', 0, b'c']);
        let err = decode_all(&PropertyType::Str, &input).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                reason: MalformedReason::StringSize {
                    declared: 5,
                    found: 3
                },
                ..
            }
        ));
        assert_eq!(err.remaining(), Some(&input));
    }

    #[test]
    fn string_without_terminator() {
        let input = string_bits(3, &[b'a', b'b']);
        let err = decode_all(&PropertyType::Str, &input).unwrap_err();
        assert!(err.to_string().contains("string size"));
    }

    #[test]
    fn string_limit() {
        let input = string_bits(100_000, &[b'a', 0]);
        let err = decode_all(&PropertyType::Str, &input).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                reason: MalformedReason::StringTooLong { .. },
                ..
            }
        ));
    }

    #[test]
    fn non_latin1_is_unencodable() {
        let value = PropertyValue::Str(StringValue::new("snow\u{2603}"));
        let err = value.to_bits(&ProtocolConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Unencodable {
                reason: EncodeReason::NonLatin1 { found: '\u{2603}' }
            }
        ));
    }

    #[test]
    fn multiple_choice_lookup() {
        let values: BTreeMap<Bits, String> = [(bits("10"), "Walk".to_string())].into_iter().collect();
        let ty = PropertyType::MultipleChoice { size: 2, values };
        let (known, _) = decode_all(&ty, &bits("10")).unwrap();
        assert_eq!(
            known,
            PropertyValue::Choice {
                key: bits("10"),
                label: "Walk".into()
            }
        );
        let (unknown, _) = decode_all(&ty, &bits("11")).unwrap();
        assert!(matches!(unknown, PropertyValue::Choice { ref label, .. } if label == UNKNOWN_CHOICE));
        let config = ProtocolConfig::default();
        assert_eq!(unknown.to_bits(&config).unwrap(), bits("11"));
    }

    #[test]
    fn params_skip_absent() {
        let ty = PropertyType::params([
            PropertyDef::new("target", PropertyType::Int),
            PropertyDef::new("crit", PropertyType::Bool),
        ]);
        let (value, rest) = decode_all(&ty, &bits("0 1 1 01")).unwrap();
        assert_eq!(
            value,
            PropertyValue::Params(vec![
                Param {
                    name: "target".into(),
                    value: None
                },
                Param {
                    name: "crit".into(),
                    value: Some(PropertyValue::Bool(true))
                },
            ])
        );
        assert_eq!(rest, bits("01"));
    }

    #[test]
    fn untyped_struct_field() {
        let ty = PropertyType::structure([PropertyDef::untyped("mystery")]);
        let err = decode_all(&ty, &bits("0000")).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn array_element_keeps_index() {
        let ty = PropertyType::array(PropertyType::bits(3));
        let (value, _) = decode_all(&ty, &bits("01000000 101")).unwrap();
        assert_eq!(
            value,
            PropertyValue::Array {
                index: 2,
                element: Box::new(PropertyValue::Bits(bits("101")))
            }
        );
    }

    #[test]
    fn list_limit() {
        let ty = PropertyType::list(PropertyType::Flag);
        // 65 elements against a testing limit of 64.
        let err = decode_all(&ty, &bits("1000001000000000")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                reason: MalformedReason::ListTooLong { len: 65, .. },
                ..
            }
        ));
    }

    #[test]
    fn nested_field_records() {
        let mut writer = BitWriter::new();
        // Tag 0x0170: one list holding one list holding a float record.
        writer.write_bits(0x0170, 16).unwrap();
        writer.write_bits(1, 16).unwrap();
        writer.write_bits(1, 16).unwrap();
        writer.write_bits(0x049B, 16).unwrap();
        writer.write_bits(u64::from(1.5_f32.to_bits()), 32).unwrap();
        let input = writer.finish();
        let (value, rest) = decode_all(&PropertyType::field_record(), &input).unwrap();
        assert!(rest.is_empty());
        let inner = PropertyValue::Tagged {
            tag: 0x049B,
            value: Box::new(PropertyValue::Float(1.5)),
        };
        assert_eq!(
            value,
            PropertyValue::Tagged {
                tag: 0x0170,
                value: Box::new(PropertyValue::List(vec![PropertyValue::List(vec![inner])])),
            }
        );
    }

    #[test]
    fn unlisted_tag_uses_default_case() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x0001, 16).unwrap();
        writer.write_bits(77, 32).unwrap();
        let input = writer.finish();
        let ty = PropertyType::field_record();
        assert_eq!(ty.tag_case(0x0001), Some(&PropertyType::Int));
        let (value, rest) = decode_all(&ty, &input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            value,
            PropertyValue::Tagged {
                tag: 0x0001,
                value: Box::new(PropertyValue::Int(77)),
            }
        );
    }

    #[test]
    fn recursion_depth_is_bounded() {
        let mut writer = BitWriter::new();
        for _ in 0..10 {
            writer.write_bits(0x016F, 16).unwrap();
            writer.write_bits(1, 16).unwrap();
            writer.write_bits(1, 16).unwrap();
        }
        let input = writer.finish();
        let err = decode_all(&PropertyType::field_record(), &input).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                reason: MalformedReason::TooDeep { max: 8 },
                ..
            }
        ));
    }

    #[test]
    fn unbound_recursion() {
        let err = decode_all(&PropertyType::Recurse, &bits("0")).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Malformed {
                reason: MalformedReason::UnboundRecursion,
                ..
            }
        ));
    }

    #[test]
    fn composite_values_roundtrip() {
        let ty = PropertyType::structure([
            PropertyDef::new("name", PropertyType::Str),
            PropertyDef::new("loc", PropertyType::FVector),
            PropertyDef::new("rot", PropertyType::FRotator),
            PropertyDef::new("ids", PropertyType::list(PropertyType::Int)),
        ]);
        let value = PropertyValue::Struct(vec![
            Field {
                name: "name".into(),
                value: PropertyValue::Str(StringValue::new("Agent")),
            },
            Field {
                name: "loc".into(),
                value: PropertyValue::FVector(FVector::new(9, -1024, 1023, 0)),
            },
            Field {
                name: "rot".into(),
                value: PropertyValue::FRotator(FRotator::new(Some(512), None, Some(-256))),
            },
            Field {
                name: "ids".into(),
                value: PropertyValue::List(vec![PropertyValue::Int(7), PropertyValue::Int(9)]),
            },
        ]);
        let input = value.to_bits(&ProtocolConfig::default()).unwrap();
        let (decoded, rest) = decode_all(&ty, &input).unwrap();
        assert_eq!(decoded, value);
        assert!(rest.is_empty());
    }
}
