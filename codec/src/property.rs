//! Object properties: identifier resolution and value dispatch.

use bitstream::{BitReader, BitWriter, Bits};
use schema::ClassSchema;

use crate::config::ProtocolConfig;
use crate::encode::{verified, Encode};
use crate::error::{AtReader, CodecError, CodecResult, ErrorContext};
use crate::value::{decode_value, PropertyValue, ValueContext};

/// One replicated property of an object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectProperty {
    /// Wire identifier, `id_size` or `id_size - 1` bits.
    pub key: Bits,
    pub name: String,
    pub value: PropertyValue,
}

impl ObjectProperty {
    /// Decodes one property of `class`.
    ///
    /// The identifier is read one bit short of the class's id size and only
    /// extended by a bit when the short key is absent from the schema.
    pub(crate) fn decode(
        reader: &mut BitReader<'_>,
        class: &ClassSchema,
        ctx: ValueContext<'_>,
    ) -> CodecResult<Self> {
        verified(reader, ctx.options, ctx.config, "property", |reader| {
            let short = reader.take(class.id_size().saturating_sub(1)).at(reader)?;
            let key = if class.prop(&short).is_some() {
                short
            } else {
                let mut key = short;
                key.push(reader.read_bit().at(reader)?);
                key
            };
            let Some(def) = class.prop(&key) else {
                return Err(CodecError::UnknownProperty {
                    class: class.name.clone(),
                    key,
                    name: None,
                    remaining: reader.remainder(),
                });
            };
            let Some(ty) = &def.ty else {
                return Err(CodecError::UnknownProperty {
                    class: class.name.clone(),
                    key,
                    name: Some(def.name.clone()),
                    remaining: reader.remainder(),
                });
            };
            let value = decode_value(reader, ty, ctx).map_err(|err| {
                err.within(ErrorContext::Property {
                    class: class.name.clone(),
                    name: def.name.clone(),
                })
            })?;
            tracing::trace!(class = %class.name, property = %def.name, "decoded property");
            Ok(Self {
                key,
                name: def.name.clone(),
                value,
            })
        })
    }
}

impl Encode for ObjectProperty {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_slice(&self.key);
        self.value.encode(writer, config)
    }
}
