//! Decoded object bodies.

use bitstream::{BitReader, BitWriter, Bits};
use schema::ClassSchema;

use crate::bootstrap::BootstrapInstance;
use crate::config::ProtocolConfig;
use crate::encode::Encode;
use crate::error::{CodecError, CodecResult};
use crate::property::ObjectProperty;
use crate::value::ValueContext;

/// The body of a payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum Instance {
    /// Schema-driven properties of a replicated object.
    Object(ObjectInstance),
    /// The connection's bootstrap object.
    Bootstrap(BootstrapInstance),
}

impl Instance {
    /// Returns the decoded properties, empty for the bootstrap object.
    #[must_use]
    pub fn properties(&self) -> &[ObjectProperty] {
        match self {
            Self::Object(object) => &object.properties,
            Self::Bootstrap(_) => &[],
        }
    }
}

impl Encode for Instance {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        match self {
            Self::Object(object) => object.encode(writer, config),
            Self::Bootstrap(bootstrap) => bootstrap.encode(writer, config),
        }
    }
}

/// The properties carried in one payload, in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectInstance {
    pub properties: Vec<ObjectProperty>,
    /// Set for reliable payloads on an already open channel.
    pub is_rpc: bool,
}

/// A decode failure inside an object body and the bits it left undigested.
#[derive(Debug)]
pub(crate) struct Undigested {
    pub error: CodecError,
    pub bits: Bits,
}

impl ObjectInstance {
    /// Decodes properties until `reader` is exhausted.
    ///
    /// A failing property ends the body: the properties before it are kept
    /// and the bits from its start are returned as undigested. Round-trip
    /// failures are returned as errors.
    pub(crate) fn decode_partial(
        reader: &mut BitReader<'_>,
        class: &ClassSchema,
        ctx: ValueContext<'_>,
        is_rpc: bool,
    ) -> CodecResult<(Self, Option<Undigested>)> {
        let mut instance = Self {
            properties: Vec::new(),
            is_rpc,
        };
        while !reader.is_empty() {
            let start = reader.position();
            match ObjectProperty::decode(reader, class, ctx) {
                Ok(property) => instance.properties.push(property),
                Err(error) if error.is_round_trip() => return Err(error),
                Err(error) => {
                    let bits = reader.remainder_from(start);
                    reader.take_rest();
                    return Ok((instance, Some(Undigested { error, bits })));
                }
            }
        }
        Ok((instance, None))
    }
}

impl Encode for ObjectInstance {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        for property in &self.properties {
            property.encode(writer, config)?;
        }
        Ok(())
    }
}
