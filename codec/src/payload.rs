//! Payload framing: size field, new-object header and object body.
//!
//! A payload is the single recovery boundary of the codec. Failures inside its
//! body are recorded on the decoded node and decoding of the packet goes on;
//! only a payload whose declared size overruns the packet fails outright.

use std::sync::Arc;

use bitstream::{BitReader, BitWriter, Bits};
use schema::ClassSchema;

use crate::bootstrap::{BootstrapInstance, BOOTSTRAP_CLASS_NAME};
use crate::config::{DecodeOptions, NewObjectHeaderShape, ProtocolConfig};
use crate::encode::{verified, Encode};
use crate::error::{AtReader, CodecResult};
use crate::instance::{Instance, ObjectInstance, Undigested};
use crate::state::ParserState;
use crate::value::ValueContext;
use crate::vector::{FRotator, FVector};

/// The class id that opens a new object.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectClass {
    pub class_id: u32,
    /// Name the id resolved to, placeholder names included.
    pub name: String,
}

impl Encode for ObjectClass {
    fn encode(&self, writer: &mut BitWriter, _config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_bits(u64::from(self.class_id), 32)?;
        Ok(())
    }
}

/// Header of a payload that opens a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewObjectHeader {
    pub class: ObjectClass,
    pub location: Option<FVector>,
    pub flags: Option<Bits>,
    pub rotation: Option<FRotator>,
}

impl NewObjectHeader {
    fn decode(
        reader: &mut BitReader<'_>,
        channel: u16,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<(Self, Arc<ClassSchema>)> {
        let mut resolved = None;
        let header = verified(reader, options, config, "new object header", |reader| {
            let class_id = u32::try_from(reader.read_bits(32).at(reader)?).unwrap_or(u32::MAX);
            let class = if config.is_bootstrap_channel(channel) {
                state.bootstrap_class()
            } else {
                state.resolve_class(class_id)
            };
            let (location, flags) = match config.new_object_header {
                NewObjectHeaderShape::Location => (Some(FVector::decode(reader)?), None),
                NewObjectHeaderShape::Flags { bits } => (None, Some(reader.take(bits).at(reader)?)),
                NewObjectHeaderShape::Nothing => (None, None),
            };
            let rotation = if config.rotation_classes.contains(&class.name) {
                Some(FRotator::decode(reader)?)
            } else {
                None
            };
            let header = Self {
                class: ObjectClass {
                    class_id,
                    name: class.name.clone(),
                },
                location,
                flags,
                rotation,
            };
            resolved = Some(class);
            Ok(header)
        })?;
        let class = resolved.unwrap_or_else(|| state.bootstrap_class());
        Ok((header, class))
    }
}

impl Encode for NewObjectHeader {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        self.class.encode(writer, config)?;
        if let Some(location) = &self.location {
            location.encode(writer, config)?;
        }
        if let Some(flags) = &self.flags {
            writer.write_slice(flags);
        }
        if let Some(rotation) = &self.rotation {
            rotation.encode(writer, config)?;
        }
        Ok(())
    }
}

/// A sized payload on a channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PayloadData {
    pub reliable: bool,
    /// Payload length in bits.
    pub size: u32,
    /// Width of the size field as it appeared on the wire.
    pub size_bits: usize,
    /// Present when the payload opened its channel.
    pub header: Option<NewObjectHeader>,
    pub instance_name: Option<String>,
    pub instance: Option<Instance>,
    /// The payload closed its channel.
    pub deleted: bool,
    /// Why decoding stopped early, if it did.
    pub bits_left_reason: Option<String>,
    /// Payload bits that were not decoded.
    pub bits_left: Option<Bits>,
}

impl PayloadData {
    pub(crate) fn decode(
        reader: &mut BitReader<'_>,
        channel: u16,
        reliable: bool,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<Self> {
        verified(reader, options, config, "payload", |reader| {
            let width = config.payload_size_bits;
            let raw = reader.peek_bits(width).at(reader)?;
            // A large raw size lends its top bit to the payload.
            let size_bits = if config
                .payload_shorten_threshold
                .is_some_and(|threshold| raw >= threshold)
            {
                width - 1
            } else {
                width
            };
            let size = u32::try_from(reader.read_bits(size_bits).at(reader)?).unwrap_or(u32::MAX);
            let body = reader
                .take(usize::try_from(size).unwrap_or(usize::MAX))
                .at(reader)?;

            let mut payload = Self {
                reliable,
                size,
                size_bits,
                header: None,
                instance_name: None,
                instance: None,
                deleted: false,
                bits_left_reason: None,
                bits_left: None,
            };
            if let Some(Undigested { error, bits }) =
                payload.decode_body(&body, channel, state, config, options)?
            {
                tracing::debug!(
                    channel,
                    undigested = bits.len(),
                    %error,
                    "payload decoded partially"
                );
                payload.bits_left_reason = Some(error.to_string());
                payload.bits_left = Some(bits);
            }
            Ok(payload)
        })
    }

    /// Decodes the body; only round-trip failures are returned as errors.
    fn decode_body(
        &mut self,
        body: &Bits,
        channel: u16,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<Option<Undigested>> {
        let mut reader = BitReader::new(body);
        let (class, instance_name, opened) = if let Some(open) = state.channel(channel) {
            (Arc::clone(&open.class), open.instance_name.clone(), false)
        } else {
            match NewObjectHeader::decode(&mut reader, channel, state, config, options) {
                Ok((header, class)) => {
                    tracing::debug!(
                        channel,
                        class = %class.name,
                        class_id = header.class.class_id,
                        "new object"
                    );
                    self.header = Some(header);
                    let name = state.open_channel(channel, Arc::clone(&class));
                    (class, name, true)
                }
                Err(error) if error.is_round_trip() => return Err(error),
                Err(error) => {
                    return Ok(Some(Undigested {
                        error,
                        bits: body.clone(),
                    }))
                }
            }
        };
        self.instance_name = Some(instance_name);

        let undigested = if class.name == BOOTSTRAP_CLASS_NAME {
            let carried_in = state.take_carried_over();
            let bootstrap = BootstrapInstance::decode(&mut reader, carried_in, config);
            state.set_carried_over(bootstrap.carried_out.clone().unwrap_or_default());
            self.instance = Some(Instance::Bootstrap(bootstrap));
            None
        } else {
            let ctx = ValueContext::new(config, options);
            let (object, undigested) =
                ObjectInstance::decode_partial(&mut reader, &class, ctx, self.reliable && !opened)?;
            self.instance = Some(Instance::Object(object));
            undigested
        };

        if undigested.is_none() && self.size == 0 {
            self.deleted = true;
            state.close_channel(channel);
        }
        Ok(undigested)
    }

    /// Returns `true` when the size field lent its top bit to the payload.
    #[must_use]
    pub const fn is_shortened(&self, config: &ProtocolConfig) -> bool {
        self.size_bits < config.payload_size_bits
    }
}

impl Encode for PayloadData {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_bits(u64::from(self.size), self.size_bits)?;
        if let Some(header) = &self.header {
            header.encode(writer, config)?;
        }
        if let Some(instance) = &self.instance {
            instance.encode(writer, config)?;
        }
        if let Some(bits) = &self.bits_left {
            writer.write_slice(bits);
        }
        Ok(())
    }
}
