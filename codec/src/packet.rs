//! Whole packets: sequence number, parts and byte padding.

use bitstream::{BitReader, BitWriter, Bits};

use crate::channel::PacketData;
use crate::config::{DecodeOptions, ProtocolConfig};
use crate::encode::Encode;
use crate::error::{AtReader, CodecError, CodecResult, MalformedReason};
use crate::state::ParserState;

/// One part of a packet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "part", content = "value", rename_all = "snake_case")
)]
pub enum PacketPart {
    Data(PacketData),
    /// Acknowledged sequence number.
    Ack(u16),
}

/// A decoded wire packet.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    pub sequence: u16,
    pub parts: Vec<PacketPart>,
    /// Bits after the terminator that fill the last byte.
    pub padding: Bits,
}

impl Packet {
    /// Decodes a packet; on failure the parts decoded so far are kept.
    pub(crate) fn decode_partial(
        input: &Bits,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> (Self, Option<CodecError>) {
        let mut reader = BitReader::new(input);
        let mut packet = Self::default();
        match packet.decode_into(&mut reader, state, config, options) {
            Ok(()) => (packet, None),
            Err(err) => (packet, Some(err)),
        }
    }

    fn decode_into(
        &mut self,
        reader: &mut BitReader<'_>,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<()> {
        self.sequence = u16::try_from(reader.read_bits(config.sequence_bits).at(reader)?)
            .unwrap_or(u16::MAX);
        loop {
            if reader.is_empty() {
                return Err(CodecError::malformed(MalformedReason::MissingTerminator, reader));
            }
            if !reader.read_bit().at(reader)? {
                self.parts
                    .push(PacketPart::Data(PacketData::decode(reader, state, config, options)?));
            } else if reader.bits_remaining() >= config.ack_bits {
                let ack = u16::try_from(reader.read_bits(config.ack_bits).at(reader)?)
                    .unwrap_or(u16::MAX);
                self.parts.push(PacketPart::Ack(ack));
            } else {
                break;
            }
        }

        let consumed = reader.position();
        let parsed = self.body_bits(config)?.len();
        if parsed != consumed {
            return Err(CodecError::malformed(
                MalformedReason::LengthMismatch { parsed, consumed },
                reader,
            ));
        }
        let expected = 8 - consumed % 8;
        if reader.bits_remaining() != expected {
            return Err(CodecError::malformed(
                MalformedReason::TrailingBits {
                    expected,
                    found: reader.bits_remaining(),
                },
                reader,
            ));
        }
        self.padding = reader.take_rest();
        Ok(())
    }

    /// Sequence number, parts and terminator, without padding.
    fn body_bits(&self, config: &ProtocolConfig) -> CodecResult<Bits> {
        let mut writer = BitWriter::new();
        self.encode_body(&mut writer, config)?;
        Ok(writer.finish())
    }

    fn encode_body(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_bits(u64::from(self.sequence), config.sequence_bits)?;
        for part in &self.parts {
            match part {
                PacketPart::Data(data) => {
                    writer.write_bool(false);
                    data.encode(writer, config)?;
                }
                PacketPart::Ack(ack) => {
                    writer.write_bool(true);
                    writer.write_bits(u64::from(*ack), config.ack_bits)?;
                }
            }
        }
        writer.write_bool(true);
        Ok(())
    }

    /// Data parts in wire order.
    pub fn data_parts(&self) -> impl Iterator<Item = &PacketData> {
        self.parts.iter().filter_map(|part| match part {
            PacketPart::Data(data) => Some(data),
            PacketPart::Ack(_) => None,
        })
    }
}

impl Encode for Packet {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        self.encode_body(writer, config)?;
        writer.write_slice(&self.padding);
        Ok(())
    }
}
