//! Packet data parts and channel headers.

use bitstream::{BitReader, BitWriter, Bits};

use crate::config::{DecodeOptions, ProtocolConfig};
use crate::encode::{verified, Encode};
use crate::error::{AtReader, CodecError, CodecResult, ErrorContext, MalformedReason};
use crate::payload::PayloadData;
use crate::state::ParserState;

/// Delivery class announced by the two-bit selector of a data part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ChannelKind {
    /// Selector `00`: no reliable header.
    Unreliable,
    /// Selector `01`: reliable header follows.
    Reliable,
    /// Selector `10`: a `11` marker, then a reliable header.
    ReliableMarked,
}

impl ChannelKind {
    /// Whether the channel header carries a counter.
    #[must_use]
    pub const fn is_reliable(self) -> bool {
        !matches!(self, Self::Unreliable)
    }

    const fn selector(self) -> (bool, bool) {
        match self {
            Self::Unreliable => (false, false),
            Self::Reliable => (false, true),
            Self::ReliableMarked => (true, false),
        }
    }
}

fn read_selector(reader: &mut BitReader<'_>) -> CodecResult<(bool, bool)> {
    let first = reader.read_bit().at(reader)?;
    let second = reader.read_bit().at(reader)?;
    Ok((first, second))
}

/// One data part of a packet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketData {
    /// A leading `11` selector was present before the real one.
    pub extra_flag: bool,
    pub kind: ChannelKind,
    pub channel_data: ChannelData,
}

impl PacketData {
    pub(crate) fn decode(
        reader: &mut BitReader<'_>,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<Self> {
        verified(reader, options, config, "packet data", |reader| {
            let mut selector = read_selector(reader)?;
            let extra_flag = selector == (true, true);
            if extra_flag {
                selector = read_selector(reader)?;
            }
            let kind = match selector {
                (false, false) => ChannelKind::Unreliable,
                (false, true) => ChannelKind::Reliable,
                (true, false) => {
                    let marker = reader.take(2).at(reader)?;
                    if marker.iter().any(|bit| !bit) {
                        return Err(CodecError::malformed(
                            MalformedReason::InvalidMarker { found: marker },
                            reader,
                        ));
                    }
                    ChannelKind::ReliableMarked
                }
                (true, true) => {
                    return Err(CodecError::malformed(MalformedReason::InvalidSelector, reader))
                }
            };
            let channel_data =
                ChannelData::decode(reader, kind.is_reliable(), state, config, options)?;
            Ok(Self {
                extra_flag,
                kind,
                channel_data,
            })
        })
    }
}

impl Encode for PacketData {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        if self.extra_flag {
            writer.write_bool(true);
            writer.write_bool(true);
        }
        let (first, second) = self.kind.selector();
        writer.write_bool(first);
        writer.write_bool(second);
        if self.kind == ChannelKind::ReliableMarked {
            writer.write_bool(true);
            writer.write_bool(true);
        }
        self.channel_data.encode(writer, config)
    }
}

/// Counter and opaque bits of a reliable channel header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReliableHeader {
    pub counter: u8,
    pub extra: Bits,
}

/// A channel index and the payload sent on it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelData {
    pub channel: u16,
    pub reliable: Option<ReliableHeader>,
    pub payload: PayloadData,
}

impl ChannelData {
    pub(crate) fn decode(
        reader: &mut BitReader<'_>,
        reliable: bool,
        state: &mut ParserState,
        config: &ProtocolConfig,
        options: DecodeOptions,
    ) -> CodecResult<Self> {
        verified(reader, options, config, "channel data", |reader| {
            let channel = u16::try_from(reader.read_bits(config.channel_bits).at(reader)?)
                .unwrap_or(u16::MAX);
            let header = if reliable {
                let counter = u8::try_from(reader.read_bits(config.counter_bits).at(reader)?)
                    .unwrap_or(u8::MAX);
                let extra = reader.take(config.reliable_extra_bits).at(reader)?;
                Some(ReliableHeader { counter, extra })
            } else {
                None
            };
            let payload = PayloadData::decode(reader, channel, reliable, state, config, options)
                .map_err(|err| err.within(ErrorContext::Channel(channel)))?;
            Ok(Self {
                channel,
                reliable: header,
                payload,
            })
        })
    }
}

impl Encode for ChannelData {
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_bits(u64::from(self.channel), config.channel_bits)?;
        if let Some(header) = &self.reliable {
            writer.write_bits(u64::from(header.counter), config.counter_bits)?;
            writer.write_slice(&header.extra);
        }
        self.payload.encode(writer, config)
    }
}
