//! Packet parser entry point.

use bitstream::Bits;
use schema::SchemaCatalog;

use crate::config::{DecodeOptions, FailureMode, ParseOptions, ProtocolConfig};
use crate::encode::{check_round_trip, Encode};
use crate::error::{CodecError, CodecResult};
use crate::packet::Packet;
use crate::state::ParserState;

/// Outcome of [`Parser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPacket {
    /// The packet, possibly only partially decoded.
    pub packet: Packet,
    /// The failure that stopped decoding, in capture mode.
    pub error: Option<CodecError>,
    /// Input left when decoding stopped.
    pub bits_left: Option<Bits>,
}

impl ParsedPacket {
    /// Returns `true` when the whole packet decoded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Decodes the packets of one connection in arrival order.
#[derive(Debug)]
pub struct Parser {
    state: ParserState,
    config: ProtocolConfig,
}

impl Parser {
    /// Creates a parser with the default protocol constants.
    pub fn new(catalog: impl SchemaCatalog + Send + Sync + 'static) -> Self {
        Self {
            state: ParserState::new(catalog),
            config: ProtocolConfig::default(),
        }
    }

    /// Creates a parser after validating `config`.
    pub fn with_config(
        catalog: impl SchemaCatalog + Send + Sync + 'static,
        config: ProtocolConfig,
    ) -> CodecResult<Self> {
        config.validate()?;
        Ok(Self {
            state: ParserState::new(catalog),
            config,
        })
    }

    #[must_use]
    pub const fn state(&self) -> &ParserState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Decodes one packet, failing on the first error.
    pub fn parse_packet(&mut self, bits: &Bits) -> CodecResult<Packet> {
        self.parse(bits, &ParseOptions::default())
            .map(|parsed| parsed.packet)
    }

    /// Decodes one datagram.
    pub fn parse_bytes(&mut self, bytes: &[u8]) -> CodecResult<Packet> {
        self.parse_packet(&Bits::from_bytes(bytes))
    }

    /// Decodes one packet under `options`.
    ///
    /// In capture mode a failure returns the parts decoded so far together
    /// with the error and the bits left. Round-trip failures are always
    /// returned as errors.
    pub fn parse(&mut self, bits: &Bits, options: &ParseOptions) -> CodecResult<ParsedPacket> {
        let (packet, error) =
            Packet::decode_partial(bits, &mut self.state, &self.config, options.decode);
        match error {
            None => {
                if options.decode.verify_round_trip {
                    check_round_trip("packet", bits.clone(), packet.to_bits(&self.config)?)?;
                }
                tracing::trace!(
                    sequence = packet.sequence,
                    parts = packet.parts.len(),
                    "parsed packet"
                );
                Ok(ParsedPacket {
                    packet,
                    error: None,
                    bits_left: None,
                })
            }
            Some(error) if error.is_round_trip() => Err(error),
            Some(error) => match options.failure {
                FailureMode::Propagate => Err(error),
                FailureMode::Capture => {
                    tracing::warn!(sequence = packet.sequence, %error, "packet decoded partially");
                    Ok(ParsedPacket {
                        packet,
                        bits_left: error.remaining().cloned(),
                        error: Some(error),
                    })
                }
            },
        }
    }

    /// Decodes one packet with round-trip verification of every node.
    pub fn parse_verified(&mut self, bits: &Bits) -> CodecResult<Packet> {
        let options = ParseOptions {
            decode: DecodeOptions::verified(),
            failure: FailureMode::Propagate,
        };
        self.parse(bits, &options).map(|parsed| parsed.packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::Catalog;

    fn bits(s: &str) -> Bits {
        s.parse().unwrap()
    }

    #[test]
    fn propagate_returns_error() {
        let mut parser = Parser::new(Catalog::new());
        let err = parser.parse_packet(&bits("10100000000000")).unwrap_err();
        assert!(err.to_string().contains("terminating bit"));
    }

    #[test]
    fn capture_returns_partial_packet() {
        let mut parser = Parser::new(Catalog::new());
        let parsed = parser
            .parse(&bits("10100000000000 1 000"), &ParseOptions::best_effort())
            .unwrap();
        assert!(!parsed.is_complete());
        assert_eq!(parsed.packet.sequence, 5);
        assert_eq!(parsed.bits_left, Some(bits("000")));
    }

    #[test]
    fn bytes_entry_point() {
        // Sequence 5 and the terminator; the last bit pads the second byte.
        let mut parser = Parser::new(Catalog::new());
        let packet = parser.parse_bytes(&[0x05, 0x40]).unwrap();
        assert_eq!(packet.sequence, 5);
        assert!(packet.parts.is_empty());
    }

    #[test]
    fn verified_parse_accepts_clean_packet() {
        let mut parser = Parser::new(Catalog::new());
        let packet = parser.parse_verified(&bits("10100000000000 1 0")).unwrap();
        assert_eq!(packet.padding, bits("0"));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ProtocolConfig {
            sequence_bits: 0,
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            Parser::with_config(Catalog::new(), config),
            Err(CodecError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn parser_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Parser>();
    }
}
