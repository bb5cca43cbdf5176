//! Protocol constants and decode options.

use std::collections::BTreeSet;

use crate::error::{CodecError, CodecResult};
use crate::limits::DecodeLimits;

/// Shape of the header that follows the class id of a newly created object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum NewObjectHeaderShape {
    /// A compressed location vector.
    #[default]
    Location,
    /// An opaque run of flag bits.
    Flags { bits: usize },
    /// No header.
    Nothing,
}

/// Wire constants of the replication protocol.
///
/// The defaults match the captured traffic the codec was built against; every
/// width is configurable so variants of the protocol can be decoded without
/// code changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ProtocolConfig {
    /// Width of the packet sequence number.
    pub sequence_bits: usize,
    /// Width of an acknowledged sequence number.
    pub ack_bits: usize,
    /// Width of a channel index.
    pub channel_bits: usize,
    /// Width of the reliable-channel counter.
    pub counter_bits: usize,
    /// Opaque bits after the reliable-channel counter.
    pub reliable_extra_bits: usize,
    /// Nominal width of the payload size field.
    pub payload_size_bits: usize,
    /// Raw size values at or above this lose their top bit to the payload.
    ///
    /// The default, 11264, is wider than the 12-bit field, so captured traffic
    /// always carries full-width sizes.
    pub payload_shorten_threshold: Option<u64>,
    /// Header decoded after the class id of a new object.
    pub new_object_header: NewObjectHeaderShape,
    /// Classes whose new-object header also carries a rotator.
    pub rotation_classes: BTreeSet<String>,
    /// Channel carrying the bootstrap object, if any.
    pub bootstrap_channel: Option<u16>,
    /// Bunch string prefix that marks a bunch without a trailing field.
    pub bootstrap_sentinel: String,
    /// Bootstrap streams of exactly this many bits are kept opaque.
    pub bootstrap_opaque_len: Option<usize>,
    /// Value decoding limits.
    pub limits: DecodeLimits,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sequence_bits: 14,
            ack_bits: 14,
            channel_bits: 10,
            counter_bits: 5,
            reliable_extra_bits: 8,
            payload_size_bits: 12,
            payload_shorten_threshold: Some(11264),
            new_object_header: NewObjectHeaderShape::Location,
            rotation_classes: BTreeSet::new(),
            bootstrap_channel: Some(0),
            bootstrap_sentinel: "WELCOME".to_string(),
            bootstrap_opaque_len: Some(4000),
            limits: DecodeLimits::default(),
        }
    }
}

impl ProtocolConfig {
    /// Creates a configuration with the default wire constants and testing limits.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            limits: DecodeLimits::for_testing(),
            ..Self::default()
        }
    }

    /// Checks that every width fits the field it is decoded into.
    pub fn validate(&self) -> CodecResult<()> {
        let checks = [
            ("sequence_bits", self.sequence_bits, 1, 16),
            ("ack_bits", self.ack_bits, 1, 16),
            ("channel_bits", self.channel_bits, 1, 16),
            ("counter_bits", self.counter_bits, 0, 8),
            ("reliable_extra_bits", self.reliable_extra_bits, 0, 64),
            ("payload_size_bits", self.payload_size_bits, 2, 32),
        ];
        for (field, value, min, max) in checks {
            if value < min || value > max {
                return Err(CodecError::InvalidConfig {
                    field,
                    reason: "width out of range",
                });
            }
        }
        if let NewObjectHeaderShape::Flags { bits } = self.new_object_header {
            if bits > 64 {
                return Err(CodecError::InvalidConfig {
                    field: "new_object_header",
                    reason: "flag run wider than 64 bits",
                });
            }
        }
        if let Some(channel) = self.bootstrap_channel {
            if u64::from(channel) >> self.channel_bits != 0 {
                return Err(CodecError::InvalidConfig {
                    field: "bootstrap_channel",
                    reason: "does not fit the channel width",
                });
            }
        }
        Ok(())
    }

    pub(crate) fn is_bootstrap_channel(&self, channel: u16) -> bool {
        self.bootstrap_channel == Some(channel)
    }
}

/// Options applied to every decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DecodeOptions {
    /// Re-encode every decoded node and compare it with the bits it consumed.
    pub verify_round_trip: bool,
}

impl DecodeOptions {
    /// Options with round-trip verification enabled.
    #[must_use]
    pub const fn verified() -> Self {
        Self {
            verify_round_trip: true,
        }
    }
}

/// What the parser does when a packet fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum FailureMode {
    /// Return the error.
    #[default]
    Propagate,
    /// Return the partially decoded packet together with the error.
    Capture,
}

/// Options for [`Parser::parse`](crate::Parser::parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ParseOptions {
    pub decode: DecodeOptions,
    pub failure: FailureMode,
}

impl ParseOptions {
    /// Best-effort parsing: failures are captured instead of returned.
    #[must_use]
    pub const fn best_effort() -> Self {
        Self {
            decode: DecodeOptions {
                verify_round_trip: false,
            },
            failure: FailureMode::Capture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ProtocolConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sequence_bits, 14);
        assert_eq!(config.channel_bits, 10);
        assert_eq!(config.payload_shorten_threshold, Some(11264));
        assert_eq!(config.new_object_header, NewObjectHeaderShape::Location);
    }

    #[test]
    fn testing_config_keeps_wire_constants() {
        let config = ProtocolConfig::for_testing();
        assert_eq!(config.payload_size_bits, ProtocolConfig::default().payload_size_bits);
        assert_eq!(config.limits, DecodeLimits::for_testing());
    }

    #[test]
    fn rejects_wide_channel() {
        let config = ProtocolConfig {
            channel_bits: 17,
            ..ProtocolConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("channel_bits"));
    }

    #[test]
    fn rejects_bootstrap_outside_channel_width() {
        let config = ProtocolConfig {
            channel_bits: 2,
            bootstrap_channel: Some(4),
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CodecError::InvalidConfig {
                field: "bootstrap_channel",
                ..
            })
        ));
    }

    #[test]
    fn best_effort_captures() {
        let options = ParseOptions::best_effort();
        assert_eq!(options.failure, FailureMode::Capture);
        assert!(!options.decode.verify_round_trip);
        assert_eq!(ParseOptions::default().failure, FailureMode::Propagate);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_partial_json() {
        let config: ProtocolConfig = serde_json::from_str(
            r#"{"new_object_header": {"kind": "flags", "bits": 11}, "rotation_classes": ["TgPawn"]}"#,
        )
        .unwrap();
        assert_eq!(
            config.new_object_header,
            NewObjectHeaderShape::Flags { bits: 11 }
        );
        assert!(config.rotation_classes.contains("TgPawn"));
        assert_eq!(config.sequence_bits, 14);
    }
}
