//! Decoding and re-encoding of the object replication stream.
//!
//! This crate ties the bitstream and schema crates together: it frames
//! packets into data parts, channels and payloads, tracks the channel table
//! across packets and decodes object properties against the class schemas.
//!
//! # Features
//!
//! - Packet, channel and payload framing
//! - Schema-driven property decoding with nested, tagged and recursive values
//! - Connection state: channel lifecycle, placeholder classes, bootstrap carry-over
//! - Best-effort decoding that records undecoded bits instead of failing
//! - Round-trip verification of every decoded node
//!
//! # Design Principles
//!
//! - **Bit-exact** - Every decoded tree re-encodes to the bits it came from.
//! - **Explicit state** - Cross-packet state lives in [`ParserState`] alone.
//! - **No panics on input** - Malformed packets become [`CodecError`] values.

mod bootstrap;
mod channel;
mod config;
mod encode;
mod error;
mod instance;
mod limits;
mod packet;
mod parser;
mod payload;
mod property;
mod state;
mod value;
mod vector;

pub use bootstrap::{bootstrap_class, BootstrapInstance, Bunch, BOOTSTRAP_CLASS_NAME};
pub use channel::{ChannelData, ChannelKind, PacketData, ReliableHeader};
pub use config::{DecodeOptions, FailureMode, NewObjectHeaderShape, ParseOptions, ProtocolConfig};
pub use encode::Encode;
pub use error::{CodecError, CodecResult, EncodeReason, ErrorContext, MalformedReason};
pub use instance::{Instance, ObjectInstance};
pub use limits::DecodeLimits;
pub use packet::{Packet, PacketPart};
pub use parser::{ParsedPacket, Parser};
pub use payload::{NewObjectHeader, ObjectClass, PayloadData};
pub use property::ObjectProperty;
pub use state::{Channel, ParserState};
pub use value::{Field, Param, PropertyValue, StringValue, UNKNOWN_CHOICE};
pub use vector::{FRotator, FVector};
