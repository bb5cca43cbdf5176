//! The bootstrap object of a connection.
//!
//! The first object the server opens is not schema driven. Its payloads carry
//! a run of bunches that may straddle payload boundaries; an incomplete bunch
//! is carried into the next payload on the same channel.

use bitstream::{BitReader, BitWriter, Bits};
use schema::{ClassSchema, PropertyDef, PropertyType};

use crate::config::ProtocolConfig;
use crate::encode::Encode;
use crate::error::{CodecResult, EncodeReason};

/// Class name of the bootstrap object.
pub const BOOTSTRAP_CLASS_NAME: &str = "FirstServerObject";

/// Returns the class registered on the bootstrap channel.
#[must_use]
pub fn bootstrap_class() -> ClassSchema {
    let mut class = ClassSchema::new(BOOTSTRAP_CLASS_NAME);
    class.id_size = Some(8);
    class.props.insert(
        Bits::from_uint(0, 8).unwrap_or_default(),
        PropertyDef::new("somestring", PropertyType::Str),
    );
    class
}

/// One bootstrap bunch: three opaque words, a string and an optional trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bunch {
    pub fields: [u16; 3],
    pub text: String,
    /// Absent when the string starts with the bootstrap sentinel.
    pub trailer: Option<u32>,
}

impl Bunch {
    fn decode(reader: &mut BitReader<'_>, sentinel: &str) -> bitstream::BitResult<Self> {
        let mut fields = [0_u16; 3];
        for field in &mut fields {
            *field = u16::try_from(reader.read_bits(16)?).unwrap_or(u16::MAX);
        }
        let len = usize::try_from(reader.read_bits(16)?).unwrap_or(usize::MAX);
        // Whole string up front so an underrun leaves the bunch unread.
        let raw = reader.take(len * 8)?;
        let mut bytes = BitReader::new(&raw);
        let mut text = String::with_capacity(len);
        for _ in 0..len {
            text.push(char::from(u8::try_from(bytes.read_bits(8)?).unwrap_or(u8::MAX)));
        }
        let trailer = if text.starts_with(sentinel) {
            None
        } else {
            Some(u32::try_from(reader.read_bits(32)?).unwrap_or(u32::MAX))
        };
        Ok(Self {
            fields,
            text,
            trailer,
        })
    }

    fn encode(&self, writer: &mut BitWriter) -> CodecResult<()> {
        for field in self.fields {
            writer.write_bits(u64::from(field), 16)?;
        }
        let len = self.text.chars().count();
        let prefix = u16::try_from(len).map_err(|_| EncodeReason::StringTooLong { len })?;
        writer.write_bits(u64::from(prefix), 16)?;
        for ch in self.text.chars() {
            let byte = u8::try_from(u32::from(ch))
                .map_err(|_| EncodeReason::NonLatin1 { found: ch })?;
            writer.write_bits(u64::from(byte), 8)?;
        }
        if let Some(trailer) = self.trailer {
            writer.write_bits(u64::from(trailer), 32)?;
        }
        Ok(())
    }
}

/// A decoded bootstrap payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BootstrapInstance {
    /// Bits of an incomplete bunch from the previous bootstrap payload.
    pub carried_in: Bits,
    pub bunches: Vec<Bunch>,
    /// The whole stream, when it was kept undecoded.
    pub opaque: Option<Bits>,
    /// Bits of an incomplete trailing bunch, handed to the next payload.
    pub carried_out: Option<Bits>,
}

impl BootstrapInstance {
    /// Decodes the rest of `reader` prefixed by `carried_in`.
    pub(crate) fn decode(
        reader: &mut BitReader<'_>,
        carried_in: Bits,
        config: &ProtocolConfig,
    ) -> Self {
        let stream = carried_in.clone() + reader.take_rest();
        let mut instance = Self {
            carried_in,
            ..Self::default()
        };
        if config.bootstrap_opaque_len == Some(stream.len()) {
            instance.opaque = Some(stream);
            return instance;
        }
        let mut bunches = BitReader::new(&stream);
        while !bunches.is_empty() {
            let start = bunches.position();
            match Bunch::decode(&mut bunches, &config.bootstrap_sentinel) {
                Ok(bunch) => instance.bunches.push(bunch),
                Err(_) => {
                    let tail = bunches.remainder_from(start);
                    tracing::debug!(bits = tail.len(), "bootstrap bunch continues in next payload");
                    instance.carried_out = Some(tail);
                    break;
                }
            }
        }
        instance
    }

    /// All bits this instance covers, carried-in prefix included.
    fn stream(&self) -> CodecResult<Bits> {
        if let Some(opaque) = &self.opaque {
            return Ok(opaque.clone());
        }
        let mut writer = BitWriter::new();
        for bunch in &self.bunches {
            bunch.encode(&mut writer)?;
        }
        if let Some(tail) = &self.carried_out {
            writer.write_slice(tail);
        }
        Ok(writer.finish())
    }
}

impl Encode for BootstrapInstance {
    /// Writes only this payload's bits; the carried-in prefix was sent with
    /// the previous payload.
    fn encode(&self, writer: &mut BitWriter, _config: &ProtocolConfig) -> CodecResult<()> {
        let stream = self.stream()?;
        writer.write_slice(&stream.slice(self.carried_in.len().min(stream.len())..stream.len())?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bunch_bits(fields: [u16; 3], text: &str, trailer: Option<u32>) -> Bits {
        let bunch = Bunch {
            fields,
            text: text.into(),
            trailer,
        };
        let mut writer = BitWriter::new();
        bunch.encode(&mut writer).unwrap();
        writer.finish()
    }

    fn decode(payload: &Bits, carried_in: Bits) -> BootstrapInstance {
        let mut reader = BitReader::new(payload);
        let instance =
            BootstrapInstance::decode(&mut reader, carried_in, &ProtocolConfig::default());
        assert!(reader.is_empty());
        instance
    }

    #[test]
    fn sentinel_bunch_has_no_trailer() {
        let payload = bunch_bits([1, 2, 3], "WELCOME map=Lobby", None)
            + bunch_bits([4, 5, 6], "HELLO", Some(0xDEAD_BEEF));
        let instance = decode(&payload, Bits::new());
        assert_eq!(instance.bunches.len(), 2);
        assert_eq!(instance.bunches[0].trailer, None);
        assert_eq!(instance.bunches[1].trailer, Some(0xDEAD_BEEF));
        assert!(instance.carried_out.is_none());
        assert_eq!(instance.to_bits(&ProtocolConfig::default()).unwrap(), payload);
    }

    #[test]
    fn split_bunch_is_carried_over() {
        let whole = bunch_bits([7, 8, 9], "HELLO", Some(42));
        let first = whole.slice(0..50).unwrap();
        let second = whole.slice(50..whole.len()).unwrap();

        let head = decode(&first, Bits::new());
        assert!(head.bunches.is_empty());
        assert_eq!(head.carried_out.as_ref(), Some(&first));
        assert_eq!(head.to_bits(&ProtocolConfig::default()).unwrap(), first);

        let tail = decode(&second, head.carried_out.unwrap());
        assert_eq!(tail.bunches.len(), 1);
        assert_eq!(tail.bunches[0].text, "HELLO");
        assert!(tail.carried_out.is_none());
        assert_eq!(tail.to_bits(&ProtocolConfig::default()).unwrap(), second);
    }

    #[test]
    fn fixed_length_stream_is_opaque() {
        let payload = Bits::from_iter((0..4000).map(|i| i % 3 == 0));
        let instance = decode(&payload, Bits::new());
        assert!(instance.bunches.is_empty());
        assert_eq!(instance.opaque.as_ref(), Some(&payload));
        assert_eq!(instance.to_bits(&ProtocolConfig::default()).unwrap(), payload);
    }

    #[test]
    fn bootstrap_class_shape() {
        let class = bootstrap_class();
        assert_eq!(class.name, BOOTSTRAP_CLASS_NAME);
        assert_eq!(class.id_size(), 8);
        class.validate().unwrap();
    }
}
