//! Re-encoding of decoded trees and round-trip verification.

use bitstream::{BitReader, BitWriter, Bits};

use crate::config::{DecodeOptions, ProtocolConfig};
use crate::error::{CodecError, CodecResult};

/// A decoded node that can be written back to the wire.
///
/// Encoding never consults the schema: every node keeps the bit-level facts
/// needed to reproduce the bits it was decoded from.
pub trait Encode {
    /// Appends the wire form of `self` to `writer`.
    fn encode(&self, writer: &mut BitWriter, config: &ProtocolConfig) -> CodecResult<()>;

    /// Returns the wire form of `self`.
    fn to_bits(&self, config: &ProtocolConfig) -> CodecResult<Bits> {
        let mut writer = BitWriter::new();
        self.encode(&mut writer, config)?;
        Ok(writer.finish())
    }
}

/// Runs `decode` and, when verification is on, checks that the decoded node
/// re-encodes to exactly the bits it consumed.
pub(crate) fn verified<'a, T, F>(
    reader: &mut BitReader<'a>,
    options: DecodeOptions,
    config: &ProtocolConfig,
    layer: &'static str,
    decode: F,
) -> CodecResult<T>
where
    T: Encode,
    F: FnOnce(&mut BitReader<'a>) -> CodecResult<T>,
{
    let start = reader.position();
    let node = decode(reader)?;
    if options.verify_round_trip {
        check_round_trip(layer, reader.consumed_since(start), node.to_bits(config)?)?;
    }
    Ok(node)
}

pub(crate) fn check_round_trip(
    layer: &'static str,
    consumed: Bits,
    encoded: Bits,
) -> CodecResult<()> {
    if consumed == encoded {
        Ok(())
    } else {
        tracing::warn!(
            layer,
            consumed = consumed.len(),
            encoded = encoded.len(),
            "round trip mismatch"
        );
        Err(CodecError::RoundTrip {
            layer,
            consumed,
            encoded,
        })
    }
}
