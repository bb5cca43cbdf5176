//! Compressed vectors and rotators.

use bitstream::{BitReader, BitWriter};

use crate::config::ProtocolConfig;
use crate::encode::Encode;
use crate::error::{AtReader, CodecResult, EncodeReason};

/// Bound of the compact precision field that opens a vector.
const PRECISION_BOUND: u64 = 20;

/// A location vector quantized to `bits` of precision.
///
/// Each component is a compact integer bounded by `1 << (bits + 2)` and
/// rebiased by `1 << (bits + 1)`, so it covers `-(1 << (bits + 1))` up to
/// `(1 << (bits + 1)) - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FVector {
    pub bits: u8,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl FVector {
    #[must_use]
    pub const fn new(bits: u8, x: i32, y: i32, z: i32) -> Self {
        Self { bits, x, y, z }
    }

    fn bias(bits: u8) -> i64 {
        1_i64 << (u32::from(bits) + 1)
    }

    fn bound(bits: u8) -> u64 {
        1_u64 << (u32::from(bits) + 2)
    }

    pub(crate) fn decode(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        let precision = reader.read_compact(PRECISION_BOUND).at(reader)?;
        // The precision bound keeps this well inside u8.
        let bits = u8::try_from(precision).unwrap_or(u8::MAX);
        let bias = Self::bias(bits);
        let bound = Self::bound(bits);
        let mut component = || -> CodecResult<i32> {
            let raw = reader.read_compact(bound).at(reader)?;
            // raw < 1 << 21, so both the i64 and the i32 fit.
            Ok(i32::try_from(i64::try_from(raw).unwrap_or(i64::MAX) - bias).unwrap_or(i32::MAX))
        };
        let x = component()?;
        let y = component()?;
        let z = component()?;
        Ok(Self { bits, x, y, z })
    }
}

impl Encode for FVector {
    fn encode(&self, writer: &mut BitWriter, _config: &ProtocolConfig) -> CodecResult<()> {
        writer.write_compact(u64::from(self.bits), PRECISION_BOUND)?;
        let bias = Self::bias(self.bits);
        let bound = Self::bound(self.bits);
        for value in [self.x, self.y, self.z] {
            let raw = u64::try_from(i64::from(value) + bias)
                .ok()
                .filter(|raw| *raw < bound)
                .ok_or(EncodeReason::VectorComponent {
                    value,
                    bits: self.bits,
                })?;
            writer.write_compact(raw, bound)?;
        }
        Ok(())
    }
}

/// A rotator with optional pitch, yaw and roll.
///
/// Components travel as their high byte; decoded values are signed 16-bit
/// rotation units, always a multiple of 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FRotator {
    pub pitch: Option<i32>,
    pub yaw: Option<i32>,
    pub roll: Option<i32>,
}

impl FRotator {
    #[must_use]
    pub const fn new(pitch: Option<i32>, yaw: Option<i32>, roll: Option<i32>) -> Self {
        Self { pitch, yaw, roll }
    }

    pub(crate) fn decode(reader: &mut BitReader<'_>) -> CodecResult<Self> {
        let mut component = || -> CodecResult<Option<i32>> {
            if !reader.read_bit().at(reader)? {
                return Ok(None);
            }
            let byte = reader.read_bits(8).at(reader)?;
            let value = i32::try_from(byte).unwrap_or(0) * 256;
            Ok(Some(if value >= 32768 { value - 65536 } else { value }))
        };
        let pitch = component()?;
        let yaw = component()?;
        let roll = component()?;
        Ok(Self { pitch, yaw, roll })
    }
}

fn rotator_byte(value: i32) -> Result<u64, EncodeReason> {
    if !(-32768..32768).contains(&value) || value % 256 != 0 {
        return Err(EncodeReason::RotatorComponent { value });
    }
    let unsigned = if value < 0 { value + 65536 } else { value };
    u64::try_from(unsigned / 256).map_err(|_| EncodeReason::RotatorComponent { value })
}

impl Encode for FRotator {
    fn encode(&self, writer: &mut BitWriter, _config: &ProtocolConfig) -> CodecResult<()> {
        for component in [self.pitch, self.yaw, self.roll] {
            match component {
                Some(value) => {
                    writer.write_bool(true);
                    writer.write_bits(rotator_byte(value)?, 8)?;
                }
                None => writer.write_bool(false),
            }
        }
        Ok(())
    }
}
