//! Low-level bit primitives for the urep replication codec.
//!
//! This crate provides the owned [`Bits`] sequence, the [`BitReader`] cursor,
//! the [`BitWriter`] accumulator, and compact bounded integers
//! ([`BitReader::read_compact`], [`BitWriter::write_compact`]).
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Little-endian bit order** - The first wire bit is the least significant bit
//!   of the first byte, and integers are read least significant bit first.
//! - **Bounded operations** - All reads/writes are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about packets, channels or objects.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bool(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_compact(15, 0x50).unwrap();
//!
//! let bits = writer.finish();
//! assert_eq!(bits.len(), 15);
//!
//! let mut reader = BitReader::new(&bits);
//! assert!(reader.read_bit().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_compact(0x50).unwrap(), 15);
//! assert!(reader.is_empty());
//! ```

mod bits;
mod compact;
mod error;
mod reader;
mod writer;

pub use bits::{Bits, Iter};
pub use compact::compact_len;
pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::BitWriter;
