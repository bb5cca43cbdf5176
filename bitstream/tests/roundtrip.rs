use bitstream::{BitError, BitReader, BitWriter, Bits};

#[test]
fn datagram_bytes_roundtrip_through_reader() {
    let datagram = [0x34u8, 0x12, 0xFF, 0x01];
    let bits = Bits::from_bytes(&datagram);
    let mut reader = BitReader::new(&bits);

    let mut writer = BitWriter::new();
    writer.write_bits(reader.read_bits(14).unwrap(), 14).unwrap();
    writer.write_compact(reader.read_compact(10).unwrap(), 10).unwrap();
    writer.write_slice(&reader.take_rest());
    assert_eq!(writer.finish().into_bytes(), datagram.to_vec());
}

#[test]
fn unaligned_concatenation_matches_written_stream() {
    let mut writer = BitWriter::new();
    writer.write_bits(0b101, 3).unwrap();
    writer.write_bits(0xBEEF, 16).unwrap();
    let written = writer.finish();

    let built = Bits::from_uint(0b101, 3).unwrap() + Bits::from_uint(0xBEEF, 16).unwrap();
    assert_eq!(built, written);
    assert_eq!(built.len(), 19);
}

#[test]
fn underrun_reports_available_bits() {
    let bits: Bits = "1011".parse().unwrap();
    let mut reader = BitReader::new(&bits);
    reader.read_bit().unwrap();
    let err = reader.read_bits(8).unwrap_err();
    assert_eq!(
        err,
        BitError::InsufficientBits {
            requested: 8,
            available: 3
        }
    );
    assert!(err.to_string().contains("only 3 bits"));
}
