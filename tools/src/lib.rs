//! Decoding and inspection tools for captured replication packets.
//!
//! This crate backs the `urep-tools` binary:
//!
//! - Load JSON catalogs and protocol configs
//! - Feed capture files through one parser in name order
//! - Summarize packets and print decoded trees as annotated bit dumps
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Every printed line shows the wire bits next to their meaning.

use std::fmt::{self, Display, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bitstream::Bits;
use codec::{
    ChannelKind, DecodeLimits, Encode, Instance, NewObjectHeader, Packet, PacketData, PacketPart,
    ParseOptions, Parser, PayloadData, PropertyValue, ProtocolConfig,
};
use glob::Pattern;
use schema::Catalog;
use serde::Serialize;

/// Reads and validates a JSON catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read catalog {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&contents).context("parse catalog json")?;
    catalog
        .validate()
        .map_err(|err| anyhow::anyhow!("catalog validation failed: {err}"))?;
    Ok(catalog)
}

/// Reads and validates a JSON protocol config; missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<ProtocolConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ProtocolConfig = serde_json::from_str(&contents).context("parse config json")?;
    config
        .validate()
        .map_err(|err| anyhow::anyhow!("config validation failed: {err}"))?;
    Ok(config)
}

/// Resolves the protocol config for a run.
///
/// Uses the JSON at `path` when given, the defaults otherwise. `no_limits`
/// lifts the value decoding limits for captures with oversized strings or lists.
pub fn parser_config(path: Option<&Path>, no_limits: bool) -> Result<ProtocolConfig> {
    let mut config = path
        .map(load_config)
        .transpose()
        .context("load config")?
        .unwrap_or_default();
    if no_limits {
        config.limits = DecodeLimits::unlimited();
    }
    Ok(config)
}

/// Lists the capture files under `path` in file-name order.
///
/// A file path is returned as is. Directory entries are filtered by `glob`,
/// matched against either the full path or the file name.
pub fn collect_captures(path: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let pattern = glob
        .map(|value| Pattern::new(value).context("invalid glob pattern"))
        .transpose()?;

    let mut files = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("read dir {}", path.display()))? {
        let file = entry?.path();
        if !file.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_name && !pattern.matches_path(&file) {
                continue;
            }
        }
        files.push(file);
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// One decoded capture file.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedPacket {
    pub file: PathBuf,
    pub packet: Packet,
    /// Set when best-effort decoding stopped early.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_left: Option<Bits>,
}

/// Decodes `files` in order through `parser`.
///
/// Unreadable files and propagated decode errors stop the run; in capture
/// mode a malformed packet is returned with its error.
pub fn decode_captures(
    parser: &mut Parser,
    files: &[PathBuf],
    options: &ParseOptions,
) -> Result<Vec<DecodedPacket>> {
    let mut decoded = Vec::with_capacity(files.len());
    for file in files {
        let bytes = fs::read(file).with_context(|| format!("read packet {}", file.display()))?;
        let parsed = parser
            .parse(&Bits::from_bytes(&bytes), options)
            .with_context(|| format!("decode packet {}", file.display()))?;
        tracing::debug!(file = %file.display(), complete = parsed.is_complete(), "decoded capture");
        decoded.push(DecodedPacket {
            file: file.clone(),
            packet: parsed.packet,
            error: parsed.error.map(|err| err.to_string()),
            bits_left: parsed.bits_left,
        });
    }
    Ok(decoded)
}

/// Per-packet counts printed by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketSummary {
    pub sequence: u16,
    pub bits: usize,
    pub acks: usize,
    pub channels: Vec<u16>,
    pub new_objects: usize,
    pub deleted: usize,
    pub undecoded_bits: usize,
}

impl PacketSummary {
    /// Summarizes `packet`, which was decoded from `bits` input bits.
    pub fn new(packet: &Packet, bits: usize) -> Self {
        let payloads = || packet.data_parts().map(|data| &data.channel_data.payload);
        Self {
            sequence: packet.sequence,
            bits,
            acks: packet
                .parts
                .iter()
                .filter(|part| matches!(part, PacketPart::Ack(_)))
                .count(),
            channels: packet
                .data_parts()
                .map(|data| data.channel_data.channel)
                .collect(),
            new_objects: payloads().filter(|payload| payload.header.is_some()).count(),
            deleted: payloads().filter(|payload| payload.deleted).count(),
            undecoded_bits: payloads()
                .filter_map(|payload| payload.bits_left.as_ref())
                .map(Bits::len)
                .sum(),
        }
    }
}

impl Display for PacketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<String> = self.channels.iter().map(u16::to_string).collect();
        write!(
            f,
            "seq {} bits {} acks {} parts {} [{}] new {} deleted {} undecoded {}",
            self.sequence,
            self.bits,
            self.acks,
            self.channels.len(),
            channels.join(","),
            self.new_objects,
            self.deleted,
            self.undecoded_bits
        )
    }
}

/// Renders `packet` as one `bits (meaning)` line per node, indented by depth.
pub fn format_packet_pretty(packet: &Packet, config: &ProtocolConfig) -> String {
    let mut dump = Dump {
        out: String::new(),
        config,
    };
    dump.packet(packet);
    dump.out
}

fn uint_bits(value: u64, width: usize) -> String {
    Bits::from_uint(value, width)
        .map(|bits| bits.to_string())
        .unwrap_or_default()
}

struct Dump<'a> {
    out: String,
    config: &'a ProtocolConfig,
}

impl Dump<'_> {
    fn line(&mut self, depth: usize, bits: impl Display, meaning: impl Display) {
        let bits = bits.to_string();
        let indent = depth * 2;
        let _ = if bits.is_empty() {
            writeln!(self.out, "{:indent$}({meaning})", "")
        } else {
            writeln!(self.out, "{:indent$}{bits} ({meaning})", "")
        };
    }

    fn encoded(&self, node: &impl Encode) -> String {
        node.to_bits(self.config)
            .map(|bits| bits.to_string())
            .unwrap_or_else(|err| format!("<{err}>"))
    }

    fn packet(&mut self, packet: &Packet) {
        let config = self.config;
        self.line(
            0,
            uint_bits(u64::from(packet.sequence), config.sequence_bits),
            format_args!("sequence = {}", packet.sequence),
        );
        for part in &packet.parts {
            match part {
                PacketPart::Ack(ack) => self.line(
                    1,
                    format_args!("1 {}", uint_bits(u64::from(*ack), config.ack_bits)),
                    format_args!("ack = {ack}"),
                ),
                PacketPart::Data(data) => self.data(data),
            }
        }
        self.line(1, "1", "end of parts");
        self.line(1, &packet.padding, "padding");
    }

    fn data(&mut self, data: &PacketData) {
        let config = self.config;
        let selector = match data.kind {
            ChannelKind::Unreliable => "00",
            ChannelKind::Reliable => "01",
            ChannelKind::ReliableMarked => "10 11",
        };
        let extra = if data.extra_flag { "11 " } else { "" };
        self.line(
            1,
            format_args!("0 {extra}{selector}"),
            format_args!("data part, {:?}", data.kind),
        );
        let channel = &data.channel_data;
        self.line(
            2,
            uint_bits(u64::from(channel.channel), config.channel_bits),
            format_args!("channel = {}", channel.channel),
        );
        if let Some(header) = &channel.reliable {
            self.line(
                2,
                format_args!(
                    "{} {}",
                    uint_bits(u64::from(header.counter), config.counter_bits),
                    header.extra
                ),
                format_args!("counter = {}", header.counter),
            );
        }
        self.payload(&channel.payload);
    }

    fn payload(&mut self, payload: &PayloadData) {
        let shortened = if payload.is_shortened(self.config) {
            ", shortened"
        } else {
            ""
        };
        self.line(
            2,
            uint_bits(u64::from(payload.size), payload.size_bits),
            format_args!("payload size = {}{shortened}", payload.size),
        );
        if let Some(header) = &payload.header {
            self.header(header, payload.instance_name.as_deref());
        } else if let Some(name) = &payload.instance_name {
            self.line(3, "", format_args!("update of {name}"));
        }
        match &payload.instance {
            Some(Instance::Object(object)) => {
                if object.is_rpc {
                    self.line(3, "", "rpc");
                }
                for property in &object.properties {
                    self.line(3, &property.key, format_args!("property {}", property.name));
                    self.value(4, &property.value);
                }
            }
            Some(Instance::Bootstrap(bootstrap)) => {
                if !bootstrap.carried_in.is_empty() {
                    self.line(3, &bootstrap.carried_in, "carried over from previous packet");
                }
                for bunch in &bootstrap.bunches {
                    self.line(
                        3,
                        "",
                        format_args!(
                            "bunch {:?} \"{}\" trailer {:?}",
                            bunch.fields, bunch.text, bunch.trailer
                        ),
                    );
                }
                if let Some(opaque) = &bootstrap.opaque {
                    self.line(3, opaque, "opaque bootstrap");
                }
                if let Some(carried) = &bootstrap.carried_out {
                    self.line(3, carried, "carried into next packet");
                }
            }
            None => {}
        }
        if payload.deleted {
            self.line(3, "", "deleted");
        }
        if let Some(bits) = &payload.bits_left {
            let reason = payload.bits_left_reason.as_deref().unwrap_or("unknown");
            self.line(3, bits, format_args!("bits left: {reason}"));
        }
    }

    fn header(&mut self, header: &NewObjectHeader, instance: Option<&str>) {
        let class = &header.class;
        self.line(
            3,
            uint_bits(u64::from(class.class_id), 32),
            format_args!(
                "new {} (class id {}) as {}",
                class.name,
                class.class_id,
                instance.unwrap_or("?")
            ),
        );
        if let Some(location) = &header.location {
            self.line(
                4,
                self.encoded(location),
                format_args!(
                    "location ({}, {}, {}) precision {}",
                    location.x, location.y, location.z, location.bits
                ),
            );
        }
        if let Some(flags) = &header.flags {
            self.line(4, flags, "flags");
        }
        if let Some(rotation) = &header.rotation {
            self.line(4, self.encoded(rotation), format_args!("rotation {rotation:?}"));
        }
    }

    fn value(&mut self, depth: usize, value: &PropertyValue) {
        match value {
            PropertyValue::Struct(fields) => {
                self.line(depth, "", "struct");
                for field in fields {
                    self.line(depth + 1, "", format_args!("field {}", field.name));
                    self.value(depth + 2, &field.value);
                }
            }
            PropertyValue::Params(params) => {
                for param in params {
                    let present = if param.value.is_some() { "1" } else { "0" };
                    self.line(depth, present, format_args!("param {}", param.name));
                    if let Some(value) = &param.value {
                        self.value(depth + 1, value);
                    }
                }
            }
            PropertyValue::Array { index, element } => {
                let bits = uint_bits(u64::from(*index), 8);
                self.line(depth, bits, format_args!("array index {index}"));
                self.value(depth + 1, element);
            }
            PropertyValue::List(items) => {
                let bits = uint_bits(items.len() as u64, 16);
                self.line(depth, bits, format_args!("list of {}", items.len()));
                for item in items {
                    self.value(depth + 1, item);
                }
            }
            PropertyValue::Tagged { tag, value } => {
                let bits = uint_bits(u64::from(*tag), 16);
                self.line(depth, bits, format_args!("tag 0x{tag:04X}"));
                self.value(depth + 1, value);
            }
            PropertyValue::Str(s) => {
                let bits = uint_bits(u64::from(s.size), 32);
                self.line(depth, bits, format_args!("string size {} \"{}\"", s.size, s.text));
            }
            leaf => {
                let meaning = match leaf {
                    PropertyValue::Int(v) => format!("int {v} {v:08X}"),
                    PropertyValue::Float(v) => format!("float {v}"),
                    PropertyValue::Bool(v) => format!("bool {v}"),
                    PropertyValue::Flag => "flag".to_string(),
                    PropertyValue::Bits(_) => "bits".to_string(),
                    PropertyValue::Choice { label, .. } => format!("choice {label}"),
                    PropertyValue::FVector(v) => {
                        format!("vector ({}, {}, {}) precision {}", v.x, v.y, v.z, v.bits)
                    }
                    PropertyValue::FRotator(r) => format!("rotator {r:?}"),
                    _ => String::new(),
                };
                self.line(depth, self.encoded(leaf), meaning);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitstream::BitWriter;
    use codec::{FVector, StringValue};
    use schema::{member_key, wire_class_id, ClassSchema, PropertyDef, PropertyType};

    fn catalog() -> Catalog {
        let pawn = ClassSchema::builder("TgPawn")
            .member(0, 1, PropertyDef::new("r_nHealth", PropertyType::Int))
            .unwrap()
            .member(1, 1, PropertyDef::new("r_sName", PropertyType::Str))
            .unwrap()
            .build()
            .unwrap();
        Catalog::new().with_class(wire_class_id(21).unwrap(), pawn)
    }

    fn capture() -> Vec<u8> {
        let config = ProtocolConfig::default();
        let body = Bits::from_uint(u64::from(wire_class_id(21).unwrap()), 32).unwrap()
            + FVector::default().to_bits(&config).unwrap()
            + member_key(0, 1).unwrap()
            + PropertyValue::Int(80).to_bits(&config).unwrap()
            + member_key(1, 1).unwrap()
            + PropertyValue::Str(StringValue::new("Tester")).to_bits(&config).unwrap();
        let mut writer = BitWriter::new();
        writer.write_bits(42, 14).unwrap();
        writer.write_bool(true);
        writer.write_bits(41, 14).unwrap();
        writer.write_bits(0, 3).unwrap();
        writer.write_bits(6, 10).unwrap();
        writer.write_bits(body.len() as u64, 12).unwrap();
        writer.write_slice(&body);
        writer.write_bool(true);
        let padding = 8 - writer.bits_written() % 8;
        writer.write_bits(0, padding).unwrap();
        writer.finish().into_bytes()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("urep-tools-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn summary_counts_parts() {
        let bytes = capture();
        let packet = Parser::new(catalog()).parse_bytes(&bytes).unwrap();
        let summary = PacketSummary::new(&packet, bytes.len() * 8);
        assert_eq!(summary.sequence, 42);
        assert_eq!(summary.acks, 1);
        assert_eq!(summary.channels, vec![6]);
        assert_eq!(summary.new_objects, 1);
        assert_eq!(summary.undecoded_bits, 0);
        assert!(summary.to_string().starts_with("seq 42 "));
    }

    #[test]
    fn pretty_dump_names_every_node() {
        let packet = Parser::new(catalog()).parse_bytes(&capture()).unwrap();
        let dump = format_packet_pretty(&packet, &ProtocolConfig::default());
        assert!(dump.starts_with("01010100000000 (sequence = 42)\n"));
        assert!(dump.contains("(ack = 41)"));
        assert!(dump.contains("(channel = 6)"));
        assert!(dump.contains("new TgPawn (class id 42) as TgPawn_0"));
        assert!(dump.contains("(property r_nHealth)"));
        assert!(dump.contains("(int 80 00000050)"));
        assert!(dump.contains("string size 7 \"Tester\""));
    }

    #[test]
    fn captures_are_read_in_name_order() {
        let dir = scratch_dir("order");
        for name in ["b.bin", "a.bin", "notes.txt"] {
            fs::write(dir.join(name), capture()).unwrap();
        }
        let files = collect_captures(&dir, Some("*.bin")).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|file| file.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.bin", "b.bin"]);

        let mut parser = Parser::new(catalog());
        let decoded = decode_captures(&mut parser, &files, &ParseOptions::best_effort()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded.iter().all(|packet| packet.error.is_none()));
        // The second capture reuses channel 6, so it reads as an update.
        let second = &decoded[1].packet.data_parts().next().unwrap().channel_data.payload;
        assert!(second.header.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn catalog_and_config_load_from_json() {
        let dir = scratch_dir("load");
        let catalog_path = dir.join("catalog.json");
        fs::write(&catalog_path, serde_json::to_string(&catalog()).unwrap()).unwrap();
        assert_eq!(load_catalog(&catalog_path).unwrap(), catalog());

        let config_path = dir.join("config.json");
        fs::write(&config_path, r#"{"channel_bits": 12}"#).unwrap();
        let config = load_config(&config_path).unwrap();
        assert_eq!(config.channel_bits, 12);
        assert_eq!(config.sequence_bits, ProtocolConfig::default().sequence_bits);

        fs::write(&config_path, r#"{"sequence_bits": 0}"#).unwrap();
        assert!(load_config(&config_path).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_limits_lifts_decode_limits() {
        let dir = scratch_dir("limits");
        let config_path = dir.join("config.json");
        fs::write(&config_path, r#"{"channel_bits": 12}"#).unwrap();

        let limited = parser_config(Some(&config_path), false).unwrap();
        assert_eq!(limited.limits, DecodeLimits::default());
        let unlimited = parser_config(Some(&config_path), true).unwrap();
        assert_eq!(unlimited.channel_bits, 12);
        assert_eq!(unlimited.limits, DecodeLimits::unlimited());
        assert_eq!(parser_config(None, false).unwrap(), ProtocolConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }
}
