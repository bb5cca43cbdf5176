use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bitstream::Bits;
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use codec::{DecodeOptions, FailureMode, ParseOptions, Parser};
use schema::Catalog;
use tracing_subscriber::EnvFilter;
use urep_tools::{
    collect_captures, decode_captures, format_packet_pretty, load_catalog, parser_config,
    PacketSummary,
};

#[derive(ClapParser)]
#[command(
    name = "urep-tools",
    version,
    about = "urep replication packet decoding and inspection tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode packet files into trees.
    Decode {
        /// A packet file, or a directory of packet files decoded in name order.
        path: PathBuf,
        /// Catalog JSON describing the replicated classes.
        #[arg(long)]
        catalog: PathBuf,
        /// Protocol config JSON overriding the default wire constants.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Glob filter when decoding a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = DecodeFormat::Json)]
        format: DecodeFormat,
        /// Re-encode every decoded node and fail on any difference.
        #[arg(long)]
        verify: bool,
        /// Keep going past malformed packets, reporting the bits left.
        #[arg(long)]
        best_effort: bool,
        /// Lift the string, list and nesting limits.
        #[arg(long)]
        no_limits: bool,
    },
    /// Print one summary line per packet.
    Inspect {
        /// A packet file, or a directory of packet files.
        path: PathBuf,
        /// Catalog JSON describing the replicated classes.
        #[arg(long)]
        catalog: PathBuf,
        /// Protocol config JSON overriding the default wire constants.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Lift the string, list and nesting limits.
        #[arg(long)]
        no_limits: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecodeFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Decode {
            path,
            catalog,
            config,
            glob,
            format,
            verify,
            best_effort,
            no_limits,
        } => {
            let catalog = load_catalog(&catalog).context("load catalog")?;
            let mut parser = build_parser(catalog, config.as_deref(), no_limits)?;
            let files = collect_captures(&path, glob.as_deref())?;
            let options = ParseOptions {
                decode: DecodeOptions {
                    verify_round_trip: verify,
                },
                failure: if best_effort {
                    FailureMode::Capture
                } else {
                    FailureMode::Propagate
                },
            };
            let decoded = decode_captures(&mut parser, &files, &options)?;
            match format {
                DecodeFormat::Json => {
                    let json = serde_json::to_string_pretty(&decoded).context("serialize json")?;
                    println!("{json}");
                }
                DecodeFormat::Pretty => {
                    for entry in &decoded {
                        println!("== {} ==", entry.file.display());
                        print!("{}", format_packet_pretty(&entry.packet, parser.config()));
                        if let Some(error) = &entry.error {
                            println!("error: {error}");
                        }
                        if let Some(bits) = &entry.bits_left {
                            println!("bits left: {bits}");
                        }
                    }
                }
            }
        }
        Command::Inspect {
            path,
            catalog,
            config,
            glob,
            no_limits,
        } => {
            let catalog = load_catalog(&catalog).context("load catalog")?;
            println!(
                "catalog: {} classes, hash 0x{:016x}",
                catalog.len(),
                schema::catalog_hash(&catalog)
            );
            let mut parser = build_parser(catalog, config.as_deref(), no_limits)?;
            for file in collect_captures(&path, glob.as_deref())? {
                let bytes =
                    fs::read(&file).with_context(|| format!("read packet {}", file.display()))?;
                let bits = Bits::from_bytes(&bytes);
                let parsed = parser
                    .parse(&bits, &ParseOptions::best_effort())
                    .with_context(|| format!("decode packet {}", file.display()))?;
                let summary = PacketSummary::new(&parsed.packet, bits.len());
                match &parsed.error {
                    None => println!("{}: {summary}", file.display()),
                    Some(error) => println!("{}: {summary} error: {error}", file.display()),
                }
            }
        }
    }
    Ok(())
}

fn build_parser(catalog: Catalog, config: Option<&Path>, no_limits: bool) -> Result<Parser> {
    let config = parser_config(config, no_limits)?;
    Parser::with_config(catalog, config).map_err(|err| anyhow::anyhow!("invalid config: {err}"))
}
