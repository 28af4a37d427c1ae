//! oodle-dyn - oo2core probe and file codec
//!
//! Entry point for the command-line tool.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oodle_dyn::{
    codec::{CodecBinding, DecodeOptions},
    config::{Config, LoggingConfig},
    native::{make_seek_chunk_len, CheckCrc, CodecVariant, CompressionLevel, FuzzSafe},
    probe::{run_diagnostics, Resolver},
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for oodle-dyn
#[derive(Parser, Debug)]
#[command(name = "oodle-dyn")]
#[command(version, about = "Probe for and drive an installed oo2core build", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the oo2core binaries (OODLE_LIBRARY_DIR still wins)
    #[arg(short = 'd', long)]
    pub library_dir: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "compact")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report which oo2core versions are installed and which would be used
    Probe {
        /// Output format (text|json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Compress a file
    Compress {
        /// File to read
        input: PathBuf,
        /// File to write
        output: PathBuf,
        /// Compressor name
        #[arg(long, default_value = "kraken")]
        compressor: CodecVariant,
        /// Compression level name (e.g. normal, optimal2, hyperfast1)
        #[arg(long, default_value = "normal")]
        level: CompressionLevel,
        /// Emit independently decodable chunks for this many seek points
        #[arg(long)]
        seek_chunks: Option<u32>,
        /// Embed per-quantum CRCs
        #[arg(long)]
        quantum_crcs: bool,
    },

    /// Decompress a file
    Decompress {
        /// File to read
        input: PathBuf,
        /// File to write
        output: PathBuf,
        /// Exact decompressed size in bytes
        #[arg(long)]
        raw_size: usize,
        /// Allow codecs that are not hardened against corrupt input
        #[arg(long)]
        no_fuzz_safe: bool,
        /// Verify per-quantum CRCs
        #[arg(long)]
        check_crc: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config(),
    };
    let config = config.with_overrides(args.library_dir.clone());

    init_logging(&args, &config.logging)?;

    info!("oodle-dyn v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Built: {} Commit: {}",
        option_env!("BUILD_DATE").unwrap_or("unknown"),
        option_env!("GIT_HASH").unwrap_or("unknown")
    );
    debug!("Config: {:?}", config);

    let resolver = Resolver::from_config(&config);

    match args.command {
        Command::Probe { format } => probe(&resolver, &format),
        Command::Compress {
            input,
            output,
            compressor,
            level,
            seek_chunks,
            quantum_crcs,
        } => {
            let binding = bind(&resolver)?;
            let raw = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let mut options = binding.default_options(compressor, level)?;
            if let Some(points) = seek_chunks {
                options = options.with_seek_chunks(make_seek_chunk_len(raw.len() as u64, points));
            }
            options = options.with_quantum_crcs(quantum_crcs);
            options.check_invariants()?;

            let bound = binding.compressed_buffer_size_needed(compressor, raw.len())?;
            let mut compressed = vec![0u8; bound];
            let written =
                binding.compress(compressor, &raw, &mut compressed, level, Some(&options))?;

            std::fs::write(&output, &compressed[..written])
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "{} -> {}: {} -> {written} bytes ({compressor}, {level})",
                input.display(),
                output.display(),
                raw.len()
            );
            Ok(())
        }
        Command::Decompress {
            input,
            output,
            raw_size,
            no_fuzz_safe,
            check_crc,
        } => {
            let binding = bind(&resolver)?;
            let compressed = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let options = DecodeOptions {
                fuzz_safe: if no_fuzz_safe { FuzzSafe::No } else { FuzzSafe::Yes },
                check_crc: if check_crc { CheckCrc::Yes } else { CheckCrc::No },
                ..DecodeOptions::default()
            };
            let mut raw = vec![0u8; raw_size];
            let written = binding
                .decompress(&compressed, &mut raw, &options)
                .context("Decompression failed (corrupt input or wrong --raw-size?)")?;

            std::fs::write(&output, &raw[..written])
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "{} -> {}: {} -> {written} bytes",
                input.display(),
                output.display(),
                compressed.len()
            );
            Ok(())
        }
    }
}

fn probe(resolver: &Resolver, format: &str) -> Result<()> {
    let report = run_diagnostics(resolver.probe());

    if format == "json" {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print!("{}", report.format_text());
    }

    Ok(())
}

fn bind(resolver: &Resolver) -> Result<CodecBinding> {
    let binding = resolver
        .resolve()
        .map_err(|e| anyhow::anyhow!("{}", e.detailed_report()))?;

    if let Some(path) = binding.library_path() {
        debug!("Using {}", path.display());
    }
    Ok(binding)
}

fn init_logging(args: &Args, logging_config: &LoggingConfig) -> Result<()> {
    // CLI -v flag overrides config
    let log_level = if args.verbose > 0 {
        match args.verbose {
            1 => "debug",
            _ => "trace",
        }
    } else {
        match logging_config.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => logging_config.level.as_str(),
            _ => "info",
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("oodle_dyn={log_level},warn"))
    });

    // Logs go to stderr; stdout carries probe reports.
    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}
