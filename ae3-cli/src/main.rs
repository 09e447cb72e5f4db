//! AE3 Log Converter CLI Application
//!
//! Command-line front end for the ae3-decoder library. It adds everything
//! the core pipeline deliberately leaves out:
//! - Batch discovery of `.ae3` files (files or whole directories)
//! - Per-session CSV output with a fixed naming scheme
//! - Session summary tables
//! - Optional persistence of the decrypted intermediate markup
//!
//! Files are decoded in parallel, one independent pipeline invocation each;
//! a corrupt file is logged and skipped without stopping the batch.

use anyhow::{bail, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod discover;
mod export;
mod report;

/// AE3 Log Converter - Decode AE300 engine data logs to per-session CSV
#[derive(Parser, Debug)]
#[command(name = "ae3-cli")]
#[command(about = "Convert AE300 .ae3 hex dump files into per-session CSV spreadsheets", long_about = None)]
#[command(version)]
struct Args {
    /// One or more .ae3 files or directories containing .ae3 files
    #[arg(required = true, value_name = "INPUT")]
    input: Vec<PathBuf>,

    /// Directory for output files
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Print session summary tables only (no CSV files generated)
    #[arg(short, long)]
    summary: bool,

    /// Save the intermediate decrypted markup next to the CSV output
    #[arg(long)]
    keep_xml: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("AE3 Log Converter v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", ae3_decoder::VERSION);

    let files = discover::collect_ae3_files(&args.input)?;
    if files.is_empty() {
        bail!("No .ae3 files found");
    }
    log::info!("Found {} file(s) to process", files.len());

    if !args.summary {
        std::fs::create_dir_all(&args.output_dir)?;
    }

    let decoded = files
        .par_iter()
        .map(|path| match process_file(path, &args) {
            Ok(sessions) => {
                log::info!("{:?}: {} sessions", path.file_name(), sessions);
                true
            }
            Err(e) => {
                log::error!("Error processing {:?}: {:#}", path.file_name(), e);
                false
            }
        })
        .filter(|ok| *ok)
        .count();

    if decoded == 0 {
        bail!("All {} file(s) failed to decode", files.len());
    }
    Ok(())
}

/// Decode one container and emit its outputs; returns the session count
fn process_file(path: &Path, args: &Args) -> Result<usize> {
    use ae3_decoder::{Ae3Decoder, DecodeOptions};

    let decoder = Ae3Decoder::new();
    let options = DecodeOptions::new().with_markup(args.keep_xml);
    let output = decoder.decode_file(path, &options)?;

    if let Some(markup) = &output.markup {
        let xml_path = args.output_dir.join(
            path.with_extension("xml")
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("dump.xml")),
        );
        std::fs::write(&xml_path, markup)?;
        log::info!("Markup saved: {:?}", xml_path);
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unnamed>");
    if !args.quiet {
        print!("{}", report::render_summary(&output.sessions, filename));
    }

    if !args.summary {
        export::write_sessions(
            &output.sessions,
            decoder.channel_table(),
            path,
            &args.output_dir,
        )?;
    }

    Ok(output.sessions.len())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
