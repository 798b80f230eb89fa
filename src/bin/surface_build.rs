//! Build option and equity surface tensors for a list of expiries.
//!
//! ```text
//! surface-build --symbol RELIANCE --input-dir data --output-dir out 20250529 20250626
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use surface_tensor::{run_batch, BuilderKind, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "surface-build")]
#[command(about = "Grid tick-level option and equity quotes into training tensors")]
struct Args {
    /// TOML file with surface settings and an optional [batch] table
    #[arg(long)]
    config: Option<PathBuf>,

    /// Underlying symbol used in input file names
    #[arg(long)]
    symbol: Option<String>,

    /// Directory holding OPT_/EQT_ input CSV files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory receiving the .npz outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// options, equity or both
    #[arg(long)]
    kind: Option<BuilderKind>,

    /// Expiry identifiers; replaces the list from the config file when given
    expiries: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut run = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };

    if let Some(symbol) = args.symbol {
        run.batch.symbol = symbol;
    }
    if let Some(dir) = args.input_dir {
        run.batch.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        run.batch.output_dir = dir;
    }
    if let Some(kind) = args.kind {
        run.batch.kind = kind;
    }
    if !args.expiries.is_empty() {
        run.batch.expiries = args.expiries;
    }
    if run.batch.expiries.is_empty() {
        bail!("no expiries given on the command line or in the config file");
    }

    info!(
        symbol = %run.batch.symbol,
        expiries = run.batch.expiries.len(),
        kind = %run.batch.kind,
        "starting batch"
    );
    let report = run_batch(&run.batch, &run.surface);

    for failure in report.failures() {
        if let Err(message) = &failure.result {
            eprintln!("{} {}: {}", failure.expiry, failure.kind, message);
        }
    }
    if report.failed() > 0 {
        bail!(
            "{} of {} surface builds failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}
