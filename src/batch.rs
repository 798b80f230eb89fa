//! Batch driver: one option and/or equity surface per expiry
//!
//! File naming is fixed:
//!
//! - inputs `OPT_<SYMBOL>_<EXPIRY>.csv` and `EQT_<SYMBOL>_<EXPIRY>.csv`
//! - outputs `OPT_PINN_TRAIN_DATA_<EXPIRY>.npz` and `EQT_PINN_TRAIN_DATA_<EXPIRY>.npz`
//!
//! A failing expiry is logged and recorded; the remaining expiries still run.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::{BatchConfig, SurfaceConfig};
use crate::data::{load_option_quotes_from_path, load_underlying_from_path, SpotSource};
use crate::error::SurfaceResult;
use crate::store::write_surface;
use crate::surface::{build_equity_surface_from_csv, build_option_surface};

pub fn option_input_name(symbol: &str, expiry: &str) -> String {
    format!("OPT_{symbol}_{expiry}.csv")
}

pub fn equity_input_name(symbol: &str, expiry: &str) -> String {
    format!("EQT_{symbol}_{expiry}.csv")
}

pub fn option_output_name(expiry: &str) -> String {
    format!("OPT_PINN_TRAIN_DATA_{expiry}.npz")
}

pub fn equity_output_name(expiry: &str) -> String {
    format!("EQT_PINN_TRAIN_DATA_{expiry}.npz")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Options,
    Equity,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Options => f.write_str("options"),
            SurfaceKind::Equity => f.write_str("equity"),
        }
    }
}

/// One builder run within a batch
#[derive(Debug, Clone)]
pub struct ExpiryOutcome {
    pub expiry: String,
    pub kind: SurfaceKind,
    /// Output path on success, error message on failure
    pub result: Result<PathBuf, String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ExpiryOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpiryOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

fn run_options(batch: &BatchConfig, config: &SurfaceConfig, expiry: &str) -> SurfaceResult<PathBuf> {
    let input = batch
        .input_dir
        .join(option_input_name(&batch.symbol, expiry));
    let equity = batch
        .input_dir
        .join(equity_input_name(&batch.symbol, expiry));

    let (quotes, report) = load_option_quotes_from_path(&input)?;
    let source = if equity.exists() {
        let (ticks, _) = load_underlying_from_path(&equity)?;
        SpotSource::Observed(ticks)
    } else {
        warn!(expiry, path = %equity.display(), "no equity file, spot falls back to strike");
        SpotSource::Fallback
    };

    let mut surface = build_option_surface(quotes, &source, expiry, config)?;
    surface.diagnostics.load = Some(report);

    let output = batch.output_dir.join(option_output_name(expiry));
    write_surface(&surface.tensor, &output)?;
    Ok(output)
}

fn run_equity(batch: &BatchConfig, config: &SurfaceConfig, expiry: &str) -> SurfaceResult<PathBuf> {
    let input = batch
        .input_dir
        .join(equity_input_name(&batch.symbol, expiry));
    let tensor = build_equity_surface_from_csv(&input, expiry, config)?;

    let output = batch.output_dir.join(equity_output_name(expiry));
    write_surface(&tensor, &output)?;
    Ok(output)
}

/// Build and write every requested surface for every expiry in `batch`.
///
/// The batch symbol overrides `config.symbol`.
pub fn run_batch(batch: &BatchConfig, config: &SurfaceConfig) -> BatchReport {
    let config = SurfaceConfig {
        symbol: batch.symbol.clone(),
        ..config.clone()
    };
    let mut report = BatchReport::default();

    if let Err(e) = fs::create_dir_all(&batch.output_dir) {
        error!(path = %batch.output_dir.display(), error = %e, "cannot create output directory");
    }

    for expiry in &batch.expiries {
        let mut jobs = Vec::new();
        if batch.kind.runs_options() {
            jobs.push(SurfaceKind::Options);
        }
        if batch.kind.runs_equity() {
            jobs.push(SurfaceKind::Equity);
        }

        for kind in jobs {
            let result = match kind {
                SurfaceKind::Options => run_options(batch, &config, expiry),
                SurfaceKind::Equity => run_equity(batch, &config, expiry),
            };
            match &result {
                Ok(path) => info!(expiry = %expiry, %kind, path = %path.display(), "saved"),
                Err(e) => error!(expiry = %expiry, %kind, error = %e, "expiry failed, continuing"),
            }
            report.outcomes.push(ExpiryOutcome {
                expiry: expiry.clone(),
                kind,
                result: result.map_err(|e| e.to_string()),
            });
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    report
}
