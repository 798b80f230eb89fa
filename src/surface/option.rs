//! Option surface construction
//!
//! Stage order is fixed: spot alignment, feature derivation, implied volatility
//! solve, gap-filling, delta, then gridding. Delta consumes the filled
//! volatilities, so it cannot start before gap-filling has finished.

use std::path::Path;

use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::grid::{build_grid, SurfaceGrid};
use super::iv_fill::fill_missing_iv;
use super::tensor::{SurfaceTensor, OPTION_CHANNELS};
use crate::config::SurfaceConfig;
use crate::data::{
    align_spot, load_option_quotes_from_path, load_underlying_from_path, LoadReport, Quote,
    SpotSource,
};
use crate::error::{SurfaceError, SurfaceResult};
use crate::features::engineer_option_features;
use crate::interp::{InterpolationError, SampleSites, ScatteredInterpolator, SurfaceFn};
use crate::models::bs::bs_delta;
use crate::models::iv::{solve_implied_vols, IvOutcome, IvSolveSummary};
use crate::models::utils::years_to_expiry;

/// What happened along the way; not serialized with the tensor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceDiagnostics {
    /// Row accounting, when the surface was built from a file
    pub load: Option<LoadReport>,
    pub spot_fallback: bool,
    pub iv: IvSolveSummary,
    /// Volatilities recovered by gap-filling
    pub iv_recovered: usize,
    /// Volatilities still missing after gap-filling
    pub iv_missing: usize,
    /// Gridded fields left all-NaN for lack of fit data
    pub skipped_fields: Vec<&'static str>,
    pub quotes: usize,
}

/// A built option surface together with its diagnostics
#[derive(Debug, Clone)]
pub struct OptionSurface {
    pub tensor: SurfaceTensor,
    pub diagnostics: SurfaceDiagnostics,
}

/// Build the option surface with the engine named in `config.interpolation`.
pub fn build_option_surface(
    quotes: Vec<Quote>,
    spot: &SpotSource,
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<OptionSurface> {
    build_option_surface_with(&config.interpolation, quotes, spot, expiry, config)
}

/// Build the option surface with an explicit scattered-data engine, used both
/// for gap-filling and for gridding.
pub fn build_option_surface_with<I>(
    interpolator: &I,
    mut quotes: Vec<Quote>,
    spot: &SpotSource,
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<OptionSurface>
where
    I: ScatteredInterpolator + Sync,
{
    config.validate()?;
    if quotes.is_empty() {
        return Err(SurfaceError::empty_input(format!(
            "no option quotes for expiry {expiry}"
        )));
    }
    quotes.sort_by_key(|q| q.timestamp);

    let spots = align_spot(&quotes, spot)?;
    let frame = engineer_option_features(&quotes, &spots, config)?;

    let outcomes = solve_implied_vols(&quotes, &spots, config);
    let iv_summary = IvSolveSummary::from_outcomes(&outcomes);
    if iv_summary.failed() > 0 {
        warn!(
            failed = iv_summary.failed(),
            no_sign_change = iv_summary.no_sign_change,
            iteration_limit = iv_summary.iteration_limit,
            "implied volatility solve failed for some quotes"
        );
    }

    let coordinates = frame.coordinates();
    let solved: Vec<Option<f64>> = outcomes.iter().map(IvOutcome::value).collect();
    let filled = fill_missing_iv(interpolator, &coordinates, &solved);

    let delta: Vec<Option<f64>> = quotes
        .iter()
        .zip(&spots)
        .zip(&filled.iv)
        .map(|((q, &s), iv)| {
            let (iv, dte) = ((*iv)?, q.dte?);
            let t = years_to_expiry(dte, config.days_per_year);
            let d = bs_delta(s, q.strike, t, config.risk_free_rate, iv, q.side);
            d.is_finite().then_some(d)
        })
        .collect();

    let grid = build_grid(&frame.log_moneyness, &frame.t_normalized);
    if grid.is_empty() {
        return Err(SurfaceError::invalid_input(
            "no quote has both a log-moneyness and a normalized time",
        ));
    }

    let as_values = |col: &[Option<f64>]| -> Vec<f64> {
        col.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    };
    let columns: Vec<(&'static str, Vec<f64>)> = vec![
        ("price", quotes.iter().map(|q| q.ltp).collect()),
        ("return_proxy", frame.return_proxy.clone()),
        (
            "open_interest",
            quotes
                .iter()
                .map(|q| q.open_interest.map_or(f64::NAN, |oi| oi as f64))
                .collect(),
        ),
        ("delta", as_values(&delta)),
        ("entropy", frame.entropy.clone()),
        ("vol_shock", frame.vol_shock.clone()),
        ("gap", frame.gap.clone()),
        ("event_day", frame.event_day.clone()),
        ("iv", as_values(&filled.iv)),
    ];

    let points: Vec<(f64, f64)> = coordinates
        .iter()
        .map(|(x, t)| (x.unwrap_or(f64::NAN), t.unwrap_or(f64::NAN)))
        .collect();
    let mesh = grid.mesh();
    let sites = SampleSites::new(&points);
    debug!(sites = sites.len(), "triangulated quote coordinates");

    let gridded: Vec<(&'static str, Option<Vec<f64>>)> = columns
        .par_iter()
        .map(|(name, values)| (*name, interpolate_field(interpolator, &sites, values, &mesh)))
        .collect();

    let mut skipped_fields = Vec::new();
    let fields: Vec<Vec<f64>> = gridded
        .into_iter()
        .map(|(name, values)| {
            values.unwrap_or_else(|| {
                warn!(field = name, "no fit data, field left empty");
                skipped_fields.push(name);
                vec![f64::NAN; mesh.len()]
            })
        })
        .collect();

    let tensor = assemble(&grid, &fields, &config.symbol, expiry)?;

    let diagnostics = SurfaceDiagnostics {
        load: None,
        spot_fallback: spot.is_fallback(),
        iv: iv_summary,
        iv_recovered: filled.recovered,
        iv_missing: filled.missing,
        skipped_fields,
        quotes: quotes.len(),
    };

    info!(
        symbol = %config.symbol,
        expiry,
        quotes = quotes.len(),
        nx = tensor.nx(),
        nt = tensor.nt(),
        coverage = tensor.coverage(),
        "option surface built"
    );

    Ok(OptionSurface {
        tensor,
        diagnostics,
    })
}

/// Load quotes (and, if given, the underlying series) from CSV and build the surface.
///
/// Without an underlying file the strike-price spot fallback is used.
pub fn build_option_surface_from_csv(
    option_csv: impl AsRef<Path>,
    underlying_csv: Option<&Path>,
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<OptionSurface> {
    let (quotes, report) = load_option_quotes_from_path(option_csv)?;
    let source = match underlying_csv {
        Some(path) => {
            let (ticks, _) = load_underlying_from_path(path)?;
            SpotSource::Observed(ticks)
        }
        None => SpotSource::Fallback,
    };

    let mut surface = build_option_surface(quotes, &source, expiry, config)?;
    surface.diagnostics.load = Some(report);
    Ok(surface)
}

/// `None` when the field has no finite sample to fit.
fn interpolate_field<I: ScatteredInterpolator>(
    interpolator: &I,
    sites: &SampleSites,
    values: &[f64],
    mesh: &[(f64, f64)],
) -> Option<Vec<f64>> {
    match interpolator.fit_sites(sites, values) {
        Ok(surface) => Some(surface.evaluate_many(mesh)),
        Err(InterpolationError::InsufficientFitData) => None,
        Err(e) => {
            debug!(error = %e, "field interpolation failed");
            None
        }
    }
}

/// Stack gridded fields (price, return proxy, then the seven channels) into a tensor.
fn assemble(
    grid: &SurfaceGrid,
    fields: &[Vec<f64>],
    symbol: &str,
    expiry: &str,
) -> SurfaceResult<SurfaceTensor> {
    let (nt, nx) = (grid.nt(), grid.nx());
    let channels = OPTION_CHANNELS.len();
    debug_assert_eq!(fields.len(), channels + 2);

    let uu = Array2::from_shape_fn((nt, nx), |(i, j)| {
        let k = i * nx + j;
        Complex64::new(fields[0][k], fields[1][k])
    });
    let features = Array3::from_shape_fn((nt, nx, channels), |(i, j, c)| fields[c + 2][i * nx + j]);

    SurfaceTensor::new(grid.x_array(), grid.tt_array(), uu, features, symbol, expiry)
}
