//! Equity surface: the tick series broadcast onto a square grid
//!
//! There is no volatility solve and no interpolation. Row `i` of every output
//! array describes tick `i`; the moneyness axis is `ln(LTP)` per tick and the
//! time axis is evenly spaced over `[0, 1]`, so the grid is `N x N`.

use std::path::Path;

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use tracing::info;

use super::tensor::{SurfaceTensor, EQUITY_CHANNELS};
use crate::config::SurfaceConfig;
use crate::data::{load_equity_ticks_from_path, EquityTick};
use crate::error::{SurfaceError, SurfaceResult};
use crate::features::rolling::{fill_missing, pct_change, rolling_mean};
use crate::features::{duplicate_flags, entropy_series, gap_flags, shock_flags};

/// `n` evenly spaced values over `[0, 1]`; a single value is `0`.
pub fn unit_linspace(n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::zeros(1),
        _ => Array1::linspace(0.0, 1.0, n),
    }
}

pub fn build_equity_surface(
    ticks: &[EquityTick],
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<SurfaceTensor> {
    config.validate()?;
    if ticks.is_empty() {
        return Err(SurfaceError::empty_input(format!(
            "no equity ticks for expiry {expiry}"
        )));
    }

    let mut ticks = ticks.to_vec();
    ticks.sort_by_key(|t| t.timestamp);
    let n = ticks.len();

    let ltp: Vec<f64> = ticks.iter().map(|t| t.ltp).collect();
    let x: Array1<f64> = ltp
        .iter()
        .map(|&p| if p > 0.0 { p.ln() } else { f64::NAN })
        .collect();
    let tt = unit_linspace(n);

    // Undefined returns and entropy stay missing through the shock quantile
    // and are zeroed only on output.
    let returns = rolling_mean(&pct_change(&ltp), config.equity_return_window, 1);
    let entropy = entropy_series(&returns, config.entropy_window, 1);
    let vol_shock = shock_flags(&entropy, config.vol_shock_quantile);
    let returns = fill_missing(&returns, 0.0);
    let entropy = fill_missing(&entropy, 0.0);

    let buy: Vec<Option<f64>> = ticks.iter().map(|t| Some(t.buy_price)).collect();
    let gap = gap_flags(&ltp, &buy, config.gap_threshold);
    let timestamps: Vec<NaiveDateTime> = ticks.iter().map(|t| t.timestamp).collect();
    let event_day = duplicate_flags(&timestamps);

    let uu = Array2::from_shape_fn((n, n), |(i, _)| Complex64::new(ltp[i], returns[i]));
    let channels = [&entropy, &event_day, &gap, &vol_shock];
    debug_assert_eq!(channels.len(), EQUITY_CHANNELS.len());
    let features = Array3::from_shape_fn((n, n, channels.len()), |(i, _, c)| channels[c][i]);

    let tensor = SurfaceTensor::new(x, tt, uu, features, &config.symbol, expiry)?;
    info!(
        symbol = %config.symbol,
        expiry,
        ticks = n,
        coverage = tensor.coverage(),
        "equity surface built"
    );
    Ok(tensor)
}

pub fn build_equity_surface_from_csv(
    equity_csv: impl AsRef<Path>,
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<SurfaceTensor> {
    let (ticks, _) = load_equity_ticks_from_path(equity_csv)?;
    build_equity_surface(&ticks, expiry, config)
}
