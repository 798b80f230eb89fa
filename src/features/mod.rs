//! Per-quote feature derivation
//!
//! Runs after spot alignment and before the implied volatility solve. All
//! signals are computed over the whole day in timestamp order:
//!
//! - log-moneyness `ln(K/S)` and normalized time `DTE / max(DTE)`
//! - percentage return of LTP and its rolling mean (the imaginary part of the field)
//! - entropy `ln(1 + rolling std(return))`, a local noise proxy
//! - volatility shock: entropy strictly above its day quantile
//! - gap: `LTP - BuyPrice` above a fixed threshold
//! - event day: the quote shares its timestamp with an earlier quote

pub mod rolling;

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::SurfaceConfig;
use crate::data::Quote;
use crate::error::{SurfaceError, SurfaceResult};
use crate::models::utils::log_moneyness;
use rolling::{fill_missing, pct_change, quantile, rolling_mean, rolling_std};

/// Derived per-quote signals, one entry per quote in quote order
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    pub spot: Vec<f64>,
    pub log_moneyness: Vec<Option<f64>>,
    pub t_normalized: Vec<Option<f64>>,
    /// Percentage change of LTP, first quote 0
    pub returns: Vec<f64>,
    /// Rolling mean of `returns`, incomplete windows 0
    pub return_proxy: Vec<f64>,
    pub entropy: Vec<f64>,
    pub vol_shock: Vec<f64>,
    pub gap: Vec<f64>,
    pub event_day: Vec<f64>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.spot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spot.is_empty()
    }

    /// `(log-moneyness, normalized time)` pairs in quote order
    pub fn coordinates(&self) -> Vec<(Option<f64>, Option<f64>)> {
        self.log_moneyness
            .iter()
            .copied()
            .zip(self.t_normalized.iter().copied())
            .collect()
    }
}

/// Scale days-to-expiry into `[0, 1]` by the batch maximum.
///
/// Fails with [`SurfaceError::DegenerateNormalization`] when no quote has a
/// positive DTE, instead of producing infinite or NaN coordinates.
pub fn normalize_time(dte: &[Option<f64>]) -> SurfaceResult<Vec<Option<f64>>> {
    let max_dte = dte
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !(max_dte > 0.0) {
        return Err(SurfaceError::DegenerateNormalization {
            max_dte: if max_dte.is_finite() { max_dte } else { 0.0 },
        });
    }
    Ok(dte.iter().map(|d| d.map(|d| d / max_dte)).collect())
}

/// 1 for every quote whose timestamp already appeared earlier in the day.
pub fn duplicate_flags(timestamps: &[NaiveDateTime]) -> Vec<f64> {
    let mut seen = HashSet::with_capacity(timestamps.len());
    timestamps
        .iter()
        .map(|ts| if seen.insert(*ts) { 0.0 } else { 1.0 })
        .collect()
}

/// 1 where `LTP - BuyPrice > threshold`; a missing buy price never flags.
pub fn gap_flags(ltp: &[f64], buy_price: &[Option<f64>], threshold: f64) -> Vec<f64> {
    ltp.iter()
        .zip(buy_price)
        .map(|(p, b)| match b {
            Some(b) if p - b > threshold => 1.0,
            _ => 0.0,
        })
        .collect()
}

/// 1 where entropy is strictly above the given quantile of the whole series.
pub fn shock_flags(entropy: &[Option<f64>], q: f64) -> Vec<f64> {
    let Some(threshold) = quantile(entropy, q) else {
        return vec![0.0; entropy.len()];
    };
    entropy
        .iter()
        .map(|e| match e {
            Some(e) if *e > threshold => 1.0,
            _ => 0.0,
        })
        .collect()
}

/// `ln(1 + rolling std)` of a return series
pub fn entropy_series(
    returns: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    rolling_std(returns, window, min_periods)
        .into_iter()
        .map(|s| s.map(f64::ln_1p))
        .collect()
}

/// Derive every option feature for time-ordered `quotes` with aligned `spots`.
pub fn engineer_option_features(
    quotes: &[Quote],
    spots: &[f64],
    config: &SurfaceConfig,
) -> SurfaceResult<FeatureFrame> {
    if quotes.len() != spots.len() {
        return Err(SurfaceError::invalid_input(format!(
            "{} quotes but {} spot prices",
            quotes.len(),
            spots.len()
        )));
    }

    let log_moneyness: Vec<Option<f64>> = quotes
        .iter()
        .zip(spots)
        .map(|(q, &s)| log_moneyness(q.strike, s))
        .collect();

    let dte: Vec<Option<f64>> = quotes.iter().map(|q| q.dte).collect();
    let t_normalized = normalize_time(&dte)?;

    let ltp: Vec<f64> = quotes.iter().map(|q| q.ltp).collect();
    let returns = fill_missing(&pct_change(&ltp), 0.0);
    let present: Vec<Option<f64>> = returns.iter().map(|r| Some(*r)).collect();

    let window = config.option_return_window;
    let return_proxy = fill_missing(&rolling_mean(&present, window, window), 0.0);

    let entropy = fill_missing(
        &entropy_series(&present, config.entropy_window, config.entropy_window),
        0.0,
    );
    let entropy_present: Vec<Option<f64>> = entropy.iter().map(|e| Some(*e)).collect();
    let vol_shock = shock_flags(&entropy_present, config.vol_shock_quantile);

    let buy: Vec<Option<f64>> = quotes.iter().map(|q| q.buy_price).collect();
    let gap = gap_flags(&ltp, &buy, config.gap_threshold);

    let timestamps: Vec<NaiveDateTime> = quotes.iter().map(|q| q.timestamp).collect();
    let event_day = duplicate_flags(&timestamps);

    debug!(
        quotes = quotes.len(),
        shocks = vol_shock.iter().filter(|v| **v > 0.0).count(),
        gaps = gap.iter().filter(|v| **v > 0.0).count(),
        events = event_day.iter().filter(|v| **v > 0.0).count(),
        "engineered option features"
    );

    Ok(FeatureFrame {
        spot: spots.to_vec(),
        log_moneyness,
        t_normalized,
        returns,
        return_proxy,
        entropy,
        vol_shock,
        gap,
        event_day,
    })
}
