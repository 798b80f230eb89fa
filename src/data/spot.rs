//! Spot alignment
//!
//! Attaches an underlying price to every option quote. The caller chooses the
//! source explicitly: an observed underlying series joined as-of on timestamp,
//! or the strike-price fallback.

use tracing::warn;

use super::types::{Quote, UnderlyingTick};
use crate::error::{SurfaceError, SurfaceResult};

/// Where quote spot prices come from
#[derive(Debug, Clone, PartialEq)]
pub enum SpotSource {
    /// Underlying price series, joined backward as-of on timestamp
    Observed(Vec<UnderlyingTick>),
    /// Approximate spot by each quote's own strike.
    ///
    /// This is a degraded stand-in, not a market estimate: every quote ends up
    /// at-the-money (log-moneyness 0), which collapses the moneyness axis of the
    /// output grid to a single column.
    Fallback,
}

impl SpotSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SpotSource::Fallback)
    }
}

/// Return one spot price per quote, in quote order.
///
/// `quotes` must already be sorted by timestamp. With an observed series each
/// quote takes the last tick at or before its timestamp; quotes that precede
/// the first tick take the first tick's price.
pub fn align_spot(quotes: &[Quote], source: &SpotSource) -> SurfaceResult<Vec<f64>> {
    match source {
        SpotSource::Fallback => {
            warn!(
                quotes = quotes.len(),
                "no underlying series supplied, approximating spot by strike"
            );
            Ok(quotes.iter().map(|q| q.strike).collect())
        }
        SpotSource::Observed(ticks) => {
            if ticks.is_empty() {
                return Err(SurfaceError::invalid_input(
                    "observed spot source contains no usable ticks",
                ));
            }

            let mut series = ticks.clone();
            series.sort_by_key(|t| t.timestamp);

            let mut spots = Vec::with_capacity(quotes.len());
            let mut cursor = 0usize;
            let mut current: Option<f64> = None;
            let mut backfilled = 0usize;

            for quote in quotes {
                while cursor < series.len() && series[cursor].timestamp <= quote.timestamp {
                    current = Some(series[cursor].price);
                    cursor += 1;
                }
                match current {
                    Some(price) => spots.push(price),
                    None => {
                        backfilled += 1;
                        spots.push(series[0].price);
                    }
                }
            }

            if backfilled > 0 {
                warn!(
                    backfilled,
                    "quotes precede the first underlying tick, using its price"
                );
            }
            Ok(spots)
        }
    }
}
