use tracing::{debug, warn};

use crate::interp::{InterpolationError, ScatteredInterpolator, SurfaceFn};

/// Result of the gap-filling pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IvFill {
    /// One entry per quote; solved values are kept as they were
    pub iv: Vec<Option<f64>>,
    /// Quotes whose volatility came from the interpolant
    pub recovered: usize,
    /// Quotes still without a volatility afterwards
    pub missing: usize,
}

/// Replace missing volatilities by interpolating the valid ones over the
/// `(log-moneyness, normalized time)` plane.
///
/// The interpolant is fitted on every quote with a coordinate and a valid
/// volatility and evaluated at every quote; only the missing entries take the
/// estimate. Quotes outside the hull of the valid ones stay missing, and with
/// no valid quote at all the column is returned unchanged.
pub fn fill_missing_iv<I: ScatteredInterpolator>(
    interpolator: &I,
    coordinates: &[(Option<f64>, Option<f64>)],
    iv: &[Option<f64>],
) -> IvFill {
    let mut points = Vec::with_capacity(iv.len());
    let mut values = Vec::with_capacity(iv.len());
    for (coord, vol) in coordinates.iter().zip(iv) {
        if let ((Some(x), Some(t)), Some(v)) = (coord, vol) {
            points.push((*x, *t));
            values.push(*v);
        }
    }

    let unchanged = |iv: &[Option<f64>]| IvFill {
        iv: iv.to_vec(),
        recovered: 0,
        missing: iv.iter().filter(|v| v.is_none()).count(),
    };

    if iv.iter().all(Option::is_some) {
        return unchanged(iv);
    }

    let surface = match interpolator.fit(&points, &values) {
        Ok(surface) => surface,
        Err(InterpolationError::InsufficientFitData) => {
            warn!(quotes = iv.len(), "no valid implied volatility to fill from");
            return unchanged(iv);
        }
        Err(e) => {
            warn!(error = %e, "implied volatility gap-fill skipped");
            return unchanged(iv);
        }
    };

    let queries: Vec<(f64, f64)> = coordinates
        .iter()
        .map(|(x, t)| (x.unwrap_or(f64::NAN), t.unwrap_or(f64::NAN)))
        .collect();
    let estimates = surface.evaluate_many(&queries);

    let mut recovered = 0;
    let filled: Vec<Option<f64>> = iv
        .iter()
        .zip(estimates)
        .map(|(v, est)| match v {
            Some(v) => Some(*v),
            None if est.is_finite() => {
                recovered += 1;
                Some(est)
            }
            None => None,
        })
        .collect();

    let missing = filled.iter().filter(|v| v.is_none()).count();
    debug!(recovered, missing, "implied volatility gaps filled");
    IvFill {
        iv: filled,
        recovered,
        missing,
    }
}
