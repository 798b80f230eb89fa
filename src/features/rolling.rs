//! Rolling-window statistics over series with gaps
//!
//! A window statistic is defined when the window holds at least `min_periods`
//! present observations; missing entries inside the window are skipped.

use statrs::statistics::Statistics;

/// Percentage change against the previous element; the first element, and any
/// element whose predecessor is zero or missing, is missing.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            out.push(None);
            continue;
        }
        let prev = values[i - 1];
        let change = (v - prev) / prev;
        out.push(if prev != 0.0 && change.is_finite() {
            Some(change)
        } else {
            None
        });
    }
    out
}

fn rolling<F>(values: &[Option<f64>], window: usize, min_periods: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let window = window.max(1);
    let mut buf = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            buf.clear();
            buf.extend(values[start..=i].iter().flatten().copied());
            if buf.is_empty() || buf.len() < min_periods {
                return None;
            }
            let v = stat(&buf);
            v.is_finite().then_some(v)
        })
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(values, window, min_periods, |w| w.iter().mean())
}

/// Sample standard deviation (n - 1 denominator); windows with fewer than two
/// observations are missing.
pub fn rolling_std(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(values, window, min_periods, |w| w.iter().std_dev())
}

/// Quantile with linear interpolation between order statistics, ignoring
/// missing values.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn fill_missing(values: &[Option<f64>], fill: f64) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(fill)).collect()
}
