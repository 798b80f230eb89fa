// Closed-form lognormal pricing used by the implied-volatility solve and the
// delta channel. The standardized-moneyness denominator carries a small
// additive epsilon so that zero volatility or zero time stays finite.

use crate::data::OptionSide;

/// Added to `sigma * sqrt(T)` in the `d1` denominator
pub const D1_EPSILON: f64 = 1e-8;

pub(crate) fn norm_cdf(x: f64) -> f64 {
    // 0.5 * [1 + erf(x / sqrt(2))]
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

#[allow(non_snake_case)]
fn d1_d2(S: f64, K: f64, T: f64, r: f64, sigma: f64) -> (f64, f64) {
    let vol_sqrt_t = sigma * T.sqrt();
    let d1 = ((S / K).ln() + (r + 0.5 * sigma.powi(2)) * T) / (vol_sqrt_t + D1_EPSILON);
    (d1, d1 - vol_sqrt_t)
}

/// Price of a European option under Black-Scholes assumptions (no dividends).
#[allow(non_snake_case)]
pub fn bs_price(S: f64, K: f64, T: f64, r: f64, sigma: f64, side: OptionSide) -> f64 {
    let (d1, d2) = d1_d2(S, K, T, r, sigma);
    let discounted_strike = K * (-r * T).exp();
    match side {
        OptionSide::Call => S * norm_cdf(d1) - discounted_strike * norm_cdf(d2),
        OptionSide::Put => discounted_strike * norm_cdf(-d2) - S * norm_cdf(-d1),
    }
}

/// Spot delta: `N(d1)` for calls, `-N(-d1)` for puts.
#[allow(non_snake_case)]
pub fn bs_delta(S: f64, K: f64, T: f64, r: f64, sigma: f64, side: OptionSide) -> f64 {
    let (d1, _) = d1_d2(S, K, T, r, sigma);
    match side {
        OptionSide::Call => norm_cdf(d1),
        OptionSide::Put => -norm_cdf(-d1),
    }
}
