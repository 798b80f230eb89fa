//! Implied volatility by bracketed root finding
//!
//! Each quote is inverted independently with Brent's method over a fixed
//! volatility bracket. A failed solve is an ordinary outcome, not an error:
//! the quote's volatility is left missing and recovered later by the
//! gap-filling pass.

use rayon::prelude::*;
use roots::{find_root_brent, SearchError, SimpleConvergency};
use thiserror::Error;
use tracing::debug;

use super::bs::bs_price;
use super::utils::years_to_expiry;
use crate::config::SurfaceConfig;
use crate::data::{OptionSide, Quote};

/// Why a single implied volatility solve produced no value
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvSolveError {
    /// The target price is not attainable for any volatility in the bracket
    #[error("no sign change over the volatility bracket")]
    NoSignChange,
    /// Brent did not converge within the iteration budget
    #[error("iteration limit exceeded")]
    IterationLimitExceeded,
    /// Spot, time or price missing or non-positive
    #[error("invalid solver input")]
    InvalidInput,
}

/// Brent solver over a fixed volatility bracket
#[derive(Debug, Clone, Copy)]
pub struct ImpliedVolSolver {
    pub lower: f64,
    pub upper: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ImpliedVolSolver {
    fn default() -> Self {
        Self::from_config(&SurfaceConfig::default())
    }
}

impl ImpliedVolSolver {
    pub fn from_config(config: &SurfaceConfig) -> Self {
        Self {
            lower: config.iv_lower,
            upper: config.iv_upper,
            max_iterations: config.iv_max_iterations,
            tolerance: config.iv_tolerance,
        }
    }

    /// Find the volatility in `(lower, upper)` whose model price matches `price`.
    pub fn solve(
        &self,
        spot: f64,
        strike: f64,
        t_years: f64,
        rate: f64,
        price: f64,
        side: OptionSide,
    ) -> Result<f64, IvSolveError> {
        let inputs_ok = [spot, strike, t_years, price]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
            && rate.is_finite();
        if !inputs_ok {
            return Err(IvSolveError::InvalidInput);
        }

        let objective = |sigma: f64| bs_price(spot, strike, t_years, rate, sigma, side) - price;
        let mut convergency = SimpleConvergency {
            eps: self.tolerance,
            max_iter: self.max_iterations,
        };

        match find_root_brent(self.lower, self.upper, objective, &mut convergency) {
            Ok(sigma) if sigma.is_finite() => Ok(sigma),
            Ok(_) => Err(IvSolveError::IterationLimitExceeded),
            Err(SearchError::NoBracketing) => Err(IvSolveError::NoSignChange),
            Err(_) => Err(IvSolveError::IterationLimitExceeded),
        }
    }
}

/// Where a quote's implied volatility came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IvOutcome {
    /// Present in the input file
    Supplied(f64),
    /// Recovered by inverting the pricer
    Solved(f64),
    /// The solve failed; gap-filling may still recover a value
    Failed(IvSolveError),
}

impl IvOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            IvOutcome::Supplied(v) | IvOutcome::Solved(v) => Some(*v),
            IvOutcome::Failed(_) => None,
        }
    }
}

/// Tally of solver outcomes across a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IvSolveSummary {
    pub supplied: usize,
    pub solved: usize,
    pub no_sign_change: usize,
    pub iteration_limit: usize,
    pub invalid_input: usize,
}

impl IvSolveSummary {
    pub fn from_outcomes(outcomes: &[IvOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                IvOutcome::Supplied(_) => summary.supplied += 1,
                IvOutcome::Solved(_) => summary.solved += 1,
                IvOutcome::Failed(IvSolveError::NoSignChange) => summary.no_sign_change += 1,
                IvOutcome::Failed(IvSolveError::IterationLimitExceeded) => {
                    summary.iteration_limit += 1
                }
                IvOutcome::Failed(IvSolveError::InvalidInput) => summary.invalid_input += 1,
            }
        }
        summary
    }

    pub fn failed(&self) -> usize {
        self.no_sign_change + self.iteration_limit + self.invalid_input
    }
}

fn solve_one(
    solver: &ImpliedVolSolver,
    quote: &Quote,
    spot: f64,
    rate: f64,
    days_per_year: f64,
) -> IvOutcome {
    if let Some(iv) = quote.iv {
        return IvOutcome::Supplied(iv);
    }
    let Some(dte) = quote.dte else {
        return IvOutcome::Failed(IvSolveError::InvalidInput);
    };
    match solver.solve(
        spot,
        quote.strike,
        years_to_expiry(dte, days_per_year),
        rate,
        quote.ltp,
        quote.side,
    ) {
        Ok(sigma) => IvOutcome::Solved(sigma),
        Err(e) => IvOutcome::Failed(e),
    }
}

/// Solve every quote that has no supplied volatility.
///
/// Solves are independent, so with `config.parallel_iv` they run on the rayon
/// pool; the order-preserving collect keeps outcome `i` attached to quote `i`.
pub fn solve_implied_vols(quotes: &[Quote], spots: &[f64], config: &SurfaceConfig) -> Vec<IvOutcome> {
    let solver = ImpliedVolSolver::from_config(config);
    let rate = config.risk_free_rate;
    let days = config.days_per_year;

    let outcomes: Vec<IvOutcome> = if config.parallel_iv {
        quotes
            .par_iter()
            .zip(spots.par_iter())
            .map(|(q, &s)| solve_one(&solver, q, s, rate, days))
            .collect()
    } else {
        quotes
            .iter()
            .zip(spots.iter())
            .map(|(q, &s)| solve_one(&solver, q, s, rate, days))
            .collect()
    };

    let summary = IvSolveSummary::from_outcomes(&outcomes);
    debug!(
        supplied = summary.supplied,
        solved = summary.solved,
        no_sign_change = summary.no_sign_change,
        iteration_limit = summary.iteration_limit,
        invalid_input = summary.invalid_input,
        "implied volatility solve finished"
    );
    outcomes
}
