//! # Surface-Tensor: Gridded Option Surfaces from Tick Data
//!
//! `surface-tensor` turns one trading day of irregular, tick-level option quotes into a dense
//! tensor bundle on a (log-moneyness x normalized time-to-expiry) grid, ready to be consumed
//! as training input by a downstream numerical model.
//!
//! ## Pipeline
//!
//! - **Loading**: CSV quotes are coerced field by field; unusable rows are dropped and counted
//! - **Spot alignment**: as-of join against an underlying series, or an explicit strike fallback
//! - **Features**: returns, rolling entropy, volatility shocks, gaps and co-timed events
//! - **Implied volatility**: Brent inversion of Black-Scholes, in parallel across quotes
//! - **Gap-filling**: failed solves recovered by scattered-data interpolation
//! - **Gridding**: Clough-Tocher interpolation of every field onto the observed coordinates
//! - **Output**: complex price field, seven feature channels and a coverage mask, saved as `.npz`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use surface_tensor::{build_option_surface_from_csv, default_configs, write_surface};
//! use std::path::Path;
//!
//! let config = default_configs::standard();
//! let surface = build_option_surface_from_csv(
//!     "data/OPT_RELIANCE_20250529.csv",
//!     Some(Path::new("data/EQT_RELIANCE_20250529.csv")),
//!     "20250529",
//!     &config,
//! )?;
//!
//! println!(
//!     "{} x {} grid, {:.1}% covered",
//!     surface.tensor.nt(),
//!     surface.tensor.nx(),
//!     100.0 * surface.tensor.coverage()
//! );
//! write_surface(&surface.tensor, "out/OPT_PINN_TRAIN_DATA_20250529.npz")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Presets
//!
//! - `standard()`: the reference constants, parallel volatility solves
//! - `reproducible()`: same numerics, solves on the calling thread
//! - `linear()`: piecewise-linear instead of piecewise-cubic interpolation

// ================================================================================================
// MODULES
// ================================================================================================

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod interp;
pub mod models;
pub mod store;
pub mod surface;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Configuration and errors
pub use config::{BatchConfig, BuilderKind, InterpolationMethod, RunConfig, SurfaceConfig};
pub use error::{SurfaceError, SurfaceResult};

// Input records and spot alignment
pub use data::{
    align_spot, load_equity_ticks, load_option_quotes, load_underlying, EquityTick, LoadReport,
    OptionSide, Quote, SpotSource, UnderlyingTick,
};

// Pricing and implied volatility
pub use models::bs::{bs_delta, bs_price};
pub use models::iv::{solve_implied_vols, ImpliedVolSolver, IvOutcome, IvSolveError, IvSolveSummary};

// Scattered-data interpolation
pub use interp::{
    CloughTocher, InterpolationError, LinearTriangulation, PiecewiseSurface, SampleSites,
    ScatteredInterpolator, SurfaceFn,
};

// Surface builders and persistence
pub use batch::{run_batch, BatchReport, ExpiryOutcome};
pub use store::{read_surface, write_surface};
pub use surface::{
    build_equity_surface, build_equity_surface_from_csv, build_option_surface,
    build_option_surface_from_csv, build_option_surface_with, OptionSurface, SurfaceDiagnostics,
    SurfaceTensor, EQUITY_CHANNELS, OPTION_CHANNELS,
};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured surface settings for common use cases.
///
/// # Available Configurations
///
/// - [`standard()`]: Reference constants for production batches
/// - [`reproducible()`]: Single-threaded volatility solves
/// - [`linear()`]: Piecewise-linear gridding
pub mod default_configs {
    use crate::config::{InterpolationMethod, SurfaceConfig};

    /// Reference configuration.
    ///
    /// **Characteristics:**
    /// - Risk-free rate 5%, 365-day year
    /// - Volatility bracket (1e-6, 5.0), at most 100 Brent iterations
    /// - Return window 3, entropy window 5, shock quantile 0.85, gap threshold 5
    /// - Clough-Tocher interpolation, parallel volatility solves
    ///
    /// # Example
    ///
    /// ```rust
    /// use surface_tensor::default_configs;
    ///
    /// let config = default_configs::standard();
    /// assert_eq!(config.iv_max_iterations, 100);
    /// ```
    pub fn standard() -> SurfaceConfig {
        SurfaceConfig::default()
    }

    /// Reference numerics with the volatility solves kept on the calling thread.
    ///
    /// **Use Cases:**
    /// - Debugging a single expiry
    /// - Comparing runs bit for bit
    pub fn reproducible() -> SurfaceConfig {
        SurfaceConfig::sequential()
    }

    /// Piecewise-linear gridding over the same triangulation.
    ///
    /// Cheaper than the cubic default and never overshoots the observed range,
    /// at the cost of a surface that is only continuous, not smooth.
    ///
    /// # Example
    ///
    /// ```rust
    /// use surface_tensor::{default_configs, InterpolationMethod};
    ///
    /// let config = default_configs::linear();
    /// assert_eq!(config.interpolation, InterpolationMethod::Linear);
    /// ```
    pub fn linear() -> SurfaceConfig {
        SurfaceConfig {
            interpolation: InterpolationMethod::Linear,
            ..SurfaceConfig::default()
        }
    }
}

/// Build an option surface from in-memory quotes using the engine named in the configuration.
///
/// Thin convenience over [`build_option_surface`] for callers holding an underlying series as
/// plain `(timestamp, price)` ticks, or none at all.
///
/// # Arguments
///
/// * `quotes` - Cleaned option quotes for a single expiry and trading day, in any order
/// * `underlying` - Underlying price ticks; `None` selects the strike-price spot fallback, under
///   which every quote is treated as at-the-money
/// * `expiry` - Expiry identifier stored in the output bundle
/// * `config` - Surface settings; see [`default_configs`]
///
/// # Errors
///
/// * [`SurfaceError::EmptyInput`] if `quotes` is empty
/// * [`SurfaceError::DegenerateNormalization`] if no quote has a positive days-to-expiry
/// * [`SurfaceError::InvalidInput`] if an observed underlying series is empty, or no quote ends up
///   with grid coordinates
///
/// Volatility solve failures are not errors: they are recovered by gap-filling where possible and
/// otherwise show up as NaN cells, reported in [`SurfaceDiagnostics`].
///
/// # Example
///
/// ```rust,no_run
/// use surface_tensor::{surface_from_quotes, default_configs, Quote};
///
/// # fn todays_quotes() -> Vec<Quote> { vec![] }
/// let surface = surface_from_quotes(todays_quotes(), None, "20250529", &default_configs::standard())?;
/// assert_eq!(surface.tensor.channels(), 7);
/// # Ok::<(), surface_tensor::SurfaceError>(())
/// ```
pub fn surface_from_quotes(
    quotes: Vec<Quote>,
    underlying: Option<Vec<UnderlyingTick>>,
    expiry: &str,
    config: &SurfaceConfig,
) -> SurfaceResult<OptionSurface> {
    let source = match underlying {
        Some(ticks) => SpotSource::Observed(ticks),
        None => SpotSource::Fallback,
    };
    build_option_surface(quotes, &source, expiry, config)
}
