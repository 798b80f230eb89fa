use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};

/// Scattered-data engine used for gap-filling and gridding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Piecewise-cubic Clough-Tocher patches over a Delaunay triangulation
    #[default]
    CloughTocher,
    /// Piecewise-linear barycentric interpolation over the same triangulation
    Linear,
}

/// Main configuration struct for surface construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Continuously compounded risk-free rate used by the pricer
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Day count used to turn DTE into years
    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,

    /// Lower end of the volatility search bracket
    #[serde(default = "default_iv_lower")]
    pub iv_lower: f64,

    /// Upper end of the volatility search bracket
    #[serde(default = "default_iv_upper")]
    pub iv_upper: f64,

    /// Iteration budget for the Brent solve
    #[serde(default = "default_iv_max_iterations")]
    pub iv_max_iterations: usize,

    /// Convergence tolerance on both the price residual and the bracket width
    #[serde(default = "default_iv_tolerance")]
    pub iv_tolerance: f64,

    /// Rolling window for the option return proxy
    #[serde(default = "default_option_return_window")]
    pub option_return_window: usize,

    /// Rolling window for the equity return proxy
    #[serde(default = "default_equity_return_window")]
    pub equity_return_window: usize,

    /// Rolling window for the entropy (noise) signal
    #[serde(default = "default_entropy_window")]
    pub entropy_window: usize,

    /// Quantile of the day's entropy above which a quote is a volatility shock
    #[serde(default = "default_vol_shock_quantile")]
    pub vol_shock_quantile: f64,

    /// Absolute LTP - BuyPrice spread above which a quote is flagged as a gap
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,

    /// Fan the per-quote implied volatility solves out over the rayon pool
    #[serde(default = "default_parallel_iv")]
    pub parallel_iv: bool,

    #[serde(default)]
    pub interpolation: InterpolationMethod,

    /// Underlying symbol written into the output bundle
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            days_per_year: default_days_per_year(),
            iv_lower: default_iv_lower(),
            iv_upper: default_iv_upper(),
            iv_max_iterations: default_iv_max_iterations(),
            iv_tolerance: default_iv_tolerance(),
            option_return_window: default_option_return_window(),
            equity_return_window: default_equity_return_window(),
            entropy_window: default_entropy_window(),
            vol_shock_quantile: default_vol_shock_quantile(),
            gap_threshold: default_gap_threshold(),
            parallel_iv: default_parallel_iv(),
            interpolation: InterpolationMethod::default(),
            symbol: default_symbol(),
        }
    }
}

impl SurfaceConfig {
    /// Same numerics as the default, with the implied volatility solves run on
    /// the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel_iv: false,
            ..Self::default()
        }
    }

    /// Default configuration for a different underlying
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SurfaceResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SurfaceError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SurfaceResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> SurfaceResult<()> {
        if !(self.iv_lower > 0.0 && self.iv_lower < self.iv_upper && self.iv_upper.is_finite()) {
            return Err(SurfaceError::config(format!(
                "volatility bracket must satisfy 0 < lower < upper, got ({}, {})",
                self.iv_lower, self.iv_upper
            )));
        }
        if self.iv_max_iterations == 0 {
            return Err(SurfaceError::config("iv_max_iterations must be positive"));
        }
        if !(self.iv_tolerance > 0.0) {
            return Err(SurfaceError::config("iv_tolerance must be positive"));
        }
        if !(self.days_per_year > 0.0) {
            return Err(SurfaceError::config("days_per_year must be positive"));
        }
        if self.option_return_window == 0
            || self.equity_return_window == 0
            || self.entropy_window == 0
        {
            return Err(SurfaceError::config("rolling windows must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.vol_shock_quantile) {
            return Err(SurfaceError::config(format!(
                "vol_shock_quantile must lie in [0, 1], got {}",
                self.vol_shock_quantile
            )));
        }
        Ok(())
    }
}

fn default_risk_free_rate() -> f64 {
    0.05
}

fn default_days_per_year() -> f64 {
    365.0
}

fn default_iv_lower() -> f64 {
    1e-6
}

fn default_iv_upper() -> f64 {
    5.0
}

fn default_iv_max_iterations() -> usize {
    100
}

fn default_iv_tolerance() -> f64 {
    1e-10
}

fn default_option_return_window() -> usize {
    3
}

fn default_equity_return_window() -> usize {
    5
}

fn default_entropy_window() -> usize {
    5
}

fn default_vol_shock_quantile() -> f64 {
    0.85
}

fn default_gap_threshold() -> f64 {
    5.0
}

fn default_parallel_iv() -> bool {
    true
}

fn default_symbol() -> String {
    "RELIANCE".to_string()
}

// ================================================================================================
// BATCH DRIVER CONFIGURATION
// ================================================================================================

/// Which builders the batch driver runs per expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderKind {
    Options,
    Equity,
    #[default]
    Both,
}

impl BuilderKind {
    pub fn runs_options(&self) -> bool {
        matches!(self, BuilderKind::Options | BuilderKind::Both)
    }

    pub fn runs_equity(&self) -> bool {
        matches!(self, BuilderKind::Equity | BuilderKind::Both)
    }
}

impl FromStr for BuilderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "options" | "option" | "opt" => Ok(BuilderKind::Options),
            "equity" | "eqt" => Ok(BuilderKind::Equity),
            "both" | "all" => Ok(BuilderKind::Both),
            other => Err(format!(
                "unknown builder kind '{other}', expected options, equity or both"
            )),
        }
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuilderKind::Options => "options",
            BuilderKind::Equity => "equity",
            BuilderKind::Both => "both",
        };
        f.write_str(name)
    }
}

/// Inputs for one batch run over a list of expiries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Expiry identifiers, e.g. `20250529`
    #[serde(default)]
    pub expiries: Vec<String>,

    #[serde(default = "default_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub kind: BuilderKind,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            expiries: Vec::new(),
            input_dir: default_dir(),
            output_dir: default_dir(),
            kind: BuilderKind::default(),
        }
    }
}

impl BatchConfig {
    pub fn from_toml_str(text: &str) -> SurfaceResult<Self> {
        toml::from_str(text).map_err(|e| SurfaceError::config(e.to_string()))
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Combined TOML file layout: surface settings at the top level, batch settings
/// under `[batch]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(flatten)]
    pub surface: SurfaceConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> SurfaceResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SurfaceError::config(e.to_string()))?;
        config.surface.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SurfaceResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}
