use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;

use crate::error::{SurfaceError, SurfaceResult};

/// Feature channels of the option surface, in tensor order
pub const OPTION_CHANNELS: [&str; 7] = [
    "open_interest",
    "delta",
    "entropy",
    "vol_shock",
    "gap",
    "event_day",
    "iv",
];

/// Feature channels of the equity surface, in tensor order
pub const EQUITY_CHANNELS: [&str; 4] = ["entropy", "event_day", "gap", "vol_shock"];

/// Gridded training tensors for one (symbol, expiry) pair.
///
/// `uu`, `mask` and the leading axes of `features` are indexed `[time, moneyness]`.
/// Cells the interpolant could not reach hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceTensor {
    pub x: Array1<f64>,
    pub tt: Array1<f64>,
    /// Real part: price; imaginary part: smoothed return
    pub uu: Array2<Complex64>,
    pub features: Array3<f64>,
    pub mask: Array2<u8>,
    pub symbol: String,
    pub expiry: String,
}

impl SurfaceTensor {
    /// Assemble a tensor, checking that every shape agrees with the axes.
    pub fn new(
        x: Array1<f64>,
        tt: Array1<f64>,
        uu: Array2<Complex64>,
        features: Array3<f64>,
        symbol: impl Into<String>,
        expiry: impl Into<String>,
    ) -> SurfaceResult<Self> {
        let mask = validity_mask(&uu);
        let tensor = Self {
            x,
            tt,
            uu,
            features,
            mask,
            symbol: symbol.into(),
            expiry: expiry.into(),
        };
        tensor.check_shapes()?;
        Ok(tensor)
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn nt(&self) -> usize {
        self.tt.len()
    }

    pub fn channels(&self) -> usize {
        self.features.dim().2
    }

    /// Fraction of grid cells marked valid
    pub fn coverage(&self) -> f64 {
        if self.mask.is_empty() {
            return 0.0;
        }
        self.mask.iter().filter(|m| **m == 1).count() as f64 / self.mask.len() as f64
    }

    pub fn check_shapes(&self) -> SurfaceResult<()> {
        let expected = (self.nt(), self.nx());
        if self.uu.dim() != expected {
            return Err(SurfaceError::invalid_input(format!(
                "uu has shape {:?}, expected {:?}",
                self.uu.dim(),
                expected
            )));
        }
        if self.mask.dim() != expected {
            return Err(SurfaceError::invalid_input(format!(
                "mask has shape {:?}, expected {:?}",
                self.mask.dim(),
                expected
            )));
        }
        let (ft, fx, _) = self.features.dim();
        if (ft, fx) != expected {
            return Err(SurfaceError::invalid_input(format!(
                "features have leading shape {:?}, expected {:?}",
                (ft, fx),
                expected
            )));
        }
        Ok(())
    }
}

/// 1 where the real part is strictly positive; NaN cells are 0.
pub fn validity_mask(uu: &Array2<Complex64>) -> Array2<u8> {
    uu.mapv(|z| u8::from(z.re > 0.0))
}
