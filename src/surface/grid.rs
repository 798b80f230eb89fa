use ndarray::Array1;

/// Output grid: the distinct observed coordinates on each axis
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGrid {
    /// Log-moneyness, strictly increasing
    pub x: Vec<f64>,
    /// Normalized time to expiry, strictly increasing
    pub tt: Vec<f64>,
}

impl SurfaceGrid {
    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn nt(&self) -> usize {
        self.tt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.tt.is_empty()
    }

    /// All `(x, t)` nodes in row-major order: time outer, moneyness inner,
    /// so node `i * nx + j` sits at `(x[j], tt[i])`.
    pub fn mesh(&self) -> Vec<(f64, f64)> {
        self.tt
            .iter()
            .flat_map(|&t| self.x.iter().map(move |&x| (x, t)))
            .collect()
    }

    pub fn x_array(&self) -> Array1<f64> {
        Array1::from_vec(self.x.clone())
    }

    pub fn tt_array(&self) -> Array1<f64> {
        Array1::from_vec(self.tt.clone())
    }
}

/// Sorted distinct finite values; no resampling
pub fn unique_sorted(values: &[Option<f64>]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

pub fn build_grid(log_moneyness: &[Option<f64>], t_normalized: &[Option<f64>]) -> SurfaceGrid {
    SurfaceGrid {
        x: unique_sorted(log_moneyness),
        tt: unique_sorted(t_normalized),
    }
}
