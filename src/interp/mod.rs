//! Scattered-data interpolation over the (log-moneyness, normalized-time) plane
//!
//! An engine implementing [`ScatteredInterpolator`] fits a [`SurfaceFn`] to
//! irregular samples. Both engines here share the same preprocessing:
//!
//! 1. Drop samples with a non-finite coordinate or value
//! 2. Rescale coordinates to the unit square (so the two axes weigh equally)
//! 3. Merge samples at identical coordinates by averaging their values
//! 4. Delaunay-triangulate; point sets without area fall back to a line
//!
//! Queries outside the convex hull of the samples evaluate to NaN.

pub mod clough_tocher;
pub mod delaunay;
pub mod line;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::InterpolationMethod;
use delaunay::Triangulation;
use line::LineInterpolant;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// No sample with finite coordinates and value
    #[error("insufficient fit data: no finite samples")]
    InsufficientFitData,

    #[error("{points} sample points but {values} values")]
    LengthMismatch { points: usize, values: usize },
}

/// A fitted surface that can be queried anywhere; NaN means "no value here".
pub trait SurfaceFn {
    fn evaluate(&self, x: f64, y: f64) -> f64;

    fn evaluate_many(&self, points: &[(f64, f64)]) -> Vec<f64> {
        points.iter().map(|&(x, y)| self.evaluate(x, y)).collect()
    }
}

/// Fits a surface through scattered `(x, y) -> value` samples.
pub trait ScatteredInterpolator {
    type Surface: SurfaceFn;

    fn fit(&self, points: &[(f64, f64)], values: &[f64]) -> Result<Self::Surface, InterpolationError>;

    /// Fit over coordinates prepared once with [`SampleSites::new`], for callers
    /// that interpolate several fields at the same points.
    fn fit_sites(&self, sites: &SampleSites, values: &[f64]) -> Result<Self::Surface, InterpolationError> {
        self.fit(sites.points(), values)
    }
}

/// Piecewise-cubic C1 interpolation (Clough-Tocher) over a Delaunay triangulation
#[derive(Debug, Clone, Copy)]
pub struct CloughTocher {
    /// Gauss-Seidel sweeps for vertex gradient estimation
    pub max_iterations: usize,
    /// Relative gradient change at which the sweeps stop
    pub tolerance: f64,
}

impl Default for CloughTocher {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            tolerance: 1e-6,
        }
    }
}

/// Piecewise-linear barycentric interpolation over a Delaunay triangulation
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTriangulation;

/// Affine map of the sample bounding box onto the unit square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScaler {
    offset: [f64; 2],
    scale: [f64; 2],
}

impl UnitScaler {
    fn from_points(points: &[(f64, f64)]) -> Self {
        let mut lo = [f64::INFINITY; 2];
        let mut hi = [f64::NEG_INFINITY; 2];
        for &(x, y) in points {
            lo = [lo[0].min(x), lo[1].min(y)];
            hi = [hi[0].max(x), hi[1].max(y)];
        }
        let span = |k: usize| {
            let s = hi[k] - lo[k];
            if s > 0.0 {
                s
            } else {
                1.0
            }
        };
        Self {
            offset: lo,
            scale: [span(0), span(1)],
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> [f64; 2] {
        // + 0.0 folds -0.0 so equal coordinates share a bit pattern
        [
            (x - self.offset[0]) / self.scale[0] + 0.0,
            (y - self.offset[1]) / self.scale[1] + 0.0,
        ]
    }
}

/// Finite, rescaled, de-duplicated samples sorted by coordinate
struct Samples {
    scaler: UnitScaler,
    points: Vec<[f64; 2]>,
    values: Vec<f64>,
}

fn prepare(points: &[(f64, f64)], values: &[f64]) -> Result<Samples, InterpolationError> {
    if points.len() != values.len() {
        return Err(InterpolationError::LengthMismatch {
            points: points.len(),
            values: values.len(),
        });
    }

    let finite: Vec<((f64, f64), f64)> = points
        .iter()
        .zip(values)
        .filter(|((x, y), v)| x.is_finite() && y.is_finite() && v.is_finite())
        .map(|(p, v)| (*p, *v))
        .collect();
    if finite.is_empty() {
        return Err(InterpolationError::InsufficientFitData);
    }

    let coords: Vec<(f64, f64)> = finite.iter().map(|(p, _)| *p).collect();
    let scaler = UnitScaler::from_points(&coords);

    let mut merged: HashMap<(u64, u64), ([f64; 2], f64, usize)> = HashMap::with_capacity(finite.len());
    for ((x, y), v) in finite {
        let p = scaler.apply(x, y);
        let entry = merged
            .entry((p[0].to_bits(), p[1].to_bits()))
            .or_insert((p, 0.0, 0));
        entry.1 += v;
        entry.2 += 1;
    }

    let mut unique: Vec<([f64; 2], f64)> = merged
        .into_values()
        .map(|(p, sum, count)| (p, sum / count as f64))
        .collect();
    unique.sort_by(|a, b| a.0[0].total_cmp(&b.0[0]).then(a.0[1].total_cmp(&b.0[1])));

    let (points, values): (Vec<[f64; 2]>, Vec<f64>) = unique.into_iter().unzip();
    Ok(Samples {
        scaler,
        points,
        values,
    })
}

/// Sample coordinates rescaled, merged and triangulated once, shared by every
/// field fitted at the same points.
///
/// A field reuses the mesh when each sample with finite coordinates also has a
/// finite value; otherwise its sample set differs and it is fitted afresh.
#[derive(Debug, Clone)]
pub struct SampleSites {
    points: Vec<(f64, f64)>,
    prepared: Option<PreparedSites>,
}

#[derive(Debug, Clone)]
struct PreparedSites {
    scaler: UnitScaler,
    /// Merged site of each input point; `None` for non-finite coordinates
    site_of: Vec<Option<usize>>,
    sites: Vec<[f64; 2]>,
    mesh: Option<Arc<Triangulation>>,
}

impl SampleSites {
    pub fn new(points: &[(f64, f64)]) -> Self {
        let finite: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        if finite.is_empty() {
            return Self {
                points: points.to_vec(),
                prepared: None,
            };
        }

        let scaler = UnitScaler::from_points(&finite);
        let scaled: Vec<Option<[f64; 2]>> = points
            .iter()
            .map(|&(x, y)| (x.is_finite() && y.is_finite()).then(|| scaler.apply(x, y)))
            .collect();

        let mut sites: Vec<[f64; 2]> = scaled.iter().flatten().copied().collect();
        sites.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        sites.dedup_by(|a, b| a[0].to_bits() == b[0].to_bits() && a[1].to_bits() == b[1].to_bits());

        let index: HashMap<(u64, u64), usize> = sites
            .iter()
            .enumerate()
            .map(|(i, p)| ((p[0].to_bits(), p[1].to_bits()), i))
            .collect();
        let site_of = scaled
            .iter()
            .map(|p| p.and_then(|p| index.get(&(p[0].to_bits(), p[1].to_bits())).copied()))
            .collect();

        let mesh = Triangulation::new(&sites).map(Arc::new);
        Self {
            points: points.to_vec(),
            prepared: Some(PreparedSites {
                scaler,
                site_of,
                sites,
                mesh,
            }),
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of distinct finite sites
    pub fn len(&self) -> usize {
        self.prepared.as_ref().map_or(0, |p| p.sites.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-site mean of `values`, or `None` when a finite site has a
    /// non-finite value.
    fn site_values(&self, values: &[f64]) -> Option<(&PreparedSites, Vec<f64>)> {
        let prepared = self.prepared.as_ref()?;
        if values.len() != self.points.len() {
            return None;
        }
        let mut sums = vec![0.0; prepared.sites.len()];
        let mut counts = vec![0_usize; prepared.sites.len()];
        for (site, &v) in prepared.site_of.iter().zip(values) {
            if let Some(s) = *site {
                if !v.is_finite() {
                    return None;
                }
                sums[s] += v;
                counts[s] += 1;
            }
        }
        let means = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| sum / count as f64)
            .collect();
        Some((prepared, means))
    }
}

#[derive(Debug, Clone)]
enum Patches {
    Cubic {
        mesh: Arc<Triangulation>,
        values: Vec<f64>,
        gradients: Vec<[f64; 2]>,
    },
    Linear {
        mesh: Arc<Triangulation>,
        values: Vec<f64>,
    },
    Collinear(LineInterpolant),
}

/// Surface produced by the triangulation-based engines
#[derive(Debug, Clone)]
pub struct PiecewiseSurface {
    scaler: UnitScaler,
    patches: Patches,
}

impl PiecewiseSurface {
    /// True when the samples had no two-dimensional extent
    pub fn is_degenerate(&self) -> bool {
        matches!(self.patches, Patches::Collinear(_))
    }

    fn evaluate_from(&self, x: f64, y: f64, hint: &mut usize) -> f64 {
        if !(x.is_finite() && y.is_finite()) {
            return f64::NAN;
        }
        let p = self.scaler.apply(x, y);
        match &self.patches {
            Patches::Cubic {
                mesh,
                values,
                gradients,
            } => match mesh.locate(p, *hint) {
                Some((t, b)) => {
                    *hint = t;
                    clough_tocher::evaluate_patch(mesh, t, b, values, gradients)
                }
                None => f64::NAN,
            },
            Patches::Linear { mesh, values } => match mesh.locate(p, *hint) {
                Some((t, b)) => {
                    *hint = t;
                    let tri = mesh.triangles()[t];
                    b[0] * values[tri[0]] + b[1] * values[tri[1]] + b[2] * values[tri[2]]
                }
                None => f64::NAN,
            },
            Patches::Collinear(line) => line.evaluate(p),
        }
    }
}

impl SurfaceFn for PiecewiseSurface {
    fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.evaluate_from(x, y, &mut 0)
    }

    /// Consecutive queries start their point-location walk where the previous
    /// one ended, which keeps row-by-row grid sweeps cheap.
    fn evaluate_many(&self, points: &[(f64, f64)]) -> Vec<f64> {
        let mut hint = 0;
        points
            .iter()
            .map(|&(x, y)| self.evaluate_from(x, y, &mut hint))
            .collect()
    }
}

impl CloughTocher {
    fn patches(&self, mesh: Arc<Triangulation>, values: Vec<f64>) -> Patches {
        let gradients =
            clough_tocher::estimate_gradients(&mesh, &values, self.max_iterations, self.tolerance);
        Patches::Cubic {
            mesh,
            values,
            gradients,
        }
    }
}

impl ScatteredInterpolator for CloughTocher {
    type Surface = PiecewiseSurface;

    fn fit(&self, points: &[(f64, f64)], values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        let samples = prepare(points, values)?;
        let patches = match Triangulation::new(&samples.points) {
            Some(mesh) => self.patches(Arc::new(mesh), samples.values),
            None => Patches::Collinear(LineInterpolant::new(&samples.points, &samples.values)),
        };
        Ok(PiecewiseSurface {
            scaler: samples.scaler,
            patches,
        })
    }

    fn fit_sites(&self, sites: &SampleSites, values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        let Some((prepared, site_values)) = sites.site_values(values) else {
            return self.fit(sites.points(), values);
        };
        let patches = match &prepared.mesh {
            Some(mesh) => self.patches(Arc::clone(mesh), site_values),
            None => Patches::Collinear(LineInterpolant::new(&prepared.sites, &site_values)),
        };
        Ok(PiecewiseSurface {
            scaler: prepared.scaler,
            patches,
        })
    }
}

impl ScatteredInterpolator for LinearTriangulation {
    type Surface = PiecewiseSurface;

    fn fit(&self, points: &[(f64, f64)], values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        let samples = prepare(points, values)?;
        let patches = match Triangulation::new(&samples.points) {
            Some(mesh) => Patches::Linear {
                mesh: Arc::new(mesh),
                values: samples.values,
            },
            None => Patches::Collinear(LineInterpolant::new(&samples.points, &samples.values)),
        };
        Ok(PiecewiseSurface {
            scaler: samples.scaler,
            patches,
        })
    }

    fn fit_sites(&self, sites: &SampleSites, values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        let Some((prepared, site_values)) = sites.site_values(values) else {
            return self.fit(sites.points(), values);
        };
        let patches = match &prepared.mesh {
            Some(mesh) => Patches::Linear {
                mesh: Arc::clone(mesh),
                values: site_values,
            },
            None => Patches::Collinear(LineInterpolant::new(&prepared.sites, &site_values)),
        };
        Ok(PiecewiseSurface {
            scaler: prepared.scaler,
            patches,
        })
    }
}

/// The configured engine, with its default settings
impl ScatteredInterpolator for InterpolationMethod {
    type Surface = PiecewiseSurface;

    fn fit(&self, points: &[(f64, f64)], values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        match self {
            InterpolationMethod::CloughTocher => CloughTocher::default().fit(points, values),
            InterpolationMethod::Linear => LinearTriangulation.fit(points, values),
        }
    }

    fn fit_sites(&self, sites: &SampleSites, values: &[f64]) -> Result<PiecewiseSurface, InterpolationError> {
        match self {
            InterpolationMethod::CloughTocher => CloughTocher::default().fit_sites(sites, values),
            InterpolationMethod::Linear => LinearTriangulation.fit_sites(sites, values),
        }
    }
}
