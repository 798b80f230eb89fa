//! Fallback for point sets without two-dimensional extent
//!
//! A single point, or points on one line, cannot be triangulated. The surface
//! is then defined only on the segment they span: piecewise-linear along it,
//! missing everywhere off it.

/// Perpendicular distance (unit-square coordinates) still treated as on the line
const ON_LINE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct LineInterpolant {
    origin: [f64; 2],
    direction: [f64; 2],
    /// `(position along direction, value)`, sorted by position
    nodes: Vec<(f64, f64)>,
}

impl LineInterpolant {
    /// `points` must be non-empty and the same length as `values`.
    pub fn new(points: &[[f64; 2]], values: &[f64]) -> Self {
        let origin = farthest_from(points, points[0]);
        let end = farthest_from(points, origin);
        let direction = [end[0] - origin[0], end[1] - origin[1]];
        let len2 = direction[0] * direction[0] + direction[1] * direction[1];

        let mut nodes: Vec<(f64, f64)> = if len2 > 0.0 {
            points
                .iter()
                .zip(values)
                .map(|(p, &v)| {
                    let s = ((p[0] - origin[0]) * direction[0] + (p[1] - origin[1]) * direction[1]) / len2;
                    (s, v)
                })
                .collect()
        } else {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            vec![(0.0, mean)]
        };
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self {
            origin,
            direction,
            nodes,
        }
    }

    pub fn evaluate(&self, p: [f64; 2]) -> f64 {
        let rel = [p[0] - self.origin[0], p[1] - self.origin[1]];
        let d = self.direction;
        let len2 = d[0] * d[0] + d[1] * d[1];

        if len2 == 0.0 {
            let dist = (rel[0] * rel[0] + rel[1] * rel[1]).sqrt();
            return if dist <= ON_LINE_TOLERANCE {
                self.nodes[0].1
            } else {
                f64::NAN
            };
        }

        let len = len2.sqrt();
        if (rel[0] * d[1] - rel[1] * d[0]).abs() / len > ON_LINE_TOLERANCE {
            return f64::NAN;
        }

        let s = (rel[0] * d[0] + rel[1] * d[1]) / len2;
        let slack = ON_LINE_TOLERANCE / len;
        let (first, last) = (self.nodes[0], self.nodes[self.nodes.len() - 1]);
        if !(s >= first.0 - slack && s <= last.0 + slack) {
            return f64::NAN;
        }

        let upper = self.nodes.partition_point(|n| n.0 <= s);
        if upper == 0 {
            return first.1;
        }
        if upper == self.nodes.len() {
            return last.1;
        }
        let (s0, v0) = self.nodes[upper - 1];
        let (s1, v1) = self.nodes[upper];
        let w = (s - s0) / (s1 - s0);
        v0 + w * (v1 - v0)
    }
}

fn farthest_from(points: &[[f64; 2]], from: [f64; 2]) -> [f64; 2] {
    let dist2 = |p: &[f64; 2]| (p[0] - from[0]).powi(2) + (p[1] - from[1]).powi(2);
    points
        .iter()
        .copied()
        .max_by(|a, b| dist2(a).total_cmp(&dist2(b)))
        .unwrap_or(from)
}
