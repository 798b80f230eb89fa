//! Clough-Tocher C1 cubic patches
//!
//! Each Delaunay triangle is split at its centroid into three cubic Bezier
//! sub-patches. Vertex values and gradients fix the outer control points; the
//! cross-boundary derivative along each edge is kept linear, which makes the
//! surface continuously differentiable across triangles.
//!
//! Vertex gradients are not observed, so they are estimated by minimizing the
//! second derivative of the edge cubics over the whole mesh.

use super::delaunay::Triangulation;

/// Estimate a gradient at every vertex by global curvature minimization.
///
/// Gauss-Seidel sweeps over the vertices; each sweep solves the 2x2 local
/// system of one vertex with its neighbours' gradients held fixed. Stops when
/// the largest relative update falls below `tolerance` or after
/// `max_iterations` sweeps. Vertices whose neighbours all lie on one line
/// keep their previous gradient.
pub fn estimate_gradients(
    mesh: &Triangulation,
    values: &[f64],
    max_iterations: usize,
    tolerance: f64,
) -> Vec<[f64; 2]> {
    let points = mesh.points();
    let adjacency = mesh.vertex_neighbors();
    let mut gradients = vec![[0.0_f64; 2]; points.len()];

    for _ in 0..max_iterations {
        let mut err = 0.0_f64;

        for (i, neighbours) in adjacency.iter().enumerate() {
            let mut q = [0.0_f64; 3]; // xx, xy, yy
            let mut s = [0.0_f64; 2];

            for &j in neighbours {
                let ex = points[j][0] - points[i][0];
                let ey = points[j][1] - points[i][1];
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;
                let df2 = -ex * gradients[j][0] - ey * gradients[j][1];
                let rhs = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;
                s[0] += rhs * ex / l3;
                s[1] += rhs * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if !(det.abs() > f64::EPSILON) {
                continue;
            }
            let r0 = (q[2] * s[0] - q[1] * s[1]) / det;
            let r1 = (-q[1] * s[0] + q[0] * s[1]) / det;

            let change = (gradients[i][0] + r0).abs().max((gradients[i][1] + r1).abs());
            gradients[i] = [-r0, -r1];
            err = err.max(change / 1.0_f64.max(r0.abs().max(r1.abs())));
        }

        if err < tolerance {
            break;
        }
    }

    gradients
}

/// Evaluate the Clough-Tocher patch of `triangle` at barycentric coordinates `b`.
pub fn evaluate_patch(
    mesh: &Triangulation,
    triangle: usize,
    b: [f64; 3],
    values: &[f64],
    gradients: &[[f64; 2]],
) -> f64 {
    let t = mesh.triangles()[triangle];
    let [p1, p2, p3] = mesh.vertices_of(triangle);

    let e12 = [p2[0] - p1[0], p2[1] - p1[1]];
    let e23 = [p3[0] - p2[0], p3[1] - p2[1]];
    let e31 = [p1[0] - p3[0], p1[1] - p3[1]];

    let dot = |g: [f64; 2], e: [f64; 2]| g[0] * e[0] + g[1] * e[1];
    let (g1, g2, g3) = (gradients[t[0]], gradients[t[1]], gradients[t[2]]);

    let df12 = dot(g1, e12);
    let df21 = -dot(g2, e12);
    let df23 = dot(g2, e23);
    let df32 = -dot(g3, e23);
    let df31 = dot(g3, e31);
    let df13 = -dot(g1, e31);

    let c3000 = values[t[0]];
    let c2100 = (df12 + 3.0 * c3000) / 3.0;
    let c2010 = (df13 + 3.0 * c3000) / 3.0;
    let c0300 = values[t[1]];
    let c1200 = (df21 + 3.0 * c0300) / 3.0;
    let c0210 = (df23 + 3.0 * c0300) / 3.0;
    let c0030 = values[t[2]];
    let c1020 = (df31 + 3.0 * c0030) / 3.0;
    let c0120 = (df32 + 3.0 * c0030) / 3.0;

    let c2001 = (c2100 + c2010 + c3000) / 3.0;
    let c0201 = (c1200 + c0300 + c0210) / 3.0;
    let c0021 = (c1020 + c0120 + c0030) / 3.0;

    // Cross-boundary derivative weights from the neighbour centroid; a hull
    // edge uses the perpendicular direction.
    let mut g = [-0.5_f64; 3];
    for (k, slot) in g.iter_mut().enumerate() {
        let Some(other) = mesh.neighbors()[triangle][k] else {
            continue;
        };
        let c = mesh.barycentric(triangle, mesh.centroid(other));
        *slot = match k {
            0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
            1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
            _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
        };
    }

    let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
        + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
        / 2.0;
    let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
        + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
        / 2.0;
    let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
        + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
        / 2.0;

    let c1002 = (c1101 + c1011 + c2001) / 3.0;
    let c0102 = (c1101 + c0111 + c0201) / 3.0;
    let c0012 = (c1011 + c0111 + c0021) / 3.0;
    let c0003 = (c1002 + c0102 + c0012) / 3.0;

    // extended barycentric coordinates: one of b1, b2, b3 is zero
    let min = b[0].min(b[1]).min(b[2]);
    let b1 = b[0] - min;
    let b2 = b[1] - min;
    let b3 = b[2] - min;
    let b4 = 3.0 * min;

    b1.powi(3) * c3000
        + 3.0 * b1 * b1 * b2 * c2100
        + 3.0 * b1 * b1 * b3 * c2010
        + 3.0 * b1 * b1 * b4 * c2001
        + 3.0 * b1 * b2 * b2 * c1200
        + 6.0 * b1 * b2 * b4 * c1101
        + 3.0 * b1 * b3 * b3 * c1020
        + 6.0 * b1 * b3 * b4 * c1011
        + 3.0 * b1 * b4 * b4 * c1002
        + b2.powi(3) * c0300
        + 3.0 * b2 * b2 * b3 * c0210
        + 3.0 * b2 * b2 * b4 * c0201
        + 3.0 * b2 * b3 * b3 * c0120
        + 6.0 * b2 * b3 * b4 * c0111
        + 3.0 * b2 * b4 * b4 * c0102
        + b3.powi(3) * c0030
        + 3.0 * b3 * b3 * b4 * c0021
        + 3.0 * b3 * b4 * b4 * c0012
        + b4.powi(3) * c0003
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points() -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                points.push([i as f64 / 3.0, j as f64 / 3.0 + 0.05 * (i % 2) as f64]);
            }
        }
        points
    }

    #[test]
    fn gradients_of_a_plane_are_exact() {
        let points = grid_points();
        let mesh = Triangulation::new(&points).unwrap();
        let values: Vec<f64> = points.iter().map(|p| 2.0 * p[0] - 3.0 * p[1] + 1.0).collect();
        let gradients = estimate_gradients(&mesh, &values, 400, 1e-10);
        for g in gradients {
            assert!((g[0] - 2.0).abs() < 1e-6, "dx {}", g[0]);
            assert!((g[1] + 3.0).abs() < 1e-6, "dy {}", g[1]);
        }
    }

    #[test]
    fn patch_matches_vertex_values() {
        let points = grid_points();
        let mesh = Triangulation::new(&points).unwrap();
        let values: Vec<f64> = points.iter().map(|p| (p[0] * 3.0).sin() + p[1] * p[1]).collect();
        let gradients = estimate_gradients(&mesh, &values, 400, 1e-6);
        for t in 0..mesh.len() {
            let tri = mesh.triangles()[t];
            for k in 0..3 {
                let mut b = [0.0; 3];
                b[k] = 1.0;
                let v = evaluate_patch(&mesh, t, b, &values, &gradients);
                assert!((v - values[tri[k]]).abs() < 1e-12);
            }
        }
    }
}
