//! Delaunay triangulation of planar point sets
//!
//! Incremental Bowyer-Watson over a bounding super triangle. Each insertion
//! walks to the containing triangle from the previous one and grows its cavity
//! across shared edges, so points are visited in a strip order that keeps
//! consecutive insertions close. Input points are expected in (or near) the
//! unit square and free of exact duplicates; the caller rescales and merges
//! before triangulating.

use std::collections::{HashMap, HashSet};

/// Encloses the unit square with a wide margin; counter-clockwise
const SUPER_TRIANGLE: [[f64; 2]; 3] = [[-300.0, -100.0], [300.0, -100.0], [0.5, 300.0]];

/// Barycentric slack when deciding whether a triangle contains a point
pub const CONTAINMENT_TOLERANCE: f64 = -1e-10;

/// Twice the signed area of `(a, b, c)`; positive when counter-clockwise.
pub fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// True when `d` lies strictly inside the circumcircle of the counter-clockwise triangle `(a, b, c)`.
fn in_circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> bool {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);
    let det = (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady);
    det > 0.0
}

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`
pub fn barycentric(a: [f64; 2], b: [f64; 2], c: [f64; 2], p: [f64; 2]) -> [f64; 3] {
    let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
    let l0 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
    let l1 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
    [l0, l1, 1.0 - l0 - l1]
}

fn min_of(b: &[f64; 3]) -> f64 {
    b[0].min(b[1]).min(b[2])
}

/// Triangles over a point set, all counter-clockwise, with edge adjacency
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
    /// `neighbors[t][k]` shares the edge of `t` opposite its vertex `k`
    neighbors: Vec<[Option<usize>; 3]>,
}

impl Triangulation {
    /// Triangulate `points`. Returns `None` when the set spans no area
    /// (fewer than three points, or all points on one line).
    pub fn new(points: &[[f64; 2]]) -> Option<Self> {
        let n = points.len();
        if n < 3 {
            return None;
        }

        let mut all = points.to_vec();
        all.extend_from_slice(&SUPER_TRIANGLE);
        let mut builder = Builder::new(&all, [n, n + 1, n + 2]);
        for index in insertion_order(points) {
            builder.insert(index);
        }

        let Builder {
            triangles, alive, ..
        } = builder;
        all.truncate(n);
        let triangles: Vec<[usize; 3]> = triangles
            .into_iter()
            .zip(alive)
            .filter(|&(t, live)| {
                live && t.iter().all(|&v| v < n) && orient(all[t[0]], all[t[1]], all[t[2]]) > 0.0
            })
            .map(|(t, _)| t)
            .collect();
        if triangles.is_empty() {
            return None;
        }

        let neighbors = build_neighbors(&triangles);
        Some(Self {
            points: all,
            triangles,
            neighbors,
        })
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn neighbors(&self) -> &[[Option<usize>; 3]] {
        &self.neighbors
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices_of(&self, triangle: usize) -> [[f64; 2]; 3] {
        let t = self.triangles[triangle];
        [self.points[t[0]], self.points[t[1]], self.points[t[2]]]
    }

    pub fn barycentric(&self, triangle: usize, p: [f64; 2]) -> [f64; 3] {
        let [a, b, c] = self.vertices_of(triangle);
        barycentric(a, b, c, p)
    }

    pub fn centroid(&self, triangle: usize) -> [f64; 2] {
        let [a, b, c] = self.vertices_of(triangle);
        [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0]
    }

    /// Find the triangle containing `p` by walking from `hint` toward it.
    ///
    /// Returns the triangle and the barycentric coordinates of `p` in it, or
    /// `None` when the walk leaves through a hull edge.
    pub fn locate(&self, p: [f64; 2], hint: usize) -> Option<(usize, [f64; 3])> {
        if self.triangles.is_empty() || !(p[0].is_finite() && p[1].is_finite()) {
            return None;
        }

        let mut current = hint.min(self.triangles.len() - 1);
        for _ in 0..self.triangles.len() + 3 {
            let b = self.barycentric(current, p);
            let mut exit = 0;
            for k in 1..3 {
                if b[k] < b[exit] {
                    exit = k;
                }
            }
            if b[exit] >= CONTAINMENT_TOLERANCE {
                return Some((current, b));
            }
            current = self.neighbors[current][exit]?;
        }

        // walk did not settle; fall back to a scan
        (0..self.triangles.len()).find_map(|t| {
            let b = self.barycentric(t, p);
            (min_of(&b) >= CONTAINMENT_TOLERANCE).then_some((t, b))
        })
    }

    /// Vertices joined to each vertex by a triangle edge, sorted
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.points.len()];
        for t in &self.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        adjacency
    }
}

/// Visit order for insertion: vertical strips of the unit square, walked
/// up and down alternately, so consecutive points are close together.
fn insertion_order(points: &[[f64; 2]]) -> Vec<usize> {
    let strips = ((points.len() as f64).sqrt() / 2.0).ceil().max(1.0);
    let strip_of = |p: [f64; 2]| (p[0] * strips).floor().clamp(0.0, strips - 1.0) as usize;

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&i, &j| {
        let (si, sj) = (strip_of(points[i]), strip_of(points[j]));
        si.cmp(&sj)
            .then_with(|| {
                let by_y = points[i][1].total_cmp(&points[j][1]);
                if si % 2 == 0 {
                    by_y
                } else {
                    by_y.reverse()
                }
            })
            .then_with(|| points[i][0].total_cmp(&points[j][0]))
    });
    order
}

/// Bowyer-Watson state. Triangles are never removed from the arrays, only
/// marked dead, so indices held in `neighbors` stay valid.
struct Builder<'a> {
    points: &'a [[f64; 2]],
    /// Indices at or above this are super-triangle vertices
    real: usize,
    triangles: Vec<[usize; 3]>,
    neighbors: Vec<[Option<usize>; 3]>,
    alive: Vec<bool>,
    last: usize,
}

impl<'a> Builder<'a> {
    fn new(points: &'a [[f64; 2]], root: [usize; 3]) -> Self {
        Self {
            points,
            real: root[0],
            triangles: vec![root],
            neighbors: vec![[None; 3]],
            alive: vec![true],
            last: 0,
        }
    }

    fn barycentric(&self, t: usize, p: [f64; 2]) -> [f64; 3] {
        let [a, b, c] = self.triangles[t];
        barycentric(self.points[a], self.points[b], self.points[c], p)
    }

    fn contains(&self, t: usize, p: [f64; 2]) -> bool {
        min_of(&self.barycentric(t, p)) >= CONTAINMENT_TOLERANCE
    }

    /// Circumcircle test. A triangle with one super vertex uses the limit of
    /// its circle as that vertex recedes: the open half-plane beyond its real
    /// edge. This keeps hull edges from being cut off by the finite super triangle.
    fn circumcircle_holds(&self, t: usize, p: [f64; 2]) -> bool {
        let tri = self.triangles[t];
        let mut ghosts = (0..3).filter(|&k| tri[k] >= self.real);
        if let (Some(k), None) = (ghosts.next(), ghosts.next()) {
            let (a, b) = self.edge(t, k);
            return orient(self.points[a], self.points[b], p) > 0.0;
        }
        let [a, b, c] = tri;
        in_circumcircle(self.points[a], self.points[b], self.points[c], p)
    }

    /// Edge of `t` opposite its vertex `k`, in the triangle's winding
    fn edge(&self, t: usize, k: usize) -> (usize, usize) {
        let tri = self.triangles[t];
        (tri[(k + 1) % 3], tri[(k + 2) % 3])
    }

    /// Walk from the last created triangle toward `p`.
    fn locate(&self, p: [f64; 2]) -> usize {
        let mut current = self.last;
        for _ in 0..self.triangles.len() + 3 {
            let b = self.barycentric(current, p);
            let mut exit = 0;
            for k in 1..3 {
                if b[k] < b[exit] {
                    exit = k;
                }
            }
            if b[exit] >= CONTAINMENT_TOLERANCE {
                return current;
            }
            match self.neighbors[current][exit] {
                Some(next) => current = next,
                None => break,
            }
        }

        // walk did not settle; take the live triangle that p is least outside of
        (0..self.triangles.len())
            .filter(|&t| self.alive[t])
            .max_by(|&s, &t| {
                min_of(&self.barycentric(s, p)).total_cmp(&min_of(&self.barycentric(t, p)))
            })
            .unwrap_or(current)
    }

    /// Triangles reachable from `start` across edges without leaving `allowed`
    fn flood(&self, start: usize, allowed: &dyn Fn(usize) -> bool) -> Vec<usize> {
        let mut seen = HashSet::from([start]);
        let mut order = vec![start];
        let mut stack = vec![start];
        while let Some(t) = stack.pop() {
            for next in self.neighbors[t].iter().flatten().copied() {
                if !seen.contains(&next) && allowed(next) {
                    seen.insert(next);
                    order.push(next);
                    stack.push(next);
                }
            }
        }
        order
    }

    fn insert(&mut self, index: usize) {
        let p = self.points[index];
        let start = self.locate(p);

        let mut cavity = self.flood(start, &|t| self.contains(t, p) || self.circumcircle_holds(t, p));

        // Every boundary edge must see p on its left, otherwise the fan around p
        // would fold over. Shrink the cavity until that holds.
        loop {
            let members: HashSet<usize> = cavity.iter().copied().collect();
            let folding: HashSet<usize> = cavity
                .iter()
                .copied()
                .filter(|&t| {
                    !self.contains(t, p)
                        && (0..3).any(|k| {
                            let outside = self.neighbors[t][k].map_or(true, |n| !members.contains(&n));
                            let (a, b) = self.edge(t, k);
                            outside && orient(self.points[a], self.points[b], p) <= 0.0
                        })
                })
                .collect();
            if folding.is_empty() {
                break;
            }
            cavity = self.flood(start, &|t| members.contains(&t) && !folding.contains(&t));
        }

        let members: HashSet<usize> = cavity.iter().copied().collect();
        let mut boundary = Vec::new();
        for &t in &cavity {
            for k in 0..3 {
                let across = self.neighbors[t][k];
                if across.map_or(true, |n| !members.contains(&n)) {
                    let (a, b) = self.edge(t, k);
                    boundary.push((a, b, across));
                }
            }
        }
        for &t in &cavity {
            self.alive[t] = false;
        }

        let mut starting_at = HashMap::with_capacity(boundary.len());
        let mut ending_at = HashMap::with_capacity(boundary.len());
        let first = self.triangles.len();
        for (offset, &(a, b, across)) in boundary.iter().enumerate() {
            let id = first + offset;
            self.triangles.push([a, b, index]);
            self.neighbors.push([None, None, across]);
            self.alive.push(true);
            starting_at.insert(a, id);
            ending_at.insert(b, id);

            if let Some(out) = across {
                if let Some(k) = (0..3).find(|&k| self.edge(out, k) == (b, a)) {
                    self.neighbors[out][k] = Some(id);
                }
            }
        }

        // fan triangles [a, b, p] meet along the spokes p-a and p-b
        for (offset, &(a, b, _)) in boundary.iter().enumerate() {
            let id = first + offset;
            self.neighbors[id][0] = starting_at.get(&b).copied();
            self.neighbors[id][1] = ending_at.get(&a).copied();
        }
        if !boundary.is_empty() {
            self.last = self.triangles.len() - 1;
        }
    }
}

fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut owner: HashMap<(usize, usize), usize> = HashMap::with_capacity(triangles.len() * 3);
    for (i, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            owner.insert((t[(k + 1) % 3], t[(k + 2) % 3]), i);
        }
    }
    triangles
        .iter()
        .map(|t| {
            let mut across = [None; 3];
            for (k, slot) in across.iter_mut().enumerate() {
                let (a, b) = (t[(k + 1) % 3], t[(k + 2) % 3]);
                *slot = owner.get(&(b, a)).copied();
            }
            across
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(tri: &Triangulation) -> f64 {
        (0..tri.len())
            .map(|t| {
                let [a, b, c] = tri.vertices_of(t);
                orient(a, b, c) / 2.0
            })
            .sum()
    }

    #[test]
    fn square_with_center_splits_into_four() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]];
        let tri = Triangulation::new(&points).unwrap();
        assert_eq!(tri.len(), 4);
        assert!((area(&tri) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn collinear_points_have_no_triangulation() {
        let points = [[0.0, 0.0], [0.25, 0.0], [0.5, 0.0], [1.0, 0.0]];
        assert!(Triangulation::new(&points).is_none());
    }

    #[test]
    fn triangulated_grid_covers_its_hull() {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                points.push([i as f64 / 4.0, j as f64 / 3.0]);
            }
        }
        let tri = Triangulation::new(&points).unwrap();
        assert!((area(&tri) - 1.0).abs() < 1e-9);
        for t in 0..tri.len() {
            let [a, b, c] = tri.vertices_of(t);
            assert!(orient(a, b, c) > 0.0);
        }
    }

    /// Deterministic scatter in the unit square (additive recurrence)
    fn scatter(n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| {
                let i = i as f64 + 1.0;
                [(i * 0.754_877_666_2).fract(), (i * 0.569_840_290_9).fract()]
            })
            .collect()
    }

    #[test]
    fn no_point_inside_any_circumcircle() {
        let points = scatter(400);
        let tri = Triangulation::new(&points).unwrap();
        for t in 0..tri.len() {
            let [a, b, c] = tri.vertices_of(t);
            let corners = tri.triangles()[t];
            for (i, p) in points.iter().enumerate() {
                if corners.contains(&i) {
                    continue;
                }
                // circumcentre relative to a, with a little slack for near-cocircular sets
                let d = 2.0 * orient(a, b, c);
                let (bx, by) = (b[0] - a[0], b[1] - a[1]);
                let (cx, cy) = (c[0] - a[0], c[1] - a[1]);
                let ux = (cy * (bx * bx + by * by) - by * (cx * cx + cy * cy)) / d;
                let uy = (bx * (cx * cx + cy * cy) - cx * (bx * bx + by * by)) / d;
                let (qx, qy) = (p[0] - a[0] - ux, p[1] - a[1] - uy);
                let (dist2, radius2) = (qx * qx + qy * qy, ux * ux + uy * uy);
                assert!(dist2 >= radius2 * (1.0 - 1e-9), "point {i} inside circumcircle of {t}");
            }
        }
    }

    /// Large inputs triangulate in walking time and still tile their hull.
    #[test]
    fn large_scatter_tiles_its_hull() {
        let mut points = scatter(20_000);
        points.extend_from_slice(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let tri = Triangulation::new(&points).unwrap();
        assert!((area(&tri) - 1.0).abs() < 1e-9);

        let hull_edges = tri.neighbors().iter().flatten().filter(|n| n.is_none()).count();
        let n = points.len();
        // Euler: a triangulation of n points with h hull vertices has 2n - 2 - h triangles
        assert_eq!(tri.len(), 2 * n - 2 - hull_edges);

        let (t, _) = tri.locate([0.5, 0.5], 0).unwrap();
        assert!(tri.barycentric(t, [0.5, 0.5]).iter().all(|b| *b >= CONTAINMENT_TOLERANCE));
    }

    #[test]
    fn locate_walks_to_containing_triangle() {
        let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.3, 0.6]];
        let tri = Triangulation::new(&points).unwrap();
        let (t, b) = tri.locate([0.9, 0.1], 0).unwrap();
        assert!(b.iter().all(|v| *v >= CONTAINMENT_TOLERANCE));
        let [p0, p1, p2] = tri.vertices_of(t);
        let x = b[0] * p0[0] + b[1] * p1[0] + b[2] * p2[0];
        let y = b[0] * p0[1] + b[1] * p1[1] + b[2] * p2[1];
        assert!((x - 0.9).abs() < 1e-12 && (y - 0.1).abs() < 1e-12);
        assert!(tri.locate([1.5, 0.5], 0).is_none());
    }
}
