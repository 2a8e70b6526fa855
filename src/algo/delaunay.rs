//! Delaunay triangulation of planar point sets.
//!
//! Bowyer-Watson insertion over the points in lexicographic `(x, y)` order.
//! A point on a circumcircle does not count as inside it, so ties among
//! concyclic points are decided by the insertion order alone and the result
//! does not depend on the order of the input.
//!
//! Only `x` and `y` take part in the triangulation; `z` is carried over to
//! the vertices unchanged.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use nalgebra::Point3;

use crate::attr::{Attr, AttrMap};
use crate::error::{MeshError, Result};
use crate::key::VertexKey;
use crate::mesh::{geometric_key, GeometricKey, Mesh};

/// Options for [`delaunay_from_points`].
#[derive(Debug, Clone)]
pub struct DelaunayOptions {
    /// Triangles whose centroid falls outside this polygon are dropped.
    /// Without it the result covers the convex hull.
    pub boundary: Option<Vec<Point3<f64>>>,

    /// Triangles whose centroid falls inside any of these polygons are
    /// dropped.
    pub holes: Vec<Vec<Point3<f64>>>,

    /// In-circle tolerance, relative to the extent of the point set.
    pub tolerance: f64,
}

impl Default for DelaunayOptions {
    fn default() -> Self {
        Self {
            boundary: None,
            holes: Vec::new(),
            tolerance: 1e-12,
        }
    }
}

impl DelaunayOptions {
    /// Clip the triangulation to a boundary polygon.
    pub fn with_boundary(mut self, boundary: Vec<Point3<f64>>) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Cut a hole.
    pub fn with_hole(mut self, hole: Vec<Point3<f64>>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Set the in-circle tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }
}

/// In-circle determinant: positive when `d` lies inside the circumcircle of
/// the counter-clockwise triangle `(a, b, c)`.
fn incircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);
    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Even-odd point-in-polygon test in the xy plane.
fn contains(polygon: &[Point3<f64>], x: f64, y: f64) -> bool {
    let n = polygon.len();
    let mut inside = false;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if (a.y > y) != (b.y > y) {
            let t = (y - a.y) / (b.y - a.y);
            if x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
    }
    inside
}

/// Triangulate a planar point set.
///
/// Vertex keys are the input indices of the points that were kept.
/// Duplicate points (equal `x` and `y`) collapse onto their first
/// occurrence. Fails with `InvalidParameter` when fewer than three distinct
/// points remain or when all of them are collinear.
pub fn delaunay_from_points<P>(points: &[P], options: &DelaunayOptions) -> Result<Mesh>
where
    P: Copy + Into<Point3<f64>>,
{
    let points: Vec<Point3<f64>> = points.iter().map(|&p| p.into()).collect();

    let mut seen: BTreeSet<GeometricKey> = BTreeSet::new();
    let mut kept: Vec<usize> = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if seen.insert(geometric_key(&Point3::new(p.x, p.y, 0.0), 9)) {
            kept.push(i);
        } else {
            warn!("delaunay: skipping duplicate point {} at ({}, {})", i, p.x, p.y);
        }
    }
    if kept.len() < 3 {
        return Err(MeshError::invalid_param(
            "points",
            kept.len(),
            "need at least three distinct points",
        ));
    }

    kept.sort_by(|&i, &j| {
        points[i]
            .x
            .total_cmp(&points[j].x)
            .then(points[i].y.total_cmp(&points[j].y))
    });

    // Work in the unit box so the tolerance is scale-free.
    let (lo_x, hi_x, lo_y, hi_y) = kept.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), &i| (a.min(points[i].x), b.max(points[i].x), c.min(points[i].y), d.max(points[i].y)),
    );
    let extent = (hi_x - lo_x).max(hi_y - lo_y).max(f64::MIN_POSITIVE);
    let mut coords: Vec<[f64; 2]> = kept
        .iter()
        .map(|&i| [(points[i].x - lo_x) / extent, (points[i].y - lo_y) / extent])
        .collect();

    let n = coords.len();
    coords.extend([[-100.0, -100.0], [100.0, -100.0], [0.0, 100.0]]);
    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    for p in 0..n {
        let d = coords[p];
        let (bad, good): (Vec<[usize; 3]>, Vec<[usize; 3]>) = triangles
            .into_iter()
            .partition(|t| incircle(coords[t[0]], coords[t[1]], coords[t[2]], d) > options.tolerance);
        triangles = good;
        if bad.is_empty() {
            warn!("delaunay: point {} fell outside every circumcircle", kept[p]);
            continue;
        }

        let directed: BTreeSet<(usize, usize)> = bad
            .iter()
            .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
            .collect();
        for &(a, b) in &directed {
            if !directed.contains(&(b, a)) {
                triangles.push([a, b, p]);
            }
        }
    }

    let mut faces: Vec<[usize; 3]> = triangles
        .into_iter()
        .filter(|t| t.iter().all(|&i| i < n))
        .filter(|t| orient(coords[t[0]], coords[t[1]], coords[t[2]]) > 0.0)
        .filter(|t| {
            let cx = t.iter().map(|&i| points[kept[i]].x).sum::<f64>() / 3.0;
            let cy = t.iter().map(|&i| points[kept[i]].y).sum::<f64>() / 3.0;
            options.boundary.as_ref().map_or(true, |b| contains(b, cx, cy))
                && !options.holes.iter().any(|h| contains(h, cx, cy))
        })
        .map(|t| t.map(|i| kept[i]))
        .collect();
    if faces.is_empty() && options.boundary.is_none() && options.holes.is_empty() {
        return Err(MeshError::invalid_param("points", n, "all points are collinear"));
    }
    for face in &mut faces {
        // Rotate so the smallest key leads; keeps the order canonical.
        if let Some(k) = (0..3).min_by_key(|&k| face[k]) {
            face.rotate_left(k);
        }
    }
    faces.sort_unstable();

    let mut mesh = Mesh::new();
    let mut used: BTreeMap<usize, bool> = kept.iter().map(|&i| (i, false)).collect();
    for face in &faces {
        for i in face {
            used.insert(*i, true);
        }
    }
    let clipped = options.boundary.is_some() || !options.holes.is_empty();
    for (&i, &in_face) in &used {
        if clipped && !in_face {
            continue;
        }
        let p = points[i];
        let values: AttrMap = [("x", p.x), ("y", p.y), ("z", p.z)]
            .into_iter()
            .map(|(name, value)| (name.to_string(), Attr::Float(value)))
            .collect();
        mesh.add_vertex(Some(VertexKey::new(i as u64)), values)?;
    }
    for face in &faces {
        let cycle = face.map(|i| VertexKey::new(i as u64));
        mesh.add_face(&cycle, None, AttrMap::new())?;
    }

    debug!(
        "delaunay: {} points -> {} vertices, {} triangles",
        points.len(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

/// Whether every interior edge of a triangle mesh satisfies the empty
/// circumcircle property in the xy plane.
///
/// Meshes with non-triangular faces are never Delaunay.
pub fn is_delaunay(mesh: &Mesh) -> bool {
    if !mesh.is_trimesh() {
        return false;
    }
    let xy = |v: VertexKey| {
        let p = mesh.position(v);
        [p.x, p.y]
    };
    mesh.edges().all(|(u, v)| {
        let (Some(f), Some(g)) = (mesh.halfedge_face(u, v), mesh.halfedge_face(v, u)) else {
            return true;
        };
        let (Some(c), Some(d)) = (mesh.face_vertex_after(f, v), mesh.face_vertex_after(g, u)) else {
            return true;
        };
        let (a, b, c, d) = (xy(u), xy(v), xy(c), xy(d));
        let scale = [b, c, d]
            .iter()
            .map(|p| (p[0] - a[0]).abs().max((p[1] - a[1]).abs()))
            .fold(f64::MIN_POSITIVE, f64::max);
        let det = incircle(a, b, c, d);
        let det = if orient(a, b, c) >= 0.0 { det } else { -det };
        det <= 1e-10 * scale.powi(4)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_set(mesh: &Mesh) -> BTreeSet<[[i64; 2]; 3]> {
        mesh.faces()
            .map(|f| {
                let mut corners: Vec<[i64; 2]> = mesh
                    .face_positions(f)
                    .iter()
                    .map(|p| [(p.x * 1e6).round() as i64, (p.y * 1e6).round() as i64])
                    .collect();
                corners.sort();
                [corners[0], corners[1], corners[2]]
            })
            .collect()
    }

    #[test]
    fn test_square_with_centre() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5, 0.0]];
        let mesh = delaunay_from_points(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.vertex_degree(VertexKey::new(4)), 4);
        assert!(mesh.is_valid());
        assert!(is_delaunay(&mesh));
        for f in mesh.faces() {
            assert!(mesh.face_normal(f).z > 0.0);
        }
    }

    #[test]
    fn test_concyclic_points_are_deterministic() {
        let square = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let reference = triangle_set(&delaunay_from_points(&square, &DelaunayOptions::default()).unwrap());
        assert_eq!(reference.len(), 2);

        let orders = [[3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2], [0, 2, 1, 3]];
        for order in orders {
            let shuffled: Vec<[f64; 3]> = order.iter().map(|&i| square[i]).collect();
            let mesh = delaunay_from_points(&shuffled, &DelaunayOptions::default()).unwrap();
            assert_eq!(triangle_set(&mesh), reference);
        }
    }

    #[test]
    fn test_random_points_are_delaunay() {
        // Deterministic pseudo-random points.
        let mut state = 12345u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let points: Vec<[f64; 3]> = (0..60).map(|_| [next() * 10.0, next() * 10.0, 0.0]).collect();
        let mesh = delaunay_from_points(&points, &DelaunayOptions::default()).unwrap();
        assert!(is_delaunay(&mesh));
        assert!(mesh.is_manifold());
        assert!(mesh.is_connected());
        assert_eq!(mesh.boundary_loops().len(), 1);
        // Planar triangulation: F = 2V - 2 - H.
        let hull = mesh.vertices_on_boundary().len();
        assert_eq!(mesh.num_faces(), 2 * mesh.num_vertices() - 2 - hull);
    }

    #[test]
    fn test_duplicates_collapse_onto_first() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 5.0], [0.0, 1.0, 0.0]];
        let mesh = delaunay_from_points(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 3);
        assert!(mesh.has_vertex(VertexKey::new(1)));
        assert!(!mesh.has_vertex(VertexKey::new(2)));
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_too_few_or_collinear_points() {
        let two = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        assert!(matches!(
            delaunay_from_points(&two, &DelaunayOptions::default()),
            Err(MeshError::InvalidParameter { .. })
        ));
        let line = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        assert!(delaunay_from_points(&line, &DelaunayOptions::default()).is_err());
    }

    #[test]
    fn test_boundary_and_hole_clip() {
        let mut points = Vec::new();
        for j in 0..4 {
            for i in 0..4 {
                points.push([i as f64, j as f64, 0.0]);
            }
        }
        let full = delaunay_from_points(&points, &DelaunayOptions::default()).unwrap();
        assert_eq!(full.num_faces(), 18);

        let hole = vec![
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
        ];
        let holed = delaunay_from_points(&points, &DelaunayOptions::default().with_hole(hole)).unwrap();
        assert_eq!(holed.num_faces(), 16);
        assert_eq!(holed.boundary_loops().len(), 2);

        // L-shape: drop the upper-right block.
        let boundary = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 3.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        let clipped = delaunay_from_points(&points, &DelaunayOptions::default().with_boundary(boundary)).unwrap();
        assert_eq!(clipped.num_faces(), 10);
        assert_eq!(clipped.num_vertices(), 12);
    }
}
