//! Geometric helpers on top of the topology.

use nalgebra::{Point3, Vector3};

use super::halfedge::cycle_pairs;
use super::Mesh;
use crate::error::{MeshError, Result};
use crate::key::{FaceKey, VertexKey};

impl Mesh {
    /// Move a vertex.
    pub fn set_position(&mut self, v: VertexKey, position: Point3<f64>) -> Result<()> {
        let record = self.vertices.get_mut(&v).ok_or_else(|| MeshError::not_found("vertex", v))?;
        record.position = position;
        Ok(())
    }

    /// Positions of a face's vertices in cycle order.
    pub fn face_positions(&self, f: FaceKey) -> Vec<Point3<f64>> {
        self.face_vertices(f).iter().map(|&v| self.position(v)).collect()
    }

    /// Newell's vector of a face: twice its vector area.
    fn face_newell(&self, f: FaceKey) -> Vector3<f64> {
        let points = self.face_positions(f);
        let n = points.len();
        (0..n).fold(Vector3::zeros(), |acc, i| {
            let a = points[i].coords;
            let b = points[(i + 1) % n].coords;
            acc + a.cross(&b)
        })
    }

    /// Unit normal of a face (zero for degenerate faces).
    pub fn face_normal(&self, f: FaceKey) -> Vector3<f64> {
        self.face_newell(f).try_normalize(1e-15).unwrap_or_else(Vector3::zeros)
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceKey) -> f64 {
        0.5 * self.face_newell(f).norm()
    }

    /// Average of the face's vertex positions.
    pub fn face_centroid(&self, f: FaceKey) -> Point3<f64> {
        centroid_of(&self.face_positions(f))
    }

    /// Area-weighted center of a face.
    ///
    /// The face is fanned around its centroid and the triangle centroids are
    /// averaged by area. Falls back to the centroid for degenerate faces.
    pub fn face_center_of_mass(&self, f: FaceKey) -> Point3<f64> {
        polygon_center_of_mass(&self.face_positions(f))
    }

    /// Largest distance of a face vertex from the plane through the face
    /// centroid along the face normal.
    pub fn face_flatness(&self, f: FaceKey) -> f64 {
        let c = self.face_centroid(f);
        let normal = self.face_normal(f);
        self.face_positions(f)
            .iter()
            .map(|p| (p - c).dot(&normal).abs())
            .fold(0.0, f64::max)
    }

    /// Area-weighted vertex normal (zero when no face touches the vertex).
    pub fn vertex_normal(&self, v: VertexKey) -> Vector3<f64> {
        let sum = self
            .vertex_faces(v, false)
            .into_iter()
            .fold(Vector3::zeros(), |acc, f| acc + self.face_newell(f));
        sum.try_normalize(1e-15).unwrap_or_else(Vector3::zeros)
    }

    /// Barycentric area of a vertex: each face contributes an equal share.
    pub fn vertex_area(&self, v: VertexKey) -> f64 {
        self.vertex_faces(v, false)
            .into_iter()
            .map(|f| self.face_area(f) / self.face_degree(f) as f64)
            .sum()
    }

    /// Vector from `u` to `v`.
    pub fn edge_vector(&self, u: VertexKey, v: VertexKey) -> Vector3<f64> {
        self.position(v) - self.position(u)
    }

    /// Length of the edge `(u, v)`.
    pub fn edge_length(&self, u: VertexKey, v: VertexKey) -> f64 {
        self.edge_vector(u, v).norm()
    }

    /// Midpoint of the edge `(u, v)`.
    pub fn edge_midpoint(&self, u: VertexKey, v: VertexKey) -> Point3<f64> {
        self.edge_point(u, v, 0.5)
    }

    /// Point at parameter `t` along the edge from `u` to `v`.
    pub fn edge_point(&self, u: VertexKey, v: VertexKey, t: f64) -> Point3<f64> {
        let a = self.position(u);
        a + (self.position(v) - a) * t
    }

    /// Average of all vertex positions.
    pub fn centroid(&self) -> Point3<f64> {
        let points: Vec<Point3<f64>> = self.vertices.values().map(|r| r.position).collect();
        centroid_of(&points)
    }

    /// Axis-aligned bounding box.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut positions = self.vertices.values().map(|r| r.position);
        let first = positions.next()?;
        Some(positions.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p))))
    }

    /// Total face area.
    pub fn area(&self) -> f64 {
        self.faces().map(|f| self.face_area(f)).sum()
    }

    /// Mean edge length (zero for an edgeless mesh).
    pub fn mean_edge_length(&self) -> f64 {
        let lengths: Vec<f64> = self.edges().map(|(u, v)| self.edge_length(u, v)).collect();
        if lengths.is_empty() {
            return 0.0;
        }
        lengths.iter().sum::<f64>() / lengths.len() as f64
    }

    /// Perimeter of a face.
    pub fn face_perimeter(&self, f: FaceKey) -> f64 {
        cycle_pairs(self.face_vertices(f))
            .map(|(u, v)| self.edge_length(u, v))
            .sum()
    }
}

/// Average of a set of points (the origin for an empty set).
pub(crate) fn centroid_of(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

/// Area-weighted center of a closed polygon.
pub(crate) fn polygon_center_of_mass(points: &[Point3<f64>]) -> Point3<f64> {
    let c = centroid_of(points);
    let n = points.len();
    let mut weighted = Vector3::zeros();
    let mut total = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let area = 0.5 * (a - c).cross(&(b - c)).norm();
        weighted += (a.coords + b.coords + c.coords) / 3.0 * area;
        total += area;
    }
    if total > 0.0 {
        Point3::from(weighted / total)
    } else {
        c
    }
}
