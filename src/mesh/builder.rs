//! Mesh construction utilities.
//!
//! This module builds meshes from the primitive shapes external code hands
//! over (indexed vertex/face lists or raw polygons) and exports them back.
//! Everything goes through [`Mesh::add_vertex`] and [`Mesh::add_face`], so the
//! usual invariants hold for the result.

use std::collections::HashMap;

use nalgebra::Point3;

use super::Mesh;
use crate::attr::AttrMap;
use crate::error::{MeshError, Result};
use crate::key::{FaceKey, KeyIndex, VertexKey};

/// Integer grid key used to weld coincident points.
pub(crate) type GeometricKey = [i64; 3];

/// Snap a point onto a grid of `10^-precision`.
pub(crate) fn geometric_key(p: &Point3<f64>, precision: u32) -> GeometricKey {
    let scale = 10f64.powi(precision as i32);
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

impl Mesh {
    /// Build a mesh from vertex coordinates and face index cycles.
    ///
    /// Vertex `i` gets key `i`; face `j` gets key `j`.
    ///
    /// # Example
    /// ```
    /// use topomesh::mesh::Mesh;
    ///
    /// let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]];
    /// let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.num_vertices(), 3);
    /// assert_eq!(mesh.num_faces(), 1);
    /// ```
    pub fn from_vertices_and_faces<P, F>(points: &[P], faces: &[F]) -> Result<Self>
    where
        P: Copy + Into<Point3<f64>>,
        F: AsRef<[usize]>,
    {
        let mut mesh = Mesh::new();
        for (i, &p) in points.iter().enumerate() {
            mesh.add_vertex(Some(VertexKey::new(i as u64)), AttrMap::new())?;
            mesh.set_position(VertexKey::new(i as u64), p.into())?;
        }
        for (j, face) in faces.iter().enumerate() {
            let cycle: Vec<VertexKey> = face.as_ref().iter().map(|&i| VertexKey::new(i as u64)).collect();
            mesh.add_face(&cycle, Some(FaceKey::new(j as u64)), AttrMap::new())?;
        }
        Ok(mesh)
    }

    /// Build a mesh from polygons given as point lists, welding points that
    /// coincide up to `precision` decimal digits.
    pub fn from_polygons<P>(polygons: &[Vec<P>], precision: u32) -> Result<Self>
    where
        P: Copy + Into<Point3<f64>>,
    {
        let mut mesh = Mesh::new();
        let mut welded: HashMap<GeometricKey, VertexKey> = HashMap::new();
        for polygon in polygons {
            let mut cycle = Vec::with_capacity(polygon.len());
            for &p in polygon {
                let p: Point3<f64> = p.into();
                let v = *welded
                    .entry(geometric_key(&p, precision))
                    .or_insert_with(|| mesh.add_vertex_at(p));
                cycle.push(v);
            }
            mesh.add_face(&cycle, None, AttrMap::new())?;
        }
        Ok(mesh)
    }

    /// Stable bijection between vertex keys (in key order) and `0..n`.
    pub fn key_index(&self) -> KeyIndex<VertexKey> {
        KeyIndex::new(self.vertices())
    }

    /// Export as coordinate list plus face index cycles, in key order.
    pub fn to_vertices_and_faces(&self) -> (Vec<[f64; 3]>, Vec<Vec<usize>>) {
        let index = self.key_index();
        let points = self.vertices_coordinates(index.keys());
        let faces = self
            .faces
            .values()
            .map(|cycle| cycle.iter().filter_map(|&v| index.index_of(v)).collect())
            .collect();
        (points, faces)
    }

    /// Export each face as its list of corner points.
    pub fn to_polygons(&self) -> Vec<Vec<[f64; 3]>> {
        self.faces()
            .map(|f| self.face_positions(f).iter().map(|p| [p.x, p.y, p.z]).collect())
            .collect()
    }

    /// Coordinates of the given vertices, in order. Unknown keys read as the origin.
    pub fn vertices_coordinates(&self, keys: &[VertexKey]) -> Vec<[f64; 3]> {
        keys.iter()
            .map(|&v| {
                let p = self.position(v);
                [p.x, p.y, p.z]
            })
            .collect()
    }

    /// Overwrite the coordinates of the given vertices.
    ///
    /// Nothing changes unless every key exists and the lengths match.
    pub fn set_vertices_coordinates(&mut self, keys: &[VertexKey], coords: &[[f64; 3]]) -> Result<()> {
        if keys.len() != coords.len() {
            return Err(MeshError::invalid_param(
                "coords",
                coords.len(),
                "must have one entry per key",
            ));
        }
        if let Some(&missing) = keys.iter().find(|&&v| !self.has_vertex(v)) {
            return Err(MeshError::not_found("vertex", missing));
        }
        for (&v, c) in keys.iter().zip(coords) {
            self.set_position(v, Point3::from(*c))?;
        }
        Ok(())
    }

    /// Edges as index pairs under the given bijection. Edges with an endpoint
    /// outside the bijection are skipped.
    pub fn edges_as_indices(&self, index: &KeyIndex<VertexKey>) -> Vec<[usize; 2]> {
        self.edges()
            .filter_map(|(u, v)| Some([index.index_of(u)?, index.index_of(v)?]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vertices_and_faces_keys_follow_indices() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = Mesh::from_vertices_and_faces(&points, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.face_vertices(FaceKey::new(1)), &[VertexKey::new(0), VertexKey::new(2), VertexKey::new(3)]);
        assert_eq!(mesh.position(VertexKey::new(2)), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_from_vertices_and_faces_rejects_bad_index() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        let result = Mesh::from_vertices_and_faces(&points, &[[0, 1, 5]]);
        assert!(matches!(result, Err(MeshError::KeyNotFound { .. })));
    }

    #[test]
    fn test_from_polygons_welds_shared_corners() {
        let polygons = vec![
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [1.0000001, 1.0, 0.0]],
        ];
        let mesh = Mesh::from_polygons(&polygons, 3).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 7);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_export_round_trip() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2]]).unwrap();
        let (vertices, faces) = mesh.to_vertices_and_faces();
        assert_eq!(vertices, points.to_vec());
        assert_eq!(faces, vec![vec![0, 1, 2]]);
        assert_eq!(mesh.to_polygons()[0][1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_numeric_boundary() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2]]).unwrap();
        let index = mesh.key_index();
        assert_eq!(mesh.edges_as_indices(&index).len(), 3);

        let keys = [VertexKey::new(2)];
        mesh.set_vertices_coordinates(&keys, &[[0.0, 2.0, 1.0]]).unwrap();
        assert_eq!(mesh.vertices_coordinates(&keys), vec![[0.0, 2.0, 1.0]]);
        assert!(mesh.set_vertices_coordinates(&keys, &[]).is_err());
    }
}
