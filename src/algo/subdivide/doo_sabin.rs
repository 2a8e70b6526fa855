//! Doo-Sabin subdivision.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::trace;
use nalgebra::{Point3, Vector3};

use crate::algo::Progress;
use crate::attr::AttrMap;
use crate::error::{MeshError, Result};
use crate::key::{FaceKey, VertexKey};
use crate::mesh::Mesh;

use super::{is_pinned, run, SubdivideOptions, SubdivideScheme};

/// Performs Doo-Sabin subdivision.
///
/// Every face corner gets a new point
/// `sum_j w_ij p_j` with `w_ii = (n + 5) / 4n` and
/// `w_ij = (3 + 2 cos(2 pi (i - j) / n)) / 4n`. The new mesh has one face per
/// old face, one quad per interior edge and one face per interior vertex.
/// Boundary edges and vertices produce no faces, so open meshes lose a strip
/// along their boundary.
///
/// Corner points of pinned vertices stay at the old vertex position.
pub fn doo_sabin(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    run(mesh, options, SubdivideScheme::DooSabin, &Progress::none())
}

pub(super) fn doo_sabin_once(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    let mut sub = mesh.empty_like();
    let mut corners: BTreeMap<(FaceKey, VertexKey), VertexKey> = BTreeMap::new();

    // Face faces.
    for f in mesh.faces() {
        let cycle = mesh.face_vertices(f);
        let points = mesh.face_positions(f);
        let n = cycle.len();
        let mut face = Vec::with_capacity(n);
        for (i, &v) in cycle.iter().enumerate() {
            let position = if is_pinned(mesh, v, options) {
                points[i]
            } else {
                corner_point(&points, i)
            };
            let w = sub.add_vertex_at(position);
            corners.insert((f, v), w);
            face.push(w);
        }
        sub.add_face(&face, None, AttrMap::new())?;
    }

    let corner = |f: FaceKey, v: VertexKey| -> Result<VertexKey> {
        corners
            .get(&(f, v))
            .copied()
            .ok_or_else(|| MeshError::not_found("face corner", (f, v)))
    };

    // Edge faces.
    for (u, v) in mesh.edges() {
        if let (Some(f), Some(g)) = (mesh.halfedge_face(u, v), mesh.halfedge_face(v, u)) {
            let quad = [corner(f, v)?, corner(f, u)?, corner(g, u)?, corner(g, v)?];
            sub.add_face(&quad, None, AttrMap::new())?;
        }
    }

    // Vertex faces: from the face of (w, v) to the face of (v, w).
    for v in mesh.vertices() {
        if mesh.is_vertex_on_boundary(v) || mesh.vertex_degree(v) < 3 {
            continue;
        }
        let faces = mesh.vertex_faces(v, false);
        let Some(&start) = faces.first() else {
            continue;
        };
        let mut ring = Vec::with_capacity(faces.len());
        let mut g = start;
        loop {
            ring.push(corner(g, v)?);
            let next = mesh
                .face_vertex_before(g, v)
                .and_then(|w| mesh.halfedge_face(v, w));
            match next {
                Some(f) if f == start => break,
                Some(f) if ring.len() < faces.len() => g = f,
                _ => return Err(MeshError::non_manifold(format!("open fan around {:?}", v))),
            }
        }
        sub.add_face(&ring, None, AttrMap::new())?;
    }

    trace!("doo-sabin step: {} faces -> {} faces", mesh.num_faces(), sub.num_faces());
    Ok(sub)
}

fn corner_point(points: &[Point3<f64>], i: usize) -> Point3<f64> {
    let n = points.len();
    let n_f = n as f64;
    let sum = points.iter().enumerate().fold(Vector3::zeros(), |acc, (j, p)| {
        let weight = if i == j {
            (n_f + 5.0) / (4.0 * n_f)
        } else {
            let k = (i as f64) - (j as f64);
            (3.0 + 2.0 * (2.0 * PI * k / n_f).cos()) / (4.0 * n_f)
        };
        acc + p.coords * weight
    });
    Point3::from(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_quad_cube() -> Mesh {
        let points = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [1, 2, 6, 5],
            [0, 4, 7, 3],
        ];
        Mesh::from_vertices_and_faces(&points, &faces).unwrap()
    }

    #[test]
    fn test_cube_step() {
        let mesh = create_quad_cube();
        let out = doo_sabin(&mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(out.num_vertices(), 24);
        assert_eq!(out.num_faces(), 6 + 12 + 8);
        assert_eq!(out.faces().filter(|&f| out.face_degree(f) == 3).count(), 8);
        assert!(out.is_closed());
        assert!(out.is_manifold());
        assert_eq!(out.euler(), 2);
    }

    #[test]
    fn test_quad_weights() {
        // For a quad: 9/16 own corner, 3/16 each neighbour, 1/16 opposite.
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let p = corner_point(&points, 0);
        assert!((p - Point3::new(0.25, 0.25, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn test_open_grid_loses_boundary_strip() {
        let mut points = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                points.push([i as f64, j as f64, 0.0]);
            }
        }
        let faces = [[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
        let mesh = Mesh::from_vertices_and_faces(&points, &faces).unwrap();
        let out = doo_sabin(&mesh, &SubdivideOptions::new(1)).unwrap();
        // 4 face faces, 4 interior edges, 1 interior vertex.
        assert_eq!(out.num_faces(), 9);
        assert!(out.is_valid());
        assert_eq!(out.boundary_loops().len(), 1);
    }
}
