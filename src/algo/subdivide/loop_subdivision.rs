//! Loop subdivision for triangle meshes.

use std::f64::consts::PI;

use log::trace;
use nalgebra::{Point3, Vector3};

use crate::algo::Progress;
use crate::attr::AttrMap;
use crate::error::{MeshError, Result};
use crate::key::VertexKey;
use crate::mesh::Mesh;

use super::{boundary_neighbours, edge_vertex, is_pinned, run, split_edges, SubdivideOptions, SubdivideScheme};

/// Performs Loop subdivision on a triangle mesh.
///
/// Every triangle becomes four. Interior edge points are
/// `3/8 (a + b) + 1/8 (c + d)` where `c` and `d` are the opposite apexes;
/// boundary edge points are midpoints. Vertices move to
/// `(1 - n beta) S + beta * sum(neighbours)` with Loop's original beta.
///
/// Fails with `InvalidParameter` when any face is not a triangle.
pub fn loop_subdivide(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    run(mesh, options, SubdivideScheme::Loop, &Progress::none())
}

pub(super) fn loop_once(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    if let Some(f) = mesh.faces().find(|&f| mesh.face_degree(f) != 3) {
        return Err(MeshError::invalid_param(
            "mesh",
            format!("face {:?} of degree {}", f, mesh.face_degree(f)),
            "loop subdivision requires a triangle mesh",
        ));
    }

    let mut sub = mesh.clone();
    let edge_points = split_edges(mesh, &mut sub)?;

    for f in mesh.faces() {
        let &[a, b, c] = mesh.face_vertices(f) else {
            continue;
        };
        let ab = edge_vertex(&edge_points, a, b)?;
        let bc = edge_vertex(&edge_points, b, c)?;
        let ca = edge_vertex(&edge_points, c, a)?;
        sub.delete_face(f)?;
        for cycle in [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]] {
            sub.add_face(&cycle, None, AttrMap::new())?;
        }
    }

    for (&(u, v), &w) in &edge_points {
        let apexes = (
            mesh.halfedge_face(u, v).and_then(|f| mesh.face_vertex_after(f, v)),
            mesh.halfedge_face(v, u).and_then(|g| mesh.face_vertex_after(g, u)),
        );
        let position = match apexes {
            (Some(c), Some(d)) => Point3::from(
                (mesh.position(u).coords + mesh.position(v).coords) * (3.0 / 8.0)
                    + (mesh.position(c).coords + mesh.position(d).coords) * (1.0 / 8.0),
            ),
            _ => mesh.edge_midpoint(u, v),
        };
        sub.set_position(w, position)?;
    }

    for v in mesh.vertices() {
        sub.set_position(v, vertex_point(mesh, v, options))?;
    }

    trace!("loop step: {} faces -> {} faces", mesh.num_faces(), sub.num_faces());
    Ok(sub)
}

fn vertex_point(mesh: &Mesh, v: VertexKey, options: &SubdivideOptions) -> Point3<f64> {
    let s = mesh.position(v);
    if is_pinned(mesh, v, options) {
        return s;
    }
    if options.preserve_boundary && mesh.is_vertex_on_boundary(v) {
        return match boundary_neighbours(mesh, v).as_slice() {
            [a, b] => Point3::from(s.coords * 0.75 + (mesh.position(*a).coords + mesh.position(*b).coords) * 0.125),
            _ => s,
        };
    }

    let neighbours = mesh.vertex_neighbours(v, false);
    if neighbours.is_empty() {
        return s;
    }
    let n = neighbours.len();
    let beta = loop_beta(n);
    let sum: Vector3<f64> = neighbours.iter().map(|&w| mesh.position(w).coords).sum();
    Point3::from(s.coords * (1.0 - n as f64 * beta) + sum * beta)
}

/// Loop's beta for a vertex of valence `n`.
fn loop_beta(n: usize) -> f64 {
    if n == 3 {
        3.0 / 16.0
    } else {
        // beta = 1/n * (5/8 - (3/8 + 1/4 cos(2 pi / n))^2)
        let n_f = n as f64;
        let inner = 3.0 / 8.0 + 0.25 * (2.0 * PI / n_f).cos();
        (5.0 / 8.0 - inner * inner) / n_f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::FaceKey;

    fn create_tetrahedron() -> Mesh {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0], [0.5, 0.5, 1.0]];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        Mesh::from_vertices_and_faces(&points, &faces).unwrap()
    }

    fn create_two_triangles() -> Mesh {
        let points = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 2.0, 0.0], [1.0, -2.0, 0.0]];
        Mesh::from_vertices_and_faces(&points, &[[0, 1, 2], [1, 0, 3]]).unwrap()
    }

    #[test]
    fn test_loop_quadruples_faces() {
        let mesh = create_tetrahedron();
        let out = loop_subdivide(&mesh, &SubdivideOptions::new(2)).unwrap();
        assert_eq!(out.num_faces(), 4 * 16);
        assert!(out.is_trimesh());
        assert!(out.is_closed());
        assert_eq!(out.euler(), mesh.euler());
    }

    #[test]
    fn test_two_triangles_counts() {
        let mesh = create_two_triangles();
        let out = loop_subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(out.num_faces(), 8);
        assert_eq!(out.num_vertices(), 9);
        assert!(out.is_valid());
    }

    #[test]
    fn test_interior_edge_point() {
        // 3/8 ((0,0) + (2,0)) + 1/8 ((1,2) + (1,-2)) = (1, 0)
        let mesh = create_two_triangles();
        let out = loop_subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        let centre = out
            .vertices()
            .filter(|v| !mesh.has_vertex(*v))
            .find(|&v| out.vertex_degree(v) == 6)
            .unwrap();
        assert!((out.position(centre) - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn test_beta_coefficient() {
        assert!((loop_beta(3) - 3.0 / 16.0).abs() < 1e-10);
        // Regular valence: 1/16.
        assert!((loop_beta(6) - 1.0 / 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_polygon_faces_are_rejected() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2, 3]]).unwrap();
        let err = loop_subdivide(&mesh, &SubdivideOptions::new(1));
        assert!(matches!(err, Err(MeshError::InvalidParameter { .. })));
        assert!(mesh.has_face(FaceKey::new(0)));
    }

    #[test]
    fn test_closed_mesh_shrinks_toward_centroid() {
        let mesh = create_tetrahedron();
        let out = loop_subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        let c = mesh.centroid();
        for v in mesh.vertices() {
            assert!((out.position(v) - c).norm() < (mesh.position(v) - c).norm());
        }
    }
}
