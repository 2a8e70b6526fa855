//! Catmull-Clark subdivision.

use std::collections::BTreeMap;

use log::trace;
use nalgebra::{Point3, Vector3};

use crate::algo::Progress;
use crate::error::Result;
use crate::key::{FaceKey, VertexKey};
use crate::mesh::{centroid_of, Mesh};

use super::simple::quad_split;
use super::{boundary_neighbours, is_pinned, run, SubdivideOptions, SubdivideScheme};

/// Performs Catmull-Clark subdivision.
///
/// Each face of degree n becomes n quads. New positions follow the usual
/// rules:
///
/// - **Face point**: centroid of the face.
/// - **Edge point**: average of the two end points and the two adjacent face
///   points; the midpoint on the boundary.
/// - **Vertex point**: (Q + 2R + (n-3)S) / n where
///   - Q = average of the adjacent face points
///   - R = average of the adjacent edge midpoints
///   - S = original position
///   - n = valence
///
/// With `preserve_boundary`, boundary vertices use `3/4 S + 1/8 (a + b)` over
/// their two boundary neighbours.
pub fn catmull_clark(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    run(mesh, options, SubdivideScheme::CatmullClark, &Progress::none())
}

pub(super) fn catmull_clark_once(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    let face_points: BTreeMap<FaceKey, Point3<f64>> = mesh.faces().map(|f| (f, mesh.face_centroid(f))).collect();

    let mut split = quad_split(mesh)?;

    for (&(u, v), &w) in &split.edge_points {
        let position = match (mesh.halfedge_face(u, v), mesh.halfedge_face(v, u)) {
            (Some(f), Some(g)) => {
                let sum = mesh.position(u).coords
                    + mesh.position(v).coords
                    + face_points[&f].coords
                    + face_points[&g].coords;
                Point3::from(sum / 4.0)
            }
            _ => mesh.edge_midpoint(u, v),
        };
        split.mesh.set_position(w, position)?;
    }

    for v in mesh.vertices() {
        let position = vertex_point(mesh, v, &face_points, options);
        split.mesh.set_position(v, position)?;
    }

    trace!(
        "catmull-clark step: {} faces -> {} faces",
        mesh.num_faces(),
        split.mesh.num_faces()
    );
    Ok(split.mesh)
}

fn vertex_point(
    mesh: &Mesh,
    v: VertexKey,
    face_points: &BTreeMap<FaceKey, Point3<f64>>,
    options: &SubdivideOptions,
) -> Point3<f64> {
    let s = mesh.position(v);
    if is_pinned(mesh, v, options) {
        return s;
    }

    if options.preserve_boundary && mesh.is_vertex_on_boundary(v) {
        let rim = boundary_neighbours(mesh, v);
        return match rim.as_slice() {
            [a, b] => Point3::from(s.coords * 0.75 + (mesh.position(*a).coords + mesh.position(*b).coords) * 0.125),
            _ => s,
        };
    }

    let faces = mesh.vertex_faces(v, false);
    let neighbours = mesh.vertex_neighbours(v, false);
    if faces.is_empty() || neighbours.is_empty() {
        return s;
    }

    let q = centroid_of(&faces.iter().map(|f| face_points[f]).collect::<Vec<_>>()).coords;
    let r: Vector3<f64> = neighbours
        .iter()
        .map(|&w| mesh.edge_midpoint(v, w).coords)
        .sum::<Vector3<f64>>()
        / neighbours.len() as f64;
    let n = neighbours.len() as f64;
    Point3::from((q + r * 2.0 + s.coords * (n - 3.0)) / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn create_single_quad() -> Mesh {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        Mesh::from_vertices_and_faces(&points, &[[0, 1, 2, 3]]).unwrap()
    }

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
    fn test_single_quad_step() {
        let mesh = create_single_quad();
        let out = catmull_clark(&mesh, &SubdivideOptions::new(1)).unwrap();

        assert_eq!(out.num_faces(), 4);
        assert!(out.is_quadmesh());
        assert_eq!(out.num_vertices(), 9);

        // Corners are pinned.
        for v in mesh.vertices() {
            assert!(out.has_vertex(v));
            assert_eq!(out.position(v), mesh.position(v));
        }

        // One face point at the centroid, four edge points at the midpoints.
        let new: Vec<VertexKey> = out.vertices().filter(|v| !mesh.has_vertex(*v)).collect();
        assert_eq!(new.len(), 5);
        assert!(new.iter().any(|&v| (out.position(v) - Point3::new(0.5, 0.5, 0.0)).norm() < EPSILON));
        assert!(new.iter().any(|&v| (out.position(v) - Point3::new(0.5, 0.0, 0.0)).norm() < EPSILON));
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_cube_counts_and_shrinkage() {
        let mesh = create_quad_cube();
        let out = catmull_clark(&mesh, &SubdivideOptions::new(2)).unwrap();
        assert_eq!(out.num_faces(), 6 * 16);
        assert!(out.is_closed());
        assert!(out.is_manifold());
        assert_eq!(out.euler(), 2);

        // Approximating scheme: corners are pulled inwards.
        let corner = out.position(VertexKey::new(6));
        assert!(corner.x < 1.0 && corner.y < 1.0 && corner.z < 1.0);
        assert!((out.centroid() - Point3::new(0.5, 0.5, 0.5)).norm() < EPSILON);
    }

    #[test]
    fn test_cube_vertex_rule() {
        // Valence 3 cube corner: (Q + 2R + 0 S) / 3.
        let mesh = create_quad_cube();
        let out = catmull_clark(&mesh, &SubdivideOptions::new(1)).unwrap();
        // Q = average of (0.5,0.5,0), (0.5,0,0.5), (0,0.5,0.5) = (1/3, 1/3, 1/3)
        // R = average of (0.5,0,0), (0,0.5,0), (0,0,0.5) = (1/6, 1/6, 1/6)
        let expected = 1.0 / 3.0 * (1.0 / 3.0 + 2.0 / 6.0);
        let p = out.position(VertexKey::new(0));
        assert!((p - Point3::new(expected, expected, expected)).norm() < EPSILON);
    }

    #[test]
    fn test_fixed_vertices_stay() {
        let mesh = create_quad_cube();
        let options = SubdivideOptions::new(1).with_fixed([VertexKey::new(6)]);
        let out = catmull_clark(&mesh, &options).unwrap();
        assert_eq!(out.position(VertexKey::new(6)), Point3::new(1.0, 1.0, 1.0));
        assert_ne!(out.position(VertexKey::new(5)), Point3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_boundary_curve_rule() {
        // 2x1 strip: vertex 1 sits on the boundary between the two quads.
        let points = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
        ];
        let mut mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap();
        mesh.set_position(VertexKey::new(1), Point3::new(1.0, 0.4, 0.0)).unwrap();
        let out = catmull_clark(&mesh, &SubdivideOptions::new(1)).unwrap();
        // 3/4 (1, 0.4) + 1/8 ((0, 0) + (2, 0))
        let p = out.position(VertexKey::new(1));
        assert!((p - Point3::new(1.0, 0.3, 0.0)).norm() < EPSILON);
    }
}
