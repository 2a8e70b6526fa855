//! Linear subdivision: no smoothing, only new topology.

use std::collections::BTreeMap;

use crate::attr::AttrMap;
use crate::error::Result;
use crate::key::{EdgeKey, FaceKey, VertexKey};
use crate::mesh::Mesh;

use super::{edge_vertex, run, split_edges, SubdivideOptions, SubdivideScheme};
use crate::algo::Progress;

/// Insert a vertex at every face centroid and fan it into triangles.
pub fn tri_subdivide(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    run(mesh, options, SubdivideScheme::Tri, &Progress::none())
}

/// Split every edge and every face into one quad per corner.
pub fn quad_subdivide(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    run(mesh, options, SubdivideScheme::Quad, &Progress::none())
}

pub(super) fn tri_once(mesh: &Mesh, _options: &SubdivideOptions) -> Result<Mesh> {
    let mut sub = mesh.clone();
    for f in mesh.faces() {
        sub.insert_vertex(f, None, AttrMap::new())?;
    }
    Ok(sub)
}

pub(super) fn quad_once(mesh: &Mesh, _options: &SubdivideOptions) -> Result<Mesh> {
    Ok(quad_split(mesh)?.mesh)
}

/// Result of [`quad_split`]: the refined mesh plus the vertex created for
/// each original edge and face.
pub(super) struct QuadSplit {
    pub mesh: Mesh,
    pub edge_points: BTreeMap<EdgeKey, VertexKey>,
    pub face_points: BTreeMap<FaceKey, VertexKey>,
}

/// Quad topology shared by the quad and Catmull-Clark schemes.
///
/// Edge points sit at the edge midpoints and face points at the face
/// centroids. Original vertices keep their keys and positions.
pub(super) fn quad_split(mesh: &Mesh) -> Result<QuadSplit> {
    let mut sub = mesh.clone();
    let edge_points = split_edges(mesh, &mut sub)?;
    let mut face_points = BTreeMap::new();

    for f in mesh.faces() {
        let corners = mesh.face_vertices(f);
        let n = corners.len();
        sub.delete_face(f)?;
        let c = sub.add_vertex_at(mesh.face_centroid(f));
        for i in 0..n {
            let v = corners[i];
            let before = edge_vertex(&edge_points, corners[(i + n - 1) % n], v)?;
            let after = edge_vertex(&edge_points, v, corners[(i + 1) % n])?;
            sub.add_face(&[v, after, c, before], None, AttrMap::new())?;
        }
        face_points.insert(f, c);
    }

    Ok(QuadSplit {
        mesh: sub,
        edge_points,
        face_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

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
    fn test_tri_subdivide_pentagon() {
        let points = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 1.0, 0.0], [1.0, 2.0, 0.0], [-1.0, 1.0, 0.0]];
        let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2, 3, 4]]).unwrap();
        let out = tri_subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(out.num_faces(), 5);
        assert_eq!(out.num_vertices(), 6);
        assert!(out.is_trimesh());
        assert!((out.area() - mesh.area()).abs() < 1e-10);
    }

    #[test]
    fn test_quad_subdivide_cube() {
        let mesh = create_quad_cube();
        let out = quad_subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(out.num_faces(), 24);
        assert_eq!(out.num_vertices(), 8 + 12 + 6);
        assert!(out.is_quadmesh());
        assert!(out.is_closed());
        assert!(out.is_valid());
        assert_eq!(out.euler(), 2);
        // Linear scheme: original corners do not move.
        assert_eq!(out.position(VertexKey::new(6)), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_quad_split_orientation_is_consistent() {
        let mesh = create_quad_cube();
        let split = quad_split(&mesh).unwrap();
        assert_eq!(split.edge_points.len(), 12);
        assert_eq!(split.face_points.len(), 6);
        let c = split.face_points[&FaceKey::new(1)];
        assert_eq!(split.mesh.position(c), Point3::new(0.5, 0.5, 1.0));
        // The top face normal still points up after the split.
        for f in split.mesh.vertex_faces(c, false) {
            assert!((split.mesh.face_normal(f).z - 1.0).abs() < 1e-10);
        }
    }
}
