//! Dual mesh construction.
//!
//! Every face of the primal becomes a vertex of the dual at the face
//! centroid, keyed by the face key. Every interior vertex becomes a dual
//! face through the centroids of its incident faces, in radial order.

use std::collections::BTreeMap;

use log::{debug, warn};
use nalgebra::Point3;

use crate::attr::{Attr, AttrMap};
use crate::error::Result;
use crate::key::{canonical_edge, EdgeKey, FaceKey, VertexKey};
use crate::mesh::Mesh;

/// What to do with boundary vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DualBoundary {
    /// Boundary vertices produce no dual face.
    #[default]
    Skip,
    /// Boundary vertices produce a dual face closed through the midpoints
    /// of their boundary edges and the vertex itself.
    Open,
}

/// Options for [`dual`].
#[derive(Debug, Clone, Default)]
pub struct DualOptions {
    /// Boundary policy.
    pub boundary: DualBoundary,
}

impl DualOptions {
    /// Set the boundary policy.
    pub fn with_boundary(mut self, boundary: DualBoundary) -> Self {
        self.boundary = boundary;
        self
    }
}

fn point_attrs(p: Point3<f64>) -> AttrMap {
    [("x", p.x), ("y", p.y), ("z", p.z)]
        .into_iter()
        .map(|(name, value)| (name.to_string(), Attr::Float(value)))
        .collect()
}

/// Faces around `v` against the [`Mesh::vertex_faces`] fan order, so the
/// dual face winds like the primal ones. On the boundary the ring starts at
/// the face whose incoming halfedge at `v` is a boundary halfedge.
///
/// Returns `None` when the faces do not form a single fan.
fn radial_faces(mesh: &Mesh, v: VertexKey) -> Option<Vec<FaceKey>> {
    let mut ring = mesh.vertex_faces(v, true);
    if ring.is_empty() || ring.len() != mesh.vertex_faces(v, false).len() {
        return None;
    }
    ring.reverse();
    Some(ring)
}

/// Build the dual of a mesh.
///
/// Dual faces wind the same way as the primal faces. Boundary vertices are
/// handled per [`DualOptions::boundary`]; with [`DualBoundary::Open`] the
/// midpoint vertices are shared between neighbouring boundary vertices.
pub fn dual(mesh: &Mesh, options: &DualOptions) -> Result<Mesh> {
    let mut out = Mesh::with_config(mesh.config());
    for f in mesh.faces() {
        out.add_vertex(Some(VertexKey::new(f.get())), point_attrs(mesh.face_centroid(f)))?;
    }

    let mut midpoints: BTreeMap<EdgeKey, VertexKey> = BTreeMap::new();
    let mut midpoint = |out: &mut Mesh, u: VertexKey, w: VertexKey| -> Result<VertexKey> {
        let key = canonical_edge(u, w);
        if let Some(&m) = midpoints.get(&key) {
            return Ok(m);
        }
        let m = out.add_vertex(None, point_attrs(mesh.edge_midpoint(u, w)))?;
        midpoints.insert(key, m);
        Ok(m)
    };

    for v in mesh.vertices() {
        if mesh.vertex_degree(v) == 0 {
            continue;
        }
        let on_boundary = mesh.is_vertex_on_boundary(v);
        if on_boundary && options.boundary == DualBoundary::Skip {
            continue;
        }
        let Some(ring) = radial_faces(mesh, v) else {
            warn!("dual: skipping non-manifold vertex {:?}", v);
            continue;
        };
        let mut cycle: Vec<VertexKey> = ring.iter().map(|f| VertexKey::new(f.get())).collect();

        if on_boundary {
            let (Some(&first), Some(&last)) = (ring.first(), ring.last()) else {
                continue;
            };
            let (Some(a), Some(b)) = (mesh.face_vertex_before(last, v), mesh.face_vertex_after(first, v)) else {
                continue;
            };
            cycle.push(midpoint(&mut out, v, a)?);
            cycle.push(out.add_vertex(None, point_attrs(mesh.position(v)))?);
            cycle.push(midpoint(&mut out, v, b)?);
        } else if cycle.len() < 3 {
            continue;
        }

        out.add_face(&cycle, None, AttrMap::new())?;
    }

    debug!(
        "dual: {} faces -> {} vertices, {} faces",
        mesh.num_faces(),
        out.num_vertices(),
        out.num_faces()
    );
    Ok(out)
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

    fn create_grid_mesh() -> Mesh {
        let mut points = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                points.push([i as f64, j as f64, 0.0]);
            }
        }
        let faces = [[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
        Mesh::from_vertices_and_faces(&points, &faces).unwrap()
    }

    #[test]
    fn test_cube_dual_is_octahedron() {
        let cube = create_quad_cube();
        let octa = dual(&cube, &DualOptions::default()).unwrap();
        assert_eq!(octa.num_vertices(), 6);
        assert_eq!(octa.num_faces(), 8);
        assert!(octa.is_trimesh());
        assert!(octa.is_closed());
        assert_eq!(octa.euler(), 2);
        // Face keys become vertex keys.
        assert_eq!(octa.position(VertexKey::new(1)), Point3::new(0.5, 0.5, 1.0));
        // Outward winding is kept.
        let c = octa.centroid();
        for f in octa.faces() {
            assert!(octa.face_normal(f).dot(&(octa.face_centroid(f) - c)) > 0.0);
        }
    }

    #[test]
    fn test_grid_dual_skips_boundary() {
        let mesh = create_grid_mesh();
        let d = dual(&mesh, &DualOptions::default()).unwrap();
        assert_eq!(d.num_vertices(), 4);
        assert_eq!(d.num_faces(), 1);
        let f = d.faces().next().unwrap();
        assert!((d.face_area(f) - 1.0).abs() < 1e-10);
        assert!(d.face_normal(f).z > 0.0);
    }

    #[test]
    fn test_grid_dual_open_boundary() {
        let mesh = create_grid_mesh();
        let d = dual(&mesh, &DualOptions::default().with_boundary(DualBoundary::Open)).unwrap();
        // One face per primal vertex.
        assert_eq!(d.num_faces(), 9);
        // 4 centroids + 8 boundary edge midpoints + 8 boundary vertices.
        assert_eq!(d.num_vertices(), 4 + 8 + 8);
        assert!(d.is_valid());
        assert!(d.is_manifold());
        assert!((d.area() - 4.0).abs() < 1e-10);
        for f in d.faces() {
            assert!(d.face_normal(f).z > 0.0);
        }
    }

    #[test]
    fn test_radial_faces_reject_bowtie() {
        let points = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
        ];
        let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2], [0, 3, 4]]).unwrap();
        assert_eq!(radial_faces(&mesh, VertexKey::new(0)), None);
        assert_eq!(radial_faces(&mesh, VertexKey::new(1)), Some(vec![FaceKey::new(0)]));

        let grid = create_grid_mesh();
        assert_eq!(
            radial_faces(&grid, VertexKey::new(1)),
            Some(vec![FaceKey::new(1), FaceKey::new(0)])
        );
        assert_eq!(radial_faces(&grid, VertexKey::new(4)).map(|ring| ring.len()), Some(4));
    }
}
