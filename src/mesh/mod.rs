//! Halfedge polygon meshes.
//!
//! The primary type is [`Mesh`], a keyed halfedge structure for polygonal
//! surfaces. Faces may have any number of sides; boundaries and holes are
//! represented by halfedges without a face.
//!
//! # Keys
//!
//! Entities are addressed by [`VertexKey`](crate::key::VertexKey) and
//! [`FaceKey`](crate::key::FaceKey). Edges are vertex pairs. Keys stay valid
//! across unrelated edits and are never reused after deletion.
//!
//! # Construction
//!
//! ```
//! use topomesh::mesh::Mesh;
//! use topomesh::attr::AttrMap;
//! use nalgebra::Point3;
//!
//! let mut mesh = Mesh::new();
//! let a = mesh.add_vertex_at(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex_at(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex_at(Point3::new(1.0, 1.0, 0.0));
//! let d = mesh.add_vertex_at(Point3::new(0.0, 1.0, 0.0));
//! let f = mesh.add_face(&[a, b, c, d], None, AttrMap::new()).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 1);
//! assert_eq!(mesh.face_vertices(f), &[a, b, c, d]);
//! assert!(!mesh.is_closed());
//! ```

mod attributes;
mod builder;
mod data;
mod geometry;
mod halfedge;
mod ops;
mod query;

pub use data::MeshData;
pub use halfedge::{Mesh, Vertex};

pub(crate) use attributes::{coordinate_axis, take_position, COORDINATE_NAMES};
pub(crate) use builder::{geometric_key, GeometricKey};
pub(crate) use geometry::{centroid_of, polygon_center_of_mass};
pub(crate) use halfedge::cycle_pairs;
