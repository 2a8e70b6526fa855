//! # Topomesh
//!
//! Mutable, attribute-carrying topological data structures for polygonal
//! geometry, and the algorithms built on them.
//!
//! - [`Mesh`](mesh::Mesh): keyed halfedge polygon mesh with stable keys,
//!   validated mutation operators (split, collapse, swap, insert) and
//!   adjacency queries
//! - [`Network`](network::Network): directed graph embedded in space
//! - [`VolMesh`](volmesh::VolMesh): cells bounded by polygon faces
//! - [`algo`]: subdivision, Delaunay triangulation, duals, relaxation,
//!   planarization, traversal and shortest paths
//!
//! Every structure carries per-entity attributes with default templates and
//! converts to and from a canonical JSON document.
//!
//! ## Quick Start
//!
//! ```
//! use topomesh::prelude::*;
//! use topomesh::algo::subdivide::{subdivide, SubdivideOptions, SubdivideScheme};
//!
//! let points = [
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [1.0, 1.0, 0.0],
//!     [0.0, 1.0, 0.0],
//! ];
//! let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2, 3]]).unwrap();
//!
//! let options = SubdivideOptions::new(2).with_scheme(SubdivideScheme::CatmullClark);
//! let fine = subdivide(&mesh, &options).unwrap();
//! assert_eq!(fine.num_faces(), 16);
//!
//! // The input is untouched.
//! assert_eq!(mesh.num_faces(), 1);
//! ```
//!
//! ## Attributes
//!
//! ```
//! use topomesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh = Mesh::new();
//! mesh.update_default_vertex_attributes(attrs([("weight", Attr::from(1.0))]))
//!     .unwrap();
//! let v = mesh.add_vertex_at(Point3::new(0.0, 0.0, 2.0));
//!
//! assert_eq!(mesh.vertex_attribute(v, "weight"), Some(Attr::Float(1.0)));
//! assert_eq!(mesh.vertex_attribute(v, "z"), Some(Attr::Float(2.0)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod attr;
pub mod data;
pub mod error;
pub mod key;
pub mod mesh;
pub mod network;
pub mod volmesh;

/// Prelude module for convenient imports.
///
/// ```
/// use topomesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::traverse::VertexGraph;
    pub use crate::algo::Progress;
    pub use crate::attr::{attrs, Attr, AttrMap, AttributePolicy, MeshConfig};
    pub use crate::data::Document;
    pub use crate::error::{MeshError, Result};
    pub use crate::key::{CellKey, EdgeKey, FaceKey, KeyIndex, VertexKey};
    pub use crate::mesh::{Mesh, MeshData};
    pub use crate::network::{Network, NetworkData};
    pub use crate::volmesh::{VolMesh, VolMeshData};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_tetrahedron() {
        let points = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.5, 1.0, 0.0],
            [0.5, 0.5, 1.0],
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

        let mesh = Mesh::from_vertices_and_faces(&points, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());
        assert!(mesh.is_closed());
        for v in mesh.vertices() {
            assert!(!mesh.is_vertex_on_boundary(v), "vertex {:?} should not be on boundary", v);
        }
    }
}
