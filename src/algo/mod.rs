//! Algorithms built on top of the mesh operators.
//!
//! - **Traversal**: breadth-first search and connected components over any
//!   [`VertexGraph`](traverse::VertexGraph)
//! - **Shortest paths**: Dijkstra with Euclidean or custom weights
//! - **Subdivision**: tri, quad, Catmull-Clark, Loop, Doo-Sabin
//! - **Delaunay**: Bowyer-Watson triangulation of planar points
//! - **Dual**: face/vertex dual with boundary policies
//! - **Relaxation**: centroid, center-of-mass and area smoothing
//! - **Planarization**: least-squares face flattening
//!
//! Algorithms that change topology return a new mesh. Relaxation and
//! planarization move vertices in place and never touch the topology.

pub mod delaunay;
pub mod dual;
pub mod planarize;
pub mod progress;
pub mod shortest_path;
pub mod smooth;
pub mod subdivide;
pub mod traverse;

pub use progress::Progress;
