//! Graph view shared by meshes, networks and volmeshes.
//!
//! Path and connectivity algorithms only need vertex keys, undirected
//! adjacency and positions. [`VertexGraph`] is that common view.

use std::collections::{BTreeSet, VecDeque};

use nalgebra::Point3;

use crate::key::VertexKey;
use crate::mesh::Mesh;

/// Read-only undirected vertex adjacency.
pub trait VertexGraph {
    /// All vertex keys, in key order.
    fn graph_vertices(&self) -> Vec<VertexKey>;

    /// Vertices joined to `v` by an edge in either direction.
    fn graph_neighbours(&self, v: VertexKey) -> Vec<VertexKey>;

    /// Position used for Euclidean edge weights.
    fn graph_position(&self, v: VertexKey) -> Point3<f64>;

    /// Whether the vertex exists.
    fn graph_contains(&self, v: VertexKey) -> bool;
}

impl VertexGraph for Mesh {
    fn graph_vertices(&self) -> Vec<VertexKey> {
        self.vertices().collect()
    }

    fn graph_neighbours(&self, v: VertexKey) -> Vec<VertexKey> {
        self.vertex_neighbours(v, false)
    }

    fn graph_position(&self, v: VertexKey) -> Point3<f64> {
        self.position(v)
    }

    fn graph_contains(&self, v: VertexKey) -> bool {
        self.has_vertex(v)
    }
}

/// Vertices reachable from `root` in breadth-first order.
pub fn breadth_first<G: VertexGraph + ?Sized>(graph: &G, root: VertexKey) -> Vec<VertexKey> {
    if !graph.graph_contains(root) {
        return Vec::new();
    }
    let mut seen = BTreeSet::from([root]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(v) = queue.pop_front() {
        order.push(v);
        for w in graph.graph_neighbours(v) {
            if seen.insert(w) {
                queue.push_back(w);
            }
        }
    }
    order
}

/// Connected components, each sorted by key, ordered by their smallest key.
pub fn connected_components<G: VertexGraph + ?Sized>(graph: &G) -> Vec<Vec<VertexKey>> {
    let mut assigned = BTreeSet::new();
    let mut components = Vec::new();
    for v in graph.graph_vertices() {
        if assigned.contains(&v) {
            continue;
        }
        let mut component = breadth_first(graph, v);
        assigned.extend(component.iter().copied());
        component.sort();
        components.push(component);
    }
    components
}

impl Mesh {
    /// Connected components of the vertex graph.
    pub fn connected_components(&self) -> Vec<Vec<VertexKey>> {
        connected_components(self)
    }
}
