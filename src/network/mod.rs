//! Directed graphs embedded in space.
//!
//! A [`Network`] stores vertices with coordinates and directed edges. Two
//! edges between the same pair of vertices may coexist only if they point in
//! opposite directions. There are no faces.
//!
//! ```
//! use topomesh::network::Network;
//! use topomesh::attr::AttrMap;
//! use nalgebra::Point3;
//!
//! let mut network = Network::new();
//! let a = network.add_vertex_at(Point3::new(0.0, 0.0, 0.0));
//! let b = network.add_vertex_at(Point3::new(1.0, 0.0, 0.0));
//! network.add_edge(a, b, AttrMap::new()).unwrap();
//!
//! assert!(network.has_edge(a, b));
//! assert!(!network.has_edge(b, a));
//! assert_eq!(network.leaves(), vec![a, b]);
//! ```

mod data;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, warn};
use nalgebra::{Point3, Vector3};

pub use data::NetworkData;

use crate::algo::traverse::{connected_components, VertexGraph};
use crate::attr::{Attr, AttrMap, AttributeStore, MeshConfig};
use crate::error::{MeshError, Result};
use crate::key::{EdgeKey, KeyAllocator, KeyIndex, VertexKey};
use crate::mesh::{coordinate_axis, geometric_key, take_position, Vertex, COORDINATE_NAMES};

/// A directed graph with vertex coordinates and per-entity attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) attributes: AttrMap,
    pub(crate) vertices: BTreeMap<VertexKey, Vertex>,
    /// Outgoing neighbours.
    pub(crate) succ: BTreeMap<VertexKey, BTreeSet<VertexKey>>,
    /// Incoming neighbours.
    pub(crate) pred: BTreeMap<VertexKey, BTreeSet<VertexKey>>,
    pub(crate) default_position: Point3<f64>,
    pub(crate) vertex_attrs: AttributeStore<VertexKey>,
    /// Keyed by the directed pair.
    pub(crate) edge_attrs: AttributeStore<EdgeKey>,
    pub(crate) vertex_keys: KeyAllocator<VertexKey>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MeshConfig::default())
    }

    /// Create an empty network with an explicit configuration.
    pub fn with_config(config: MeshConfig) -> Self {
        Self {
            attributes: AttrMap::new(),
            vertices: BTreeMap::new(),
            succ: BTreeMap::new(),
            pred: BTreeMap::new(),
            default_position: Point3::origin(),
            vertex_attrs: AttributeStore::new("vertex", AttrMap::new(), config),
            edge_attrs: AttributeStore::new("edge", AttrMap::new(), config),
            vertex_keys: KeyAllocator::new(),
        }
    }

    /// The configuration the network was built with.
    pub fn config(&self) -> MeshConfig {
        self.vertex_attrs.config()
    }

    // ==================== Counts and membership ====================

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of directed edges.
    pub fn num_edges(&self) -> usize {
        self.succ.values().map(BTreeSet::len).sum()
    }

    /// Whether the vertex exists.
    pub fn has_vertex(&self, v: VertexKey) -> bool {
        self.vertices.contains_key(&v)
    }

    /// Whether the directed edge `u -> v` exists.
    pub fn has_edge(&self, u: VertexKey, v: VertexKey) -> bool {
        self.succ.get(&u).is_some_and(|s| s.contains(&v))
    }

    /// Whether `u` and `v` are joined by an edge in either direction.
    pub fn is_adjacent(&self, u: VertexKey, v: VertexKey) -> bool {
        self.has_edge(u, v) || self.has_edge(v, u)
    }

    // ==================== Iteration ====================

    /// Vertex keys in key order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys().copied()
    }

    /// Vertices paired with their attributes, coordinates included.
    pub fn vertices_with_attributes(&self) -> impl Iterator<Item = (VertexKey, AttrMap)> + '_ {
        self.vertices().filter_map(|v| Some((v, self.vertex_attributes(v)?)))
    }

    /// Directed edges, ordered by source then target.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.succ.iter().flat_map(|(&u, targets)| targets.iter().map(move |&v| (u, v)))
    }

    /// Edges paired with their attributes.
    pub fn edges_with_attributes(&self) -> impl Iterator<Item = (EdgeKey, AttrMap)> + '_ {
        self.edges().map(|e| (e, self.edge_attrs.attributes(e)))
    }

    // ==================== Mutation ====================

    /// Add a vertex. Coordinates come from `x`, `y`, `z` in `attrs`.
    pub fn add_vertex(&mut self, key: Option<VertexKey>, mut attrs: AttrMap) -> Result<VertexKey> {
        let position = take_position(&mut attrs, self.default_position)?;
        self.vertex_attrs.check_names(&attrs)?;
        let vertices = &self.vertices;
        let v = self.vertex_keys.allocate(key, |k| vertices.contains_key(&k))?;
        self.vertices.insert(v, Vertex::new(position));
        self.succ.entry(v).or_default();
        self.pred.entry(v).or_default();
        self.vertex_attrs.create(v, attrs);
        debug!("added vertex {:?}", v);
        Ok(v)
    }

    /// Add a vertex at a position with an automatic key.
    pub fn add_vertex_at(&mut self, position: Point3<f64>) -> VertexKey {
        let v = self.vertex_keys.peek();
        self.vertex_keys.observe(v);
        self.vertices.insert(v, Vertex::new(position));
        self.succ.entry(v).or_default();
        self.pred.entry(v).or_default();
        self.vertex_attrs.create(v, AttrMap::new());
        v
    }

    /// Add the directed edge `u -> v`.
    ///
    /// Fails with `KeyNotFound` for unknown vertices, `DuplicateKey` when the
    /// edge already exists and `InvalidParameter` for a loop.
    pub fn add_edge(&mut self, u: VertexKey, v: VertexKey, attrs: AttrMap) -> Result<EdgeKey> {
        for w in [u, v] {
            if !self.has_vertex(w) {
                return Err(MeshError::not_found("vertex", w));
            }
        }
        if u == v {
            return Err(MeshError::invalid_param("edge", format!("{:?}", (u, v)), "loops are not allowed"));
        }
        if self.has_edge(u, v) {
            return Err(MeshError::duplicate("edge", (u, v)));
        }
        self.edge_attrs.check_names(&attrs)?;
        self.succ.entry(u).or_default().insert(v);
        self.pred.entry(v).or_default().insert(u);
        self.edge_attrs.create((u, v), attrs);
        debug!("added edge ({:?}, {:?})", u, v);
        Ok((u, v))
    }

    /// Delete a directed edge.
    pub fn delete_edge(&mut self, u: VertexKey, v: VertexKey) -> Result<()> {
        if !self.has_edge(u, v) {
            return Err(MeshError::not_found("edge", (u, v)));
        }
        self.unlink(u, v);
        debug!("deleted edge ({:?}, {:?})", u, v);
        Ok(())
    }

    fn unlink(&mut self, u: VertexKey, v: VertexKey) {
        if let Some(s) = self.succ.get_mut(&u) {
            s.remove(&v);
        }
        if let Some(p) = self.pred.get_mut(&v) {
            p.remove(&u);
        }
        self.edge_attrs.remove((u, v));
    }

    /// Delete a vertex and every edge touching it.
    pub fn delete_vertex(&mut self, v: VertexKey) -> Result<()> {
        if !self.has_vertex(v) {
            return Err(MeshError::not_found("vertex", v));
        }
        for w in self.neighbours_out(v) {
            self.unlink(v, w);
        }
        for w in self.neighbours_in(v) {
            self.unlink(w, v);
        }
        self.succ.remove(&v);
        self.pred.remove(&v);
        self.vertices.remove(&v);
        self.vertex_attrs.remove(v);
        debug!("deleted vertex {:?}", v);
        Ok(())
    }

    /// Split the edge `u -> v` by a new vertex at `u + t (v - u)`.
    ///
    /// The edge is replaced by `u -> w` and `w -> v`; both halves inherit
    /// its attributes.
    pub fn split_edge(&mut self, u: VertexKey, v: VertexKey, t: f64) -> Result<VertexKey> {
        if !self.has_edge(u, v) {
            return Err(MeshError::not_found("edge", (u, v)));
        }
        if !(0.0..=1.0).contains(&t) {
            return Err(MeshError::invalid_param("t", t, "must be in [0, 1]"));
        }
        let w = self.add_vertex_at(self.edge_point(u, v, t));
        for (a, b) in [(u, w), (w, v)] {
            self.succ.entry(a).or_default().insert(b);
            self.pred.entry(b).or_default().insert(a);
            self.edge_attrs.copy((u, v), (a, b));
        }
        self.unlink(u, v);
        debug!("split edge ({:?}, {:?}) at {:?}", u, v, w);
        Ok(w)
    }

    // ==================== Queries ====================

    /// Targets of the edges leaving `v`.
    pub fn neighbours_out(&self, v: VertexKey) -> Vec<VertexKey> {
        self.succ.get(&v).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Sources of the edges entering `v`.
    pub fn neighbours_in(&self, v: VertexKey) -> Vec<VertexKey> {
        self.pred.get(&v).map(|p| p.iter().copied().collect()).unwrap_or_default()
    }

    /// Vertices joined to `v` in either direction, in key order.
    pub fn neighbours(&self, v: VertexKey) -> Vec<VertexKey> {
        let mut all: BTreeSet<VertexKey> = BTreeSet::new();
        all.extend(self.succ.get(&v).into_iter().flatten());
        all.extend(self.pred.get(&v).into_iter().flatten());
        all.into_iter().collect()
    }

    /// Number of distinct neighbours.
    pub fn degree(&self, v: VertexKey) -> usize {
        self.neighbours(v).len()
    }

    /// Number of outgoing edges.
    pub fn degree_out(&self, v: VertexKey) -> usize {
        self.succ.get(&v).map_or(0, BTreeSet::len)
    }

    /// Number of incoming edges.
    pub fn degree_in(&self, v: VertexKey) -> usize {
        self.pred.get(&v).map_or(0, BTreeSet::len)
    }

    /// Vertices with exactly one neighbour.
    pub fn leaves(&self) -> Vec<VertexKey> {
        self.vertices().filter(|&v| self.degree(v) == 1).collect()
    }

    /// Connected components, ignoring edge direction.
    pub fn connected_components(&self) -> Vec<Vec<VertexKey>> {
        connected_components(self)
    }

    /// Whether the network is a single component. An empty network is not
    /// connected.
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() == 1
    }

    // ==================== Geometry ====================

    /// Position of a vertex (the origin for unknown keys).
    pub fn position(&self, v: VertexKey) -> Point3<f64> {
        self.vertices.get(&v).map_or_else(Point3::origin, |r| r.position)
    }

    /// Move a vertex.
    pub fn set_position(&mut self, v: VertexKey, position: Point3<f64>) -> Result<()> {
        let record = self.vertices.get_mut(&v).ok_or_else(|| MeshError::not_found("vertex", v))?;
        record.position = position;
        Ok(())
    }

    /// Vector from `u` to `v`.
    pub fn edge_vector(&self, u: VertexKey, v: VertexKey) -> Vector3<f64> {
        self.position(v) - self.position(u)
    }

    /// Length of the edge `(u, v)`.
    pub fn edge_length(&self, u: VertexKey, v: VertexKey) -> f64 {
        self.edge_vector(u, v).norm()
    }

    /// Point at parameter `t` from `u` to `v`.
    pub fn edge_point(&self, u: VertexKey, v: VertexKey, t: f64) -> Point3<f64> {
        self.position(u) + self.edge_vector(u, v) * t
    }

    // ==================== Attributes ====================

    /// Mesh-level attributes.
    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    /// Set a network-level attribute.
    pub fn set_attribute(&mut self, name: &str, value: Attr) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Merge `mapping` into the default vertex template.
    pub fn update_default_vertex_attributes(&mut self, mut mapping: AttrMap) -> Result<()> {
        self.default_position = take_position(&mut mapping, self.default_position)?;
        self.vertex_attrs.update_defaults(mapping);
        Ok(())
    }

    /// Merge `mapping` into the default edge template.
    pub fn update_default_edge_attributes(&mut self, mapping: AttrMap) {
        self.edge_attrs.update_defaults(mapping);
    }

    /// Default vertex attributes, coordinates included.
    pub fn default_vertex_attributes(&self) -> AttrMap {
        let mut out = self.vertex_attrs.defaults().clone();
        for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
            out.insert(name.to_string(), Attr::Float(self.default_position[axis]));
        }
        out
    }

    /// Read one vertex attribute.
    pub fn vertex_attribute(&self, v: VertexKey, name: &str) -> Option<Attr> {
        let record = self.vertices.get(&v)?;
        match coordinate_axis(name) {
            Some(axis) => Some(Attr::Float(record.position[axis])),
            None => self.vertex_attrs.get(v, name).cloned(),
        }
    }

    /// All attributes of a vertex, coordinates included.
    pub fn vertex_attributes(&self, v: VertexKey) -> Option<AttrMap> {
        let record = self.vertices.get(&v)?;
        let mut out = self.vertex_attrs.attributes(v);
        for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
            out.insert(name.to_string(), Attr::Float(record.position[axis]));
        }
        Some(out)
    }

    /// Write one vertex attribute; `x`, `y`, `z` move the vertex.
    pub fn set_vertex_attribute(&mut self, v: VertexKey, name: &str, value: Attr) -> Result<()> {
        let Some(record) = self.vertices.get_mut(&v) else {
            return Err(MeshError::not_found("vertex", v));
        };
        match coordinate_axis(name) {
            Some(axis) => {
                record.position[axis] = value
                    .as_f64()
                    .ok_or_else(|| MeshError::invalid_param("coordinate", format!("{:?}", value), "must be numeric"))?;
                Ok(())
            }
            None => self.vertex_attrs.set(v, name, value),
        }
    }

    /// Read one attribute for many vertices (all when `keys` is `None`).
    pub fn vertices_attribute(&self, name: &str, keys: Option<&[VertexKey]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&v| self.vertex_attribute(v, name)).collect(),
            None => self.vertices().map(|v| self.vertex_attribute(v, name)).collect(),
        }
    }

    /// Read one edge attribute.
    pub fn edge_attribute(&self, u: VertexKey, v: VertexKey, name: &str) -> Option<Attr> {
        if !self.has_edge(u, v) {
            return None;
        }
        self.edge_attrs.get((u, v), name).cloned()
    }

    /// Write one edge attribute.
    pub fn set_edge_attribute(&mut self, u: VertexKey, v: VertexKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_edge(u, v) {
            return Err(MeshError::not_found("edge", (u, v)));
        }
        self.edge_attrs.set((u, v), name, value)
    }

    /// Read one attribute for many edges (all when `keys` is `None`).
    pub fn edges_attribute(&self, name: &str, keys: Option<&[EdgeKey]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&(u, v)| self.edge_attribute(u, v, name)).collect(),
            None => self.edges().map(|(u, v)| self.edge_attribute(u, v, name)).collect(),
        }
    }

    // ==================== Construction ====================

    /// Build a network from line segments, welding endpoints that agree to
    /// `precision` decimals.
    ///
    /// Segments that collapse to a point or repeat an existing edge are
    /// skipped. A segment drawn against an existing one becomes the
    /// antiparallel edge.
    pub fn from_lines<P>(lines: &[[P; 2]], precision: u32) -> Result<Self>
    where
        P: Copy + Into<Point3<f64>>,
    {
        let mut network = Network::new();
        let mut welded = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            let [u, v] = line.map(|p| {
                let p: Point3<f64> = p.into();
                *welded
                    .entry(geometric_key(&p, precision))
                    .or_insert_with(|| network.add_vertex_at(p))
            });
            if u == v {
                warn!("from_lines: skipping degenerate line {}", i);
                continue;
            }
            if network.has_edge(u, v) {
                warn!("from_lines: skipping duplicate line {}", i);
                continue;
            }
            network.add_edge(u, v, AttrMap::new())?;
        }
        Ok(network)
    }

    /// Export edges as coordinate pairs, in edge order.
    pub fn to_lines(&self) -> Vec<[[f64; 3]; 2]> {
        self.edges()
            .map(|(u, v)| [self.position(u).into(), self.position(v).into()])
            .collect()
    }

    /// Key/index bijection over the vertices in key order.
    pub fn key_index(&self) -> KeyIndex<VertexKey> {
        KeyIndex::new(self.vertices())
    }

    /// Export coordinates and edges as index pairs.
    pub fn to_vertices_and_edges(&self) -> (Vec<[f64; 3]>, Vec<[usize; 2]>) {
        let index = self.key_index();
        let points = self.vertices().map(|v| self.position(v).into()).collect();
        let edges = self
            .edges()
            .filter_map(|(u, v)| Some([index.index_of(u)?, index.index_of(v)?]))
            .collect();
        (points, edges)
    }
}

impl VertexGraph for Network {
    fn graph_vertices(&self) -> Vec<VertexKey> {
        self.vertices().collect()
    }

    fn graph_neighbours(&self, v: VertexKey) -> Vec<VertexKey> {
        self.neighbours(v)
    }

    fn graph_position(&self, v: VertexKey) -> Point3<f64> {
        self.position(v)
    }

    fn graph_contains(&self, v: VertexKey) -> bool {
        self.has_vertex(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::shortest_path::shortest_path;

    /// Path 0 -> 1 -> 2 -> 3 plus a branch 1 -> 4.
    fn create_tree() -> Network {
        let lines = [
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            [[2.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        ];
        Network::from_lines(&lines, 6).unwrap()
    }

    #[test]
    fn test_from_lines_welds_endpoints() {
        let network = create_tree();
        assert_eq!(network.num_vertices(), 5);
        assert_eq!(network.num_edges(), 4);
        let v1 = VertexKey::new(1);
        assert_eq!(network.degree(v1), 3);
        assert_eq!(network.degree_out(v1), 2);
        assert_eq!(network.degree_in(v1), 1);
        assert_eq!(network.leaves(), vec![VertexKey::new(0), VertexKey::new(3), VertexKey::new(4)]);
        assert_eq!(network.to_lines()[0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_from_lines_keeps_reversed_segments() {
        let lines = [
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            [[2.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
        ];
        let network = Network::from_lines(&lines, 6).unwrap();
        let (a, b) = (VertexKey::new(0), VertexKey::new(1));
        assert_eq!(network.num_vertices(), 3);
        assert_eq!(network.num_edges(), 2);
        assert!(network.has_edge(a, b));
        assert!(network.has_edge(b, a));
        assert_eq!(network.degree(a), 1);
    }

    #[test]
    fn test_antiparallel_edges_coexist() {
        let mut network = create_tree();
        let (a, b) = (VertexKey::new(0), VertexKey::new(1));
        network.add_edge(b, a, AttrMap::new()).unwrap();
        assert_eq!(network.num_edges(), 5);
        assert!(matches!(network.add_edge(a, b, AttrMap::new()), Err(MeshError::DuplicateKey { .. })));
        assert!(network.add_edge(a, a, AttrMap::new()).is_err());
        assert!(network.add_edge(a, VertexKey::new(99), AttrMap::new()).is_err());
        assert_eq!(network.degree(a), 1);
    }

    #[test]
    fn test_delete_vertex_cascades() {
        let mut network = create_tree();
        let v1 = VertexKey::new(1);
        network.set_edge_attribute(VertexKey::new(0), v1, "w", Attr::from(2.0)).unwrap();
        network.delete_vertex(v1).unwrap();
        assert_eq!(network.num_edges(), 1);
        assert_eq!(network.connected_components().len(), 3);
        assert!(network.edge_attrs.keys().next().is_none());
        assert!(network.delete_vertex(v1).is_err());
    }

    #[test]
    fn test_split_and_delete_edge() {
        let mut network = create_tree();
        let (a, b) = (VertexKey::new(2), VertexKey::new(3));
        network.set_edge_attribute(a, b, "kind", Attr::from("bar")).unwrap();
        let w = network.split_edge(a, b, 0.25).unwrap();
        assert_eq!(network.position(w), Point3::new(2.25, 0.0, 0.0));
        assert!(!network.has_edge(a, b));
        assert_eq!(network.edge_attribute(w, b, "kind"), Some(Attr::from("bar")));
        network.delete_edge(a, w).unwrap();
        assert!(!network.is_connected());
        assert!(network.delete_edge(a, w).is_err());
    }

    #[test]
    fn test_shortest_path_ignores_direction() {
        let network = create_tree();
        let path = shortest_path(&network, VertexKey::new(3), VertexKey::new(4)).unwrap();
        assert_eq!(path, vec![VertexKey::new(3), VertexKey::new(2), VertexKey::new(1), VertexKey::new(4)]);
    }

    #[test]
    fn test_vertex_attributes_and_export() {
        let mut network = create_tree();
        let v = VertexKey::new(4);
        network.set_vertex_attribute(v, "z", Attr::from(2.0)).unwrap();
        network.set_vertex_attribute(v, "load", Attr::from(5)).unwrap();
        assert_eq!(network.position(v), Point3::new(1.0, 1.0, 2.0));
        assert_eq!(network.vertex_attribute(v, "load"), Some(Attr::from(5)));

        let (points, edges) = network.to_vertices_and_edges();
        assert_eq!(points.len(), 5);
        assert!(edges.contains(&[1, 4]));
    }
}
