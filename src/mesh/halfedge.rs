//! Halfedge mesh data structure.
//!
//! This module provides a keyed halfedge representation for polygon meshes.
//! Entities are addressed by stable keys instead of dense indices, so local
//! edits (splits, collapses, swaps) never renumber the rest of the mesh.
//!
//! # Structure
//!
//! - Each vertex owns a map of **outgoing halfedges** `u -> v`.
//! - Each halfedge stores the **face** on its left, or `None` on the boundary.
//! - Adding a face binds its halfedges and makes sure every reverse halfedge
//!   exists, so the **opposite** of any halfedge is always present.
//! - Each face stores its **vertex cycle**; halfedges are derived from it.
//!
//! Ordered neighbourhoods are not stored; they are recovered by walking
//! halfedge/face linkage (see [`Mesh::vertex_neighbours`]).

use std::collections::BTreeMap;

use nalgebra::Point3;

use crate::attr::{Attr, AttrMap, AttributeStore, MeshConfig};
use crate::key::{EdgeKey, FaceKey, KeyAllocator, VertexKey};

/// A vertex record.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a new vertex from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// A mutable halfedge mesh for polygonal surfaces.
///
/// All mutation goes through the operators in this module's `ops` section;
/// each validates fully before changing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Mesh-level attributes (name, metadata).
    pub(crate) attributes: AttrMap,

    /// Vertex records.
    pub(crate) vertices: BTreeMap<VertexKey, Vertex>,

    /// Outgoing halfedges per vertex, with the face on their left.
    pub(crate) halfedges: BTreeMap<VertexKey, BTreeMap<VertexKey, Option<FaceKey>>>,

    /// Face vertex cycles.
    pub(crate) faces: BTreeMap<FaceKey, Vec<VertexKey>>,

    /// Default position used when a vertex is created without coordinates.
    pub(crate) default_position: Point3<f64>,

    pub(crate) vertex_attrs: AttributeStore<VertexKey>,
    pub(crate) edge_attrs: AttributeStore<EdgeKey>,
    pub(crate) face_attrs: AttributeStore<FaceKey>,

    pub(crate) vertex_keys: KeyAllocator<VertexKey>,
    pub(crate) face_keys: KeyAllocator<FaceKey>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Create a new empty mesh with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MeshConfig::default())
    }

    /// Create a new empty mesh with an explicit configuration.
    pub fn with_config(config: MeshConfig) -> Self {
        Self {
            attributes: AttrMap::new(),
            vertices: BTreeMap::new(),
            halfedges: BTreeMap::new(),
            faces: BTreeMap::new(),
            default_position: Point3::origin(),
            vertex_attrs: AttributeStore::new("vertex", AttrMap::new(), config),
            edge_attrs: AttributeStore::new("edge", AttrMap::new(), config),
            face_attrs: AttributeStore::new("face", AttrMap::new(), config),
            vertex_keys: KeyAllocator::new(),
            face_keys: KeyAllocator::new(),
        }
    }

    /// The configuration the mesh was built with.
    #[inline]
    pub fn config(&self) -> MeshConfig {
        self.vertex_attrs.config()
    }

    /// An empty mesh sharing this mesh's configuration and default templates.
    pub fn empty_like(&self) -> Self {
        let mut mesh = Self::with_config(self.config());
        mesh.attributes = self.attributes.clone();
        mesh.default_position = self.default_position;
        mesh.vertex_attrs.update_defaults(self.vertex_attrs.defaults().clone());
        mesh.edge_attrs.update_defaults(self.edge_attrs.defaults().clone());
        mesh.face_attrs.update_defaults(self.face_attrs.defaults().clone());
        mesh
    }

    // ==================== Counts ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of directed halfedges.
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.values().map(|nbrs| nbrs.len()).sum()
    }

    /// Get the number of (undirected) edges.
    pub fn num_edges(&self) -> usize {
        self.num_halfedges() / 2
    }

    /// Whether the mesh has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    // ==================== Membership ====================

    /// Whether a vertex exists.
    #[inline]
    pub fn has_vertex(&self, v: VertexKey) -> bool {
        self.vertices.contains_key(&v)
    }

    /// Whether a face exists.
    #[inline]
    pub fn has_face(&self, f: FaceKey) -> bool {
        self.faces.contains_key(&f)
    }

    /// Whether the directed halfedge `u -> v` exists.
    #[inline]
    pub fn has_halfedge(&self, u: VertexKey, v: VertexKey) -> bool {
        self.halfedges.get(&u).is_some_and(|nbrs| nbrs.contains_key(&v))
    }

    /// Whether an edge between `u` and `v` exists (either direction).
    #[inline]
    pub fn has_edge(&self, u: VertexKey, v: VertexKey) -> bool {
        self.has_halfedge(u, v) || self.has_halfedge(v, u)
    }

    // ==================== Accessors ====================

    /// Get a vertex record.
    #[inline]
    pub fn vertex(&self, v: VertexKey) -> Option<&Vertex> {
        self.vertices.get(&v)
    }

    /// Get the position of a vertex. Unknown keys read as the origin.
    #[inline]
    pub fn position(&self, v: VertexKey) -> Point3<f64> {
        self.vertices.get(&v).map_or_else(Point3::origin, |r| r.position)
    }

    /// The face on the left of halfedge `u -> v`, if any.
    #[inline]
    pub fn halfedge_face(&self, u: VertexKey, v: VertexKey) -> Option<FaceKey> {
        self.halfedges.get(&u).and_then(|nbrs| nbrs.get(&v).copied().flatten())
    }

    /// The vertex cycle of a face. Unknown keys yield an empty slice.
    #[inline]
    pub fn face_vertices(&self, f: FaceKey) -> &[VertexKey] {
        self.faces.get(&f).map_or(&[], |c| c.as_slice())
    }

    /// The halfedges of a face in cycle order.
    pub fn face_halfedges(&self, f: FaceKey) -> Vec<(VertexKey, VertexKey)> {
        cycle_pairs(self.face_vertices(f)).collect()
    }

    /// Number of vertices of a face.
    #[inline]
    pub fn face_degree(&self, f: FaceKey) -> usize {
        self.face_vertices(f).len()
    }

    /// The vertex after `v` in the cycle of `f`.
    pub fn face_vertex_after(&self, f: FaceKey, v: VertexKey) -> Option<VertexKey> {
        let cycle = self.face_vertices(f);
        let i = cycle.iter().position(|&x| x == v)?;
        Some(cycle[(i + 1) % cycle.len()])
    }

    /// The vertex before `v` in the cycle of `f`.
    pub fn face_vertex_before(&self, f: FaceKey, v: VertexKey) -> Option<VertexKey> {
        let cycle = self.face_vertices(f);
        let i = cycle.iter().position(|&x| x == v)?;
        Some(cycle[(i + cycle.len() - 1) % cycle.len()])
    }

    /// Mesh-level attributes.
    #[inline]
    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    /// Set a mesh-level attribute.
    pub fn set_attribute(&mut self, name: &str, value: Attr) {
        self.attributes.insert(name.to_string(), value);
    }

    // ==================== Iteration ====================
    //
    // Every call starts an independent traversal over the current state.

    /// Iterate over all vertex keys.
    pub fn vertices(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys().copied()
    }

    /// Iterate over vertex keys paired with their attributes.
    pub fn vertices_with_attributes(&self) -> impl Iterator<Item = (VertexKey, AttrMap)> + '_ {
        self.vertices().map(|v| (v, self.vertex_attributes(v).unwrap_or_default()))
    }

    /// Iterate over all face keys.
    pub fn faces(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.faces.keys().copied()
    }

    /// Iterate over face keys paired with their attributes.
    pub fn faces_with_attributes(&self) -> impl Iterator<Item = (FaceKey, AttrMap)> + '_ {
        self.faces().map(|f| (f, self.face_attrs.attributes(f)))
    }

    /// Iterate over all directed halfedges.
    pub fn halfedges(&self) -> impl Iterator<Item = (VertexKey, VertexKey)> + '_ {
        self.halfedges
            .iter()
            .flat_map(|(&u, nbrs)| nbrs.keys().map(move |&v| (u, v)))
    }

    /// Iterate over all edges, each once, as `(smaller, larger)` key pairs.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.halfedges().filter(|(u, v)| u < v)
    }

    /// Iterate over edges paired with their attributes.
    pub fn edges_with_attributes(&self) -> impl Iterator<Item = (EdgeKey, AttrMap)> + '_ {
        self.edges().map(|e| (e, self.edge_attrs.attributes(e)))
    }

    // ==================== Internal topology primitives ====================
    //
    // These never fail; callers validate first.

    pub(crate) fn insert_vertex_record(&mut self, v: VertexKey, position: Point3<f64>, attrs: AttrMap) {
        self.vertices.insert(v, Vertex::new(position));
        self.halfedges.entry(v).or_default();
        self.vertex_attrs.create(v, attrs);
    }

    /// Store a face cycle and bind its halfedges.
    pub(crate) fn bind_face(&mut self, f: FaceKey, cycle: Vec<VertexKey>) {
        for (u, v) in cycle_pairs(&cycle) {
            self.halfedges.entry(u).or_default().insert(v, Some(f));
            self.halfedges.entry(v).or_default().entry(u).or_insert(None);
        }
        self.faces.insert(f, cycle);
    }

    /// Remove a face cycle, leaving its halfedges unbound.
    pub(crate) fn unbind_face(&mut self, f: FaceKey) -> Option<Vec<VertexKey>> {
        let cycle = self.faces.remove(&f)?;
        for (u, v) in cycle_pairs(&cycle) {
            if let Some(slot) = self.halfedges.get_mut(&u).and_then(|nbrs| nbrs.get_mut(&v)) {
                *slot = None;
            }
        }
        Some(cycle)
    }

    /// Remove both halfedges of an edge.
    pub(crate) fn remove_edge_pair(&mut self, u: VertexKey, v: VertexKey) {
        if let Some(nbrs) = self.halfedges.get_mut(&u) {
            nbrs.remove(&v);
        }
        if let Some(nbrs) = self.halfedges.get_mut(&v) {
            nbrs.remove(&u);
        }
    }

    /// Ensure an (unbound) edge exists between `u` and `v`.
    pub(crate) fn ensure_edge_pair(&mut self, u: VertexKey, v: VertexKey) {
        self.halfedges.entry(u).or_default().entry(v).or_insert(None);
        self.halfedges.entry(v).or_default().entry(u).or_insert(None);
    }

    /// Outgoing halfedges of a vertex.
    pub(crate) fn outgoing(&self, v: VertexKey) -> impl Iterator<Item = (VertexKey, Option<FaceKey>)> + '_ {
        self.halfedges
            .get(&v)
            .into_iter()
            .flat_map(|nbrs| nbrs.iter().map(|(&w, &f)| (w, f)))
    }
}

/// Consecutive pairs of a cycle, wrapping around.
pub(crate) fn cycle_pairs(cycle: &[VertexKey]) -> impl Iterator<Item = (VertexKey, VertexKey)> + '_ {
    let n = cycle.len();
    (0..n).map(move |i| (cycle[i], cycle[(i + 1) % n]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_creation() {
        let v = Vertex::from_coords(1.0, 2.0, 3.0);
        assert_eq!(v.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_empty());
        assert!(mesh.face_vertices(FaceKey::new(0)).is_empty());
    }

    #[test]
    fn test_traversals_are_restartable() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex_at(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex_at(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex_at(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[a, b, c], None, AttrMap::new()).unwrap();

        let first: Vec<_> = mesh.edges().collect();
        let second: Vec<_> = mesh.edges().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        let mut one = mesh.vertices();
        let mut two = mesh.vertices();
        assert_eq!(one.next(), Some(a));
        assert_eq!(one.next(), Some(b));
        assert_eq!(two.next(), Some(a));
    }

    #[test]
    fn test_cycle_pairs_wrap() {
        let cycle = [VertexKey::new(0), VertexKey::new(1), VertexKey::new(2)];
        let pairs: Vec<_> = cycle_pairs(&cycle).collect();
        assert_eq!(pairs.last(), Some(&(VertexKey::new(2), VertexKey::new(0))));
    }
}
