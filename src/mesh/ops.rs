//! Mutation operators.
//!
//! Every operator validates its full precondition set before the first
//! change, so a returned error leaves the mesh exactly as it was.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;
use nalgebra::Point3;

use super::attributes::take_position;
use super::halfedge::cycle_pairs;
use super::Mesh;
use crate::attr::AttrMap;
use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, FaceKey, VertexKey};

fn collapse_error(u: VertexKey, v: VertexKey, reason: impl Into<String>) -> MeshError {
    MeshError::Collapse {
        u: u.get(),
        v: v.get(),
        reason: reason.into(),
    }
}

fn swap_error(u: VertexKey, v: VertexKey, reason: impl Into<String>) -> MeshError {
    MeshError::Swap {
        u: u.get(),
        v: v.get(),
        reason: reason.into(),
    }
}

fn check_parameter(t: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&t) {
        return Err(MeshError::invalid_param("t", t, "must be in [0, 1]"));
    }
    Ok(())
}

/// Drop consecutive repeats from a cycle, including across the wrap.
fn dedup_cycle(cycle: &mut Vec<VertexKey>) {
    cycle.dedup();
    while cycle.len() > 1 && cycle.first() == cycle.last() {
        cycle.pop();
    }
}

impl Mesh {
    // ==================== Vertices ====================

    /// Add a vertex.
    ///
    /// Coordinates are read from the `x`, `y`, `z` entries of `attrs`, falling
    /// back to the default vertex attributes. Without a key the next
    /// automatic key is used.
    pub fn add_vertex(&mut self, key: Option<VertexKey>, mut attrs: AttrMap) -> Result<VertexKey> {
        let position = take_position(&mut attrs, self.default_position)?;
        self.vertex_attrs.check_names(&attrs)?;
        let vertices = &self.vertices;
        let v = self.vertex_keys.allocate(key, |k| vertices.contains_key(&k))?;
        self.insert_vertex_record(v, position, attrs);
        debug!("added vertex {:?}", v);
        Ok(v)
    }

    /// Add a vertex at a position with an automatic key and default attributes.
    pub fn add_vertex_at(&mut self, position: Point3<f64>) -> VertexKey {
        let v = self.vertex_keys.peek();
        self.vertex_keys.observe(v);
        self.insert_vertex_record(v, position, AttrMap::new());
        v
    }

    /// Delete a vertex together with every face and edge that uses it.
    pub fn delete_vertex(&mut self, v: VertexKey) -> Result<()> {
        if !self.has_vertex(v) {
            return Err(MeshError::not_found("vertex", v));
        }

        let faces: BTreeSet<FaceKey> = self.vertex_faces(v, false).into_iter().collect();
        for f in faces {
            self.unbind_face(f);
            self.face_attrs.remove(f);
        }

        let nbrs: Vec<VertexKey> = self.outgoing(v).map(|(w, _)| w).collect();
        for w in nbrs {
            self.remove_edge_pair(v, w);
            self.edge_attrs.remove(canonical_edge(v, w));
        }

        self.halfedges.remove(&v);
        self.vertices.remove(&v);
        self.vertex_attrs.remove(v);
        debug!("deleted vertex {:?}", v);
        Ok(())
    }

    /// Remove vertices that are not used by any edge.
    pub fn cull_vertices(&mut self) -> usize {
        let isolated: Vec<VertexKey> = self
            .vertices()
            .filter(|v| self.halfedges.get(v).map_or(true, |nbrs| nbrs.is_empty()))
            .collect();
        for &v in &isolated {
            self.halfedges.remove(&v);
            self.vertices.remove(&v);
            self.vertex_attrs.remove(v);
        }
        isolated.len()
    }

    // ==================== Faces ====================

    /// Add a face from a vertex cycle.
    ///
    /// A repeated closing vertex is dropped. The cycle must then have at
    /// least three distinct existing vertices, and none of its halfedges may
    /// already belong to another face.
    pub fn add_face(&mut self, cycle: &[VertexKey], key: Option<FaceKey>, attrs: AttrMap) -> Result<FaceKey> {
        let cycle = self.validate_cycle(cycle)?;
        self.face_attrs.check_names(&attrs)?;
        let faces = &self.faces;
        let f = self.face_keys.allocate(key, |k| faces.contains_key(&k))?;
        self.bind_face(f, cycle);
        self.face_attrs.create(f, attrs);
        debug!("added face {:?}", f);
        Ok(f)
    }

    /// Check a candidate face cycle and return it normalized.
    pub(crate) fn validate_cycle(&self, cycle: &[VertexKey]) -> Result<Vec<VertexKey>> {
        let mut cycle = cycle.to_vec();
        if cycle.len() > 1 && cycle.first() == cycle.last() {
            cycle.pop();
        }
        if cycle.len() < 3 {
            return Err(MeshError::degenerate(format!(
                "a face needs at least 3 vertices, got {}",
                cycle.len()
            )));
        }
        let mut seen = HashSet::with_capacity(cycle.len());
        for &v in &cycle {
            if !seen.insert(v) {
                return Err(MeshError::degenerate(format!("vertex {:?} repeats in the cycle", v)));
            }
            if !self.has_vertex(v) {
                return Err(MeshError::not_found("vertex", v));
            }
        }
        for (u, v) in cycle_pairs(&cycle) {
            if let Some(other) = self.halfedge_face(u, v) {
                return Err(MeshError::non_manifold(format!(
                    "halfedge ({:?}, {:?}) already belongs to face {:?}",
                    u, v, other
                )));
            }
        }
        Ok(cycle)
    }

    /// Delete a face. Its halfedges become boundary; edges and vertices stay.
    pub fn delete_face(&mut self, f: FaceKey) -> Result<()> {
        if self.unbind_face(f).is_none() {
            return Err(MeshError::not_found("face", f));
        }
        self.face_attrs.remove(f);
        debug!("deleted face {:?}", f);
        Ok(())
    }

    // ==================== Edge operators ====================

    /// Split the edge `(u, v)` by a new vertex at `u + t (v - u)`.
    ///
    /// Both adjacent faces gain the new vertex in their cycles. Attributes of
    /// the old edge are carried over to both halves.
    pub fn split_edge(&mut self, u: VertexKey, v: VertexKey, t: f64) -> Result<VertexKey> {
        if !self.has_halfedge(u, v) {
            return Err(MeshError::not_found("edge", (u, v)));
        }
        check_parameter(t)?;

        let pu = self.position(u);
        let pv = self.position(v);
        let w = self.add_vertex_at(pu + (pv - pu) * t);

        let left = self.halfedge_face(u, v);
        let right = self.halfedge_face(v, u);
        self.remove_edge_pair(u, v);

        for (f, a, b) in [(left, u, v), (right, v, u)] {
            if let Some(cycle) = f.and_then(|f| self.faces.get_mut(&f)) {
                if let Some(i) = cycle.iter().position(|&x| x == a) {
                    cycle.insert(i + 1, w);
                }
            }
            self.halfedges.entry(a).or_default().insert(w, f);
            self.halfedges.entry(w).or_default().insert(b, f);
        }

        self.edge_attrs.copy(canonical_edge(u, v), canonical_edge(u, w));
        self.edge_attrs.copy(canonical_edge(u, v), canonical_edge(w, v));
        self.edge_attrs.remove(canonical_edge(u, v));
        debug!("split edge ({:?}, {:?}) at {:?}", u, v, w);
        Ok(w)
    }

    /// Collapse the edge `(u, v)`, merging `v` into `u`.
    ///
    /// `u` moves to `u + t (v - u)`. Faces reduced below three vertices are
    /// deleted and their neighbours are stitched together. The collapse is
    /// rejected when it would create a non-manifold configuration or, unless
    /// `allow_boundary` is set, when the edge lies on the boundary.
    pub fn collapse_edge(&mut self, u: VertexKey, v: VertexKey, t: f64, allow_boundary: bool) -> Result<()> {
        if u == v || !self.has_halfedge(u, v) {
            return Err(collapse_error(u, v, "edge does not exist"));
        }
        check_parameter(t)?;

        let on_boundary = self.is_edge_on_boundary(u, v);
        if on_boundary && !allow_boundary {
            return Err(collapse_error(u, v, "edge is on the boundary"));
        }
        if !on_boundary && self.is_vertex_on_boundary(u) && self.is_vertex_on_boundary(v) {
            return Err(collapse_error(u, v, "interior edge joins two boundary vertices"));
        }

        // Link condition: every common neighbour must be the apex of a
        // triangle on the edge.
        let nu: BTreeSet<VertexKey> = self.outgoing(u).map(|(w, _)| w).collect();
        let nv: BTreeSet<VertexKey> = self.outgoing(v).map(|(w, _)| w).collect();
        let common: BTreeSet<VertexKey> = nu.intersection(&nv).copied().collect();
        let apexes: BTreeSet<VertexKey> = [self.halfedge_face(u, v), self.halfedge_face(v, u)]
            .into_iter()
            .flatten()
            .filter(|&f| self.face_degree(f) == 3)
            .flat_map(|f| self.face_vertices(f).to_vec())
            .filter(|&x| x != u && x != v)
            .collect();
        if common != apexes {
            return Err(collapse_error(u, v, "link condition violated"));
        }

        // Simulate the new cycles of every face around v.
        let around_v: BTreeSet<FaceKey> = self.vertex_faces(v, false).into_iter().collect();
        let mut rewritten: BTreeMap<FaceKey, Vec<VertexKey>> = BTreeMap::new();
        for &f in &around_v {
            let mut cycle: Vec<VertexKey> = self
                .face_vertices(f)
                .iter()
                .map(|&x| if x == v { u } else { x })
                .collect();
            dedup_cycle(&mut cycle);
            let distinct: HashSet<VertexKey> = cycle.iter().copied().collect();
            if cycle.len() >= 3 && distinct.len() != cycle.len() {
                return Err(collapse_error(u, v, format!("face {:?} would pinch", f)));
            }
            rewritten.insert(f, cycle);
        }

        // No directed halfedge may be claimed twice afterwards.
        let mut claimed = HashSet::new();
        let around_u: BTreeSet<FaceKey> = self.vertex_faces(u, false).into_iter().collect();
        for f in around_u.union(&around_v) {
            let cycle = rewritten.get(f).map_or_else(|| self.face_vertices(*f).to_vec(), Clone::clone);
            if cycle.len() < 3 {
                continue;
            }
            for pair in cycle_pairs(&cycle) {
                if !claimed.insert(pair) {
                    return Err(collapse_error(u, v, "faces would share a directed halfedge"));
                }
            }
        }

        // Commit.
        let pu = self.position(u);
        let pv = self.position(v);
        if let Some(record) = self.vertices.get_mut(&u) {
            record.position = pu + (pv - pu) * t;
        }

        let mut was_bound: BTreeSet<(VertexKey, VertexKey)> = BTreeSet::new();
        for &f in &around_v {
            if let Some(cycle) = self.unbind_face(f) {
                was_bound.extend(cycle_pairs(&cycle).map(|(a, b)| canonical_edge(a, b)));
            }
        }

        self.edge_attrs.remove(canonical_edge(u, v));
        let nbrs: Vec<VertexKey> = nv.iter().copied().collect();
        for w in nbrs {
            self.remove_edge_pair(v, w);
            if w != u {
                self.edge_attrs.rekey(canonical_edge(v, w), canonical_edge(u, w));
                self.ensure_edge_pair(u, w);
            }
        }
        self.halfedges.remove(&v);
        self.vertices.remove(&v);
        self.vertex_attrs.remove(v);

        for (f, cycle) in rewritten {
            if cycle.len() >= 3 {
                self.bind_face(f, cycle);
            } else {
                self.face_attrs.remove(f);
            }
        }

        // Edges left without any face by the collapse disappear.
        let stale: Vec<VertexKey> = self
            .outgoing(u)
            .filter(|&(w, f)| f.is_none() && self.halfedge_face(w, u).is_none())
            .map(|(w, _)| w)
            .filter(|&w| was_bound.contains(&canonical_edge(u, w)) || was_bound.contains(&canonical_edge(v, w)))
            .collect();
        for w in stale {
            self.remove_edge_pair(u, w);
            self.edge_attrs.remove(canonical_edge(u, w));
        }

        debug!("collapsed {:?} into {:?}", v, u);
        Ok(())
    }

    /// Swap the diagonal shared by two triangles.
    ///
    /// With faces `(u, v, a)` and `(v, u, b)` the edge `(u, v)` is replaced by
    /// `(a, b)`. Both face keys are kept.
    pub fn swap_edge(&mut self, u: VertexKey, v: VertexKey) -> Result<()> {
        if !self.has_halfedge(u, v) {
            return Err(swap_error(u, v, "edge does not exist"));
        }
        let (Some(f1), Some(f2)) = (self.halfedge_face(u, v), self.halfedge_face(v, u)) else {
            return Err(swap_error(u, v, "edge is on the boundary"));
        };
        if self.face_degree(f1) != 3 || self.face_degree(f2) != 3 {
            return Err(swap_error(u, v, "both faces must be triangles"));
        }
        let (Some(a), Some(b)) = (self.face_vertex_after(f1, v), self.face_vertex_after(f2, u)) else {
            return Err(swap_error(u, v, "inconsistent face cycles"));
        };
        if a == b {
            return Err(swap_error(u, v, "faces share all three vertices"));
        }
        if self.has_edge(a, b) {
            return Err(swap_error(u, v, "the opposite diagonal already exists"));
        }

        self.edge_attrs.rekey(canonical_edge(u, v), canonical_edge(a, b));
        self.unbind_face(f1);
        self.unbind_face(f2);
        self.remove_edge_pair(u, v);
        self.bind_face(f1, vec![u, b, a]);
        self.bind_face(f2, vec![v, a, b]);
        debug!("swapped edge ({:?}, {:?}) to ({:?}, {:?})", u, v, a, b);
        Ok(())
    }

    // ==================== Face operators ====================

    /// Insert a vertex inside a face and fan-triangulate around it.
    ///
    /// The vertex goes to the face centroid unless `attrs` carries
    /// coordinates. The original face is replaced by one triangle per side.
    pub fn insert_vertex(
        &mut self,
        f: FaceKey,
        key: Option<VertexKey>,
        mut attrs: AttrMap,
    ) -> Result<(VertexKey, Vec<FaceKey>)> {
        if !self.has_face(f) {
            return Err(MeshError::not_found("face", f));
        }
        let position = take_position(&mut attrs, self.face_centroid(f))?;
        self.vertex_attrs.check_names(&attrs)?;
        let vertices = &self.vertices;
        let w = self.vertex_keys.allocate(key, |k| vertices.contains_key(&k))?;

        let cycle = self.unbind_face(f).unwrap_or_default();
        self.face_attrs.remove(f);
        self.insert_vertex_record(w, position, attrs);

        let fan = cycle_pairs(&cycle)
            .map(|(a, b)| {
                let g = self.face_keys.peek();
                self.face_keys.observe(g);
                self.bind_face(g, vec![a, b, w]);
                self.face_attrs.create(g, AttrMap::new());
                g
            })
            .collect::<Vec<_>>();
        debug!("inserted vertex {:?} into face {:?}", w, f);
        Ok((w, fan))
    }

    /// Split a face along a new edge between two of its non-adjacent vertices.
    pub fn split_face(&mut self, f: FaceKey, u: VertexKey, v: VertexKey) -> Result<(FaceKey, FaceKey)> {
        let cycle = self.face_vertices(f).to_vec();
        if cycle.is_empty() {
            return Err(MeshError::not_found("face", f));
        }
        let (Some(i), Some(j)) = (
            cycle.iter().position(|&x| x == u),
            cycle.iter().position(|&x| x == v),
        ) else {
            return Err(MeshError::invalid_param("vertices", format!("({:?}, {:?})", u, v), "must belong to the face"));
        };
        let n = cycle.len();
        if i == j || (i + 1) % n == j || (j + 1) % n == i {
            return Err(MeshError::invalid_param(
                "vertices",
                format!("({:?}, {:?})", u, v),
                "must be distinct and not adjacent",
            ));
        }
        if self.has_edge(u, v) {
            return Err(MeshError::non_manifold(format!("edge ({:?}, {:?}) already exists", u, v)));
        }

        let walk = |from: usize, to: usize| -> Vec<VertexKey> {
            let mut out = vec![cycle[from]];
            let mut k = from;
            while k != to {
                k = (k + 1) % n;
                out.push(cycle[k]);
            }
            out
        };
        let first = walk(i, j);
        let second = walk(j, i);

        self.unbind_face(f);
        self.face_attrs.remove(f);
        let mut keys = [f; 2];
        for (slot, part) in keys.iter_mut().zip([first, second]) {
            let g = self.face_keys.peek();
            self.face_keys.observe(g);
            self.bind_face(g, part);
            self.face_attrs.create(g, AttrMap::new());
            *slot = g;
        }
        Ok((keys[0], keys[1]))
    }

    // ==================== Orientation ====================

    /// Reverse the cycle of every face.
    pub fn flip_cycles(&mut self) {
        let cycles: BTreeMap<FaceKey, Vec<VertexKey>> = self
            .faces
            .iter()
            .map(|(&f, c)| (f, c.iter().rev().copied().collect()))
            .collect();
        self.rebind_all(cycles);
    }

    /// Make face cycles consistently oriented within each connected component.
    ///
    /// The first face of each component keeps its orientation. Fails with
    /// [`MeshError::NonManifold`] when no consistent orientation exists.
    pub fn unify_cycles(&mut self) -> Result<()> {
        let mut cycles: BTreeMap<FaceKey, Vec<VertexKey>> = BTreeMap::new();

        // Faces incident to each undirected edge.
        let mut edge_faces: BTreeMap<(VertexKey, VertexKey), Vec<FaceKey>> = BTreeMap::new();
        for (&f, cycle) in &self.faces {
            for (a, b) in cycle_pairs(cycle) {
                edge_faces.entry(canonical_edge(a, b)).or_default().push(f);
            }
        }

        for &seed in self.faces.keys() {
            if cycles.contains_key(&seed) {
                continue;
            }
            cycles.insert(seed, self.faces[&seed].clone());
            let mut stack = vec![seed];
            while let Some(f) = stack.pop() {
                let cycle = cycles[&f].clone();
                for (a, b) in cycle_pairs(&cycle) {
                    for &g in &edge_faces[&canonical_edge(a, b)] {
                        if g == f || cycles.contains_key(&g) {
                            continue;
                        }
                        let mut other = self.faces[&g].clone();
                        if cycle_pairs(&other).any(|pair| pair == (a, b)) {
                            other.reverse();
                        }
                        cycles.insert(g, other);
                        stack.push(g);
                    }
                }
            }
        }

        let mut claimed = HashSet::new();
        for cycle in cycles.values() {
            for pair in cycle_pairs(cycle) {
                if !claimed.insert(pair) {
                    return Err(MeshError::non_manifold("face cycles cannot be oriented consistently"));
                }
            }
        }
        self.rebind_all(cycles);
        Ok(())
    }

    /// Replace every face cycle and rebuild the halfedge linkage.
    fn rebind_all(&mut self, cycles: BTreeMap<FaceKey, Vec<VertexKey>>) {
        let edges: Vec<(VertexKey, VertexKey)> = self.edges().collect();
        for nbrs in self.halfedges.values_mut() {
            nbrs.clear();
        }
        self.faces.clear();
        for (f, cycle) in cycles {
            self.bind_face(f, cycle);
        }
        for (u, v) in edges {
            self.ensure_edge_pair(u, v);
        }
    }
}
