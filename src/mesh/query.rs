//! Topological queries: neighbourhoods, boundaries and global predicates.
//!
//! Queries never fail. Unknown keys produce empty results.

use std::collections::{BTreeSet, HashSet};

use super::halfedge::cycle_pairs;
use super::Mesh;
use crate::algo::traverse::connected_components;
use crate::key::{canonical_edge, EdgeKey, FaceKey, VertexKey};

impl Mesh {
    // ==================== Vertex neighbourhoods ====================

    /// Neighbours of a vertex.
    ///
    /// Unordered neighbours come in key order. Ordered neighbours follow the
    /// face fan around the vertex, clockwise for counter-clockwise faces. On
    /// the boundary the walk starts at the neighbour reached by the outgoing
    /// boundary halfedge, so the whole fan is covered.
    pub fn vertex_neighbours(&self, v: VertexKey, ordered: bool) -> Vec<VertexKey> {
        let Some(nbrs) = self.halfedges.get(&v) else {
            return Vec::new();
        };
        let unordered: Vec<VertexKey> = nbrs.keys().copied().collect();
        if !ordered || unordered.len() < 2 {
            return unordered;
        }

        let start = unordered
            .iter()
            .copied()
            .find(|w| nbrs.get(w).copied().flatten().is_none())
            .unwrap_or(unordered[0]);

        let mut out = vec![start];
        let mut face = self.halfedge_face(start, v);
        while let Some(f) = face {
            if out.len() > unordered.len() {
                break;
            }
            let Some(next) = self.face_vertex_after(f, v) else {
                break;
            };
            if next == start {
                break;
            }
            out.push(next);
            face = self.halfedge_face(next, v);
        }
        out
    }

    /// Number of neighbours of a vertex.
    pub fn vertex_degree(&self, v: VertexKey) -> usize {
        self.halfedges.get(&v).map_or(0, |nbrs| nbrs.len())
    }

    /// Faces around a vertex, optionally in fan order.
    pub fn vertex_faces(&self, v: VertexKey, ordered: bool) -> Vec<FaceKey> {
        if ordered {
            return self
                .vertex_neighbours(v, true)
                .into_iter()
                .filter_map(|w| self.halfedge_face(v, w))
                .collect();
        }
        let faces: BTreeSet<FaceKey> = self
            .outgoing(v)
            .filter_map(|(_, f)| f)
            .chain(self.outgoing(v).filter_map(|(w, _)| self.halfedge_face(w, v)))
            .collect();
        faces.into_iter().collect()
    }

    // ==================== Edges and faces ====================

    /// The two faces of an edge: left of `u -> v`, then left of `v -> u`.
    pub fn edge_faces(&self, u: VertexKey, v: VertexKey) -> (Option<FaceKey>, Option<FaceKey>) {
        (self.halfedge_face(u, v), self.halfedge_face(v, u))
    }

    /// The halfedge that follows `u -> v`.
    ///
    /// Inside a face this is the next halfedge of the cycle; on the boundary
    /// it is the outgoing boundary halfedge of `v`.
    pub fn halfedge_after(&self, u: VertexKey, v: VertexKey) -> Option<(VertexKey, VertexKey)> {
        if !self.has_halfedge(u, v) {
            return None;
        }
        match self.halfedge_face(u, v) {
            Some(f) => self.face_vertex_after(f, v).map(|w| (v, w)),
            None => self
                .outgoing(v)
                .find(|&(w, f)| f.is_none() && w != u)
                .or_else(|| self.outgoing(v).find(|&(_, f)| f.is_none()))
                .map(|(w, _)| (v, w)),
        }
    }

    /// Faces sharing an edge with `f`.
    pub fn face_neighbours(&self, f: FaceKey) -> Vec<FaceKey> {
        let mut seen = BTreeSet::new();
        cycle_pairs(self.face_vertices(f))
            .filter_map(|(u, v)| self.halfedge_face(v, u))
            .filter(|&g| seen.insert(g))
            .collect()
    }

    /// The halfedge of `f` whose opposite belongs to `g`.
    pub fn face_adjacency_halfedge(&self, f: FaceKey, g: FaceKey) -> Option<(VertexKey, VertexKey)> {
        cycle_pairs(self.face_vertices(f)).find(|&(u, v)| self.halfedge_face(v, u) == Some(g))
    }

    // ==================== Boundary ====================

    /// Whether a vertex touches a boundary or face-less halfedge.
    pub fn is_vertex_on_boundary(&self, v: VertexKey) -> bool {
        self.outgoing(v)
            .any(|(w, f)| f.is_none() || self.halfedge_face(w, v).is_none())
    }

    /// Whether an edge has a face-less side.
    pub fn is_edge_on_boundary(&self, u: VertexKey, v: VertexKey) -> bool {
        self.has_edge(u, v) && (self.halfedge_face(u, v).is_none() || self.halfedge_face(v, u).is_none())
    }

    /// Whether a face has an edge on the boundary.
    pub fn is_face_on_boundary(&self, f: FaceKey) -> bool {
        cycle_pairs(self.face_vertices(f)).any(|(u, v)| self.halfedge_face(v, u).is_none())
    }

    /// Vertices on the boundary, in key order.
    pub fn vertices_on_boundary(&self) -> Vec<VertexKey> {
        self.vertices().filter(|&v| self.is_vertex_on_boundary(v)).collect()
    }

    /// Edges on the boundary, in canonical form.
    pub fn edges_on_boundary(&self) -> Vec<EdgeKey> {
        self.edges().filter(|&(u, v)| self.is_edge_on_boundary(u, v)).collect()
    }

    /// Faces with at least one boundary edge.
    pub fn faces_on_boundary(&self) -> Vec<FaceKey> {
        self.faces().filter(|&f| self.is_face_on_boundary(f)).collect()
    }

    /// Boundary loops, each as a cycle of vertices along the face-less halfedges.
    pub fn boundary_loops(&self) -> Vec<Vec<VertexKey>> {
        let mut visited: HashSet<(VertexKey, VertexKey)> = HashSet::new();
        let mut loops = Vec::new();
        for (u, v) in self.halfedges() {
            if self.halfedge_face(u, v).is_some() || visited.contains(&(u, v)) {
                continue;
            }
            let mut cycle = Vec::new();
            let mut current = (u, v);
            while visited.insert(current) {
                cycle.push(current.0);
                match self.halfedge_after(current.0, current.1) {
                    Some(next) => current = next,
                    None => break,
                }
            }
            loops.push(cycle);
        }
        loops
    }

    // ==================== Global predicates ====================

    /// Euler characteristic `V - E + F`.
    pub fn euler(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    /// Whether every halfedge has a face.
    pub fn is_closed(&self) -> bool {
        self.halfedges().all(|(u, v)| self.halfedge_face(u, v).is_some())
    }

    /// Whether every vertex has a single, simple face fan.
    ///
    /// Isolated vertices and face-less edges make a mesh non-manifold.
    pub fn is_manifold(&self) -> bool {
        self.vertices().all(|v| {
            let degree = self.vertex_degree(v);
            if degree == 0 {
                return false;
            }
            let open = self.outgoing(v).filter(|(_, f)| f.is_none()).count();
            open <= 1 && self.vertex_neighbours(v, true).len() == degree
        })
    }

    /// Whether all vertices belong to a single connected component.
    pub fn is_connected(&self) -> bool {
        !self.is_empty() && connected_components(self).len() == 1
    }

    /// Whether every face is a triangle.
    pub fn is_trimesh(&self) -> bool {
        !self.faces.is_empty() && self.faces.values().all(|c| c.len() == 3)
    }

    /// Whether every face is a quad.
    pub fn is_quadmesh(&self) -> bool {
        !self.faces.is_empty() && self.faces.values().all(|c| c.len() == 4)
    }

    /// Check the structural invariants of the halfedge linkage.
    ///
    /// - every halfedge endpoint is a vertex and every halfedge has an opposite
    /// - every face cycle has at least three distinct vertices
    /// - a halfedge names face `f` exactly when it lies on the cycle of `f`
    pub fn is_valid(&self) -> bool {
        if self.halfedges.keys().ne(self.vertices.keys()) {
            return false;
        }
        for (u, v) in self.halfedges() {
            if !self.has_vertex(v) || !self.has_halfedge(v, u) {
                return false;
            }
            if let Some(f) = self.halfedge_face(u, v) {
                if !cycle_pairs(self.face_vertices(f)).any(|pair| pair == (u, v)) {
                    return false;
                }
            }
        }
        self.faces.iter().all(|(&f, cycle)| {
            let distinct: BTreeSet<VertexKey> = cycle.iter().copied().collect();
            cycle.len() >= 3
                && distinct.len() == cycle.len()
                && cycle_pairs(cycle).all(|(u, v)| self.halfedge_face(u, v) == Some(f))
        })
    }

    /// Edges incident to a vertex, in canonical form.
    pub fn vertex_edges(&self, v: VertexKey) -> Vec<EdgeKey> {
        self.outgoing(v).map(|(w, _)| canonical_edge(v, w)).collect()
    }
}
