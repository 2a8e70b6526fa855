//! Volmesh queries and cell geometry.

use std::collections::{BTreeSet, HashMap, VecDeque};

use nalgebra::Point3;

use super::VolMesh;
use crate::algo::traverse::VertexGraph;
use crate::attr::{attrs, Attr, AttrMap};
use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, CellKey, EdgeKey, FaceKey, VertexKey};
use crate::mesh::{centroid_of, cycle_pairs, Mesh};

impl VolMesh {
    // ==================== Counts and membership ====================

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of undirected edges of the face layer.
    pub fn num_edges(&self) -> usize {
        self.edges().count()
    }

    /// Whether the vertex exists.
    pub fn has_vertex(&self, v: VertexKey) -> bool {
        self.vertices.contains_key(&v)
    }

    /// Whether the face exists.
    pub fn has_face(&self, f: FaceKey) -> bool {
        self.faces.contains_key(&f)
    }

    /// Whether the cell exists.
    pub fn has_cell(&self, c: CellKey) -> bool {
        self.cells.contains_key(&c)
    }

    // ==================== Iteration ====================

    /// Vertex keys in key order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys().copied()
    }

    /// Face keys in key order.
    pub fn faces(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.faces.keys().copied()
    }

    /// Cell keys in key order.
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys().copied()
    }

    /// Cells paired with their attributes.
    pub fn cells_with_attributes(&self) -> impl Iterator<Item = (CellKey, AttrMap)> + '_ {
        self.cells().map(|c| (c, self.cell_attrs.attributes(c)))
    }

    /// Undirected edges as `(min, max)` pairs, sorted.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> {
        let edges: BTreeSet<EdgeKey> = self
            .faces
            .values()
            .flat_map(|cycle| cycle_pairs(cycle).map(|(u, v)| canonical_edge(u, v)))
            .collect();
        edges.into_iter()
    }

    // ==================== Adjacency ====================

    /// The vertex cycle of a face. Unknown keys yield an empty slice.
    pub fn face_vertices(&self, f: FaceKey) -> &[VertexKey] {
        self.faces.get(&f).map_or(&[], |c| c.as_slice())
    }

    /// Cells on either side of a face, in key order.
    pub fn face_cells(&self, f: FaceKey) -> Vec<CellKey> {
        let mut cells: Vec<CellKey> = self.face_cells.get(&f).into_iter().flatten().flatten().copied().collect();
        cells.sort_unstable();
        cells
    }

    /// Whether a face borders fewer than two cells.
    pub fn is_face_on_boundary(&self, f: FaceKey) -> bool {
        self.has_face(f) && self.face_cells(f).len() < 2
    }

    /// Faces bordering fewer than two cells.
    pub fn faces_on_boundary(&self) -> Vec<FaceKey> {
        self.faces().filter(|&f| self.is_face_on_boundary(f)).collect()
    }

    /// Faces using a vertex.
    pub fn vertex_faces(&self, v: VertexKey) -> Vec<FaceKey> {
        self.vertex_faces.get(&v).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Cells using a vertex.
    pub fn vertex_cells(&self, v: VertexKey) -> Vec<CellKey> {
        let cells: BTreeSet<CellKey> = self.vertex_faces(v).into_iter().flat_map(|f| self.face_cells(f)).collect();
        cells.into_iter().collect()
    }

    /// Vertices joined to `v` by a face edge, in key order.
    pub fn vertex_neighbours(&self, v: VertexKey) -> Vec<VertexKey> {
        let mut out = BTreeSet::new();
        for f in self.vertex_faces(v) {
            for (a, b) in cycle_pairs(self.face_vertices(f)) {
                if a == v {
                    out.insert(b);
                } else if b == v {
                    out.insert(a);
                }
            }
        }
        out.into_iter().collect()
    }

    /// The faces of a cell, in the order they were given.
    pub fn cell_faces(&self, c: CellKey) -> Vec<FaceKey> {
        self.cells.get(&c).cloned().unwrap_or_default()
    }

    /// Distinct vertices of a cell, in key order.
    pub fn cell_vertices(&self, c: CellKey) -> Vec<VertexKey> {
        let vertices: BTreeSet<VertexKey> = self
            .cell_faces(c)
            .into_iter()
            .flat_map(|f| self.face_vertices(f).to_vec())
            .collect();
        vertices.into_iter().collect()
    }

    /// Cells sharing a face with `c`, in key order.
    pub fn cell_neighbours(&self, c: CellKey) -> Vec<CellKey> {
        let cells: BTreeSet<CellKey> = self
            .cell_faces(c)
            .into_iter()
            .flat_map(|f| self.face_cells(f))
            .filter(|&d| d != c)
            .collect();
        cells.into_iter().collect()
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

    /// Mean of the face vertices.
    pub fn face_centroid(&self, f: FaceKey) -> Point3<f64> {
        let points: Vec<_> = self.face_vertices(f).iter().map(|&v| self.position(v)).collect();
        centroid_of(&points)
    }

    /// Mean of the distinct cell vertices.
    pub fn cell_centroid(&self, c: CellKey) -> Point3<f64> {
        let points: Vec<_> = self.cell_vertices(c).into_iter().map(|v| self.position(v)).collect();
        centroid_of(&points)
    }

    /// The face cycles of a cell, wound so that their normals point out of
    /// the cell.
    ///
    /// Neighbouring faces are made to traverse their shared edge in opposite
    /// directions; the whole shell is then flipped if it encloses negative
    /// volume.
    pub fn cell_face_cycles(&self, c: CellKey) -> Result<Vec<(FaceKey, Vec<VertexKey>)>> {
        let faces = self.cells.get(&c).ok_or_else(|| MeshError::not_found("cell", c))?;

        let mut owners: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
        for (i, &f) in faces.iter().enumerate() {
            for (u, v) in cycle_pairs(self.face_vertices(f)) {
                owners.entry(canonical_edge(u, v)).or_default().push(i);
            }
        }

        let mut cycles: Vec<Option<Vec<VertexKey>>> = vec![None; faces.len()];
        for root in 0..faces.len() {
            if cycles[root].is_some() {
                continue;
            }
            cycles[root] = Some(self.face_vertices(faces[root]).to_vec());
            let mut queue = VecDeque::from([root]);
            while let Some(i) = queue.pop_front() {
                let Some(cycle) = cycles[i].clone() else {
                    continue;
                };
                for (u, v) in cycle_pairs(&cycle) {
                    for &j in owners.get(&canonical_edge(u, v)).into_iter().flatten() {
                        if j == i || cycles[j].is_some() {
                            continue;
                        }
                        let mut other = self.face_vertices(faces[j]).to_vec();
                        if cycle_pairs(&other).any(|e| e == (u, v)) {
                            other.reverse();
                        }
                        cycles[j] = Some(other);
                        queue.push_back(j);
                    }
                }
            }
        }

        let mut oriented: Vec<(FaceKey, Vec<VertexKey>)> =
            faces.iter().copied().zip(cycles.into_iter().flatten()).collect();
        if self.enclosed_volume(&oriented) < 0.0 {
            for (_, cycle) in &mut oriented {
                cycle.reverse();
            }
        }
        Ok(oriented)
    }

    /// Signed volume of a closed shell (divergence theorem over face fans).
    fn enclosed_volume(&self, shell: &[(FaceKey, Vec<VertexKey>)]) -> f64 {
        let mut volume = 0.0;
        for (_, cycle) in shell {
            let Some(&first) = cycle.first() else {
                continue;
            };
            let a = self.position(first).coords;
            for pair in cycle[1..].windows(2) {
                let b = self.position(pair[0]).coords;
                let c = self.position(pair[1]).coords;
                volume += a.dot(&b.cross(&c));
            }
        }
        volume / 6.0
    }

    /// Volume enclosed by a cell.
    pub fn cell_volume(&self, c: CellKey) -> Result<f64> {
        let shell = self.cell_face_cycles(c)?;
        Ok(self.enclosed_volume(&shell))
    }

    /// The boundary of a cell as a closed, outward-oriented polygon mesh.
    ///
    /// Vertex and face keys are kept. Fails with `NonManifold` when the
    /// faces cannot be wound consistently.
    pub fn cell_to_mesh(&self, c: CellKey) -> Result<Mesh> {
        let shell = self.cell_face_cycles(c)?;
        let mut mesh = Mesh::with_config(self.config());
        for v in self.cell_vertices(c) {
            let p = self.position(v);
            mesh.add_vertex(
                Some(v),
                attrs([("x", Attr::Float(p.x)), ("y", Attr::Float(p.y)), ("z", Attr::Float(p.z))]),
            )?;
        }
        for (f, cycle) in shell {
            mesh.add_face(&cycle, Some(f), AttrMap::new())?;
        }
        Ok(mesh)
    }
}

impl VertexGraph for VolMesh {
    fn graph_vertices(&self) -> Vec<VertexKey> {
        self.vertices().collect()
    }

    fn graph_neighbours(&self, v: VertexKey) -> Vec<VertexKey> {
        self.vertex_neighbours(v)
    }

    fn graph_position(&self, v: VertexKey) -> Point3<f64> {
        self.position(v)
    }

    fn graph_contains(&self, v: VertexKey) -> bool {
        self.has_vertex(v)
    }
}
