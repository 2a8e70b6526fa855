//! Volumetric meshes: cells bounded by polygon faces.
//!
//! A [`VolMesh`] layers cells on top of a face layer. Faces are plain vertex
//! cycles; a cell is a list of faces that closes up (every edge of the cell
//! is shared by exactly two of its faces). A face borders at most two cells,
//! and a face with fewer than two cells lies on the boundary of the complex.
//!
//! ```
//! use topomesh::volmesh::VolMesh;
//! use topomesh::attr::AttrMap;
//! use nalgebra::Point3;
//!
//! let mut vm = VolMesh::new();
//! let p = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
//! let v: Vec<_> = p.iter().map(|&c| vm.add_vertex_at(Point3::from(c))).collect();
//! let faces: Vec<_> = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]]
//!     .iter()
//!     .map(|t| vm.add_face(&[v[t[0]], v[t[1]], v[t[2]]], None, AttrMap::new()).unwrap())
//!     .collect();
//! let c = vm.add_cell(&faces, None, AttrMap::new()).unwrap();
//!
//! assert_eq!(vm.cell_vertices(c).len(), 4);
//! assert!((vm.cell_volume(c).unwrap() - 1.0 / 6.0).abs() < 1e-12);
//! ```

mod attributes;
mod data;
mod query;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::debug;
use nalgebra::Point3;

pub use data::VolMeshData;

use crate::attr::{AttrMap, AttributeStore, MeshConfig};
use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, CellKey, EdgeKey, FaceKey, KeyAllocator, VertexKey};
use crate::mesh::{cycle_pairs, take_position, Vertex};

/// A cell complex of polygon faces.
#[derive(Debug, Clone, PartialEq)]
pub struct VolMesh {
    pub(crate) attributes: AttrMap,
    pub(crate) vertices: BTreeMap<VertexKey, Vertex>,
    pub(crate) faces: BTreeMap<FaceKey, Vec<VertexKey>>,
    pub(crate) cells: BTreeMap<CellKey, Vec<FaceKey>>,
    /// The (at most two) cells on either side of each face.
    pub(crate) face_cells: BTreeMap<FaceKey, [Option<CellKey>; 2]>,
    /// Faces incident to each vertex.
    pub(crate) vertex_faces: BTreeMap<VertexKey, BTreeSet<FaceKey>>,
    pub(crate) default_position: Point3<f64>,

    pub(crate) vertex_attrs: AttributeStore<VertexKey>,
    pub(crate) face_attrs: AttributeStore<FaceKey>,
    pub(crate) cell_attrs: AttributeStore<CellKey>,

    pub(crate) vertex_keys: KeyAllocator<VertexKey>,
    pub(crate) face_keys: KeyAllocator<FaceKey>,
    pub(crate) cell_keys: KeyAllocator<CellKey>,
}

impl Default for VolMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl VolMesh {
    /// Create an empty volmesh with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MeshConfig::default())
    }

    /// Create an empty volmesh with an explicit configuration.
    pub fn with_config(config: MeshConfig) -> Self {
        Self {
            attributes: AttrMap::new(),
            vertices: BTreeMap::new(),
            faces: BTreeMap::new(),
            cells: BTreeMap::new(),
            face_cells: BTreeMap::new(),
            vertex_faces: BTreeMap::new(),
            default_position: Point3::origin(),
            vertex_attrs: AttributeStore::new("vertex", AttrMap::new(), config),
            face_attrs: AttributeStore::new("face", AttrMap::new(), config),
            cell_attrs: AttributeStore::new("cell", AttrMap::new(), config),
            vertex_keys: KeyAllocator::new(),
            face_keys: KeyAllocator::new(),
            cell_keys: KeyAllocator::new(),
        }
    }

    /// The configuration the volmesh was built with.
    pub fn config(&self) -> MeshConfig {
        self.vertex_attrs.config()
    }

    /// Build a volmesh from coordinates and cells given as lists of index
    /// cycles.
    ///
    /// Vertex `i` gets key `i`. Faces with the same vertex set are welded, so
    /// neighbouring cells share the face between them.
    pub fn from_vertices_and_cells<P>(points: &[P], cells: &[Vec<Vec<usize>>]) -> Result<Self>
    where
        P: Copy + Into<Point3<f64>>,
    {
        let mut vm = VolMesh::new();
        for (i, &p) in points.iter().enumerate() {
            let v = vm.add_vertex(Some(VertexKey::new(i as u64)), AttrMap::new())?;
            vm.set_position(v, p.into())?;
        }
        let mut welded: HashMap<Vec<usize>, FaceKey> = HashMap::new();
        for cell in cells {
            let mut faces = Vec::with_capacity(cell.len());
            for cycle in cell {
                let mut signature = cycle.clone();
                signature.sort_unstable();
                let f = match welded.get(&signature) {
                    Some(&f) => f,
                    None => {
                        let keys: Vec<VertexKey> = cycle.iter().map(|&i| VertexKey::new(i as u64)).collect();
                        let f = vm.add_face(&keys, None, AttrMap::new())?;
                        welded.insert(signature, f);
                        f
                    }
                };
                faces.push(f);
            }
            vm.add_cell(&faces, None, AttrMap::new())?;
        }
        Ok(vm)
    }

    // ==================== Vertices ====================

    /// Add a vertex. Coordinates come from `x`, `y`, `z` in `attrs`.
    pub fn add_vertex(&mut self, key: Option<VertexKey>, mut attrs: AttrMap) -> Result<VertexKey> {
        let position = take_position(&mut attrs, self.default_position)?;
        self.vertex_attrs.check_names(&attrs)?;
        let vertices = &self.vertices;
        let v = self.vertex_keys.allocate(key, |k| vertices.contains_key(&k))?;
        self.vertices.insert(v, Vertex::new(position));
        self.vertex_faces.entry(v).or_default();
        self.vertex_attrs.create(v, attrs);
        debug!("added vertex {:?}", v);
        Ok(v)
    }

    /// Add a vertex at a position with an automatic key.
    pub fn add_vertex_at(&mut self, position: Point3<f64>) -> VertexKey {
        let v = self.vertex_keys.peek();
        self.vertex_keys.observe(v);
        self.vertices.insert(v, Vertex::new(position));
        self.vertex_faces.entry(v).or_default();
        self.vertex_attrs.create(v, AttrMap::new());
        v
    }

    /// Delete a vertex with every face (and so every cell) using it.
    pub fn delete_vertex(&mut self, v: VertexKey) -> Result<()> {
        if !self.has_vertex(v) {
            return Err(MeshError::not_found("vertex", v));
        }
        for f in self.vertex_faces(v) {
            self.delete_face(f)?;
        }
        self.vertex_faces.remove(&v);
        self.vertices.remove(&v);
        self.vertex_attrs.remove(v);
        debug!("deleted vertex {:?}", v);
        Ok(())
    }

    // ==================== Faces ====================

    /// Add a face from a vertex cycle.
    ///
    /// A repeated closing vertex is dropped; the rest must be at least three
    /// distinct existing vertices.
    pub fn add_face(&mut self, cycle: &[VertexKey], key: Option<FaceKey>, attrs: AttrMap) -> Result<FaceKey> {
        let cycle = self.validate_face(cycle)?;
        self.face_attrs.check_names(&attrs)?;
        let faces = &self.faces;
        let f = self.face_keys.allocate(key, |k| faces.contains_key(&k))?;
        self.bind_face(f, cycle);
        self.face_attrs.create(f, attrs);
        debug!("added face {:?}", f);
        Ok(f)
    }

    pub(crate) fn validate_face(&self, cycle: &[VertexKey]) -> Result<Vec<VertexKey>> {
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
        Ok(cycle)
    }

    pub(crate) fn bind_face(&mut self, f: FaceKey, cycle: Vec<VertexKey>) {
        for &v in &cycle {
            self.vertex_faces.entry(v).or_default().insert(f);
        }
        self.faces.insert(f, cycle);
        self.face_cells.insert(f, [None, None]);
    }

    /// Delete a face and the cells it bounds.
    pub fn delete_face(&mut self, f: FaceKey) -> Result<()> {
        if !self.has_face(f) {
            return Err(MeshError::not_found("face", f));
        }
        for c in self.face_cells(f) {
            self.delete_cell(c)?;
        }
        if let Some(cycle) = self.faces.remove(&f) {
            for v in cycle {
                if let Some(faces) = self.vertex_faces.get_mut(&v) {
                    faces.remove(&f);
                }
            }
        }
        self.face_cells.remove(&f);
        self.face_attrs.remove(f);
        debug!("deleted face {:?}", f);
        Ok(())
    }

    // ==================== Cells ====================

    /// Add a cell bounded by existing faces.
    ///
    /// Fails with `KeyNotFound` for unknown faces, `BoundaryOperation` when a
    /// face already borders two cells and `NonManifold` when the faces do not
    /// close (some edge is not shared by exactly two of them).
    pub fn add_cell(&mut self, faces: &[FaceKey], key: Option<CellKey>, attrs: AttrMap) -> Result<CellKey> {
        self.validate_cell(faces)?;
        self.cell_attrs.check_names(&attrs)?;
        let cells = &self.cells;
        let c = self.cell_keys.allocate(key, |k| cells.contains_key(&k))?;
        self.bind_cell(c, faces.to_vec());
        self.cell_attrs.create(c, attrs);
        debug!("added cell {:?} with {} faces", c, faces.len());
        Ok(c)
    }

    pub(crate) fn validate_cell(&self, faces: &[FaceKey]) -> Result<()> {
        if faces.len() < 4 {
            return Err(MeshError::degenerate(format!(
                "a cell needs at least 4 faces, got {}",
                faces.len()
            )));
        }
        let mut seen = HashSet::with_capacity(faces.len());
        let mut uses: HashMap<EdgeKey, usize> = HashMap::new();
        for &f in faces {
            if !seen.insert(f) {
                return Err(MeshError::degenerate(format!("face {:?} repeats in the cell", f)));
            }
            let cycle = self.faces.get(&f).ok_or_else(|| MeshError::not_found("face", f))?;
            if self.face_cells(f).len() == 2 {
                return Err(MeshError::BoundaryOperation {
                    details: format!("face {:?} already borders two cells", f),
                });
            }
            for (u, v) in cycle_pairs(cycle) {
                *uses.entry(canonical_edge(u, v)).or_default() += 1;
            }
        }
        if let Some((edge, count)) = uses.iter().find(|(_, &count)| count != 2) {
            return Err(MeshError::non_manifold(format!(
                "edge {:?} is used by {} faces of the cell",
                edge, count
            )));
        }
        Ok(())
    }

    pub(crate) fn bind_cell(&mut self, c: CellKey, faces: Vec<FaceKey>) {
        for f in &faces {
            if let Some(slot) = self.face_cells.get_mut(f).and_then(|s| s.iter_mut().find(|s| s.is_none())) {
                *slot = Some(c);
            }
        }
        self.cells.insert(c, faces);
    }

    /// Delete a cell. Its faces stay.
    pub fn delete_cell(&mut self, c: CellKey) -> Result<()> {
        let faces = self.cells.remove(&c).ok_or_else(|| MeshError::not_found("cell", c))?;
        for f in faces {
            if let Some(slots) = self.face_cells.get_mut(&f) {
                for slot in slots.iter_mut().filter(|s| **s == Some(c)) {
                    *slot = None;
                }
            }
        }
        self.cell_attrs.remove(c);
        debug!("deleted cell {:?}", c);
        Ok(())
    }
}
