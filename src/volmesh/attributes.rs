//! Attribute access for volmesh vertices, faces and cells.

use super::VolMesh;
use crate::attr::{Attr, AttrMap};
use crate::error::{MeshError, Result};
use crate::key::{CellKey, FaceKey, VertexKey};
use crate::mesh::{coordinate_axis, take_position, COORDINATE_NAMES};

impl VolMesh {
    /// Volmesh-level attributes.
    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    /// Set a volmesh-level attribute.
    pub fn set_attribute(&mut self, name: &str, value: Attr) {
        self.attributes.insert(name.to_string(), value);
    }

    // ==================== Vertices ====================

    /// Default vertex attributes, coordinates included.
    pub fn default_vertex_attributes(&self) -> AttrMap {
        let mut out = self.vertex_attrs.defaults().clone();
        for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
            out.insert(name.to_string(), Attr::Float(self.default_position[axis]));
        }
        out
    }

    /// Merge `mapping` into the default vertex template.
    pub fn update_default_vertex_attributes(&mut self, mut mapping: AttrMap) -> Result<()> {
        self.default_position = take_position(&mut mapping, self.default_position)?;
        self.vertex_attrs.update_defaults(mapping);
        Ok(())
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

    // ==================== Faces ====================

    /// Default face attributes.
    pub fn default_face_attributes(&self) -> &AttrMap {
        self.face_attrs.defaults()
    }

    /// Merge `mapping` into the default face template.
    pub fn update_default_face_attributes(&mut self, mapping: AttrMap) {
        self.face_attrs.update_defaults(mapping);
    }

    /// Read one face attribute.
    pub fn face_attribute(&self, f: FaceKey, name: &str) -> Option<Attr> {
        if !self.has_face(f) {
            return None;
        }
        self.face_attrs.get(f, name).cloned()
    }

    /// Write one face attribute.
    pub fn set_face_attribute(&mut self, f: FaceKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_face(f) {
            return Err(MeshError::not_found("face", f));
        }
        self.face_attrs.set(f, name, value)
    }

    // ==================== Cells ====================

    /// Default cell attributes.
    pub fn default_cell_attributes(&self) -> &AttrMap {
        self.cell_attrs.defaults()
    }

    /// Merge `mapping` into the default cell template.
    ///
    /// Changed values reach only cells created afterwards; new names reach all.
    pub fn update_default_cell_attributes(&mut self, mapping: AttrMap) {
        self.cell_attrs.update_defaults(mapping);
    }

    /// Read one cell attribute.
    pub fn cell_attribute(&self, c: CellKey, name: &str) -> Option<Attr> {
        if !self.has_cell(c) {
            return None;
        }
        self.cell_attrs.get(c, name).cloned()
    }

    /// All attributes of a cell.
    pub fn cell_attributes(&self, c: CellKey) -> Option<AttrMap> {
        self.has_cell(c).then(|| self.cell_attrs.attributes(c))
    }

    /// Write one cell attribute.
    pub fn set_cell_attribute(&mut self, c: CellKey, name: &str, value: Attr) -> Result<()> {
        if !self.has_cell(c) {
            return Err(MeshError::not_found("cell", c));
        }
        self.cell_attrs.set(c, name, value)
    }

    /// Read one attribute for many cells (all when `keys` is `None`), in key
    /// order.
    pub fn cells_attribute(&self, name: &str, keys: Option<&[CellKey]>) -> Vec<Option<Attr>> {
        match keys {
            Some(keys) => keys.iter().map(|&c| self.cell_attribute(c, name)).collect(),
            None => self.cells().map(|c| self.cell_attribute(c, name)).collect(),
        }
    }

    /// Write one attribute on many cells (all when `keys` is `None`).
    pub fn set_cells_attribute(&mut self, name: &str, value: Attr, keys: Option<&[CellKey]>) -> Result<()> {
        let keys: Vec<CellKey> = match keys {
            Some(keys) => keys.to_vec(),
            None => self.cells().collect(),
        };
        for c in keys {
            self.set_cell_attribute(c, name, value.clone())?;
        }
        Ok(())
    }
}
