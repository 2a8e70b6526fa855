//! Canonical document form of a volmesh.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::VolMesh;
use crate::attr::{Attr, AttrMap, MeshConfig};
use crate::data::Document;
use crate::error::Result;
use crate::key::{CellKey, FaceKey, VertexKey};
use crate::mesh::{take_position, Vertex, COORDINATE_NAMES};

/// Serializable snapshot of a [`VolMesh`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolMeshData {
    /// Volmesh-level attributes.
    pub attributes: AttrMap,
    /// Default vertex template, coordinates included.
    pub default_vertex_attrs: AttrMap,
    /// Default face template.
    pub default_face_attrs: AttrMap,
    /// Default cell template.
    pub default_cell_attrs: AttrMap,
    /// Vertex records by key.
    pub vertices: BTreeMap<VertexKey, AttrMap>,
    /// Face cycles by key.
    pub faces: BTreeMap<FaceKey, Vec<VertexKey>>,
    /// Face records by key.
    pub facedata: BTreeMap<FaceKey, AttrMap>,
    /// Cell face lists by key.
    pub cells: BTreeMap<CellKey, Vec<FaceKey>>,
    /// Cell records by key.
    pub celldata: BTreeMap<CellKey, AttrMap>,
    /// High-water mark of the vertex keys.
    pub max_int_key: Option<u64>,
    /// High-water mark of the face keys.
    pub max_int_fkey: Option<u64>,
    /// High-water mark of the cell keys.
    pub max_int_ckey: Option<u64>,
}

impl Document for VolMeshData {}

impl VolMesh {
    /// Export the volmesh as a document.
    pub fn to_data(&self) -> VolMeshData {
        let vertices = self
            .vertices
            .iter()
            .map(|(&v, record)| {
                let mut values = self.vertex_attrs.exported(v).unwrap_or_default();
                for (axis, name) in COORDINATE_NAMES.iter().enumerate() {
                    values.insert(name.to_string(), Attr::Float(record.position[axis]));
                }
                (v, values)
            })
            .collect();
        let facedata = self
            .faces()
            .filter_map(|f| self.face_attrs.exported(f).map(|values| (f, values)))
            .collect();
        let celldata = self
            .cells()
            .filter_map(|c| self.cell_attrs.exported(c).map(|values| (c, values)))
            .collect();

        VolMeshData {
            attributes: self.attributes.clone(),
            default_vertex_attrs: self.default_vertex_attributes(),
            default_face_attrs: self.face_attrs.defaults().clone(),
            default_cell_attrs: self.cell_attrs.defaults().clone(),
            vertices,
            faces: self.faces.clone(),
            facedata,
            cells: self.cells.clone(),
            celldata,
            max_int_key: self.vertex_keys.high_water(),
            max_int_fkey: self.face_keys.high_water(),
            max_int_ckey: self.cell_keys.high_water(),
        }
    }

    /// Rebuild a volmesh from a document with the default configuration.
    pub fn from_data(data: &VolMeshData) -> Result<Self> {
        Self::from_data_with_config(data, MeshConfig::default())
    }

    /// Rebuild a volmesh from a document.
    ///
    /// Faces and cells are re-validated, so an open cell in the document is
    /// rejected.
    pub fn from_data_with_config(data: &VolMeshData, config: MeshConfig) -> Result<Self> {
        let mut vm = VolMesh::with_config(config);
        vm.attributes = data.attributes.clone();
        vm.update_default_vertex_attributes(data.default_vertex_attrs.clone())?;
        vm.update_default_face_attributes(data.default_face_attrs.clone());
        vm.update_default_cell_attributes(data.default_cell_attrs.clone());

        for (&v, values) in &data.vertices {
            let mut values = values.clone();
            let position = take_position(&mut values, vm.default_position)?;
            let vertices = &vm.vertices;
            vm.vertex_keys.allocate(Some(v), |k| vertices.contains_key(&k))?;
            vm.vertices.insert(v, Vertex::new(position));
            vm.vertex_faces.entry(v).or_default();
            vm.vertex_attrs.restore(v, values);
        }

        for (&f, cycle) in &data.faces {
            let cycle = vm.validate_face(cycle)?;
            let faces = &vm.faces;
            vm.face_keys.allocate(Some(f), |k| faces.contains_key(&k))?;
            vm.bind_face(f, cycle);
            vm.face_attrs.restore(f, data.facedata.get(&f).cloned().unwrap_or_default());
        }

        for (&c, faces) in &data.cells {
            vm.validate_cell(faces)?;
            let cells = &vm.cells;
            vm.cell_keys.allocate(Some(c), |k| cells.contains_key(&k))?;
            vm.bind_cell(c, faces.clone());
            vm.cell_attrs.restore(c, data.celldata.get(&c).cloned().unwrap_or_default());
        }

        vm.vertex_keys.restore(data.max_int_key);
        vm.face_keys.restore(data.max_int_fkey);
        vm.cell_keys.restore(data.max_int_ckey);
        Ok(vm)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.to_data().to_json()
    }

    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_data(&VolMeshData::from_json(json)?)
    }

    /// Write the volmesh document to a file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_data().to_json_file(path)
    }

    /// Read a volmesh document from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_data(&VolMeshData::from_json_file(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::create_two_cubes;
    use super::*;
    use crate::error::MeshError;

    #[test]
    fn test_export_import_export_is_identity() {
        let mut vm = create_two_cubes();
        vm.set_cell_attribute(CellKey::new(0), "material", Attr::from("steel")).unwrap();
        vm.set_face_attribute(FaceKey::new(1), "wall", Attr::from(true)).unwrap();
        let json = vm.to_json().unwrap();
        let back = VolMesh::from_json(&json).unwrap();
        assert_eq!(back.to_json().unwrap(), json);
        assert_eq!(back.face_cells(FaceKey::new(1)).len(), 2);
        assert_eq!(back.cell_attribute(CellKey::new(0), "material"), Some(Attr::from("steel")));
    }

    #[test]
    fn test_open_cells_are_rejected() {
        let mut data = create_two_cubes().to_data();
        if let Some(faces) = data.cells.get_mut(&CellKey::new(1)) {
            faces.pop();
        }
        assert!(matches!(VolMesh::from_data(&data), Err(MeshError::NonManifold { .. })));
    }
}
