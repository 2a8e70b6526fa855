//! Canonical document form of a mesh.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::attributes::{take_position, COORDINATE_NAMES};
use super::Mesh;
use crate::attr::{Attr, AttrMap, MeshConfig};
use crate::data::{edge_from_string, edge_to_string, Document};
use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, FaceKey, VertexKey};

/// Serializable snapshot of a [`Mesh`].
///
/// `vertices` holds the coordinates plus the stored attribute values of each
/// vertex; `facedata` and `edgedata` hold the stored face and edge values.
/// Under the sparse policy the stored values are the overrides, plus any
/// creation-time template value that the current template no longer holds.
/// Edges that border no face are listed in `edges`; all others follow from
/// the face cycles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    /// Mesh-level attributes.
    pub attributes: AttrMap,
    /// Default vertex template, coordinates included.
    pub default_vertex_attrs: AttrMap,
    /// Default edge template.
    pub default_edge_attrs: AttrMap,
    /// Default face template.
    pub default_face_attrs: AttrMap,
    /// Vertex records by key.
    pub vertices: BTreeMap<VertexKey, AttrMap>,
    /// Face cycles by key.
    pub faces: BTreeMap<FaceKey, Vec<VertexKey>>,
    /// Face records by key.
    pub facedata: BTreeMap<FaceKey, AttrMap>,
    /// Edges without a face on either side.
    pub edges: Vec<[VertexKey; 2]>,
    /// Edge records keyed `"u-v"`.
    pub edgedata: BTreeMap<String, AttrMap>,
    /// High-water mark of the vertex keys.
    pub max_int_key: Option<u64>,
    /// High-water mark of the face keys.
    pub max_int_fkey: Option<u64>,
}

impl Document for MeshData {}

impl Mesh {
    /// Export the mesh as a document.
    pub fn to_data(&self) -> MeshData {
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

        let edgedata = self
            .edge_attrs
            .keys()
            .filter(|&(u, v)| self.has_edge(u, v))
            .filter_map(|(u, v)| {
                let values = self.edge_attrs.exported((u, v))?;
                Some((edge_to_string(u, v), values))
            })
            .collect();

        let edges = self
            .edges()
            .filter(|&(u, v)| self.halfedge_face(u, v).is_none() && self.halfedge_face(v, u).is_none())
            .map(|(u, v)| [u, v])
            .collect();

        MeshData {
            attributes: self.attributes.clone(),
            default_vertex_attrs: self.default_vertex_attributes(),
            default_edge_attrs: self.edge_attrs.defaults().clone(),
            default_face_attrs: self.face_attrs.defaults().clone(),
            vertices,
            faces: self.faces.clone(),
            facedata,
            edges,
            edgedata,
            max_int_key: self.vertex_keys.high_water(),
            max_int_fkey: self.face_keys.high_water(),
        }
    }

    /// Rebuild a mesh from a document with the default configuration.
    pub fn from_data(data: &MeshData) -> Result<Self> {
        Self::from_data_with_config(data, MeshConfig::default())
    }

    /// Rebuild a mesh from a document.
    ///
    /// Faces are re-added through the usual validation, so a document with
    /// broken topology is rejected rather than imported.
    pub fn from_data_with_config(data: &MeshData, config: MeshConfig) -> Result<Self> {
        let mut mesh = Mesh::with_config(config);
        mesh.attributes = data.attributes.clone();
        mesh.update_default_vertex_attributes(data.default_vertex_attrs.clone())?;
        mesh.update_default_edge_attributes(data.default_edge_attrs.clone());
        mesh.update_default_face_attributes(data.default_face_attrs.clone());

        for (&v, values) in &data.vertices {
            let mut values = values.clone();
            let position = take_position(&mut values, mesh.default_position)?;
            let vertices = &mesh.vertices;
            mesh.vertex_keys.allocate(Some(v), |k| vertices.contains_key(&k))?;
            mesh.vertices.insert(v, super::Vertex::new(position));
            mesh.halfedges.entry(v).or_default();
            mesh.vertex_attrs.restore(v, values);
        }

        for (&f, cycle) in &data.faces {
            let cycle = mesh.validate_cycle(cycle)?;
            let faces = &mesh.faces;
            mesh.face_keys.allocate(Some(f), |k| faces.contains_key(&k))?;
            mesh.bind_face(f, cycle);
            let values = data.facedata.get(&f).cloned().unwrap_or_default();
            mesh.face_attrs.restore(f, values);
        }

        for &[u, v] in &data.edges {
            if u == v {
                return Err(MeshError::degenerate(format!("edge ({:?}, {:?}) is a loop", u, v)));
            }
            for w in [u, v] {
                if !mesh.has_vertex(w) {
                    return Err(MeshError::not_found("vertex", w));
                }
            }
            mesh.ensure_edge_pair(u, v);
        }

        for (text, values) in &data.edgedata {
            let (u, v) = edge_from_string(text)?;
            if !mesh.has_edge(u, v) {
                return Err(MeshError::not_found("edge", (u, v)));
            }
            mesh.edge_attrs.restore(canonical_edge(u, v), values.clone());
        }

        mesh.vertex_keys.restore(data.max_int_key);
        mesh.face_keys.restore(data.max_int_fkey);
        Ok(mesh)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.to_data().to_json()
    }

    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_data(&MeshData::from_json(json)?)
    }

    /// Write the mesh document to a file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_data().to_json_file(path)
    }

    /// Read a mesh document from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_data(&MeshData::from_json_file(path)?)
    }
}
