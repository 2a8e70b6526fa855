//! Canonical document form of a network.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Network;
use crate::attr::{Attr, AttrMap, MeshConfig};
use crate::data::{edge_from_string, edge_to_string, Document};
use crate::error::{MeshError, Result};
use crate::key::VertexKey;
use crate::mesh::{take_position, Vertex, COORDINATE_NAMES};

/// Serializable snapshot of a [`Network`].
///
/// Edges are listed as `"u-v"` keys of `edgedata`; the direction is part of
/// the key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkData {
    /// Network-level attributes.
    pub attributes: AttrMap,
    /// Default vertex template, coordinates included.
    pub default_vertex_attrs: AttrMap,
    /// Default edge template.
    pub default_edge_attrs: AttrMap,
    /// Vertex records by key.
    pub vertices: BTreeMap<VertexKey, AttrMap>,
    /// Edge records keyed `"u-v"`.
    pub edgedata: BTreeMap<String, AttrMap>,
    /// High-water mark of the vertex keys.
    pub max_int_key: Option<u64>,
}

impl Document for NetworkData {}

impl Network {
    /// Export the network as a document.
    pub fn to_data(&self) -> NetworkData {
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

        let edgedata = self
            .edges()
            .map(|(u, v)| {
                let values = self.edge_attrs.exported((u, v)).unwrap_or_default();
                (edge_to_string(u, v), values)
            })
            .collect();

        NetworkData {
            attributes: self.attributes.clone(),
            default_vertex_attrs: self.default_vertex_attributes(),
            default_edge_attrs: self.edge_attrs.defaults().clone(),
            vertices,
            edgedata,
            max_int_key: self.vertex_keys.high_water(),
        }
    }

    /// Rebuild a network from a document with the default configuration.
    pub fn from_data(data: &NetworkData) -> Result<Self> {
        Self::from_data_with_config(data, MeshConfig::default())
    }

    /// Rebuild a network from a document.
    pub fn from_data_with_config(data: &NetworkData, config: MeshConfig) -> Result<Self> {
        let mut network = Network::with_config(config);
        network.attributes = data.attributes.clone();
        network.update_default_vertex_attributes(data.default_vertex_attrs.clone())?;
        network.update_default_edge_attributes(data.default_edge_attrs.clone());

        for (&v, values) in &data.vertices {
            let mut values = values.clone();
            let position = take_position(&mut values, network.default_position)?;
            let vertices = &network.vertices;
            network.vertex_keys.allocate(Some(v), |k| vertices.contains_key(&k))?;
            network.vertices.insert(v, Vertex::new(position));
            network.succ.entry(v).or_default();
            network.pred.entry(v).or_default();
            network.vertex_attrs.restore(v, values);
        }

        for (text, values) in &data.edgedata {
            let (u, v) = edge_from_string(text)?;
            if u == v {
                return Err(MeshError::invalid_param("edge", text, "loops are not allowed"));
            }
            for w in [u, v] {
                if !network.has_vertex(w) {
                    return Err(MeshError::not_found("vertex", w));
                }
            }
            network.succ.entry(u).or_default().insert(v);
            network.pred.entry(v).or_default().insert(u);
            network.edge_attrs.restore((u, v), values.clone());
        }

        network.vertex_keys.restore(data.max_int_key);
        Ok(network)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.to_data().to_json()
    }

    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_data(&NetworkData::from_json(json)?)
    }

    /// Write the network document to a file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_data().to_json_file(path)
    }

    /// Read a network document from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_data(&NetworkData::from_json_file(path)?)
    }
}
