//! JSON documents shared by meshes, networks and volmeshes.
//!
//! Each structure converts to and from a plain serde document
//! ([`MeshData`](crate::mesh::MeshData), [`NetworkData`](crate::network::NetworkData),
//! [`VolMeshData`](crate::volmesh::VolMeshData)). The [`Document`] trait adds
//! JSON text and file I/O on top.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MeshError, Result};
use crate::key::VertexKey;

/// JSON encoding for data documents.
pub trait Document: Serialize + DeserializeOwned {
    /// Serialize to pretty-printed JSON.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(MeshError::from)
    }

    /// Deserialize from JSON text.
    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(MeshError::from)
    }

    /// Write the document to a file.
    fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| MeshError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a document from a file.
    fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| MeshError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Document form of an edge key: `"u-v"`.
pub(crate) fn edge_to_string(u: VertexKey, v: VertexKey) -> String {
    format!("{}-{}", u.get(), v.get())
}

/// Parse the `"u-v"` form of an edge key.
pub(crate) fn edge_from_string(text: &str) -> Result<(VertexKey, VertexKey)> {
    let parse = |part: &str| part.trim().parse::<u64>().ok().map(VertexKey::new);
    text.split_once('-')
        .and_then(|(u, v)| Some((parse(u)?, parse(v)?)))
        .ok_or_else(|| MeshError::invalid_param("edge key", text, "expected \"u-v\" with integer keys"))
}
