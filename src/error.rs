//! Error types for topomesh.
//!
//! Every mutation operator validates its preconditions before touching any
//! state, so an `Err` from any of them means the structure is unchanged.
//! Queries never fail for "no result"; they return empty collections or
//! `None` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during topology operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A referenced entity does not exist.
    #[error("{kind} {key} not found")]
    KeyNotFound {
        /// Entity class ("vertex", "face", "edge", ...).
        kind: &'static str,
        /// The missing key, formatted.
        key: String,
    },

    /// A user-supplied key is already in use.
    #[error("{kind} {key} already exists")]
    DuplicateKey {
        /// Entity class.
        kind: &'static str,
        /// The clashing key, formatted.
        key: String,
    },

    /// A face cycle has too few or repeated vertices.
    #[error("degenerate face: {details}")]
    DegenerateFace {
        /// Description of the degeneracy.
        details: String,
    },

    /// The operation would break manifoldness.
    #[error("non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// The operation is not defined on (or away from) the boundary.
    #[error("boundary operation rejected: {details}")]
    BoundaryOperation {
        /// Why the operation was rejected.
        details: String,
    },

    /// An edge collapse was rejected.
    #[error("cannot collapse edge ({u}, {v}): {reason}")]
    Collapse {
        /// First vertex of the edge.
        u: u64,
        /// Second vertex of the edge.
        v: u64,
        /// Why the collapse was rejected.
        reason: String,
    },

    /// An edge swap was rejected.
    #[error("cannot swap edge ({u}, {v}): {reason}")]
    Swap {
        /// First vertex of the edge.
        u: u64,
        /// Second vertex of the edge.
        v: u64,
        /// Why the swap was rejected.
        reason: String,
    },

    /// Strict attributes are enabled and the name is not in the template.
    #[error("attribute '{name}' is not declared in the default {kind} attributes")]
    AttributeSchema {
        /// Entity class whose template was consulted.
        kind: &'static str,
        /// The undeclared attribute name.
        name: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// File I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A data document could not be encoded or decoded.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a key-not-found error.
    pub fn not_found<K: std::fmt::Debug>(kind: &'static str, key: K) -> Self {
        MeshError::KeyNotFound {
            kind,
            key: format!("{:?}", key),
        }
    }

    /// Create a duplicate-key error.
    pub fn duplicate<K: std::fmt::Debug>(kind: &'static str, key: K) -> Self {
        MeshError::DuplicateKey {
            kind,
            key: format!("{:?}", key),
        }
    }

    /// Create a degenerate-face error.
    pub fn degenerate(details: impl Into<String>) -> Self {
        MeshError::DegenerateFace {
            details: details.into(),
        }
    }

    /// Create a non-manifold error.
    pub fn non_manifold(details: impl Into<String>) -> Self {
        MeshError::NonManifold {
            details: details.into(),
        }
    }
}
