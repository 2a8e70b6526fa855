//! Subdivision schemes.
//!
//! Every scheme returns a fresh mesh and leaves its input untouched. The
//! refined topology is produced with the ordinary mutation operators, so the
//! result satisfies the same invariants as any hand-built mesh.
//!
//! # Schemes
//!
//! - **Tri**: a vertex at each face centroid, fanned into triangles.
//! - **Quad**: split every edge, add a face point, one quad per corner.
//! - **Catmull-Clark**: the quad topology with smoothing weights. Works on
//!   arbitrary polygon meshes and always produces quads.
//! - **Loop**: triangle meshes only; every triangle becomes four.
//! - **Doo-Sabin**: one new point per face corner, with face, edge and vertex
//!   faces connecting them.
//!
//! Corner vertices (boundary vertices with a single incident face) and the
//! vertices in [`SubdivideOptions::fixed`] keep their position in every
//! smoothing scheme.
//!
//! # Example
//!
//! ```
//! use topomesh::mesh::Mesh;
//! use topomesh::algo::subdivide::{subdivide, SubdivideOptions, SubdivideScheme};
//!
//! let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
//! let mesh = Mesh::from_vertices_and_faces(&points, &[[0, 1, 2, 3]]).unwrap();
//!
//! let options = SubdivideOptions::new(2).with_scheme(SubdivideScheme::CatmullClark);
//! let fine = subdivide(&mesh, &options).unwrap();
//! assert_eq!(fine.num_faces(), 16);
//! assert_eq!(mesh.num_faces(), 1);
//! ```
//!
//! # References
//!
//! - Loop, C. (1987). "Smooth Subdivision Surfaces Based on Triangles."
//!   Master's thesis, University of Utah.
//! - Catmull, E. & Clark, J. (1978). "Recursively generated B-spline surfaces
//!   on arbitrary topological meshes." Computer-Aided Design, 10(6), 350-355.
//! - Doo, D. & Sabin, M. (1978). "Behaviour of recursive division surfaces
//!   near extraordinary points." Computer-Aided Design, 10(6), 356-360.

mod catmull_clark;
mod doo_sabin;
mod loop_subdivision;
mod simple;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::debug;

pub use catmull_clark::catmull_clark;
pub use doo_sabin::doo_sabin;
pub use loop_subdivision::loop_subdivide;
pub use simple::{quad_subdivide, tri_subdivide};

use crate::error::{MeshError, Result};
use crate::key::{canonical_edge, EdgeKey, VertexKey};
use crate::mesh::Mesh;

use super::Progress;

/// Available subdivision schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdivideScheme {
    /// Face-centroid fan.
    Tri,
    /// Edge midpoints and face centroid, one quad per corner.
    Quad,
    /// Catmull-Clark smoothing on the quad topology.
    #[default]
    CatmullClark,
    /// Loop smoothing for triangle meshes.
    Loop,
    /// Doo-Sabin corner cutting.
    DooSabin,
}

impl SubdivideScheme {
    /// Lower-case scheme name.
    pub fn name(self) -> &'static str {
        match self {
            SubdivideScheme::Tri => "tri",
            SubdivideScheme::Quad => "quad",
            SubdivideScheme::CatmullClark => "catmull-clark",
            SubdivideScheme::Loop => "loop",
            SubdivideScheme::DooSabin => "doo-sabin",
        }
    }

    fn step(self) -> fn(&Mesh, &SubdivideOptions) -> Result<Mesh> {
        match self {
            SubdivideScheme::Tri => simple::tri_once,
            SubdivideScheme::Quad => simple::quad_once,
            SubdivideScheme::CatmullClark => catmull_clark::catmull_clark_once,
            SubdivideScheme::Loop => loop_subdivision::loop_once,
            SubdivideScheme::DooSabin => doo_sabin::doo_sabin_once,
        }
    }
}

impl fmt::Display for SubdivideScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubdivideScheme {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "tri" => Ok(SubdivideScheme::Tri),
            "quad" => Ok(SubdivideScheme::Quad),
            "catmull-clark" | "catmullclark" | "cc" => Ok(SubdivideScheme::CatmullClark),
            "loop" => Ok(SubdivideScheme::Loop),
            "doo-sabin" | "doosabin" | "ds" => Ok(SubdivideScheme::DooSabin),
            _ => Err(MeshError::invalid_param("scheme", s, "unknown subdivision scheme")),
        }
    }
}

/// Options for subdivision.
#[derive(Debug, Clone)]
pub struct SubdivideOptions {
    /// Scheme used by [`subdivide`].
    pub scheme: SubdivideScheme,

    /// Number of subdivision iterations.
    pub iterations: usize,

    /// Vertices that keep their position.
    pub fixed: BTreeSet<VertexKey>,

    /// Whether boundary vertices follow the boundary curve rule instead of
    /// the interior rule.
    pub preserve_boundary: bool,
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SubdivideOptions {
    /// Create options with the specified number of iterations.
    pub fn new(iterations: usize) -> Self {
        Self {
            scheme: SubdivideScheme::default(),
            iterations,
            fixed: BTreeSet::new(),
            preserve_boundary: true,
        }
    }

    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: SubdivideScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Pin a set of vertices.
    pub fn with_fixed(mut self, fixed: impl IntoIterator<Item = VertexKey>) -> Self {
        self.fixed.extend(fixed);
        self
    }

    /// Set whether to preserve boundary curves.
    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }
}

/// Subdivide with the scheme selected in `options`.
pub fn subdivide(mesh: &Mesh, options: &SubdivideOptions) -> Result<Mesh> {
    subdivide_with_progress(mesh, options, &Progress::none())
}

/// Subdivide with progress reporting, once per iteration.
pub fn subdivide_with_progress(mesh: &Mesh, options: &SubdivideOptions, progress: &Progress) -> Result<Mesh> {
    run(mesh, options, options.scheme, progress)
}

fn run(mesh: &Mesh, options: &SubdivideOptions, scheme: SubdivideScheme, progress: &Progress) -> Result<Mesh> {
    let step = scheme.step();
    let mut current = mesh.clone();
    for iteration in 0..options.iterations {
        progress.report(iteration, options.iterations, scheme.name());
        current = step(&current, options)?;
    }
    progress.report(options.iterations, options.iterations, scheme.name());
    debug!(
        "{} subdivision x{}: {} vertices, {} faces",
        scheme,
        options.iterations,
        current.num_vertices(),
        current.num_faces()
    );
    Ok(current)
}

/// Whether a vertex keeps its position during smoothing.
pub(super) fn is_pinned(mesh: &Mesh, v: VertexKey, options: &SubdivideOptions) -> bool {
    options.fixed.contains(&v) || (mesh.is_vertex_on_boundary(v) && mesh.vertex_faces(v, false).len() == 1)
}

/// Neighbours of `v` across boundary edges.
pub(super) fn boundary_neighbours(mesh: &Mesh, v: VertexKey) -> Vec<VertexKey> {
    mesh.vertex_neighbours(v, false)
        .into_iter()
        .filter(|&w| mesh.is_edge_on_boundary(v, w))
        .collect()
}

/// Split every edge of `source` inside `target` at its midpoint.
///
/// `target` must be a copy of `source`. Returns the new vertex of each
/// original edge under its canonical key.
pub(super) fn split_edges(source: &Mesh, target: &mut Mesh) -> Result<BTreeMap<EdgeKey, VertexKey>> {
    let mut points = BTreeMap::new();
    for (u, v) in source.edges() {
        let w = target.split_edge(u, v, 0.5)?;
        points.insert(canonical_edge(u, v), w);
    }
    Ok(points)
}

/// The vertex that split the edge `(u, v)`.
pub(super) fn edge_vertex(points: &BTreeMap<EdgeKey, VertexKey>, u: VertexKey, v: VertexKey) -> Result<VertexKey> {
    points
        .get(&canonical_edge(u, v))
        .copied()
        .ok_or_else(|| MeshError::not_found("edge", (u, v)))
}
