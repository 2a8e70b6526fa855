//! Face planarization.
//!
//! Each iteration projects the vertices of every face onto the face's
//! least-squares plane, then moves each free vertex to the average of its
//! projections. Repeating this drives the faces towards planarity; the
//! remaining non-planarity is measured with [`Mesh::face_flatness`].

use std::collections::{BTreeMap, BTreeSet};

use log::trace;
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use crate::key::{FaceKey, VertexKey};
use crate::mesh::{centroid_of, Mesh};

use super::Progress;

/// Options for [`planarize_faces`].
#[derive(Debug, Clone)]
pub struct PlanarizeOptions {
    /// Maximum number of iterations.
    pub iterations: usize,

    /// Stop once every face is flatter than this.
    pub tolerance: f64,

    /// Vertices that never move.
    pub fixed: BTreeSet<VertexKey>,

    /// Whether to fit face planes in parallel.
    pub parallel: bool,
}

impl Default for PlanarizeOptions {
    fn default() -> Self {
        Self {
            iterations: 100,
            tolerance: 1e-6,
            fixed: BTreeSet::new(),
            parallel: true,
        }
    }
}

impl PlanarizeOptions {
    /// Set the iteration budget.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the flatness tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Pin a set of vertices.
    pub fn with_fixed(mut self, fixed: impl IntoIterator<Item = VertexKey>) -> Self {
        self.fixed.extend(fixed);
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of a planarization run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanarizeReport {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Largest face flatness after the last iteration.
    pub max_flatness: f64,
    /// Whether every face reached the tolerance.
    pub converged: bool,
}

/// Least-squares plane through a set of points, as (point, unit normal).
///
/// The normal is the eigenvector of the covariance matrix with the smallest
/// eigenvalue. Returns `None` for fewer than three points.
pub fn best_fit_plane(points: &[Point3<f64>]) -> Option<(Point3<f64>, Vector3<f64>)> {
    if points.len() < 3 {
        return None;
    }
    let c = centroid_of(points);
    let covariance = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - c;
        acc + d * d.transpose()
    });
    let eigen = SymmetricEigen::new(covariance);
    let i = eigen.eigenvalues.imin();
    let normal = eigen.eigenvectors.column(i).into_owned();
    normal.try_normalize(1e-15).map(|n| (c, n))
}

/// Largest face flatness over the mesh.
pub fn max_flatness(mesh: &Mesh) -> f64 {
    mesh.faces().map(|f| mesh.face_flatness(f)).fold(0.0, f64::max)
}

/// Planarize all faces.
pub fn planarize_faces(mesh: &mut Mesh, options: &PlanarizeOptions) -> PlanarizeReport {
    planarize_faces_with_progress(mesh, options, &Progress::none())
}

/// Planarize all faces, reporting once per iteration.
pub fn planarize_faces_with_progress(
    mesh: &mut Mesh,
    options: &PlanarizeOptions,
    progress: &Progress,
) -> PlanarizeReport {
    let mut report = PlanarizeReport {
        max_flatness: max_flatness(mesh),
        ..Default::default()
    };
    if report.max_flatness <= options.tolerance {
        report.converged = true;
        return report;
    }

    let faces: Vec<FaceKey> = mesh.faces().collect();
    for iteration in 0..options.iterations {
        progress.report(iteration, options.iterations, "planarize faces");

        let projections: Vec<Vec<(VertexKey, Point3<f64>)>> = if options.parallel {
            let view: &Mesh = mesh;
            faces.par_iter().map(|&f| project_face(view, f)).collect()
        } else {
            faces.iter().map(|&f| project_face(mesh, f)).collect()
        };

        let mut sums: BTreeMap<VertexKey, (Vector3<f64>, usize)> = BTreeMap::new();
        for (v, p) in projections.into_iter().flatten() {
            let entry = sums.entry(v).or_insert((Vector3::zeros(), 0));
            entry.0 += p.coords;
            entry.1 += 1;
        }
        for (v, (sum, count)) in sums {
            if options.fixed.contains(&v) {
                continue;
            }
            if let Some(record) = mesh.vertices.get_mut(&v) {
                record.position = Point3::from(sum / count as f64);
            }
        }

        report.iterations = iteration + 1;
        report.max_flatness = max_flatness(mesh);
        trace!("planarize iteration {}: max flatness {:.3e}", iteration, report.max_flatness);
        if report.max_flatness <= options.tolerance {
            report.converged = true;
            break;
        }
    }

    progress.report(options.iterations, options.iterations, "planarize faces");
    report
}

fn project_face(mesh: &Mesh, f: FaceKey) -> Vec<(VertexKey, Point3<f64>)> {
    let cycle = mesh.face_vertices(f);
    let points = mesh.face_positions(f);
    match best_fit_plane(&points) {
        Some((origin, normal)) => cycle
            .iter()
            .zip(points)
            .map(|(&v, p)| (v, p - normal * (p - origin).dot(&normal)))
            .collect(),
        None => cycle.iter().copied().zip(points).collect(),
    }
}
