//! Iterative vertex relaxation.
//!
//! Each iteration recomputes the position of every free vertex from its
//! neighbourhood and moves it part of the way there. Only coordinates change;
//! the topology is never touched.
//!
//! # Methods
//!
//! - [`smooth_centroid`]: average of the neighbouring vertices
//! - [`smooth_center_of_mass`]: center of mass of the polygon spanned by the
//!   ordered neighbours
//! - [`smooth_area`]: area-weighted average of the incident face centroids
//!
//! # Example
//!
//! ```
//! use topomesh::mesh::Mesh;
//! use topomesh::algo::smooth::{smooth_centroid, SmoothOptions};
//!
//! let points = [
//!     [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0], [1.3, 0.8, 0.4], [2.0, 1.0, 0.0],
//!     [0.0, 2.0, 0.0], [1.0, 2.0, 0.0], [2.0, 2.0, 0.0],
//! ];
//! let faces = [[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
//! let mut mesh = Mesh::from_vertices_and_faces(&points, &faces).unwrap();
//!
//! let options = SmoothOptions::default().with_iterations(50).with_tolerance(1e-9);
//! let report = smooth_centroid(&mut mesh, &options);
//! assert!(report.converged);
//! ```

use std::collections::BTreeSet;

use log::trace;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::key::VertexKey;
use crate::mesh::{centroid_of, polygon_center_of_mass, Mesh};

use super::Progress;

/// How the target position of a vertex is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothMethod {
    /// Average of the neighbouring vertices.
    #[default]
    Centroid,
    /// Center of mass of the ordered neighbour polygon.
    CenterOfMass,
    /// Area-weighted average of the incident face centroids.
    Area,
}

impl SmoothMethod {
    fn label(self) -> &'static str {
        match self {
            SmoothMethod::Centroid => "smooth centroid",
            SmoothMethod::CenterOfMass => "smooth center of mass",
            SmoothMethod::Area => "smooth area",
        }
    }
}

/// Options for vertex relaxation.
#[derive(Debug, Clone)]
pub struct SmoothOptions {
    /// Maximum number of iterations.
    pub iterations: usize,

    /// Fraction of the way each vertex moves towards its target (0.0 to 1.0).
    pub damping: f64,

    /// Stop once no vertex moves further than this in one iteration.
    pub tolerance: f64,

    /// Vertices that never move.
    pub fixed: BTreeSet<VertexKey>,

    /// Whether boundary vertices stay in place.
    pub preserve_boundary: bool,

    /// Whether to compute targets in parallel.
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            damping: 0.5,
            tolerance: 0.0,
            fixed: BTreeSet::new(),
            preserve_boundary: true,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Set the iteration budget.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the damping factor, clamped to `[0, 1]`.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Set the displacement tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Pin a set of vertices.
    pub fn with_fixed(mut self, fixed: impl IntoIterator<Item = VertexKey>) -> Self {
        self.fixed.extend(fixed);
        self
    }

    /// Let boundary vertices move.
    pub fn allow_boundary_movement(mut self) -> Self {
        self.preserve_boundary = false;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Outcome of a relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothReport {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Largest single-vertex displacement in the last iteration.
    pub max_displacement: f64,
    /// Whether the tolerance was reached before the budget ran out.
    pub converged: bool,
}

/// Move each free vertex towards the centroid of its neighbours.
pub fn smooth_centroid(mesh: &mut Mesh, options: &SmoothOptions) -> SmoothReport {
    smooth_with_progress(mesh, SmoothMethod::Centroid, options, &Progress::none())
}

/// Move each free vertex towards the center of mass of its neighbour polygon.
pub fn smooth_center_of_mass(mesh: &mut Mesh, options: &SmoothOptions) -> SmoothReport {
    smooth_with_progress(mesh, SmoothMethod::CenterOfMass, options, &Progress::none())
}

/// Move each free vertex towards the area-weighted centroid of its faces.
///
/// Vertices whose faces all have zero area stay where they are.
pub fn smooth_area(mesh: &mut Mesh, options: &SmoothOptions) -> SmoothReport {
    smooth_with_progress(mesh, SmoothMethod::Area, options, &Progress::none())
}

/// Relax with an explicit method.
pub fn smooth(mesh: &mut Mesh, method: SmoothMethod, options: &SmoothOptions) -> SmoothReport {
    smooth_with_progress(mesh, method, options, &Progress::none())
}

/// Relax with an explicit method, reporting once per iteration.
pub fn smooth_with_progress(
    mesh: &mut Mesh,
    method: SmoothMethod,
    options: &SmoothOptions,
    progress: &Progress,
) -> SmoothReport {
    let mut report = SmoothReport::default();
    if options.iterations == 0 {
        return report;
    }

    // Isolated vertices have no neighbourhood to move towards.
    let free: Vec<VertexKey> = mesh
        .vertices()
        .filter(|v| !options.fixed.contains(v))
        .filter(|&v| !(options.preserve_boundary && mesh.is_vertex_on_boundary(v)))
        .filter(|&v| mesh.vertex_degree(v) > 0)
        .collect();

    let label = method.label();
    for iteration in 0..options.iterations {
        progress.report(iteration, options.iterations, label);

        let targets: Vec<(VertexKey, Point3<f64>)> = if options.parallel {
            let view: &Mesh = mesh;
            free.par_iter().map(|&v| (v, target(view, v, method))).collect()
        } else {
            free.iter().map(|&v| (v, target(mesh, v, method))).collect()
        };

        let mut max_displacement: f64 = 0.0;
        for (v, goal) in targets {
            if let Some(record) = mesh.vertices.get_mut(&v) {
                let step = (goal - record.position) * options.damping;
                max_displacement = max_displacement.max(step.norm());
                record.position += step;
            }
        }

        report.iterations = iteration + 1;
        report.max_displacement = max_displacement;
        trace!("{} iteration {}: max displacement {:.3e}", label, iteration, max_displacement);
        if max_displacement <= options.tolerance {
            report.converged = true;
            break;
        }
    }

    progress.report(options.iterations, options.iterations, label);
    report
}

fn target(mesh: &Mesh, v: VertexKey, method: SmoothMethod) -> Point3<f64> {
    match method {
        SmoothMethod::Centroid => {
            let points: Vec<Point3<f64>> = mesh
                .vertex_neighbours(v, false)
                .into_iter()
                .map(|w| mesh.position(w))
                .collect();
            centroid_of(&points)
        }
        SmoothMethod::CenterOfMass => {
            let points: Vec<Point3<f64>> = mesh
                .vertex_neighbours(v, true)
                .into_iter()
                .map(|w| mesh.position(w))
                .collect();
            polygon_center_of_mass(&points)
        }
        SmoothMethod::Area => {
            let mut weighted = Vector3::zeros();
            let mut total = 0.0;
            for f in mesh.vertex_faces(v, false) {
                let area = mesh.face_area(f);
                weighted += mesh.face_centroid(f).coords * area;
                total += area;
            }
            if total > 0.0 {
                Point3::from(weighted / total)
            } else {
                mesh.position(v)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    /// 3x3 vertex grid split into triangles, centre vertex 4 lifted by `h`.
    fn create_grid_mesh(h: f64) -> Mesh {
        let mut vertices = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                vertices.push([i as f64, j as f64, 0.0]);
            }
        }
        vertices[4][2] = h;
        let mut faces = Vec::new();
        for j in 0..2 {
            for i in 0..2 {
                let v00 = j * 3 + i;
                faces.push([v00, v00 + 1, v00 + 4]);
                faces.push([v00, v00 + 4, v00 + 3]);
            }
        }
        Mesh::from_vertices_and_faces(&vertices, &faces).unwrap()
    }

    fn centre() -> VertexKey {
        VertexKey::new(4)
    }

    #[test]
    fn test_centroid_and_center_of_mass_flatten_the_grid() {
        for method in [SmoothMethod::Centroid, SmoothMethod::CenterOfMass] {
            let mut mesh = create_grid_mesh(1.0);
            let options = SmoothOptions::default().with_iterations(1).with_damping(1.0);
            let report = smooth(&mut mesh, method, &options);
            assert_eq!(report.iterations, 1);
            assert!((mesh.position(centre()) - Point3::new(1.0, 1.0, 0.0)).norm() < EPSILON);
        }
    }

    #[test]
    fn test_area_smoothing_target() {
        // Every face around the centre has its centroid at a third of the lift.
        let mut mesh = create_grid_mesh(0.9);
        let options = SmoothOptions::default().with_iterations(1).with_damping(1.0);
        smooth_area(&mut mesh, &options);
        let p = mesh.position(centre());
        assert!((p.x - 1.0).abs() < EPSILON);
        assert!((p.y - 1.0).abs() < EPSILON);
        assert!((p.z - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_boundary_and_fixed_vertices_stay() {
        let mut mesh = create_grid_mesh(1.0);
        let before = mesh.clone();
        smooth_centroid(&mut mesh, &SmoothOptions::default());
        for v in mesh.vertices_on_boundary() {
            assert_eq!(mesh.position(v), before.position(v));
        }

        let mut mesh = create_grid_mesh(1.0);
        let options = SmoothOptions::default().with_fixed([centre()]);
        let report = smooth_centroid(&mut mesh, &options);
        assert_eq!(mesh, before);
        assert!(report.converged);
    }

    #[test]
    fn test_open_boundary_moves_when_allowed() {
        let mut mesh = create_grid_mesh(0.0);
        let options = SmoothOptions::default().allow_boundary_movement().with_iterations(1);
        smooth_centroid(&mut mesh, &options);
        assert_ne!(mesh.position(VertexKey::new(0)), Point3::origin());
    }

    #[test]
    fn test_converges_within_budget() {
        let mut mesh = create_grid_mesh(1.0);
        let options = SmoothOptions::default().with_iterations(200).with_tolerance(1e-9);
        let report = smooth_centroid(&mut mesh, &options);
        assert!(report.converged);
        assert!(report.iterations < 200);
        assert!(report.max_displacement <= 1e-9);
        assert!(mesh.position(centre()).z.abs() < 1e-8);
    }

    #[test]
    fn test_zero_iterations_no_change() {
        let mut mesh = create_grid_mesh(1.0);
        let before = mesh.clone();
        let report = smooth_area(&mut mesh, &SmoothOptions::default().with_iterations(0));
        assert_eq!(report, SmoothReport::default());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut a = create_grid_mesh(0.7);
        let mut b = a.clone();
        let options = SmoothOptions::default().allow_boundary_movement().with_iterations(5);
        smooth_center_of_mass(&mut a, &options);
        smooth_center_of_mass(&mut b, &options.clone().sequential());
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_is_reported() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let progress = Progress::new(move |_, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let mut mesh = create_grid_mesh(1.0);
        smooth_with_progress(&mut mesh, SmoothMethod::Centroid, &SmoothOptions::default().with_iterations(3), &progress);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
