//! Topomesh CLI - mesh topology command-line tool.
//!
//! Usage: topomesh <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Meshes are read and written as JSON mesh documents. Set `RUST_LOG` (for
//! example `RUST_LOG=topomesh=debug`) to see what the operators do.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Deserialize;

use topomesh::algo::delaunay::{delaunay_from_points, is_delaunay, DelaunayOptions};
use topomesh::algo::dual::{dual, DualBoundary, DualOptions};
use topomesh::algo::planarize::{max_flatness, planarize_faces_with_progress, PlanarizeOptions};
use topomesh::algo::smooth::{self, SmoothOptions};
use topomesh::algo::subdivide::{self, SubdivideOptions, SubdivideScheme};
use topomesh::algo::Progress;
use topomesh::mesh::Mesh;
use topomesh::nalgebra::Point3;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "topomesh")]
#[command(author, version, about = "Mesh topology CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh document
        input: PathBuf,
    },

    /// Subdivide a mesh
    Subdivide {
        /// Input mesh document
        input: PathBuf,

        /// Output mesh document
        output: PathBuf,

        /// Subdivision scheme
        #[arg(short, long, value_enum, default_value = "catmull-clark")]
        scheme: Scheme,

        /// Number of subdivision iterations
        #[arg(short, long, default_value = "1")]
        iterations: usize,

        /// Let boundary vertices follow the interior rules
        #[arg(long)]
        move_boundary: bool,
    },

    /// Relax vertex positions
    Smooth {
        /// Input mesh document
        input: PathBuf,

        /// Output mesh document
        output: PathBuf,

        /// Relaxation target
        #[arg(short, long, value_enum, default_value = "centroid")]
        method: SmoothMethod,

        /// Number of iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Fraction of the step towards the target (0.0 to 1.0)
        #[arg(short, long, default_value = "0.5")]
        damping: f64,

        /// Allow boundary vertices to move
        #[arg(long)]
        move_boundary: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Build the dual mesh
    Dual {
        /// Input mesh document
        input: PathBuf,

        /// Output mesh document
        output: PathBuf,

        /// Close boundary vertex faces through edge midpoints
        #[arg(long)]
        open_boundary: bool,
    },

    /// Triangulate planar points
    Delaunay {
        /// JSON file with a list of points, or an object with `points`,
        /// `boundary` and `holes`
        points: PathBuf,

        /// Output mesh document
        output: PathBuf,
    },

    /// Flatten the faces of a mesh
    Planarize {
        /// Input mesh document
        input: PathBuf,

        /// Output mesh document
        output: PathBuf,

        /// Maximum number of iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,

        /// Stop once every face is this flat
        #[arg(short, long, default_value = "1e-6")]
        tolerance: f64,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Scheme {
    /// Split every face into a triangle fan
    Tri,
    /// Split every face into quads
    Quad,
    /// Catmull-Clark subdivision
    CatmullClark,
    /// Loop subdivision (triangle meshes only)
    Loop,
    /// Doo-Sabin subdivision
    DooSabin,
}

impl From<Scheme> for SubdivideScheme {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Tri => SubdivideScheme::Tri,
            Scheme::Quad => SubdivideScheme::Quad,
            Scheme::CatmullClark => SubdivideScheme::CatmullClark,
            Scheme::Loop => SubdivideScheme::Loop,
            Scheme::DooSabin => SubdivideScheme::DooSabin,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SmoothMethod {
    /// Average of the neighbouring vertices
    Centroid,
    /// Center of mass of the neighbour polygon
    CenterOfMass,
    /// Area-weighted face centroids
    Area,
}

impl From<SmoothMethod> for smooth::SmoothMethod {
    fn from(method: SmoothMethod) -> Self {
        match method {
            SmoothMethod::Centroid => smooth::SmoothMethod::Centroid,
            SmoothMethod::CenterOfMass => smooth::SmoothMethod::CenterOfMass,
            SmoothMethod::Area => smooth::SmoothMethod::Area,
        }
    }
}

/// Point input for `delaunay`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointsInput {
    List(Vec<[f64; 3]>),
    Document {
        points: Vec<[f64; 3]>,
        #[serde(default)]
        boundary: Option<Vec<[f64; 3]>>,
        #[serde(default)]
        holes: Vec<Vec<[f64; 3]>>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    match cli.command {
        Commands::Info { input } => cmd_info(&input),
        Commands::Subdivide {
            input,
            output,
            scheme,
            iterations,
            move_boundary,
        } => cmd_subdivide(&input, &output, scheme.into(), iterations, !move_boundary),
        Commands::Smooth {
            input,
            output,
            method,
            iterations,
            damping,
            move_boundary,
            sequential,
        } => {
            let mut options = SmoothOptions::default()
                .with_iterations(iterations)
                .with_damping(damping)
                .with_parallel(!sequential);
            if move_boundary {
                options = options.allow_boundary_movement();
            }
            cmd_smooth(&input, &output, method.into(), &options)
        }
        Commands::Dual {
            input,
            output,
            open_boundary,
        } => cmd_dual(&input, &output, open_boundary),
        Commands::Delaunay { points, output } => cmd_delaunay(&points, &output),
        Commands::Planarize {
            input,
            output,
            iterations,
            tolerance,
            sequential,
        } => {
            let options = PlanarizeOptions::default()
                .with_iterations(iterations)
                .with_tolerance(tolerance)
                .with_parallel(!sequential);
            cmd_planarize(&input, &output, &options)
        }
    }
}

/// Create a progress reporter that draws a bar on stderr.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }
        let percent = ((current + 1) * 100 / total).min(100);
        // Only redraw when the bar grows.
        if max_percent.fetch_max(percent, Ordering::Relaxed) >= percent && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        eprint!(
            "\r[{}{}] {:3}% {}",
            "=".repeat(filled),
            " ".repeat(bar_width - filled),
            percent,
            message
        );
        let _ = std::io::stderr().flush();
        if current + 1 >= total {
            eprintln!();
        }
    })
}

fn load(input: &Path) -> Result<Mesh, Box<dyn std::error::Error>> {
    let mesh = Mesh::from_json_file(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    Ok(mesh)
}

fn save(mesh: &Mesh, output: &Path, start: Instant) -> CliResult {
    let elapsed = start.elapsed();
    println!("Result: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    mesh.to_json_file(output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);
    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let mesh = Mesh::from_json_file(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Euler characteristic: {}", mesh.euler());
    println!("Components: {}", mesh.connected_components().len());

    let areas: Vec<f64> = mesh.faces().map(|f| mesh.face_area(f)).collect();
    if !areas.is_empty() {
        let min_area = areas.iter().copied().fold(f64::INFINITY, f64::min);
        let max_area = areas.iter().copied().fold(0.0, f64::max);
        println!("Surface area: {:.6}", mesh.area());
        println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);
        println!("Max face flatness: {:.6}", max_flatness(&mesh));
    }

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    if mesh.is_trimesh() {
        let delaunay = if is_delaunay(&mesh) { ", Delaunay" } else { "" };
        println!("Mesh type: Triangle mesh{}", delaunay);
    } else if mesh.is_quadmesh() {
        println!("Mesh type: Quad mesh");
    } else {
        println!("Mesh type: Mixed polygon mesh");
    }

    let loops = mesh.boundary_loops();
    if loops.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary loops)", loops.len());
    }
    if !mesh.is_manifold() {
        println!("Warning: mesh is not manifold");
    }

    Ok(())
}

fn cmd_subdivide(
    input: &Path,
    output: &Path,
    scheme: SubdivideScheme,
    iterations: usize,
    preserve_boundary: bool,
) -> CliResult {
    let mesh = load(input)?;
    let options = SubdivideOptions::new(iterations)
        .with_scheme(scheme)
        .with_preserve_boundary(preserve_boundary);

    println!("Applying {} subdivision ({} iterations)...", scheme, iterations);
    let start = Instant::now();
    let result = subdivide::subdivide_with_progress(&mesh, &options, &create_progress())?;
    save(&result, output, start)
}

fn cmd_smooth(input: &Path, output: &Path, method: smooth::SmoothMethod, options: &SmoothOptions) -> CliResult {
    let mut mesh = load(input)?;
    let mode = if options.parallel { "parallel" } else { "sequential" };

    println!(
        "Applying {:?} smoothing ({} iterations, damping={}, {})...",
        method, options.iterations, options.damping, mode
    );
    let start = Instant::now();
    let report = smooth::smooth_with_progress(&mut mesh, method, options, &create_progress());
    info!("smooth report: {:?}", report);
    println!(
        "Ran {} iterations, last max displacement {:.6}",
        report.iterations, report.max_displacement
    );
    save(&mesh, output, start)
}

fn cmd_dual(input: &Path, output: &Path, open_boundary: bool) -> CliResult {
    let mesh = load(input)?;
    let boundary = if open_boundary { DualBoundary::Open } else { DualBoundary::Skip };
    let start = Instant::now();
    let result = dual(&mesh, &DualOptions::default().with_boundary(boundary))?;
    save(&result, output, start)
}

fn cmd_delaunay(points: &Path, output: &Path) -> CliResult {
    let text = fs::read_to_string(points)?;
    let (points, options) = match serde_json::from_str::<PointsInput>(&text)? {
        PointsInput::List(points) => (points, DelaunayOptions::default()),
        PointsInput::Document { points, boundary, holes } => {
            let to_points = |list: Vec<[f64; 3]>| list.into_iter().map(Point3::from).collect::<Vec<_>>();
            let mut options = DelaunayOptions::default();
            if let Some(boundary) = boundary {
                options = options.with_boundary(to_points(boundary));
            }
            for hole in holes {
                options = options.with_hole(to_points(hole));
            }
            (points, options)
        }
    };

    println!("Loaded: {} points", points.len());
    let start = Instant::now();
    let mesh = delaunay_from_points(&points, &options)?;
    save(&mesh, output, start)
}

fn cmd_planarize(input: &Path, output: &Path, options: &PlanarizeOptions) -> CliResult {
    let mut mesh = load(input)?;
    println!("Initial max flatness: {:.6}", max_flatness(&mesh));

    let start = Instant::now();
    let report = planarize_faces_with_progress(&mut mesh, options, &create_progress());
    println!(
        "Ran {} iterations, max flatness {:.6}{}",
        report.iterations,
        report.max_flatness,
        if report.converged { " (converged)" } else { "" }
    );
    save(&mesh, output, start)
}
