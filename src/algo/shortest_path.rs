//! Shortest paths over the vertex graph.
//!
//! Dijkstra's algorithm over any [`VertexGraph`], with Euclidean edge
//! lengths by default or a caller-supplied weight. Unreachable targets give
//! `None`, never an error.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::key::VertexKey;

use super::traverse::VertexGraph;

/// Entry in Dijkstra's priority queue.
#[derive(Debug, Clone)]
struct DijkstraEntry {
    vertex: VertexKey,
    distance: f64,
}

impl PartialEq for DijkstraEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DijkstraEntry {}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ties go to the smaller key.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Distances and predecessors from one or more sources.
#[derive(Debug, Clone, Default)]
pub struct PathResult {
    distances: BTreeMap<VertexKey, f64>,
    predecessors: BTreeMap<VertexKey, VertexKey>,
}

impl PathResult {
    /// Distance to a vertex, if reached.
    pub fn distance(&self, v: VertexKey) -> Option<f64> {
        self.distances.get(&v).copied()
    }

    /// All reached vertices with their distances.
    pub fn distances(&self) -> &BTreeMap<VertexKey, f64> {
        &self.distances
    }

    /// Whether a vertex was reached.
    pub fn is_reachable(&self, v: VertexKey) -> bool {
        self.distances.contains_key(&v)
    }

    /// Path from the nearest source to `target`, both included.
    pub fn path_to(&self, target: VertexKey) -> Option<Vec<VertexKey>> {
        if !self.is_reachable(target) {
            return None;
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(&pred) = self.predecessors.get(&current) {
            path.push(pred);
            current = pred;
            if path.len() > self.distances.len() {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }

    /// The reached vertex farthest from the sources.
    pub fn farthest_vertex(&self) -> Option<(VertexKey, f64)> {
        self.distances
            .iter()
            .map(|(&v, &d)| (v, d))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    }
}

/// Dijkstra from several sources with an explicit edge weight.
///
/// Stops early once `target` is settled. Weights must be non-negative;
/// edges with a negative or NaN weight are skipped.
pub fn dijkstra<G, W>(graph: &G, sources: &[VertexKey], target: Option<VertexKey>, weight: W) -> PathResult
where
    G: VertexGraph + ?Sized,
    W: Fn(VertexKey, VertexKey) -> f64,
{
    let mut result = PathResult::default();
    let mut heap = BinaryHeap::new();

    for &source in sources {
        if graph.graph_contains(source) {
            result.distances.insert(source, 0.0);
            heap.push(DijkstraEntry {
                vertex: source,
                distance: 0.0,
            });
        }
    }

    while let Some(DijkstraEntry { vertex: u, distance }) = heap.pop() {
        if result.distances.get(&u).is_some_and(|&d| distance > d) {
            continue;
        }
        if target == Some(u) {
            break;
        }
        for v in graph.graph_neighbours(u) {
            let w = weight(u, v);
            if !(w >= 0.0) {
                continue;
            }
            let candidate = distance + w;
            if result.distances.get(&v).map_or(true, |&d| candidate < d) {
                result.distances.insert(v, candidate);
                result.predecessors.insert(v, u);
                heap.push(DijkstraEntry {
                    vertex: v,
                    distance: candidate,
                });
            }
        }
    }
    result
}

/// Shortest path between two vertices with Euclidean edge lengths.
pub fn shortest_path<G: VertexGraph + ?Sized>(graph: &G, start: VertexKey, end: VertexKey) -> Option<Vec<VertexKey>> {
    shortest_path_with(graph, start, end, |u, v| {
        (graph.graph_position(v) - graph.graph_position(u)).norm()
    })
}

/// Shortest path between two vertices with a caller-supplied edge weight.
pub fn shortest_path_with<G, W>(graph: &G, start: VertexKey, end: VertexKey, weight: W) -> Option<Vec<VertexKey>>
where
    G: VertexGraph + ?Sized,
    W: Fn(VertexKey, VertexKey) -> f64,
{
    if !graph.graph_contains(end) {
        return None;
    }
    dijkstra(graph, &[start], Some(end), weight).path_to(end)
}

/// Euclidean distances from a source to every reachable vertex.
pub fn distances<G: VertexGraph + ?Sized>(graph: &G, source: VertexKey) -> BTreeMap<VertexKey, f64> {
    dijkstra(graph, &[source], None, |u, v| {
        (graph.graph_position(v) - graph.graph_position(u)).norm()
    })
    .distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    fn create_grid_mesh(n: usize) -> Mesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push([i as f64, j as f64, 0.0]);
            }
        }
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + n + 1;
                let v11 = v01 + 1;
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        Mesh::from_vertices_and_faces(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_shortest_path_follows_diagonal() {
        let mesh = create_grid_mesh(2);
        let path = shortest_path(&mesh, VertexKey::new(0), VertexKey::new(8)).unwrap();
        assert_eq!(path, vec![VertexKey::new(0), VertexKey::new(4), VertexKey::new(8)]);

        let d = distances(&mesh, VertexKey::new(0));
        assert_eq!(d.len(), 9);
        assert!((d[&VertexKey::new(8)] - 2.0 * 2f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_custom_weight_changes_route() {
        let mesh = create_grid_mesh(2);
        // Make every diagonal expensive.
        let path = shortest_path_with(&mesh, VertexKey::new(0), VertexKey::new(8), |u, v| {
            let d = mesh.position(v) - mesh.position(u);
            if d.x != 0.0 && d.y != 0.0 {
                10.0
            } else {
                1.0
            }
        })
        .unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_no_path_is_none() {
        let mut mesh = create_grid_mesh(1);
        let lonely = mesh.add_vertex_at(nalgebra::Point3::new(9.0, 9.0, 0.0));
        assert!(shortest_path(&mesh, VertexKey::new(0), lonely).is_none());
        assert!(shortest_path(&mesh, VertexKey::new(0), VertexKey::new(99)).is_none());
        assert_eq!(
            shortest_path(&mesh, VertexKey::new(0), VertexKey::new(0)),
            Some(vec![VertexKey::new(0)])
        );
    }

    #[test]
    fn test_path_result_farthest() {
        let mesh = create_grid_mesh(2);
        let result = dijkstra(&mesh, &[VertexKey::new(0)], None, |_, _| 1.0);
        let (v, d) = result.farthest_vertex().unwrap();
        assert_eq!(d, 2.0);
        assert!(result.is_reachable(v));
    }
}
