//! Property-based tests across the mesh operators and documents.
//!
//! Run with: cargo test --test properties

use proptest::prelude::*;
use topomesh::prelude::*;

// =============================================================================
// Fixtures and strategies
// =============================================================================

fn create_quad_cube() -> Mesh {
    let points = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let faces = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [1, 2, 6, 5],
        [0, 4, 7, 3],
    ];
    Mesh::from_vertices_and_faces(&points, &faces).unwrap()
}

/// One mutation, addressed by indices into the current entity lists.
#[derive(Debug, Clone)]
enum Op {
    SplitEdge(usize, f64),
    InsertVertex(usize),
    SplitFace(usize),
    SwapEdge(usize),
    CollapseEdge(usize),
    DeleteFace(usize),
    SetWeight(usize, f64),
    UpdateWeightDefault(f64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), 0.1..0.9f64).prop_map(|(i, t)| Op::SplitEdge(i, t)),
        any::<usize>().prop_map(Op::InsertVertex),
        any::<usize>().prop_map(Op::SplitFace),
        any::<usize>().prop_map(Op::SwapEdge),
        any::<usize>().prop_map(Op::CollapseEdge),
    ]
}

/// Operators that keep a closed mesh closed, plus face deletion and
/// attribute edits.
fn arb_open_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_op(),
        1 => any::<usize>().prop_map(Op::DeleteFace),
        1 => (any::<usize>(), -10.0..10.0f64).prop_map(|(i, w)| Op::SetWeight(i, w)),
        1 => (-10.0..10.0f64).prop_map(Op::UpdateWeightDefault),
    ]
}

fn apply(mesh: &mut Mesh, op: &Op) -> Result<()> {
    let vertices: Vec<VertexKey> = mesh.vertices().collect();
    let edges: Vec<EdgeKey> = mesh.edges().collect();
    let faces: Vec<FaceKey> = mesh.faces().collect();
    let nothing = || MeshError::invalid_param("op", format!("{:?}", op), "no entity to act on");
    let edge = |i: usize| edges.get(i % edges.len().max(1)).copied().ok_or_else(nothing);
    let face = |i: usize| faces.get(i % faces.len().max(1)).copied().ok_or_else(nothing);
    match *op {
        Op::SplitEdge(i, t) => {
            let (u, v) = edge(i)?;
            mesh.split_edge(u, v, t).map(|_| ())
        }
        Op::InsertVertex(i) => mesh.insert_vertex(face(i)?, None, AttrMap::new()).map(|_| ()),
        Op::SplitFace(i) => {
            let f = face(i)?;
            let cycle = mesh.face_vertices(f).to_vec();
            mesh.split_face(f, cycle[0], cycle[2]).map(|_| ())
        }
        Op::SwapEdge(i) => {
            let (u, v) = edge(i)?;
            mesh.swap_edge(u, v)
        }
        Op::CollapseEdge(i) => {
            let (u, v) = edge(i)?;
            mesh.collapse_edge(u, v, 0.5, false)
        }
        Op::DeleteFace(i) => mesh.delete_face(face(i)?),
        Op::SetWeight(i, w) => {
            let v = vertices.get(i % vertices.len().max(1)).copied().ok_or_else(nothing)?;
            mesh.set_vertex_attribute(v, "weight", Attr::Float(w))
        }
        Op::UpdateWeightDefault(w) => {
            mesh.update_default_vertex_attributes(attrs([("weight", Attr::Float(w))]))
        }
    }
}

fn arb_attr() -> impl Strategy<Value = Attr> {
    prop_oneof![
        Just(Attr::Null),
        any::<bool>().prop_map(Attr::Bool),
        (-1000i64..1000).prop_map(Attr::Int),
        (-1.0e3..1.0e3f64).prop_map(Attr::Float),
        "[a-z]{0,8}".prop_map(Attr::Text),
    ]
}

// =============================================================================
// Operator sequences
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Committed operators keep a closed genus-0 mesh valid with Euler
    /// characteristic 2; rejected operators leave it untouched.
    #[test]
    fn euler_is_invariant_under_operators(ops in prop::collection::vec(arb_op(), 1..25)) {
        let mut mesh = create_quad_cube();
        for op in &ops {
            let before = mesh.to_data();
            match apply(&mut mesh, op) {
                Ok(()) => {
                    prop_assert!(mesh.is_valid(), "invalid after {:?}", op);
                    prop_assert_eq!(mesh.euler(), 2, "euler broken by {:?}", op);
                    prop_assert!(mesh.is_closed());
                }
                Err(_) => prop_assert_eq!(mesh.to_data(), before, "{:?} failed but changed the mesh", op),
            }
        }
    }

    /// Keys handed out automatically are never reused.
    #[test]
    fn deleted_keys_are_not_reused(n in 1usize..20, delete in prop::collection::vec(any::<usize>(), 0..10)) {
        let mut mesh = Mesh::new();
        let keys: Vec<VertexKey> = (0..n)
            .map(|i| mesh.add_vertex_at(nalgebra::Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        for i in delete {
            let _ = mesh.delete_vertex(keys[i % keys.len()]);
        }
        let fresh = mesh.add_vertex_at(nalgebra::Point3::origin());
        prop_assert!(keys.iter().all(|&k| k < fresh));
    }
}

// =============================================================================
// Documents
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every intermediate state of an editing session survives the document,
    /// including face-less edges and sparse records created under an older
    /// template.
    #[test]
    fn document_round_trip_after_every_step(ops in prop::collection::vec(arb_open_op(), 1..25)) {
        let config = MeshConfig::default().sparse();
        let mut mesh = Mesh::from_data_with_config(&create_quad_cube().to_data(), config).unwrap();
        for op in &ops {
            let _ = apply(&mut mesh, op);
            let data = mesh.to_data();
            let back = match Mesh::from_data_with_config(&data, config) {
                Ok(back) => back,
                Err(err) => return Err(TestCaseError::fail(format!("import failed after {:?}: {}", op, err))),
            };
            prop_assert_eq!(back.to_data(), data, "document changed after {:?}", op);
            prop_assert_eq!(back.num_edges(), mesh.num_edges());
            for v in mesh.vertices() {
                prop_assert_eq!(back.vertex_attribute(v, "weight"), mesh.vertex_attribute(v, "weight"));
            }
        }
    }

    /// Export, import and export again gives the same document.
    #[test]
    fn mesh_document_round_trip(
        values in prop::collection::vec(arb_attr(), 1..12),
        ops in prop::collection::vec(arb_op(), 0..8),
    ) {
        let mut mesh = create_quad_cube();
        for op in &ops {
            let _ = apply(&mut mesh, op);
        }
        let vertices: Vec<VertexKey> = mesh.vertices().collect();
        let faces: Vec<FaceKey> = mesh.faces().collect();
        let edges: Vec<EdgeKey> = mesh.edges().collect();
        for (i, value) in values.into_iter().enumerate() {
            let name = format!("a{}", i % 3);
            let v = vertices[i % vertices.len()];
            mesh.set_vertex_attribute(v, &name, value.clone()).unwrap();
            mesh.set_face_attribute(faces[i % faces.len()], &name, value.clone()).unwrap();
            let (u, w) = edges[i % edges.len()];
            mesh.set_edge_attribute(u, w, &name, value).unwrap();
        }

        let json = mesh.to_json().unwrap();
        let back = Mesh::from_json(&json).unwrap();
        prop_assert_eq!(back.to_data(), mesh.to_data());
        prop_assert_eq!(back.to_json().unwrap(), json);
    }

    /// Networks built from random segments survive a document round trip.
    #[test]
    fn network_document_round_trip(
        lines in prop::collection::vec(
            (prop::array::uniform3(0..4i32), prop::array::uniform3(0..4i32)),
            1..30,
        ),
    ) {
        let lines: Vec<[[f64; 3]; 2]> = lines
            .into_iter()
            .map(|(a, b)| [a.map(f64::from), b.map(f64::from)])
            .collect();
        let network = Network::from_lines(&lines, 6).unwrap();
        let json = network.to_json().unwrap();
        let back = Network::from_json(&json).unwrap();
        prop_assert_eq!(back.to_data(), network.to_data());
        prop_assert_eq!(back.num_edges(), network.num_edges());
    }
}
