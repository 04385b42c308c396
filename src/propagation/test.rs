use crate::{assert_fp_eq, graph::*};

fn chain_with_loop(self_weight: f64, exit_weight: f64) -> ClosedGraph {
    let mut graph = ContextGraph::new(1);
    graph.add_node(Context::empty(), vec![0], &[1.0]).unwrap();
    graph.add_node([0], vec![0, 1], &[self_weight, exit_weight]).unwrap();
    graph.close().unwrap()
}

#[test]
fn geometric_loop() {
    let graph = chain_with_loop(1.0, 1.0);
    let result = graph.propagate_ess(6.0).unwrap();

    // start, [0], and the synthesized [1]
    assert_fp_eq!(result.cumulated().to_vec(), vec![6.0, 12.0, 6.0], 1e-10);
    assert_fp_eq!(result.node_hyper(NodeId(0)).to_vec(), vec![6.0], 1e-10);
    assert_fp_eq!(result.node_hyper(NodeId(1)).to_vec(), vec![6.0, 6.0], 1e-10);
    assert!(result.node_hyper(NodeId(2)).is_empty());
    assert_fp_eq!(result.state_ess().to_vec(), vec![12.0, 6.0], 1e-10);
}

#[test]
fn mass_is_conserved() {
    for (s, e) in [(1.0, 1.0), (9.0, 1.0), (99.0, 1.0), (0.0, 1.0)] {
        let graph = chain_with_loop(s, e);
        let result = graph.propagate_ess(3.5).unwrap();
        assert_fp_eq!(@absolute, result.absorbed(&graph), 3.5, 1e-9);
    }
}

#[test]
fn branching_graph_conserves_mass() {
    let mut graph = ContextGraph::new(2);
    graph.add_node(Context::empty(), vec![0, 1, 2], &[1.0, 2.0, 3.0]).unwrap();
    graph.add_node([0], vec![0, 1], &[1.0, 1.0]).unwrap();
    graph.add_node([1], vec![0, 2], &[2.0, 1.0]).unwrap();
    graph.add_node([0, 0], vec![0, 1, 2], &[1.0, 1.0, 1.0]).unwrap();
    graph.add_node([1, 0], vec![1, 2], &[1.0, 4.0]).unwrap();
    graph.add_node([0, 1], vec![0, 2], &[1.0, 1.0]).unwrap();
    let graph = graph.close().unwrap();

    let result = graph.propagate_ess(100.0).unwrap();
    assert_fp_eq!(@absolute, result.absorbed(&graph), 100.0, 1e-9);

    for (node, hyper) in graph.nodes().iter().zip(result.hyper()) {
        assert_eq!(node.states().len(), hyper.len());
    }

    // Every node except the start contributes to exactly one state
    let total: f64 = result.state_ess().iter().sum();
    assert_fp_eq!(total, result.cumulated()[1..].iter().sum::<f64>(), 1e-12);
}

#[test]
fn start_without_children_absorbs_everything() {
    let mut graph = ContextGraph::new(1);
    graph.add_node(Context::empty(), Vec::new(), &[]).unwrap();
    let graph = graph.close().unwrap();
    let result = graph.propagate_ess(2.0).unwrap();
    assert_eq!(result.rounds(), 1);
    assert_eq!(result.cumulated(), &[2.0]);
    assert!(result.state_ess().is_empty());
}

#[test]
fn deterministic() {
    let graph = chain_with_loop(3.0, 1.0);
    let a = graph.propagate_ess(10.0).unwrap();
    let b = graph.propagate_ess(10.0).unwrap();
    assert_eq!(a, b);
    assert_fp_eq!(a, b);
}

#[test]
fn invalid_ess() {
    let graph = chain_with_loop(1.0, 1.0);
    for ess in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert_eq!(graph.propagate_ess(ess), Err(GraphError::InvalidEss));
    }
}

#[test]
fn scales_linearly() {
    let graph = chain_with_loop(2.0, 1.0);
    let one = graph.propagate_ess(1.0).unwrap();
    let ten = graph.propagate_ess(10.0).unwrap();
    for (a, b) in one.cumulated().iter().zip(ten.cumulated()) {
        assert_fp_eq!(a * 10.0, *b, 1e-9);
    }
}

#[test]
fn saturated_self_loop_reports_stall() {
    // The self-loop normalizes to exactly 1, so no mass ever leaves [0]
    let graph = chain_with_loop(1e17, 1.0);
    assert_eq!(graph.node(NodeId(1)).prob()[0].to_bits(), 1.0f64.to_bits());
    assert!(graph.node(NodeId(1)).prob()[1] > 0.0);

    match graph.propagate_ess(1.0) {
        Err(GraphError::NotConverging { rounds, residual }) => {
            assert_eq!(rounds, graph.len());
            assert_fp_eq!(residual, 1.0);
        }
        other => panic!("expected a stall, got {other:?}"),
    }
}

#[test]
fn slow_loops_still_converge() {
    let graph = chain_with_loop(999.0, 1.0);
    let result = graph.propagate_ess(2.0).unwrap();
    assert!(result.rounds() > graph.len());
    assert_fp_eq!(@absolute, result.absorbed(&graph), 2.0, 1e-9);
}
