use super::*;
use crate::{
    assert_fp_eq,
    emission::PhyloTree,
    graph::{GraphError, NodeId},
};

/// Reports the ESS each emission would be trained with.
struct EssFactory;

impl EmissionFactory for EssFactory {
    type Emission = f64;
    type Error = &'static str;

    fn silent(&self) -> Result<f64, &'static str> {
        Ok(0.0)
    }

    fn uniform(&self) -> Result<f64, &'static str> {
        Ok(0.0)
    }

    fn discrete(&self, ess: f64) -> Result<f64, &'static str> {
        Ok(ess)
    }

    fn phylo_discrete(&self, ess: f64, _tree: PhyloTree) -> Result<f64, &'static str> {
        Ok(ess)
    }

    fn reference_discrete(
        &self, ess: f64, _reference: usize, condition_init: Option<&[Vec<f64>]>,
    ) -> Result<f64, &'static str> {
        condition_init.map(|_| ess).ok_or("missing condition initialization")
    }
}

#[test]
fn ergodic_first_order() {
    let topology = ErgodicConfig {
        emissions: vec![EmissionKind::Discrete; 3],
        ..ErgodicConfig::default()
    }
    .build()
    .unwrap();
    assert_eq!(topology.names(), ["0", "1", "2"]);

    let graph = topology.graph();
    assert_eq!(graph.len(), 4);
    assert_fp_eq!(graph.nodes()[0].prior().to_vec(), vec![4.0 / 3.0; 3]);
    // 4 * (100 - 1) split into half for the self-transition
    assert_fp_eq!(graph.nodes()[1].prior().to_vec(), vec![198.0, 99.0, 99.0]);
    assert_fp_eq!(graph.nodes()[3].prior().to_vec(), vec![99.0, 99.0, 198.0]);

    let Prior::Fixed { state_ess } = topology.prior() else {
        panic!("ergodic topologies fix their state ESS");
    };
    assert_fp_eq!(state_ess[0], 396.0 + 4.0 / 3.0);
}

#[test]
fn ergodic_second_order_levels() {
    let topology = ErgodicConfig {
        order: 2,
        ..ErgodicConfig::default()
    }
    .build()
    .unwrap();
    let graph = topology.graph();
    assert_eq!(graph.len(), 7);

    let contexts: Vec<_> = graph.nodes().iter().map(|n| n.context().clone()).collect();
    assert_eq!(
        contexts,
        [
            Context::empty(),
            Context::from([0]),
            Context::from([1]),
            Context::from([0, 0]),
            Context::from([0, 1]),
            Context::from([1, 0]),
            Context::from([1, 1]),
        ]
    );
    assert_fp_eq!(graph.nodes()[1].prior().to_vec(), vec![1.0, 1.0]);
    assert_fp_eq!(graph.nodes()[4].prior().to_vec(), vec![196.0, 196.0]);
}

#[test]
fn ergodic_order_zero_closes() {
    let topology = ErgodicConfig {
        order: 0,
        ess: 10.0,
        ..ErgodicConfig::default()
    }
    .build()
    .unwrap();
    assert_eq!(topology.graph().len(), 1);
    assert_fp_eq!(topology.graph().nodes()[0].prob().to_vec(), vec![0.5, 0.5]);

    let graph = topology.graph().clone().close().unwrap();
    assert_eq!(graph.absorbing(), &[NodeId(1), NodeId(2)]);
    let result = graph.propagate_ess(10.0).unwrap();
    assert_fp_eq!(result.cumulated()[1], 5.0);
    assert_fp_eq!(result.cumulated()[2], 5.0);
    assert_fp_eq!(result.absorbed(&graph), 10.0);
}

#[test]
fn ergodic_blueprint_uses_fixed_prior() {
    let blueprint = ErgodicConfig::default().build().unwrap().assemble().unwrap();
    assert_eq!(blueprint.transitions.len(), 3);
    assert_fp_eq!(blueprint.transitions[1].hyper, vec![198.0, 198.0]);
    assert_fp_eq!(blueprint.transitions[1].ess(), 396.0);
    assert_eq!(blueprint.instantiate(&EssFactory), Ok(vec![398.0, 398.0]));
}

#[test]
fn ergodic_rejects() {
    let config = ErgodicConfig::default();
    assert_eq!(
        ErgodicConfig {
            emissions: Vec::new(),
            ..config.clone()
        }
        .build()
        .unwrap_err(),
        TopologyError::NoStates
    );
    assert_eq!(
        ErgodicConfig {
            emissions: vec![EmissionKind::Discrete, EmissionKind::Silent],
            ..config.clone()
        }
        .build()
        .unwrap_err(),
        TopologyError::SilentErgodicState { state: 1 }
    );
    assert_eq!(
        ErgodicConfig {
            ess: f64::NAN,
            ..config.clone()
        }
        .build()
        .unwrap_err(),
        TopologyError::InvalidEss
    );
    assert_eq!(
        ErgodicConfig {
            self_fraction: 1.5,
            ..config.clone()
        }
        .build()
        .unwrap_err(),
        TopologyError::FractionOutOfRange {
            name:  "self_fraction",
            value: 1.5,
        }
    );
    assert_eq!(
        ErgodicConfig {
            order: 2,
            expected_length: 2.0,
            ..config
        }
        .build()
        .unwrap_err(),
        TopologyError::ExpectedLengthTooShort
    );
}

fn pseudo_ergodic() -> PseudoErgodicConfig {
    PseudoErgodicConfig {
        num_states: 3,
        ess: 12.0,
        self_fraction: 0.5,
        final_fraction: 0.2,
        insert_uniform: false,
    }
}

#[test]
fn pseudo_ergodic_graph() {
    let topology = pseudo_ergodic().build().unwrap();
    assert_eq!(topology.names(), ["0", "1", "2", "F"]);
    assert_eq!(
        topology.emissions(),
        [
            EmissionKind::Discrete,
            EmissionKind::Discrete,
            EmissionKind::Discrete,
            EmissionKind::Silent
        ]
    );

    let node = &topology.graph().nodes()[2];
    assert_eq!(node.context(), &Context::from([1]));
    assert_eq!(node.states(), &[0, 1, 2, 3]);
    assert_fp_eq!(node.prior().to_vec(), vec![1.8, 6.0, 1.8, 2.4]);
    assert_fp_eq!(node.prob().to_vec(), vec![0.15, 0.5, 0.15, 0.2]);
}

#[test]
fn pseudo_ergodic_propagation() {
    let topology = pseudo_ergodic().build().unwrap();
    let graph = topology.graph().clone().close().unwrap();
    let result = graph.propagate_ess(12.0).unwrap();

    // Every emitting state is visited 1 / 0.2 times per unit of mass entering
    for i in 1..=3 {
        assert_fp_eq!(result.cumulated()[i], 20.0, 1e-9);
        assert_fp_eq!(result.node_hyper(NodeId(i))[i - 1], 10.0, 1e-9);
    }

    let f = result.state_ess()[3];
    assert!(f > 0.0 && f <= 12.0 + 1e-9);
    assert_fp_eq!(f, 12.0, 1e-9);
}

#[test]
fn pseudo_ergodic_blueprint() {
    let blueprint = pseudo_ergodic().build().unwrap().assemble().unwrap();
    assert_eq!(blueprint.transitions.len(), 4);
    assert_fp_eq!(blueprint.transitions[0].hyper, vec![4.0, 4.0, 4.0], 1e-9);

    let transition = blueprint.transition(&Context::from([0])).unwrap();
    assert_eq!(transition.children, [0, 1, 2, 3]);
    assert_fp_eq!(transition.hyper, vec![10.0, 3.0, 3.0, 4.0], 1e-9);
    assert!(blueprint.transition(&Context::from([3])).is_none());

    let ess = blueprint.instantiate(&EssFactory).unwrap();
    assert_fp_eq!(ess, vec![20.0, 20.0, 20.0, 0.0], 1e-9);
    assert_fp_eq!(blueprint.emissions[3].ess, 12.0, 1e-9);
}

#[test]
fn pseudo_ergodic_rejects() {
    assert_eq!(
        PseudoErgodicConfig {
            num_states: 0,
            ..pseudo_ergodic()
        }
        .build()
        .unwrap_err(),
        TopologyError::NoStates
    );
    assert_eq!(
        PseudoErgodicConfig {
            self_fraction: 0.6,
            final_fraction: 0.5,
            ..pseudo_ergodic()
        }
        .build()
        .unwrap_err(),
        TopologyError::FractionsExceedOne
    );
}

#[test]
fn pseudo_ergodic_saturated_self_loop_fails_assembly() {
    let topology = PseudoErgodicConfig {
        num_states: 1,
        self_fraction: 1.0 - f64::EPSILON / 2.0,
        final_fraction: 1e-17,
        ..pseudo_ergodic()
    }
    .build()
    .unwrap();
    assert!(matches!(
        topology.assemble(),
        Err(TopologyError::Graph(GraphError::NotConverging { .. }))
    ));
}

fn small_sunflower() -> SunflowerConfig {
    SunflowerConfig {
        ess:             2.0,
        expected_length: 3,
        start_central:   true,
        motif_lengths:   vec![2],
        motif_probs:     Some(vec![0.5]),
        phylo:           false,
    }
}

#[test]
fn sunflower_visits() {
    let topology = small_sunflower().build().unwrap();
    assert_eq!(topology.names(), ["bg", "motif 0 position 0", "motif 0 position 1"]);

    let graph = topology.graph();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.nodes()[0].states(), &[0]);
    assert_eq!(graph.nodes()[1].states(), &[0, 1]);
    assert_fp_eq!(graph.nodes()[1].prior().to_vec(), vec![1.75, 1.75]);
    assert_eq!(graph.nodes()[2].states(), &[2]);
    assert_fp_eq!(graph.nodes()[2].prior().to_vec(), vec![1.5]);
    // The tail closes back into the centre
    assert_eq!(graph.nodes()[3].states(), &[0]);
    assert_fp_eq!(graph.nodes()[3].prior().to_vec(), vec![1.0]);

    let Prior::Fixed { state_ess } = topology.prior() else {
        panic!("sunflower topologies fix their state ESS");
    };
    assert_fp_eq!(*state_ess, vec![3.5, 1.5, 1.0]);
}

#[test]
fn sunflower_conserves_mass() {
    for start_central in [true, false] {
        let config = SunflowerConfig {
            ess: 5.0,
            expected_length: 40,
            start_central,
            motif_lengths: vec![3, 1, 4],
            motif_probs: Some(vec![0.1, 0.3, 0.05]),
            phylo: true,
        };
        let topology = config.build().unwrap();
        assert_eq!(topology.num_states(), 9);

        let Prior::Fixed { state_ess } = topology.prior() else {
            panic!("sunflower topologies fix their state ESS");
        };
        assert_fp_eq!(state_ess.iter().sum::<f64>(), 5.0 * 40.0, 1e-10);

        let start = &topology.graph().nodes()[0];
        assert_fp_eq!(start.prior().iter().sum::<f64>(), 5.0);
        assert_eq!(start.states().len(), if start_central { 1 } else { 9 });

        assert_eq!(
            topology.emissions()[0],
            EmissionKind::PhyloDiscrete {
                tree: PhyloTree::Background,
            }
        );
        assert_eq!(topology.emissions()[8], EmissionKind::PhyloDiscrete { tree: PhyloTree::Motif });
    }
}

#[test]
fn sunflower_default_probabilities() {
    let topology = SunflowerConfig {
        motif_lengths: vec![2, 2],
        ..SunflowerConfig::default()
    }
    .build()
    .unwrap();
    let centre = &topology.graph().nodes()[1];
    assert_eq!(centre.states(), &[0, 1, 3]);
    assert_fp_eq!(centre.prob().to_vec(), vec![0.9, 0.05, 0.05], 1e-10);
}

#[test]
fn sunflower_blueprint_display() {
    let blueprint = small_sunflower().build().unwrap().assemble().unwrap();
    let text = blueprint.to_string();
    assert!(text.starts_with("bg\tdiscrete\t3.5\n"));
    assert!(text.contains(" -> bg\t2\n"));
    assert!(text.contains("bg -> motif 0 position 0\t1.75\n"));
    assert!(text.contains("motif 0 position 1 -> bg\t1\n"));
}

#[test]
fn sunflower_rejects() {
    assert_eq!(
        SunflowerConfig {
            motif_lengths: vec![3, 0],
            ..small_sunflower()
        }
        .build()
        .unwrap_err(),
        TopologyError::EmptyMotif { motif: 1 }
    );
    assert_eq!(
        SunflowerConfig {
            motif_probs: Some(vec![0.1, 0.1]),
            ..small_sunflower()
        }
        .build()
        .unwrap_err(),
        TopologyError::MotifProbabilityMismatch { expected: 1, found: 2 }
    );
    assert_eq!(
        SunflowerConfig {
            motif_lengths: vec![1, 1],
            motif_probs: Some(vec![0.7, 0.6]),
            ..small_sunflower()
        }
        .build()
        .unwrap_err(),
        TopologyError::FractionsExceedOne
    );
    assert_eq!(
        SunflowerConfig {
            expected_length: 0,
            ..small_sunflower()
        }
        .build()
        .unwrap_err(),
        TopologyError::ExpectedLengthTooShort
    );
}

#[test]
fn reference_matches_scale_condition_init() {
    let topology = ProfileConfig {
        num_layers: 3,
        ess: 12.0,
        match_emission: vec![MatchEmission::Reference],
        condition_init: Some(vec![vec![1.0, 3.0], vec![0.5, 0.5]]),
        ..ProfileConfig::default()
    }
    .build()
    .unwrap();
    let blueprint = topology.assemble().unwrap();

    let m1 = &blueprint.emissions[topology.state_index("M1").unwrap()];
    assert_eq!(m1.kind, EmissionKind::ReferenceDiscrete { reference: 0 });
    assert_fp_eq!(m1.ess, 6.0, 1e-10);
    let init = m1.condition_init.as_ref().unwrap();
    assert_fp_eq!(init[0], vec![6.0, 18.0], 1e-10);
    assert_fp_eq!(init[1], vec![3.0, 3.0], 1e-10);

    let ess = blueprint.instantiate(&EssFactory).unwrap();
    assert_fp_eq!(ess[topology.state_index("M2").unwrap()], blueprint.emissions[7].ess);
}

#[test]
fn reference_without_condition_init_fails_instantiation() {
    let blueprint = ProfileConfig {
        num_layers: 2,
        match_emission: vec![MatchEmission::Reference],
        ..ProfileConfig::default()
    }
    .build()
    .unwrap()
    .assemble()
    .unwrap();
    assert!(blueprint.emissions.iter().all(|e| e.condition_init.is_none()));
    assert_eq!(blueprint.instantiate(&EssFactory), Err("missing condition initialization"));
}

#[test]
fn profile_blueprint_rows_are_normalized() {
    let blueprint = ProfileConfig {
        num_layers: 3,
        ..ProfileConfig::default()
    }
    .build()
    .unwrap()
    .assemble()
    .unwrap();

    for t in &blueprint.transitions {
        assert_eq!(t.children.len(), t.hyper.len());
        assert_eq!(t.children.len(), t.display_weights.len());
        let newest = t.context.newest().map(|s| blueprint.names[s].as_str());
        if newest.is_some_and(|name| name.starts_with('D')) {
            let total = t.ess();
            let probs: Vec<f64> = t.hyper.iter().map(|h| h / total).collect();
            assert_fp_eq!(probs.iter().sum::<f64>(), 1.0);
        }
    }
}

#[test]
fn trapped_profile_fails_assembly() {
    let e = 1.0;
    let nan = f64::NAN;
    // Insert states may only repeat
    let template = TransitionTemplate::from_nan_matrix([
        [nan, nan, nan, e, nan, e],
        [nan, e, nan, nan, nan, nan],
        [nan, e, nan, e, nan, e],
    ]);
    let topology = ProfileConfig {
        num_layers: 3,
        template: Some(template),
        ..ProfileConfig::default()
    }
    .build()
    .unwrap();
    assert!(matches!(
        topology.assemble(),
        Err(TopologyError::Graph(GraphError::Trapped { .. }))
    ));
}

#[test]
fn transition_elements_compare_nearly() {
    let a = TransitionElement {
        context:         Context::from([1]),
        children:        vec![0, 2],
        hyper:           vec![1.0, 2.0],
        display_weights: vec![1.0, 1.0],
    };
    let mut b = a.clone();
    b.hyper[1] += 1e-12;
    assert_fp_eq!(a, b);

    b.children[1] = 3;
    assert!(!crate::is_fp_eq!(a, b));
}

#[test]
fn display_falls_back_to_state_indices() {
    let blueprint = HmmBlueprint {
        names:       vec!["a".to_owned()],
        emissions:   Vec::new(),
        transitions: vec![TransitionElement {
            context:         Context::from([0, 4]),
            children:        vec![0, 7],
            hyper:           vec![1.0, 2.5],
            display_weights: vec![1.0, 1.0],
        }],
    };
    assert_eq!(blueprint.to_string(), "a 4 -> a\t1\na 4 -> 7\t2.5\n");
}

#[test]
fn indexed_names() {
    assert_eq!(indexed_name("J", 12), "J12");
    assert_eq!(indexed_name("", 0), "0");
}
