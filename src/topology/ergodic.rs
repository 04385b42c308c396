use super::{Prior, Topology, TopologyError, check_ess, check_fraction, indexed_name};
use crate::{
    emission::EmissionKind,
    graph::{Context, ContextGraph, GraphError},
    trace_stage,
};

/// Parameters of a fully connected HMM whose states all emit.
#[derive(Clone, Debug, PartialEq)]
pub struct ErgodicConfig {
    /// The emission kind of each state, which also fixes the number of states
    pub emissions:       Vec<EmissionKind>,
    /// The Markov order
    pub order:           usize,
    pub ess:             f64,
    /// The prior fraction of every self-transition
    pub self_fraction:   f64,
    /// The expected length of the modeled sequences, which must exceed the
    /// order
    pub expected_length: f64,
}

impl Default for ErgodicConfig {
    fn default() -> Self {
        ErgodicConfig {
            emissions:       vec![EmissionKind::Discrete; 2],
            order:           1,
            ess:             4.0,
            self_fraction:   0.5,
            expected_length: 100.0,
        }
    }
}

impl ErgodicConfig {
    /// Builds the ergodic topology.
    ///
    /// The start node and the levels of contexts shorter than the order are
    /// visited once per sequence and share a small amount of prior mass. Each
    /// context of the full order carries `ess * (expected_length - order)`,
    /// as it is visited for the remainder of the sequence. Within a node the
    /// self-transition receives `self_fraction` of the mass and the other
    /// states split the rest evenly.
    ///
    /// ## Errors
    ///
    /// There must be at least one state and none may be silent. The ESS must
    /// be positive, `self_fraction` must lie in [0, 1], and the expected
    /// length must exceed the order.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(&self) -> Result<Topology, TopologyError> {
        trace_stage!("ergodic");

        let n = self.emissions.len();
        if n == 0 {
            return Err(TopologyError::NoStates);
        }
        if let Some(state) = self.emissions.iter().position(|e| e.is_silent()) {
            return Err(TopologyError::SilentErgodicState { state });
        }
        let ess = check_ess(self.ess)?;
        let self_fraction = check_fraction("self_fraction", self.self_fraction)?;
        let order = self.order;
        if self.expected_length.is_nan() || self.expected_length <= order as f64 {
            return Err(TopologyError::ExpectedLengthTooShort);
        }

        let states: Vec<usize> = (0..n).collect();
        let mut graph = ContextGraph::new(order);
        if order == 0 {
            graph.add_node(Context::empty(), states, &vec![ess * self.expected_length / n as f64; n])?;
        } else {
            graph.add_node(Context::empty(), states, &vec![ess / n as f64; n])?;
            let mut mass = ess / n as f64;
            for level in 1..order {
                add_level(&mut graph, n, level, mass, self_fraction)?;
                mass /= n as f64;
            }
            add_level(&mut graph, n, order, ess * (self.expected_length - order as f64), self_fraction)?;
        }

        let mut state_ess = vec![0.0; n];
        for node in graph.nodes() {
            for (&s, &w) in node.states().iter().zip(node.prior()) {
                state_ess[s] += w;
            }
        }

        Ok(Topology {
            names: (0..n).map(|i| indexed_name("", i)).collect(),
            emissions: self.emissions.clone(),
            graph,
            prior: Prior::Fixed { state_ess },
            condition_init: None,
        })
    }
}

/// Adds one node for every context of length `len` over `n` states, in
/// lexicographic order with the last position varying fastest.
#[allow(clippy::cast_precision_loss)]
fn add_level(graph: &mut ContextGraph, n: usize, len: usize, mass: f64, self_fraction: f64) -> Result<(), GraphError> {
    let other = if n > 1 {
        mass * (1.0 - self_fraction) / (n - 1) as f64
    } else {
        0.0
    };
    let mut weights = vec![other; n];
    let mut context = vec![0; len];

    loop {
        let newest = context[len - 1];
        weights[newest] = mass * self_fraction;
        graph.add_node(context.as_slice(), (0..n).collect(), &weights)?;
        weights[newest] = other;

        let mut pos = len;
        loop {
            if pos == 0 {
                return Ok(());
            }
            pos -= 1;
            context[pos] += 1;
            if context[pos] < n {
                break;
            }
            context[pos] = 0;
        }
    }
}
