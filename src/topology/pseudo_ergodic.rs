use super::{Prior, Topology, TopologyError, check_ess, check_fraction, indexed_name};
use crate::{
    emission::EmissionKind,
    graph::{Context, ContextGraph},
    trace_stage,
};

/// Parameters of a clique of emitting states that drains into a silent,
/// absorbing final state. Unlike an ergodic HMM, this models the length of the
/// sequences.
#[derive(Clone, Debug, PartialEq)]
pub struct PseudoErgodicConfig {
    /// The number of emitting states
    pub num_states:     usize,
    pub ess:            f64,
    /// The prior fraction of every self-transition
    pub self_fraction:  f64,
    /// The prior fraction of every transition into the final state
    pub final_fraction: f64,
    /// Use uniform instead of discrete emissions for the emitting states
    pub insert_uniform: bool,
}

impl Default for PseudoErgodicConfig {
    fn default() -> Self {
        PseudoErgodicConfig {
            num_states:     3,
            ess:            4.0,
            self_fraction:  0.5,
            final_fraction: 0.1,
            insert_uniform: false,
        }
    }
}

impl PseudoErgodicConfig {
    /// Builds the topology with states `0..num_states` and the final state
    /// `F`.
    ///
    /// ## Errors
    ///
    /// There must be at least one emitting state, the ESS must be positive,
    /// and both fractions must lie in [0, 1] with a sum of at most 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(&self) -> Result<Topology, TopologyError> {
        trace_stage!("pseudo_ergodic");

        let n = self.num_states;
        if n == 0 {
            return Err(TopologyError::NoStates);
        }
        let ess = check_ess(self.ess)?;
        let self_fraction = check_fraction("self_fraction", self.self_fraction)?;
        let final_fraction = check_fraction("final_fraction", self.final_fraction)?;
        if self_fraction + final_fraction > 1.0 {
            return Err(TopologyError::FractionsExceedOne);
        }

        let mut graph = ContextGraph::new(1);
        graph.add_node(Context::empty(), (0..n).collect(), &vec![ess / n as f64; n])?;

        let other = if n > 1 {
            (1.0 - self_fraction - final_fraction) * ess / (n - 1) as f64
        } else {
            0.0
        };
        let mut weights = vec![other; n + 1];
        weights[n] = final_fraction * ess;
        for i in 0..n {
            weights[i] = self_fraction * ess;
            graph.add_node([i], (0..=n).collect(), &weights)?;
            weights[i] = other;
        }

        let kind = if self.insert_uniform {
            EmissionKind::Uniform
        } else {
            EmissionKind::Discrete
        };
        let mut emissions = vec![kind; n];
        emissions.push(EmissionKind::Silent);

        let mut names: Vec<String> = (0..n).map(|i| indexed_name("", i)).collect();
        names.push("F".to_string());

        Ok(Topology {
            names,
            emissions,
            graph,
            prior: Prior::Propagated { ess },
            condition_init: None,
        })
    }
}
