//! ## Equivalent sample size propagation
//!
//! A global equivalent sample size (ESS) is injected at the start node of a
//! [`ClosedGraph`] and pushed along every edge in proportion to its
//! probability until (almost) all of it has settled in absorbing nodes. The
//! mass that passed through each node over all rounds gives Dirichlet
//! hyperparameters for its choices and a visitation based ESS for every
//! state.
//!
//! ```
//! # use ctxhmm::prelude::*;
//! let mut graph = ContextGraph::new(1);
//! graph.add_node(Context::empty(), vec![0], &[1.0]).unwrap();
//! graph.add_node([0], vec![0, 1], &[3.0, 1.0]).unwrap();
//!
//! let result = graph.close().unwrap().propagate_ess(10.0).unwrap();
//! // State 0 is visited 4 times on average
//! assert!((result.state_ess()[0] - 40.0).abs() < 1e-9);
//! assert!((result.state_ess()[1] - 10.0).abs() < 1e-9);
//! ```

use crate::{
    graph::{ClosedGraph, GraphError, NodeId, PseudoTransition},
    math::{NearlyEqual, NearlyEqualMethod},
};

/// The circulating mass below which propagation stops.
pub const ESS_EPSILON: f64 = 1e-12;

/// The number of rounds after which propagation gives up.
pub const MAX_ROUNDS: usize = 10_000_000;

/// The result of propagating an equivalent sample size through a
/// [`ClosedGraph`].
#[derive(Clone, Debug, PartialEq)]
pub struct EssPropagation {
    hyper:     Vec<Vec<f64>>,
    state_ess: Vec<f64>,
    cumulated: Vec<f64>,
    rounds:    usize,
}

impl EssPropagation {
    /// Dirichlet hyperparameters per node, aligned with the node's choices.
    #[inline]
    #[must_use]
    pub fn hyper(&self) -> &[Vec<f64>] {
        &self.hyper
    }

    /// Hyperparameters of a single node.
    #[inline]
    #[must_use]
    pub fn node_hyper(&self, id: NodeId) -> &[f64] {
        &self.hyper[id.index()]
    }

    /// The mass attributed to having just visited each state, indexed by state.
    #[inline]
    #[must_use]
    pub fn state_ess(&self) -> &[f64] {
        &self.state_ess
    }

    /// The total mass that passed through each node.
    #[inline]
    #[must_use]
    pub fn cumulated(&self) -> &[f64] {
        &self.cumulated
    }

    /// The number of propagation rounds performed.
    #[inline]
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// The total mass settled in the absorbing nodes of `graph`.
    #[must_use]
    pub fn absorbed(&self, graph: &ClosedGraph) -> f64 {
        graph.absorbing().iter().map(|id| self.cumulated[id.index()]).sum()
    }
}

impl ClosedGraph {
    /// Propagates `ess` from the start node until the circulating mass falls
    /// below [`ESS_EPSILON`].
    ///
    /// Every node of a closed graph can reach an absorbing node in fewer
    /// rounds than there are nodes, so the circulating mass must shrink over
    /// any window of that many rounds. Rounding can still keep it constant,
    /// for instance when a self-loop probability normalizes to exactly 1.
    ///
    /// ## Errors
    ///
    /// `ess` must be positive and finite. If the circulating mass stops
    /// shrinking over a window, or is still above [`ESS_EPSILON`] after
    /// [`MAX_ROUNDS`], [`GraphError::NotConverging`] is returned.
    pub fn propagate_ess(&self, ess: f64) -> Result<EssPropagation, GraphError> {
        if !(ess.is_finite() && ess > 0.0) {
            return Err(GraphError::InvalidEss);
        }

        let mut current = vec![0.0; self.len()];
        let mut next = vec![0.0; self.len()];
        let mut cumulated = vec![0.0; self.len()];
        current[self.start().index()] = ess;

        let window = self.len().max(1);
        let mut checkpoint = ess;
        let mut rounds = 0;
        loop {
            sweep(self.nodes(), &current, &mut next);
            for (c, m) in cumulated.iter_mut().zip(&current) {
                *c += m;
            }
            std::mem::swap(&mut current, &mut next);
            next.fill(0.0);
            rounds += 1;

            let residual: f64 = current.iter().sum();
            if residual < ESS_EPSILON {
                #[cfg(feature = "tracing")]
                tracing::debug!(rounds, residual, "ess propagation converged");
                break;
            }

            if rounds % window == 0 {
                if residual >= checkpoint || rounds >= MAX_ROUNDS {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(rounds, residual, "ess propagation stalled");
                    return Err(GraphError::NotConverging { rounds, residual });
                }
                checkpoint = residual;
            }
        }

        let hyper = self
            .nodes()
            .iter()
            .zip(&cumulated)
            .map(|(node, &mass)| node.prob().iter().map(|p| p * mass).collect())
            .collect();

        let mut state_ess = vec![0.0; self.num_states()];
        for (node, &mass) in self.nodes().iter().zip(&cumulated) {
            if let Some(s) = node.context().newest() {
                state_ess[s] += mass;
            }
        }

        Ok(EssPropagation {
            hyper,
            state_ess,
            cumulated,
            rounds,
        })
    }
}

/// Pushes the mass of every node along its edges into `next`. Absorbing nodes
/// forward nothing.
#[cfg_attr(feature = "multiversion", multiversion::multiversion(targets = "simd"))]
fn sweep(nodes: &[PseudoTransition], current: &[f64], next: &mut [f64]) {
    for (node, &mass) in nodes.iter().zip(current) {
        if mass <= 0.0 {
            continue;
        }
        for (p, child) in node.edges() {
            next[child.index()] += p * mass;
        }
    }
}

impl NearlyEqual<f64> for EssPropagation {
    fn nearly_equal<M: NearlyEqualMethod<f64>>(&self, b: &Self, method: &M) -> (bool, Option<(f64, f64)>) {
        let (eq, vals) = self.hyper.nearly_equal(&b.hyper, method);
        if !eq {
            return (false, vals);
        }
        let (eq, vals) = self.state_ess.nearly_equal(&b.state_ess, method);
        if !eq {
            return (false, vals);
        }
        self.cumulated.nearly_equal(&b.cumulated, method)
    }
}

#[cfg(test)]
mod test;
