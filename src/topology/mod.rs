//! ## Topology builders
//!
//! Each builder validates its configuration and returns a [`Topology`]: the
//! state names, the emission kind of every state, and a populated
//! [`ContextGraph`]. [`Topology::assemble`] turns this into the
//! [`HmmBlueprint`] consumed by HMM assembly, propagating the equivalent
//! sample size when the topology has an absorbing final state.
//!
//! ```
//! # use ctxhmm::prelude::*;
//! let config = ProfileConfig {
//!     num_layers: 3,
//!     ..ProfileConfig::default()
//! };
//! let blueprint = config.build().unwrap().assemble().unwrap();
//! assert_eq!(
//!     blueprint.names,
//!     ["E0", "S0", "D1", "I1", "M1", "D2", "I2", "M2", "D3", "I3", "M3", "F"]
//! );
//! ```

use crate::{
    emission::{EmissionFactory, EmissionKind, EmissionSpec},
    graph::{Context, ContextGraph, PseudoTransition},
    math::{NearlyEqual, NearlyEqualMethod},
};
use std::fmt;

mod ergodic;
mod errors;
mod profile;
mod pseudo_ergodic;
mod sunflower;

pub use ergodic::*;
pub use errors::*;
pub use profile::*;
pub use pseudo_ergodic::*;
pub use sunflower::*;

/// How the hyperparameters of a topology are obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum Prior {
    /// The equivalent sample size is propagated through the closed graph. Used
    /// by topologies with an absorbing final state.
    Propagated { ess: f64 },
    /// The prior weights of the graph are used as hyperparameters directly,
    /// and the ESS of every state was fixed by the builder. Used by topologies
    /// whose walks never absorb.
    Fixed { state_ess: Vec<f64> },
}

/// The states and context graph of an HMM, before hyperparameters are
/// finalized.
#[derive(Clone, Debug)]
pub struct Topology {
    pub(crate) names:          Vec<String>,
    pub(crate) emissions:      Vec<EmissionKind>,
    pub(crate) graph:          ContextGraph,
    pub(crate) prior:          Prior,
    pub(crate) condition_init: Option<Vec<Vec<f64>>>,
}

impl Topology {
    #[inline]
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    #[must_use]
    pub fn emissions(&self) -> &[EmissionKind] {
        &self.emissions
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ContextGraph {
        &self.graph
    }

    #[inline]
    #[must_use]
    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    #[inline]
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.names.len()
    }

    /// Returns the index of the state called `name`.
    #[must_use]
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Finalizes the hyperparameters of every transition and the ESS of every
    /// state.
    ///
    /// For [`Prior::Propagated`] the graph is closed and the ESS is
    /// propagated; absorbing nodes carry no choices and are left out of the
    /// transitions. For [`Prior::Fixed`] the prior weights become the
    /// hyperparameters unchanged.
    ///
    /// ## Errors
    ///
    /// Closing or propagating the graph can fail, see
    /// [`GraphError`](crate::graph::GraphError).
    pub fn assemble(&self) -> Result<HmmBlueprint, TopologyError> {
        crate::trace_stage!("assemble");

        let (transitions, state_ess) = match &self.prior {
            Prior::Propagated { ess } => {
                let closed = self.graph.clone().close()?;
                let result = closed.propagate_ess(*ess)?;
                let transitions = closed
                    .nodes()
                    .iter()
                    .zip(result.hyper())
                    .filter(|(node, _)| !node.is_absorbing())
                    .map(|(node, hyper)| TransitionElement::new(node, hyper.clone()))
                    .collect();
                (transitions, result.state_ess().to_vec())
            }
            Prior::Fixed { state_ess } => {
                let transitions = self
                    .graph
                    .nodes()
                    .iter()
                    .filter(|node| !node.is_absorbing())
                    .map(|node| TransitionElement::new(node, node.prior().to_vec()))
                    .collect();
                (transitions, state_ess.clone())
            }
        };

        let emissions = self
            .emissions
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                let ess = state_ess.get(i).copied().unwrap_or_default();
                let mut spec = EmissionSpec::new(kind, ess);
                if let EmissionKind::ReferenceDiscrete { .. } = kind {
                    spec.condition_init = self
                        .condition_init
                        .as_ref()
                        .map(|rows| rows.iter().map(|row| row.iter().map(|v| v * ess).collect()).collect());
                }
                spec
            })
            .collect();

        Ok(HmmBlueprint {
            names: self.names.clone(),
            emissions,
            transitions,
        })
    }
}

/// A finalized transition: the choices available after a context, with their
/// Dirichlet hyperparameters.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionElement {
    pub context:         Context,
    pub children:        Vec<usize>,
    pub hyper:           Vec<f64>,
    pub display_weights: Vec<f64>,
}

impl TransitionElement {
    fn new(node: &PseudoTransition, hyper: Vec<f64>) -> Self {
        TransitionElement {
            context: node.context().clone(),
            children: node.states().to_vec(),
            hyper,
            display_weights: node.weights().to_vec(),
        }
    }

    /// The total hyperparameter mass of this transition.
    #[inline]
    #[must_use]
    pub fn ess(&self) -> f64 {
        self.hyper.iter().sum()
    }
}

impl NearlyEqual<f64> for TransitionElement {
    fn nearly_equal<M: NearlyEqualMethod<f64>>(&self, b: &Self, method: &M) -> (bool, Option<(f64, f64)>) {
        if self.context != b.context || self.children != b.children {
            return (false, None);
        }
        let (eq, vals) = self.hyper.nearly_equal(&b.hyper, method);
        if !eq {
            return (false, vals);
        }
        self.display_weights.nearly_equal(&b.display_weights, method)
    }
}

/// Everything needed to instantiate an HMM: state names, emission
/// specifications, and transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct HmmBlueprint {
    pub names:       Vec<String>,
    pub emissions:   Vec<EmissionSpec>,
    pub transitions: Vec<TransitionElement>,
}

impl HmmBlueprint {
    /// Builds the emission of every state with `factory`, in state order.
    ///
    /// ## Errors
    ///
    /// The first error reported by the factory is returned.
    pub fn instantiate<F: EmissionFactory>(&self, factory: &F) -> Result<Vec<F::Emission>, F::Error> {
        self.emissions.iter().map(|spec| spec.instantiate(factory)).collect()
    }

    /// Returns the transition leaving `context`, if any.
    #[must_use]
    pub fn transition(&self, context: &Context) -> Option<&TransitionElement> {
        self.transitions.iter().find(|t| &t.context == context)
    }
}

impl HmmBlueprint {
    /// The name of `state`, or its index when no name was given.
    fn name_or_index<'a>(&'a self, state: usize, buff: &'a mut itoa::Buffer) -> &'a str {
        match self.names.get(state) {
            Some(name) => name,
            None => buff.format(state),
        }
    }
}

impl fmt::Display for HmmBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, spec) in self.names.iter().zip(&self.emissions) {
            writeln!(f, "{name}\t{}\t{}", spec.kind, spec.ess)?;
        }
        let mut buff = itoa::Buffer::new();
        for t in &self.transitions {
            let context: Vec<String> = t
                .context
                .iter()
                .map(|&s| self.name_or_index(s, &mut buff).to_owned())
                .collect();
            let context = context.join(" ");
            for (child, hyper) in t.children.iter().zip(&t.hyper) {
                writeln!(f, "{context} -> {}\t{hyper}", self.name_or_index(*child, &mut buff))?;
            }
        }
        Ok(())
    }
}

/// Renders state names with a prefix followed by an index.
pub(crate) fn indexed_name(prefix: &str, i: usize) -> String {
    let mut buff = itoa::Buffer::new();
    let mut name = String::with_capacity(prefix.len() + 4);
    name.push_str(prefix);
    name.push_str(buff.format(i));
    name
}

#[cfg(test)]
mod test;
