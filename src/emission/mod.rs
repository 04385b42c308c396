//! ## Emissions
//!
//! Topology builders never construct emission models themselves. They record
//! an [`EmissionKind`] per state, and once the state ESS is known, an
//! [`EmissionSpec`] is mapped onto an external [`EmissionFactory`] that owns
//! the alphabet and the actual emission implementations.

use std::fmt;

/// The phylogenetic tree slot used by a phylogenetic emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhyloTree {
    /// The tree of the background (non-motif) states
    Background,
    /// The tree of the motif states
    Motif,
}

/// The kind of emission a state uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmissionKind {
    /// A non-emitting state
    Silent,
    /// A fixed uniform distribution over the alphabet
    Uniform,
    /// A trainable discrete distribution
    Discrete,
    /// A discrete distribution evolving along a phylogenetic tree
    PhyloDiscrete { tree: PhyloTree },
    /// A discrete distribution conditioned on position `reference` of a
    /// reference sequence
    ReferenceDiscrete { reference: usize },
}

impl EmissionKind {
    #[inline]
    #[must_use]
    pub fn is_silent(self) -> bool {
        matches!(self, EmissionKind::Silent)
    }
}

impl fmt::Display for EmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmissionKind::Silent => f.write_str("silent"),
            EmissionKind::Uniform => f.write_str("uniform"),
            EmissionKind::Discrete => f.write_str("discrete"),
            EmissionKind::PhyloDiscrete { tree: PhyloTree::Background } => f.write_str("phylo-discrete (background)"),
            EmissionKind::PhyloDiscrete { tree: PhyloTree::Motif } => f.write_str("phylo-discrete (motif)"),
            EmissionKind::ReferenceDiscrete { reference } => write!(f, "reference-discrete ({reference})"),
        }
    }
}

/// Everything needed to instantiate the emission of one state.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionSpec {
    pub kind:           EmissionKind,
    /// The equivalent sample size of the state
    pub ess:            f64,
    /// Hyperparameters for initializing a reference conditioned emission, one
    /// row per reference symbol, already scaled by `ess`
    pub condition_init: Option<Vec<Vec<f64>>>,
}

impl EmissionSpec {
    #[inline]
    #[must_use]
    pub fn new(kind: EmissionKind, ess: f64) -> Self {
        EmissionSpec {
            kind,
            ess,
            condition_init: None,
        }
    }

    /// Builds the emission using `factory`.
    ///
    /// ## Errors
    ///
    /// Any error reported by the factory is returned unchanged.
    pub fn instantiate<F: EmissionFactory>(&self, factory: &F) -> Result<F::Emission, F::Error> {
        match self.kind {
            EmissionKind::Silent => factory.silent(),
            EmissionKind::Uniform => factory.uniform(),
            EmissionKind::Discrete => factory.discrete(self.ess),
            EmissionKind::PhyloDiscrete { tree } => factory.phylo_discrete(self.ess, tree),
            EmissionKind::ReferenceDiscrete { reference } => {
                factory.reference_discrete(self.ess, reference, self.condition_init.as_deref())
            }
        }
    }
}

/// Constructs emission models for an assembled HMM. Implementors hold the
/// alphabet and any phylogenetic trees.
pub trait EmissionFactory {
    type Emission;
    type Error;

    /// ## Errors
    ///
    /// Implementation defined.
    fn silent(&self) -> Result<Self::Emission, Self::Error>;

    /// ## Errors
    ///
    /// Implementation defined.
    fn uniform(&self) -> Result<Self::Emission, Self::Error>;

    /// ## Errors
    ///
    /// Implementation defined.
    fn discrete(&self, ess: f64) -> Result<Self::Emission, Self::Error>;

    /// ## Errors
    ///
    /// Implementation defined.
    fn phylo_discrete(&self, ess: f64, tree: PhyloTree) -> Result<Self::Emission, Self::Error>;

    /// ## Errors
    ///
    /// Implementation defined.
    fn reference_discrete(
        &self, ess: f64, reference: usize, condition_init: Option<&[Vec<f64>]>,
    ) -> Result<Self::Emission, Self::Error>;
}

#[cfg(test)]
mod test;
