#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::wildcard_imports,
    clippy::enum_glob_use
)]

/// Emission kinds recorded per state and the factory seam used to instantiate
/// them.
pub mod emission;
/// Error traits shared by every module.
pub mod err;
/// The context graph: history nodes, their choices, and the closure pass.
pub mod graph;
/// Floating point comparison utilities.
#[doc(hidden)]
pub mod math;
/// Equivalent sample size propagation over a closed context graph.
pub mod propagation;
/// Topology builders for ergodic, pseudo-ergodic, sunflower, and profile HMMs.
pub mod topology;

/// Seeded random walks through a context graph.
#[cfg(feature = "rand")]
pub mod generate;

/// `Arbitrary` implementations for the topology configurations.
#[cfg(feature = "fuzzing")]
pub mod arbitrary;

/// Enter a tracing span for a builder stage when the *tracing* feature is
/// enabled. Expands to nothing otherwise.
macro_rules! trace_stage {
    ($name:expr) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("topology_stage", stage = $name).entered();
    };
}
pub(crate) use trace_stage;

/// Common structures and traits re-exported
pub mod prelude {
    pub use crate::emission::{EmissionFactory, EmissionKind, EmissionSpec, PhyloTree};
    pub use crate::err::{GetCode, OrFail};
    pub use crate::graph::{ClosedGraph, Context, ContextGraph, GraphError, NodeId, PseudoTransition};
    pub use crate::propagation::{ESS_EPSILON, EssPropagation, MAX_ROUNDS};
    pub use crate::topology::{
        ErgodicConfig, HmmBlueprint, MatchEmission, Prior, ProfileArchitecture, ProfileConfig, PseudoErgodicConfig,
        SunflowerConfig, Topology, TopologyError, TransitionElement, TransitionTemplate,
    };
}
