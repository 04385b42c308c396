use crate::{err::GetCode, graph::GraphError};
use std::{error::Error, fmt};

/// An enum representing errors that can happen when a topology is requested
/// with invalid parameters.
#[non_exhaustive]
#[derive(Clone, PartialEq)]
pub enum TopologyError {
    /// The topology would have no states
    NoStates,
    /// An ergodic topology was given a silent state
    SilentErgodicState { state: usize },
    /// The Markov order is too small for the architecture
    OrderTooSmall { order: usize },
    /// A profile HMM was requested without layers
    NoLayers,
    /// The equivalent sample size was not positive and finite
    InvalidEss,
    /// A prior fraction was outside of [0, 1]
    FractionOutOfRange { name: &'static str, value: f64 },
    /// The prior fractions sum to more than 1
    FractionsExceedOne,
    /// The expected sequence length does not exceed the Markov order
    ExpectedLengthTooShort,
    /// A motif of the sunflower has no positions
    EmptyMotif { motif: usize },
    /// The number of motif probabilities differs from the number of motifs
    MotifProbabilityMismatch { expected: usize, found: usize },
    /// The number of match emission kinds is neither 1 nor the number of
    /// layers
    MatchEmissionMismatch { expected: usize, found: usize },
    /// The name of a profile architecture was not recognized
    UnknownArchitecture { name: String },
    /// The condition initialization matrix is empty, ragged, or holds a
    /// negative or non-finite entry
    ConditionInitMismatch,
    /// The context graph could not be built or closed
    Graph(GraphError),
}

impl fmt::Display for TopologyError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TopologyError::NoStates => write!(f, "The topology has no states!"),
            TopologyError::SilentErgodicState { state } => {
                write!(f, "An ergodic HMM can not contain silent states, but state {state} is silent!")
            }
            TopologyError::OrderTooSmall { order } => {
                write!(f, "The order of a profile HMM has to be at least 1, but {order} was given!")
            }
            TopologyError::NoLayers => write!(f, "A profile HMM needs at least one layer!"),
            TopologyError::InvalidEss => write!(f, "The equivalent sample size must be positive and finite!"),
            TopologyError::FractionOutOfRange { name, value } => {
                write!(f, "The prior fraction `{name}` must lie in [0, 1], but {value} was given!")
            }
            TopologyError::FractionsExceedOne => write!(f, "The prior fractions sum to more than 1!"),
            TopologyError::ExpectedLengthTooShort => {
                write!(f, "The expected sequence length must exceed the Markov order!")
            }
            TopologyError::EmptyMotif { motif } => write!(f, "Motif {motif} has length 0!"),
            TopologyError::MotifProbabilityMismatch { expected, found } => {
                write!(f, "Expected {expected} motif probabilities but {found} were given!")
            }
            TopologyError::MatchEmissionMismatch { expected, found } => write!(
                f,
                "Expected 1 or {expected} match emission kinds but {found} were given!"
            ),
            TopologyError::UnknownArchitecture { name } => {
                write!(f, "Unknown profile architecture `{name}`, expected PLAN7, PLAN8I, PLAN8D, or PLAN9!")
            }
            TopologyError::ConditionInitMismatch => write!(
                f,
                "The condition initialization matrix must be non-empty, rectangular, and hold non-negative finite values!"
            ),
            TopologyError::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for TopologyError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for TopologyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TopologyError::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl GetCode for TopologyError {}

impl From<GraphError> for TopologyError {
    #[inline]
    fn from(e: GraphError) -> Self {
        TopologyError::Graph(e)
    }
}

/// Checks that a prior fraction lies in [0, 1].
pub(crate) fn check_fraction(name: &'static str, value: f64) -> Result<f64, TopologyError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(TopologyError::FractionOutOfRange { name, value })
    }
}

/// Checks that an equivalent sample size is positive and finite.
pub(crate) fn check_ess(ess: f64) -> Result<f64, TopologyError> {
    if ess.is_finite() && ess > 0.0 {
        Ok(ess)
    } else {
        Err(TopologyError::InvalidEss)
    }
}
