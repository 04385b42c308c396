use crate::err::GetCode;
use std::{error::Error, fmt};

/// An enum representing errors that can happen while building or closing a
/// context graph.
#[non_exhaustive]
#[derive(Clone, PartialEq)]
pub enum GraphError {
    /// The children, prior weights, and display weights of a node differ in
    /// length
    LengthMismatch {
        states:  usize,
        prior:   usize,
        display: usize,
    },
    /// A prior or display weight of the node being added was negative or not
    /// finite
    InvalidWeight { node: usize },
    /// A context was longer than the Markov order of the graph
    ContextTooLong { len: usize, order: usize },
    /// A second node with an empty context was added
    MultipleStarts,
    /// The graph has no node with an empty context
    NoStart,
    /// After closure, no node of the graph is absorbing
    NoAbsorbingState,
    /// A node reachable from the start cannot reach any absorbing node
    Trapped { node: usize },
    /// The equivalent sample size was not positive and finite
    InvalidEss,
    /// The circulating mass stopped shrinking or outlasted the round limit
    NotConverging { rounds: usize, residual: f64 },
}

impl fmt::Display for GraphError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GraphError::LengthMismatch { states, prior, display } => write!(
                f,
                "A node was given {states} children but {prior} prior weights and {display} display weights!"
            ),
            GraphError::InvalidWeight { node } => {
                write!(f, "Node {node} has a negative or non-finite weight!")
            }
            GraphError::ContextTooLong { len, order } => {
                write!(f, "A context of length {len} exceeds the Markov order {order}!")
            }
            GraphError::MultipleStarts => write!(f, "Multiple start transitions were specified!"),
            GraphError::NoStart => write!(f, "The graph has no start transition!"),
            GraphError::NoAbsorbingState => write!(f, "The graph has no absorbing state!"),
            GraphError::Trapped { node } => write!(
                f,
                "Node {node} is reachable from the start but cannot reach an absorbing state!"
            ),
            GraphError::InvalidEss => write!(f, "The equivalent sample size must be positive and finite!"),
            GraphError::NotConverging { rounds, residual } => write!(
                f,
                "The propagated mass did not drain: {residual} still circulates after {rounds} rounds!"
            ),
        }
    }
}

impl fmt::Debug for GraphError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for GraphError {}
impl GetCode for GraphError {}
