//! ## Context graphs
//!
//! A [`ContextGraph`] holds one [`PseudoTransition`] per distinct history of
//! visited states. Each node lists the states that may follow its history,
//! their normalized probabilities, and (once resolved) the node reached after
//! taking each choice. Topology builders populate the graph with
//! [`ContextGraph::add_node`], and [`ContextGraph::close`] synthesizes the
//! missing absorbing nodes, validates the graph, and returns a [`ClosedGraph`]
//! ready for equivalent sample size propagation.
//!
//! ```
//! # use ctxhmm::prelude::*;
//! let mut graph = ContextGraph::new(1);
//! graph.add_node(Context::empty(), vec![0, 1], &[1.0, 3.0]).unwrap();
//! graph.add_node([0], vec![0, 1], &[1.0, 1.0]).unwrap();
//!
//! // Context [1] is never populated and becomes absorbing
//! let closed = graph.close().unwrap();
//! assert_eq!(closed.len(), 3);
//! assert_eq!(closed.absorbing(), &[NodeId(2)]);
//! ```

use rustc_hash::FxHashMap;
use std::fmt;

mod context;
mod errors;

pub use context::*;
pub use errors::*;

/// The index of a node within a [`ContextGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A history node together with its outgoing choices.
///
/// `states`, `prior`, `prob`, `weights`, and `child` always have the same
/// length. A node without states is absorbing.
#[derive(Clone, Debug, PartialEq)]
pub struct PseudoTransition {
    context: Context,
    states:  Vec<usize>,
    prior:   Vec<f64>,
    prob:    Vec<f64>,
    weights: Vec<f64>,
    child:   Vec<Option<NodeId>>,
}

impl PseudoTransition {
    fn new(context: Context, states: Vec<usize>, prior: Vec<f64>, weights: Vec<f64>) -> Self {
        let prob = normalized(&prior);
        let child = vec![None; states.len()];
        PseudoTransition {
            context,
            states,
            prior,
            prob,
            weights,
            child,
        }
    }

    fn absorbing(context: Context) -> Self {
        PseudoTransition::new(context, Vec::new(), Vec::new(), Vec::new())
    }

    /// The history this node represents.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The states that may follow this history.
    #[inline]
    #[must_use]
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// The raw prior weights the node was added with.
    #[inline]
    #[must_use]
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// The prior weights normalized to sum to one.
    #[inline]
    #[must_use]
    pub fn prob(&self) -> &[f64] {
        &self.prob
    }

    /// Display weights, which never affect `prob`.
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The node reached after each choice, or `None` while unresolved.
    #[inline]
    #[must_use]
    pub fn child(&self) -> &[Option<NodeId>] {
        &self.child
    }

    /// Iterates over the resolved successor nodes paired with their
    /// probabilities. Unresolved choices are skipped.
    #[inline]
    pub fn edges(&self) -> impl Iterator<Item = (f64, NodeId)> + '_ {
        self.prob
            .iter()
            .zip(&self.child)
            .filter_map(|(&p, c)| c.map(|c| (p, c)))
    }

    #[inline]
    #[must_use]
    pub fn is_absorbing(&self) -> bool {
        self.states.is_empty()
    }
}

impl fmt::Display for PseudoTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (s, p) in self.states.iter().zip(&self.prob) {
            writeln!(f, "P({s}|{})\t= {p}", self.context)?;
        }
        Ok(())
    }
}

/// Sum-normalizes `prior`, falling back to a uniform distribution when the
/// weights sum to zero.
fn normalized(prior: &[f64]) -> Vec<f64> {
    let sum: f64 = prior.iter().sum();
    if sum > 0.0 {
        prior.iter().map(|w| w / sum).collect()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / prior.len() as f64;
        vec![uniform; prior.len()]
    }
}

/// An append-only list of history nodes under construction.
#[derive(Clone, Debug)]
pub struct ContextGraph {
    order: usize,
    nodes: Vec<PseudoTransition>,
    index: FxHashMap<Context, NodeId>,
    start: Option<NodeId>,
}

impl ContextGraph {
    /// Creates an empty graph tracking histories of at most `order` states.
    #[inline]
    #[must_use]
    pub fn new(order: usize) -> Self {
        ContextGraph {
            order,
            nodes: Vec::new(),
            index: FxHashMap::default(),
            start: None,
        }
    }

    /// Appends a node with display weights of 1 for every child.
    ///
    /// ## Errors
    ///
    /// See [`add_weighted_node`](ContextGraph::add_weighted_node).
    #[inline]
    pub fn add_node(&mut self, context: impl Into<Context>, states: Vec<usize>, prior: &[f64]) -> Result<NodeId, GraphError> {
        self.add_weighted_node(context, states, prior, None)
    }

    /// Appends a node without resolving its children.
    ///
    /// ## Errors
    ///
    /// The lengths of `states`, `prior`, and `display` (when given) must
    /// match, all weights must be finite and non-negative, the context may not
    /// exceed the order of the graph, and only one node may have an empty
    /// context.
    pub fn add_weighted_node(
        &mut self, context: impl Into<Context>, states: Vec<usize>, prior: &[f64], display: Option<&[f64]>,
    ) -> Result<NodeId, GraphError> {
        let context = context.into();
        let display_len = display.map_or(states.len(), <[f64]>::len);

        if prior.len() != states.len() || display_len != states.len() {
            return Err(GraphError::LengthMismatch {
                states:  states.len(),
                prior:   prior.len(),
                display: display_len,
            });
        }

        let id = NodeId(self.nodes.len());
        let valid = |w: &f64| w.is_finite() && *w >= 0.0;
        if !prior.iter().all(valid) || !display.unwrap_or_default().iter().all(valid) {
            return Err(GraphError::InvalidWeight { node: id.0 });
        }

        if context.len() > self.order {
            return Err(GraphError::ContextTooLong {
                len:   context.len(),
                order: self.order,
            });
        }

        if context.is_empty() {
            if self.start.is_some() {
                return Err(GraphError::MultipleStarts);
            }
            self.start = Some(id);
        }

        let weights = display.map_or_else(|| vec![1.0; states.len()], <[f64]>::to_vec);
        self.index.entry(context.clone()).or_insert(id);
        self.nodes.push(PseudoTransition::new(context, states, prior.to_vec(), weights));
        Ok(id)
    }

    /// Resolves every child pointer to the node whose context equals the
    /// current context extended by the chosen state and truncated to
    /// `max_order` entries. `max_order` is capped at the order of the graph
    /// (at least 1), so synthesized contexts never exceed it.
    ///
    /// Contexts with no matching node are first collected, then appended in
    /// one batch as absorbing nodes. With `max_order == 0` there is no history
    /// to track and unmatched choices resolve to node 0. Returns the number of
    /// nodes synthesized.
    pub fn resolve_children(&mut self, max_order: usize) -> usize {
        let max_order = max_order.min(self.order.max(1));
        let next: Vec<Vec<Context>> = self
            .nodes
            .iter()
            .map(|node| node.states.iter().map(|&s| node.context.successor(s, max_order)).collect())
            .collect();

        let mut pending = ContextSet::new();
        if max_order > 0 {
            for ctx in next.iter().flatten() {
                if !self.index.contains_key(ctx) {
                    pending.insert(ctx.clone());
                }
            }
        }

        let synthesized = pending.len();
        for ctx in pending {
            self.index.insert(ctx.clone(), NodeId(self.nodes.len()));
            self.nodes.push(PseudoTransition::absorbing(ctx));
        }

        for (node, next) in self.nodes.iter_mut().zip(next) {
            for (child, ctx) in node.child.iter_mut().zip(next) {
                *child = Some(self.index.get(&ctx).copied().unwrap_or(NodeId(0)));
            }
        }

        synthesized
    }

    /// Resolves all children with the order of the graph (at least 1) and
    /// validates the result.
    ///
    /// ## Errors
    ///
    /// The graph must have a start node and at least one absorbing node, and
    /// every node reachable from the start with positive probability must be
    /// able to reach an absorbing node.
    pub fn close(mut self) -> Result<ClosedGraph, GraphError> {
        let start = self.start.ok_or(GraphError::NoStart)?;
        let _synthesized = self.resolve_children(self.order.max(1));

        #[cfg(feature = "tracing")]
        tracing::debug!(nodes = self.nodes.len(), synthesized = _synthesized, "closed context graph");

        let absorbing: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_absorbing())
            .map(NodeId)
            .collect();

        if absorbing.is_empty() {
            return Err(GraphError::NoAbsorbingState);
        }

        if let Some(node) = find_trapped(&self.nodes, start, &absorbing) {
            return Err(GraphError::Trapped { node: node.0 });
        }

        Ok(ClosedGraph {
            order: self.order,
            nodes: self.nodes,
            start,
            absorbing,
        })
    }

    #[inline]
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[PseudoTransition] {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the first node carrying `context`, if any.
    #[inline]
    #[must_use]
    pub fn find(&self, context: &Context) -> Option<NodeId> {
        self.index.get(context).copied()
    }
}

/// Returns the first node reachable from `start` through positive probability
/// edges that has no positive probability path to an absorbing node.
fn find_trapped(nodes: &[PseudoTransition], start: NodeId, absorbing: &[NodeId]) -> Option<NodeId> {
    let mut reachable = vec![false; nodes.len()];
    let mut stack = vec![start];
    reachable[start.0] = true;
    while let Some(id) = stack.pop() {
        for (p, c) in nodes[id.0].edges() {
            if p > 0.0 && !reachable[c.0] {
                reachable[c.0] = true;
                stack.push(c);
            }
        }
    }

    let mut parents = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for (p, c) in node.edges() {
            if p > 0.0 {
                parents[c.0].push(i);
            }
        }
    }

    let mut drains = vec![false; nodes.len()];
    let mut stack: Vec<usize> = absorbing.iter().map(|a| a.0).collect();
    for &a in &stack {
        drains[a] = true;
    }
    while let Some(i) = stack.pop() {
        for &parent in &parents[i] {
            if !drains[parent] {
                drains[parent] = true;
                stack.push(parent);
            }
        }
    }

    (0..nodes.len()).find(|&i| reachable[i] && !drains[i]).map(NodeId)
}

/// A validated context graph whose child pointers are all resolved.
#[derive(Clone, Debug)]
pub struct ClosedGraph {
    order:     usize,
    nodes:     Vec<PseudoTransition>,
    start:     NodeId,
    absorbing: Vec<NodeId>,
}

impl ClosedGraph {
    #[inline]
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[PseudoTransition] {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &PseudoTransition {
        &self.nodes[id.0]
    }

    /// The unique node with an empty context.
    #[inline]
    #[must_use]
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// All nodes without outgoing choices, in index order.
    #[inline]
    #[must_use]
    pub fn absorbing(&self) -> &[NodeId] {
        &self.absorbing
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One more than the largest state index appearing in any context or
    /// choice.
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|n| n.context.iter().chain(&n.states))
            .max()
            .map_or(0, |m| m + 1)
    }
}

impl fmt::Display for ClosedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}
