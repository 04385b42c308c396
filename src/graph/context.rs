use rustc_hash::FxHashSet;
use std::{
    fmt::{self, Write},
    ops::{Deref, Index},
};

/// A history of previously visited states, oldest first.
///
/// The empty context belongs to the unique start node. A context never holds
/// more entries than the Markov order of the graph it is used in.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Context(Box<[usize]>);

impl Context {
    /// Returns the empty context of the start node.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Context(Box::new([]))
    }

    /// Returns the state visited most recently, or `None` for the empty
    /// context.
    #[inline]
    #[must_use]
    pub fn newest(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Returns the context reached after visiting `state`: `state` is
    /// appended, and the oldest entries are dropped so that at most
    /// `max_order` remain.
    #[must_use]
    pub fn successor(&self, state: usize, max_order: usize) -> Self {
        let len = max_order.min(self.0.len() + 1);
        let keep = len.saturating_sub(1);
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.0[self.0.len() - keep..]);
        if len > 0 {
            out.push(state);
        }
        Context(out.into_boxed_slice())
    }

    /// Returns the context with its oldest entry dropped and `state` appended,
    /// keeping the length unchanged. An empty context stays empty.
    #[inline]
    #[must_use]
    pub fn shifted(&self, state: usize) -> Self {
        self.successor(state, self.0.len())
    }

    /// Returns the underlying states as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Context {
    type Target = [usize];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Context {
    #[inline]
    fn from(v: Vec<usize>) -> Self {
        Context(v.into_boxed_slice())
    }
}

impl From<&[usize]> for Context {
    #[inline]
    fn from(v: &[usize]) -> Self {
        Context(v.into())
    }
}

impl<const N: usize> From<[usize; N]> for Context {
    #[inline]
    fn from(v: [usize; N]) -> Self {
        Context(Box::new(v))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buff = itoa::Buffer::new();
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(buff.format(*s))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        fmt::Display::fmt(self, f)?;
        f.write_char(']')
    }
}

/// An insertion-ordered set of contexts.
///
/// A context is only added if no stored context is equal to it on every
/// position. Builders use this to avoid emitting two nodes (and thus duplicate
/// edges) for histories that coincide after truncation. The set may grow while
/// it is being walked by index, which is how same-layer successors get
/// processed in the sweep that discovered them.
#[derive(Clone, Debug, Default)]
pub struct ContextSet {
    order: Vec<Context>,
    seen:  FxHashSet<Context>,
}

impl ContextSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `context` unless an equal context is already stored. Returns
    /// whether it was added.
    pub fn insert(&mut self, context: Context) -> bool {
        if self.seen.contains(&context) {
            false
        } else {
            self.seen.insert(context.clone());
            self.order.push(context);
            true
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, context: &Context) -> bool {
        self.seen.contains(context)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Context> {
        self.order.iter()
    }

    /// Removes every context, keeping the allocations.
    #[inline]
    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl Index<usize> for ContextSet {
    type Output = Context;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.order[index]
    }
}

impl IntoIterator for ContextSet {
    type Item = Context;
    type IntoIter = std::vec::IntoIter<Context>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

impl<'a> IntoIterator for &'a ContextSet {
    type Item = &'a Context;
    type IntoIter = std::slice::Iter<'a, Context>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
