use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// The three kinds of states within each layer of a profile HMM. This is used
/// for readability when indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileState {
    Delete = 0,
    Insert = 1,
    Match  = 2,
}

impl ProfileState {
    /// All kinds in index order.
    pub const ALL: [ProfileState; 3] = [ProfileState::Delete, ProfileState::Insert, ProfileState::Match];

    /// The prefix of the state names of this kind.
    #[inline]
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            ProfileState::Delete => "D",
            ProfileState::Insert => "I",
            ProfileState::Match => "M",
        }
    }
}

impl From<usize> for ProfileState {
    #[inline]
    fn from(value: usize) -> Self {
        // WARNING: enum order must be maintained
        ProfileState::ALL[value]
    }
}

impl From<ProfileState> for usize {
    #[inline]
    fn from(value: ProfileState) -> Self {
        value as usize
    }
}

/// An array of type `[T; N]` indexed by an enum `E`. This is useful for
/// readability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EnumArray<T, E, const N: usize> {
    pub(crate) inner: [T; N],
    phantom:          PhantomData<E>,
}

impl<T, E, const N: usize> EnumArray<T, E, N> {
    /// Create a new array of type `[T; N]` indexed by enum `E`.
    #[inline]
    #[must_use]
    pub(crate) fn new(inner: [T; N]) -> Self {
        Self {
            inner,
            phantom: PhantomData,
        }
    }
}

impl<T, E: From<usize>, const N: usize> EnumArray<T, E, N> {
    /// Iterates over the variants together with their values.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (E, &T)> {
        self.inner.iter().enumerate().map(|(i, v)| (E::from(i), v))
    }
}

impl<T: Default + Copy, E, const N: usize> Default for EnumArray<T, E, N> {
    #[inline]
    fn default() -> Self {
        Self {
            inner:   [T::default(); N],
            phantom: PhantomData,
        }
    }
}

impl<T, E: Into<usize>, const N: usize> Index<E> for EnumArray<T, E, N> {
    type Output = T;

    #[inline]
    fn index(&self, index: E) -> &Self::Output {
        &self.inner[index.into()]
    }
}

impl<T, E: Into<usize>, const N: usize> IndexMut<E> for EnumArray<T, E, N> {
    #[inline]
    fn index_mut(&mut self, index: E) -> &mut Self::Output {
        &mut self.inner[index.into()]
    }
}

/// An array holding values of type `T`, indexed by the variants in
/// [`ProfileState`]
pub(crate) type ProfileStateArray<T> = EnumArray<T, ProfileState, 3>;

/// The state indices of two consecutive layers: the layer whose contexts are
/// being expanded, and the layer after it. Columns `0..3` hold the current
/// layer and `3..6` the next one, each ordered Delete, Insert, Match, matching
/// the columns of a [`TransitionTemplate`](super::TransitionTemplate).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LayerWindow {
    slots: [Option<usize>; 6],
}

impl LayerWindow {
    /// A window whose next layer holds only `state` in the Match slot.
    pub(crate) fn entering(state: usize) -> Self {
        let mut window = LayerWindow::default();
        window.slots[3 + usize::from(ProfileState::Match)] = Some(state);
        window
    }

    /// Moves the next layer into the current one and fills the next layer
    /// with `next`.
    pub(crate) fn advance(&mut self, next: ProfileStateArray<Option<usize>>) {
        self.slots.copy_within(3..6, 0);
        self.slots[3..].copy_from_slice(&next.inner);
    }

    /// The state held in `column`, if any.
    #[inline]
    pub(crate) fn slot(&self, column: usize) -> Option<usize> {
        self.slots[column]
    }

    /// The kind of `state` within the current layer.
    #[inline]
    pub(crate) fn kind_of(&self, state: usize) -> Option<ProfileState> {
        self.slots[..3].iter().position(|&s| s == Some(state)).map(ProfileState::from)
    }
}
