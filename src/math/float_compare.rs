use super::Float;
use std::fmt::Debug;

/// A trait unifying the methods for comparing two floating point numbers. This
/// is implemented for [`NearlyEqualStrategy`] and `Fn(T, T) -> bool` closures.
///
/// This is an implementation detail of [`assert_fp_eq`] and [`is_fp_eq`].
#[doc(hidden)]
pub trait NearlyEqualMethod<T> {
    fn nearly_equal_float(&self, a: T, b: T) -> bool;
}

/// The provided floating point comparison methods.
#[doc(hidden)]
pub enum NearlyEqualStrategy<T> {
    /// Relative error with a tolerance of `eps`
    Relative { eps: T },
    /// Absolute error with a tolerance of `eps`
    Absolute { eps: T },
}

impl<T: Float> NearlyEqualMethod<T> for NearlyEqualStrategy<T> {
    /// Relative error as described in
    /// <https://floating-point-gui.de/errors/comparison/>
    fn nearly_equal_float(&self, a: T, b: T) -> bool {
        if a == b {
            return true;
        }
        let diff = (a - b).abs();
        match self {
            NearlyEqualStrategy::Relative { eps } => {
                let scale = a.abs() + b.abs();
                if a == T::ZERO || b == T::ZERO || scale < T::MIN_POSITIVE {
                    diff < *eps * T::MIN_POSITIVE
                } else {
                    diff / scale.min(T::MAX) < *eps
                }
            }
            NearlyEqualStrategy::Absolute { eps } => diff < *eps,
        }
    }
}

impl<T: Float, F: Fn(T, T) -> bool> NearlyEqualMethod<T> for F {
    #[inline]
    fn nearly_equal_float(&self, a: T, b: T) -> bool {
        self(a, b)
    }
}

/// Equality comparisons for types containing floating point numbers of type
/// `T`.
///
/// The second value returned holds the first pair of floats found unequal, or
/// `None` when the values differ structurally (for example, vectors of
/// different lengths).
#[doc(hidden)]
pub trait NearlyEqual<T> {
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>);
}

macro_rules! impl_float_nearly_equal {
    {$($ty:ty),*} => {
        $(
            impl NearlyEqual<$ty> for $ty {
                #[inline]
                fn nearly_equal<M: NearlyEqualMethod<$ty>>(&self, b: &Self, method: &M) -> (bool, Option<($ty, $ty)>) {
                    if method.nearly_equal_float(*self, *b) {
                        (true, None)
                    } else {
                        (false, Some((*self, *b)))
                    }
                }
            }
        )*
    }
}

impl_float_nearly_equal!(f32, f64);

impl<T, S: NearlyEqual<T>> NearlyEqual<T> for Option<S> {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>) {
        match (self, b) {
            (Some(x), Some(y)) => x.nearly_equal(y, method),
            (None, None) => (true, None),
            _ => (false, None),
        }
    }
}

impl<T, S: NearlyEqual<T>> NearlyEqual<T> for [S] {
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>) {
        if self.len() != b.len() {
            return (false, None);
        }
        self.iter()
            .zip(b)
            .map(|(x, y)| x.nearly_equal(y, method))
            .find(|(eq, _)| !eq)
            .unwrap_or((true, None))
    }
}

impl<T, S: NearlyEqual<T>, const N: usize> NearlyEqual<T> for [S; N] {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>) {
        self.as_slice().nearly_equal(b.as_slice(), method)
    }
}

impl<T, S: NearlyEqual<T>> NearlyEqual<T> for Vec<S> {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>) {
        self.as_slice().nearly_equal(b.as_slice(), method)
    }
}

impl<T, S: NearlyEqual<T> + ?Sized> NearlyEqual<T> for &S {
    #[inline]
    fn nearly_equal<M: NearlyEqualMethod<T>>(&self, b: &Self, method: &M) -> (bool, Option<(T, T)>) {
        (**self).nearly_equal(*b, method)
    }
}

/// Reports a failed [`assert_fp_eq`].
#[doc(hidden)]
#[track_caller]
pub fn fp_assert_failed<A: Debug, B: Debug, T: Debug>(a: &A, b: &B, eps: Option<&dyn Debug>, vals: Option<(T, T)>) -> ! {
    let mut msg = format!("assertion failed: `(found ≈ expected)`\n left:\t`{a:?}`,\n right:\t`{b:?}`");
    if let Some(eps) = eps {
        msg.push_str(&format!(",\n eps:\t`{eps:?}`"));
    }
    if let Some((x, y)) = vals {
        msg.push_str(&format!(",\n\n Caused by the comparison of:\n left:\t`{x:?}`,\n right:\t`{y:?}`"));
    }
    panic!("{msg}")
}

/// Assert that two floating point values are approximately equal.
///
/// The default compares using relative error with a tolerance of
/// $\epsilon=10^{-8}$:
/// ```
/// # use ctxhmm::assert_fp_eq;
/// assert_fp_eq!(3.0, 1.0 + 2.0);
/// assert_fp_eq!(3.0, 2.99999, 1e-4);
/// ```
///
/// The method can be changed to absolute error (`@absolute`) or a custom
/// closure (`@custom`):
/// ```
/// # use ctxhmm::assert_fp_eq;
/// assert_fp_eq!(@relative, 3.0, 2.99999, 1e-4);
/// assert_fp_eq!(@absolute, 1e-10, 2e-10, 1e-8);
/// assert_fp_eq!(@custom, 0.5_f64, 0.6, |x: f64, y: f64| (x - y).abs() < 0.2);
/// ```
///
/// `f32` and `f64` can be compared, along with `Option<T>`, `[T; N]`, `[T]`,
/// `Vec<T>`, and references to any of these. Propagation results
/// ([`EssPropagation`](crate::propagation::EssPropagation)) and transition
/// elements ([`TransitionElement`](crate::topology::TransitionElement)) can
/// also be compared.
#[macro_export]
macro_rules! assert_fp_eq {
    ($(@$method:tt,)? $a:expr, $b:expr) => {
        $crate::assert_fp_eq!($(@$method,)? $a, $b, 1e-8)
    };
    ($(@relative,)? $a:expr, $b:expr, $epsilon:expr) => {{
        let (eq, vals) = $crate::math::NearlyEqual::nearly_equal(
            &$a,
            &$b,
            &$crate::math::NearlyEqualStrategy::Relative { eps: $epsilon },
        );
        if !eq {
            $crate::math::fp_assert_failed(&$a, &$b, Some(&$epsilon), vals);
        }
    }};
    (@absolute, $a:expr, $b:expr, $epsilon:expr) => {{
        let (eq, vals) = $crate::math::NearlyEqual::nearly_equal(
            &$a,
            &$b,
            &$crate::math::NearlyEqualStrategy::Absolute { eps: $epsilon },
        );
        if !eq {
            $crate::math::fp_assert_failed(&$a, &$b, Some(&$epsilon), vals);
        }
    }};
    (@custom, $a:expr, $b:expr, $closure:expr) => {{
        let (eq, vals) = $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$closure);
        if !eq {
            $crate::math::fp_assert_failed(&$a, &$b, None, vals);
        }
    }};
}

/// Check whether two floating point values are approximately equal.
///
/// Similar to [`assert_fp_eq`], but returns a boolean rather than performing an
/// assertion.
#[macro_export]
macro_rules! is_fp_eq {
    ($(@$method:tt,)? $a:expr, $b:expr) => {
        $crate::is_fp_eq!($(@$method,)? $a, $b, 1e-8)
    };
    ($(@relative,)? $a:expr, $b:expr, $epsilon:expr) => {
        $crate::math::NearlyEqual::nearly_equal(
            &$a,
            &$b,
            &$crate::math::NearlyEqualStrategy::Relative { eps: $epsilon },
        )
        .0
    };
    (@absolute, $a:expr, $b:expr, $epsilon:expr) => {
        $crate::math::NearlyEqual::nearly_equal(
            &$a,
            &$b,
            &$crate::math::NearlyEqualStrategy::Absolute { eps: $epsilon },
        )
        .0
    };
    (@custom, $a:expr, $b:expr, $closure:expr) => {
        $crate::math::NearlyEqual::nearly_equal(&$a, &$b, &$closure).0
    };
}
