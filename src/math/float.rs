use std::{
    fmt::{Debug, Display},
    ops::{Add, Div, Mul, Sub},
};

mod private {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Trait for providing generic functionality over floating point numbers.
pub trait Float:
    Sub<Output = Self>
    + Add<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialEq
    + PartialOrd
    + Copy
    + Debug
    + Display
    + private::Sealed {
    const MIN_POSITIVE: Self;
    const MAX: Self;
    const ZERO: Self;

    /// Generic absolute value for [`Float`]
    #[must_use]
    fn abs(self) -> Self;

    /// Generic minimum of 2 values for [`Float`]
    #[must_use]
    fn min(self, other: Self) -> Self;
}

macro_rules! impl_float {
    {$($ty:ty),*} => {
        $(
            impl Float for $ty {
                const MIN_POSITIVE: Self = <$ty>::MIN_POSITIVE;
                const MAX: Self = <$ty>::MAX;
                const ZERO: Self = 0.0;

                #[inline]
                fn abs(self) -> Self {
                    self.abs()
                }

                #[inline]
                fn min(self, other: Self) -> Self {
                    self.min(other)
                }
            }
        )*
    }
}

impl_float!(f32, f64);
