//! A module providing implementations of
//! [`Arbitrary`](https://docs.rs/arbitrary/latest/arbitrary/trait.Arbitrary.html)
//! for the emission kinds and profile settings, as well as wrapper types
//! generating topology configurations that always build into valid,
//! convergent context graphs.
//!
//! <div class="warning note">
//!
//! **Note**
//!
//! You must enable the *fuzzing* feature in your `Cargo.toml` to use these
//! functions.
//!
//! </div>

use crate::{
    emission::{EmissionKind, PhyloTree},
    topology::{ErgodicConfig, MatchEmission, ProfileArchitecture, ProfileConfig, PseudoErgodicConfig, SunflowerConfig},
};
use arbitrary::{Arbitrary, Result, Unstructured};

macro_rules! impl_deref {
    ($wrapper:ty, $inner:ty) => {
        impl ::std::ops::Deref for $wrapper {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $wrapper {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

impl<'a> Arbitrary<'a> for PhyloTree {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(*u.choose(&[PhyloTree::Background, PhyloTree::Motif])?)
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        let _ = depth;
        (1, Some(4))
    }
}

impl<'a> Arbitrary<'a> for EmissionKind {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(match u.int_in_range(0..=4)? {
            0 => EmissionKind::Silent,
            1 => EmissionKind::Uniform,
            2 => EmissionKind::Discrete,
            3 => EmissionKind::PhyloDiscrete {
                tree: PhyloTree::arbitrary(u)?,
            },
            _ => EmissionKind::ReferenceDiscrete {
                reference: usize::arbitrary(u)?,
            },
        })
    }
}

impl<'a> Arbitrary<'a> for ProfileArchitecture {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(*u.choose(&[
            ProfileArchitecture::Plan7,
            ProfileArchitecture::Plan8I,
            ProfileArchitecture::Plan8D,
            ProfileArchitecture::Plan9,
        ])?)
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        let _ = depth;
        (1, Some(4))
    }
}

impl<'a> Arbitrary<'a> for MatchEmission {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(*u.choose(&[MatchEmission::Uniform, MatchEmission::Unconditional, MatchEmission::Reference])?)
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        let _ = depth;
        (1, Some(4))
    }
}

/// A positive ESS between 0.1 and 100.
fn arbitrary_ess(u: &mut Unstructured<'_>) -> Result<f64> {
    Ok(f64::from(u.int_in_range(1u16..=1000)?) / 10.0)
}

/// A fraction in `[0, max]` with a resolution of one percent of `max`.
fn arbitrary_fraction(u: &mut Unstructured<'_>, max: f64) -> Result<f64> {
    Ok(max * f64::from(u.int_in_range(0u8..=100)?) / 100.0)
}

/// A wrapper around [`ErgodicConfig`] such that the implementation of
/// [`Arbitrary`](https://docs.rs/arbitrary/latest/arbitrary/trait.Arbitrary.html)
/// only generates configurations that build. This means:
///
/// - There are 1 to 4 states, none of them silent
/// - The order is at most 3
/// - The expected length exceeds the order
#[derive(Debug)]
pub struct ErgodicValid(pub ErgodicConfig);

impl_deref! {ErgodicValid, ErgodicConfig}

impl<'a> Arbitrary<'a> for ErgodicValid {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let n = u.int_in_range(1..=4)?;
        let emissions = (0..n)
            .map(|_| {
                Ok(match EmissionKind::arbitrary(u)? {
                    EmissionKind::Silent => EmissionKind::Discrete,
                    kind => kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let order: u8 = u.int_in_range(0..=3)?;

        Ok(ErgodicValid(ErgodicConfig {
            emissions,
            order: usize::from(order),
            ess: arbitrary_ess(u)?,
            self_fraction: arbitrary_fraction(u, 1.0)?,
            expected_length: f64::from(order) + f64::from(u.int_in_range(1u8..=200)?),
        }))
    }
}

/// A wrapper around [`PseudoErgodicConfig`] such that the implementation of
/// [`Arbitrary`](https://docs.rs/arbitrary/latest/arbitrary/trait.Arbitrary.html)
/// only generates configurations whose graphs drain into the final state.
/// This means the final fraction is always positive.
#[derive(Debug)]
pub struct PseudoErgodicValid(pub PseudoErgodicConfig);

impl_deref! {PseudoErgodicValid, PseudoErgodicConfig}

impl<'a> Arbitrary<'a> for PseudoErgodicValid {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let self_fraction = f64::from(u.int_in_range(0u8..=99)?) / 100.0;
        let final_fraction = (1.0 - self_fraction) * f64::from(u.int_in_range(1u8..=99)?) / 100.0;

        Ok(PseudoErgodicValid(PseudoErgodicConfig {
            num_states: u.int_in_range(1..=6)?,
            ess: arbitrary_ess(u)?,
            self_fraction,
            final_fraction,
            insert_uniform: bool::arbitrary(u)?,
        }))
    }
}

/// A wrapper around [`SunflowerConfig`] such that the implementation of
/// [`Arbitrary`](https://docs.rs/arbitrary/latest/arbitrary/trait.Arbitrary.html)
/// only generates configurations that build. This means:
///
/// - There are 1 to 4 motifs of lengths 1 to 8
/// - The motif probabilities, when given, sum to at most 0.9
/// - The expected length is between 1 and 200
#[derive(Debug)]
pub struct SunflowerValid(pub SunflowerConfig);

impl_deref! {SunflowerValid, SunflowerConfig}

impl<'a> Arbitrary<'a> for SunflowerValid {
    #[allow(clippy::cast_precision_loss)]
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let motifs = u.int_in_range(1..=4)?;
        let motif_lengths = (0..motifs)
            .map(|_| u.int_in_range(1..=8))
            .collect::<Result<Vec<_>>>()?;
        let motif_probs = if bool::arbitrary(u)? {
            let share = 0.9 / motifs as f64;
            Some(
                (0..motifs)
                    .map(|_| arbitrary_fraction(u, share))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        Ok(SunflowerValid(SunflowerConfig {
            ess: arbitrary_ess(u)?,
            expected_length: u.int_in_range(1..=200)?,
            start_central: bool::arbitrary(u)?,
            motif_lengths,
            motif_probs,
            phylo: bool::arbitrary(u)?,
        }))
    }
}

/// A wrapper around [`ProfileConfig`] such that the implementation of
/// [`Arbitrary`](https://docs.rs/arbitrary/latest/arbitrary/trait.Arbitrary.html)
/// only generates configurations that build. This means:
///
/// - The architecture is one of the named ones and no custom template is used
/// - The order is 1 to 3 and there are 1 to 8 layers
/// - There is either one Match emission kind or one per layer
/// - The condition initialization, when given, is rectangular and
///   non-negative
#[derive(Debug)]
pub struct ProfileValid(pub ProfileConfig);

impl_deref! {ProfileValid, ProfileConfig}

impl<'a> Arbitrary<'a> for ProfileValid {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let num_layers = u.int_in_range(1..=8)?;
        let kinds = if bool::arbitrary(u)? { num_layers } else { 1 };
        let match_emission = (0..kinds)
            .map(|_| MatchEmission::arbitrary(u))
            .collect::<Result<Vec<_>>>()?;
        let condition_init = if bool::arbitrary(u)? {
            let rows = u.int_in_range(1..=4)?;
            let width = u.int_in_range(1..=4)?;
            Some(
                (0..rows)
                    .map(|_| (0..width).map(|_| arbitrary_fraction(u, 1.0)).collect())
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        Ok(ProfileValid(ProfileConfig {
            architecture: ProfileArchitecture::arbitrary(u)?,
            template: None,
            order: u.int_in_range(1..=3)?,
            num_layers,
            ess: arbitrary_ess(u)?,
            match_emission,
            joining_states: u.int_in_range(0..=3)?,
            condition_init,
            insert_uniform: bool::arbitrary(u)?,
        }))
    }
}
