use super::{Prior, Topology, TopologyError, check_ess, check_fraction};
use crate::{
    emission::{EmissionKind, PhyloTree},
    graph::{Context, ContextGraph},
    trace_stage,
};

/// Parameters of a first order sunflower HMM: a central background state with
/// one linear petal per motif, each closing back into the centre.
#[derive(Clone, Debug, PartialEq)]
pub struct SunflowerConfig {
    pub ess:             f64,
    /// The number of rounds used to estimate the visitation mass of each state
    pub expected_length: usize,
    /// Start in the centre only, instead of in any state
    pub start_central:   bool,
    /// The length of each motif
    pub motif_lengths:   Vec<usize>,
    /// The prior probability of entering each motif from the centre. Defaults
    /// to `0.1 / motifs` each.
    pub motif_probs:     Option<Vec<f64>>,
    /// Use phylogenetic emissions, with the background tree for the centre and
    /// the motif tree for the petals
    pub phylo:           bool,
}

impl Default for SunflowerConfig {
    fn default() -> Self {
        SunflowerConfig {
            ess:             4.0,
            expected_length: 100,
            start_central:   true,
            motif_lengths:   vec![6],
            motif_probs:     None,
            phylo:           false,
        }
    }
}

impl SunflowerConfig {
    /// Builds the sunflower topology. State 0 is the centre `bg`, followed by
    /// the positions of every motif, named `motif m position p`.
    ///
    /// The prior mass of each transition and state is estimated by running
    /// `expected_length` synchronous rounds: the mass in the centre either
    /// stays or enters the head of a petal, petal mass moves forward one
    /// position per round, and the mass leaving the petal tails returns to
    /// the centre.
    ///
    /// ## Errors
    ///
    /// The ESS must be positive, the expected length non-zero, every motif
    /// non-empty, and the motif probabilities (one per motif) must lie in
    /// [0, 1] with a sum of at most 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(&self) -> Result<Topology, TopologyError> {
        trace_stage!("sunflower");

        let ess = check_ess(self.ess)?;
        if self.expected_length == 0 {
            return Err(TopologyError::ExpectedLengthTooShort);
        }
        if let Some(motif) = self.motif_lengths.iter().position(|&l| l == 0) {
            return Err(TopologyError::EmptyMotif { motif });
        }

        let k = self.motif_lengths.len();
        let probs = match &self.motif_probs {
            Some(probs) if probs.len() != k => {
                return Err(TopologyError::MotifProbabilityMismatch {
                    expected: k,
                    found:    probs.len(),
                });
            }
            Some(probs) => probs
                .iter()
                .map(|&p| check_fraction("motif_probs", p))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![0.1 / k as f64; k],
        };
        let stay: f64 = 1.0 - probs.iter().sum::<f64>();
        if stay < 0.0 {
            return Err(TopologyError::FractionsExceedOne);
        }

        // The first state of each motif
        let mut heads = Vec::with_capacity(k);
        let mut num_states = 1;
        for &len in &self.motif_lengths {
            heads.push(num_states);
            num_states += len;
        }

        let mut petals: Vec<Vec<f64>> = self.motif_lengths.iter().map(|&len| vec![0.0; len]).collect();
        let mut graph = ContextGraph::new(1);

        let centre = if self.start_central {
            graph.add_node(Context::empty(), vec![0], &[ess])?;
            ess
        } else {
            let mut start = vec![ess * stay; num_states];
            for (m, petal) in petals.iter_mut().enumerate() {
                let share = probs[m] * ess / petal.len() as f64;
                petal.fill(share);
                start[heads[m]..heads[m] + petal.len()].fill(share);
            }
            graph.add_node(Context::empty(), (0..num_states).collect(), &start)?;
            ess * stay
        };

        let (centre_ess, petal_ess, centre_hyper) = estimate_visits(&probs, stay, centre, petals, self.expected_length);

        let mut centre_children = Vec::with_capacity(k + 1);
        centre_children.push(0);
        centre_children.extend_from_slice(&heads);
        graph.add_node([0], centre_children, &centre_hyper)?;

        let mut state_ess = Vec::with_capacity(num_states);
        state_ess.push(centre_ess);
        for (m, visits) in petal_ess.iter().enumerate() {
            let head = heads[m];
            for (p, &mass) in visits.iter().enumerate() {
                let next = if p + 1 == visits.len() { 0 } else { head + p + 1 };
                graph.add_node([head + p], vec![next], &[mass])?;
                state_ess.push(mass);
            }
        }

        let mut names = Vec::with_capacity(num_states);
        names.push("bg".to_string());
        for (m, &len) in self.motif_lengths.iter().enumerate() {
            names.extend((0..len).map(|p| format!("motif {m} position {p}")));
        }

        let (background, motif) = if self.phylo {
            (
                EmissionKind::PhyloDiscrete {
                    tree: PhyloTree::Background,
                },
                EmissionKind::PhyloDiscrete { tree: PhyloTree::Motif },
            )
        } else {
            (EmissionKind::Discrete, EmissionKind::Discrete)
        };
        let mut emissions = vec![motif; num_states];
        emissions[0] = background;

        Ok(Topology {
            names,
            emissions,
            graph,
            prior: Prior::Fixed { state_ess },
            condition_init: None,
        })
    }
}

/// Runs the synchronous visitation rounds starting from the given centre and
/// petal masses. Returns the accumulated visits of the centre, the
/// accumulated visits of every petal position, and the transition mass
/// leaving the centre (to itself, then to each petal head).
fn estimate_visits(
    probs: &[f64], stay: f64, mut centre: f64, mut petals: Vec<Vec<f64>>, rounds: usize,
) -> (f64, Vec<Vec<f64>>, Vec<f64>) {
    let mut centre_ess = 0.0;
    let mut petal_ess: Vec<Vec<f64>> = petals.iter().map(|p| vec![0.0; p.len()]).collect();
    let mut hyper = vec![0.0; probs.len() + 1];

    for _ in 0..rounds {
        let returning: f64 = petals.iter().filter_map(|p| p.last()).sum();

        for (m, petal) in petals.iter_mut().enumerate() {
            for (acc, &mass) in petal_ess[m].iter_mut().zip(petal.iter()) {
                *acc += mass;
            }
            petal.rotate_right(1);
            petal[0] = probs[m] * centre;
            hyper[m + 1] += petal[0];
        }

        centre_ess += centre;
        hyper[0] += stay * centre;
        centre = returning + stay * centre;
    }

    (centre_ess, petal_ess, hyper)
}
