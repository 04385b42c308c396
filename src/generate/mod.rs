use crate::graph::{ClosedGraph, NodeId};
use rand_xoshiro::{
    Xoshiro256PlusPlus,
    rand_core::{RngCore, SeedableRng},
};

/// Draws seeded random walks through a [`ClosedGraph`], following each edge
/// with its normalized prior probability.
pub struct WalkSampler<'a> {
    graph: &'a ClosedGraph,
    rng:   Xoshiro256PlusPlus,
}

impl<'a> WalkSampler<'a> {
    #[must_use]
    pub fn new(graph: &'a ClosedGraph, seed: u64) -> Self {
        WalkSampler {
            graph,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// A uniform sample from `[0, 1)` using the upper 53 bits.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn uniform(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Walks from the start node until an absorbing node is reached or
    /// `max_steps` edges were taken. The returned path includes the start.
    pub fn walk(&mut self, max_steps: usize) -> Vec<NodeId> {
        let mut node = self.graph.start();
        let mut path = vec![node];

        for _ in 0..max_steps {
            let current = self.graph.node(node);
            if current.is_absorbing() {
                break;
            }

            // Rounding may leave u above the total probability, in which case
            // the last edge is taken
            let mut u = self.uniform();
            let mut next = None;
            for (p, child) in current.edges() {
                next = Some(child);
                if u < p {
                    break;
                }
                u -= p;
            }

            let Some(child) = next else {
                break;
            };
            node = child;
            path.push(node);
        }

        path
    }
}

/// Draws a single seeded random walk, see [`WalkSampler::walk`].
#[must_use]
pub fn random_walk(graph: &ClosedGraph, seed: u64, max_steps: usize) -> Vec<NodeId> {
    WalkSampler::new(graph, seed).walk(max_steps)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{assert_fp_eq, topology::PseudoErgodicConfig};

    fn graph() -> ClosedGraph {
        PseudoErgodicConfig {
            num_states: 3,
            ess: 12.0,
            self_fraction: 0.5,
            final_fraction: 0.2,
            insert_uniform: false,
        }
        .build()
        .unwrap()
        .graph()
        .clone()
        .close()
        .unwrap()
    }

    #[test]
    fn walks_end_absorbed() {
        let graph = graph();
        let mut sampler = WalkSampler::new(&graph, 7);
        for _ in 0..100 {
            let path = sampler.walk(10_000);
            assert_eq!(path[0], graph.start());
            let last = *path.last().unwrap();
            assert!(graph.absorbing().contains(&last));
        }
    }

    #[test]
    fn walks_are_seeded() {
        let graph = graph();
        assert_eq!(random_walk(&graph, 42, 1000), random_walk(&graph, 42, 1000));
    }

    #[test]
    fn max_steps_bounds_walk() {
        let graph = graph();
        assert_eq!(random_walk(&graph, 3, 0), vec![graph.start()]);
        assert!(random_walk(&graph, 3, 2).len() <= 3);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn visits_match_propagation() {
        const WALKS: usize = 20_000;

        let graph = graph();
        let ess = 12.0;
        let expected = graph.propagate_ess(ess).unwrap();

        let mut visits = vec![0usize; graph.len()];
        let mut sampler = WalkSampler::new(&graph, 2024);
        for _ in 0..WALKS {
            for node in sampler.walk(100_000) {
                visits[node.index()] += 1;
            }
        }

        for (count, cumulated) in visits.iter().zip(expected.cumulated()) {
            assert_fp_eq!(@absolute, *count as f64 / WALKS as f64, cumulated / ess, 0.1);
        }
    }
}
