use super::ProfileBuilder;
use crate::{
    emission::EmissionKind,
    graph::{Context, ContextSet, GraphError},
    topology::indexed_name,
};

impl ProfileBuilder {
    /// Closes the profile into a loop: the end context leads to the final
    /// state or the first of `count` joining states. Each joining state may
    /// repeat, move on to the next joining state, or return to the start
    /// chain, whose remaining states then lead back to the first layer.
    pub(super) fn add_joining_states(
        &mut self, end: Context, final_state: usize, count: usize, emission: EmissionKind,
    ) -> Result<(), GraphError> {
        let first = self.names.len();
        self.graph.add_node(end.clone(), vec![final_state, first], &[self.ess / 2.0; 2])?;
        for j in 0..count {
            self.push_state(indexed_name("J", j), emission);
        }

        let restart = self.start_state(0);
        let mut pending = vec![ContextSet::new(); count];
        pending[0].insert(end.shifted(first));
        let mut returning = ContextSet::new();

        for j in 0..count {
            let state = first + j;
            let (children, prior) = if j + 1 == count {
                (vec![state, restart], vec![self.ess / 2.0; 2])
            } else {
                (vec![state, state + 1, restart], vec![self.ess / 3.0; 3])
            };

            let mut i = 0;
            while i < pending[j].len() {
                let context = pending[j][i].clone();
                i += 1;
                for &child in &children {
                    let next = context.shifted(child);
                    if child == restart {
                        returning.insert(next);
                    } else {
                        pending[child - first].insert(next);
                    }
                }
                self.graph.add_node(context, children.clone(), &prior)?;
            }
        }

        // Walk back up the start chain until the context is the one entering
        // the first layer
        let mut chain = ContextSet::new();
        for mut context in returning {
            for i in 1..self.order {
                let state = self.start_state(i);
                let next = context.shifted(state);
                if chain.insert(context.clone()) {
                    self.graph.add_node(context, vec![state], &[self.ess])?;
                }
                context = next;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(joining = count, restarts = chain.len(), "closed profile loop");

        Ok(())
    }
}
