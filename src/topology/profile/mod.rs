//! ## Profile HMMs
//!
//! A profile HMM is a chain of layers, each with up to three states: a silent
//! Delete state, an Insert state, and a Match state. Which transitions exist
//! is governed by a [`TransitionTemplate`], usually derived from one of the
//! [`ProfileArchitecture`] variants.
//!
//! Silent start (`S*`) and end (`E*`) chains with one state per Markov order
//! prime and drain the context. The last start state acts as the Match state
//! of a virtual layer before the first, and every end state acts as the Match
//! state of a virtual layer after the last, so that entering and leaving the
//! profile use the same template lookups as moving between layers. The silent
//! final state `F` absorbs all mass; optional joining states (`J*`) lead back
//! to the start chain so that the profile can be traversed repeatedly.

use super::{Prior, Topology, TopologyError, check_ess, indexed_name};
use crate::{
    emission::EmissionKind,
    graph::{Context, ContextGraph, ContextSet, GraphError},
    trace_stage,
};
use std::{fmt, str::FromStr};

mod joining;
mod state;

pub use state::ProfileState;
pub(crate) use state::*;

/// Display weight of a transition within the same layer.
const SAME_LAYER_WEIGHT: f64 = 1000.0;
/// Display weight of a transition into the next layer.
const NEXT_LAYER_WEIGHT: f64 = 1.0;

/// The named profile HMM architectures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ProfileArchitecture {
    /// No transitions between Delete and Insert states
    #[default]
    Plan7,
    /// Adds Delete to Insert within a layer
    Plan8I,
    /// Adds Insert to the next layer's Delete
    Plan8D,
    /// Both of the above
    Plan9,
}

impl FromStr for ProfileArchitecture {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLAN7" => Ok(ProfileArchitecture::Plan7),
            "PLAN8I" => Ok(ProfileArchitecture::Plan8I),
            "PLAN8D" => Ok(ProfileArchitecture::Plan8D),
            "PLAN9" => Ok(ProfileArchitecture::Plan9),
            _ => Err(TopologyError::UnknownArchitecture { name: s.to_string() }),
        }
    }
}

impl fmt::Display for ProfileArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileArchitecture::Plan7 => "PLAN7",
            ProfileArchitecture::Plan8I => "PLAN8I",
            ProfileArchitecture::Plan8D => "PLAN8D",
            ProfileArchitecture::Plan9 => "PLAN9",
        })
    }
}

/// The emission kind of a Match state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MatchEmission {
    Uniform,
    #[default]
    Unconditional,
    /// Conditioned on the aligned position of a reference sequence
    Reference,
}

/// Prior hyperparameters of the transitions leaving each state kind.
///
/// Rows are the source kind. Columns `0..3` are the Delete, Insert, and Match
/// states of the same layer and columns `3..6` those of the next layer. `None`
/// means the transition does not exist, which is different from a transition
/// with zero weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionTemplate(ProfileStateArray<[Option<f64>; 6]>);

impl TransitionTemplate {
    /// Creates a template from rows ordered Delete, Insert, Match.
    #[inline]
    #[must_use]
    pub fn new(rows: [[Option<f64>; 6]; 3]) -> Self {
        TransitionTemplate(ProfileStateArray::new(rows))
    }

    /// Creates a template from a matrix in which `NaN` marks a missing
    /// transition.
    #[must_use]
    pub fn from_nan_matrix(rows: [[f64; 6]; 3]) -> Self {
        TransitionTemplate::new(rows.map(|row| row.map(|v| if v.is_nan() { None } else { Some(v) })))
    }

    /// The template of a named architecture, spreading `ess` evenly over the
    /// transitions leaving each state kind.
    #[must_use]
    pub fn for_architecture(architecture: ProfileArchitecture, ess: f64) -> Self {
        let third = Some(ess / 3.0);
        let half = Some(ess / 2.0);
        let full = [None, third, None, third, None, third];
        let delete_plan7 = [None, None, None, half, None, half];
        let insert_plan7 = [None, half, None, None, None, half];

        match architecture {
            ProfileArchitecture::Plan7 => TransitionTemplate::new([delete_plan7, insert_plan7, full]),
            ProfileArchitecture::Plan8I => TransitionTemplate::new([full, insert_plan7, full]),
            ProfileArchitecture::Plan8D => TransitionTemplate::new([delete_plan7, full, full]),
            ProfileArchitecture::Plan9 => TransitionTemplate::new([full; 3]),
        }
    }

    /// The weight of the transition from `from` into `column`, if it exists.
    #[inline]
    #[must_use]
    pub fn weight(&self, from: ProfileState, column: usize) -> Option<f64> {
        self.0[from][column]
    }

    /// Whether the transition from `from` to `to` exists, within the same
    /// layer or into the next one.
    #[inline]
    #[must_use]
    pub fn allows(&self, from: ProfileState, to: ProfileState, next_layer: bool) -> bool {
        let column = usize::from(to) + if next_layer { 3 } else { 0 };
        self.weight(from, column).is_some()
    }
}

/// Parameters of a profile HMM.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileConfig {
    pub architecture:   ProfileArchitecture,
    /// Overrides the template derived from `architecture`
    pub template:       Option<TransitionTemplate>,
    /// The Markov order, at least 1
    pub order:          usize,
    pub num_layers:     usize,
    pub ess:            f64,
    /// Either a single kind for all Match states or one per layer
    pub match_emission: Vec<MatchEmission>,
    /// The number of joining states leading from the end back to the start.
    /// With 0 the profile is traversed once.
    pub joining_states: usize,
    /// Prior probabilities for initializing reference conditioned Match
    /// states, one row per reference symbol. They are scaled by the ESS of
    /// each state.
    pub condition_init: Option<Vec<Vec<f64>>>,
    /// Use uniform instead of discrete emissions for Insert and joining states
    pub insert_uniform: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            architecture:   ProfileArchitecture::Plan7,
            template:       None,
            order:          1,
            num_layers:     10,
            ess:            16.0,
            match_emission: vec![MatchEmission::Unconditional],
            joining_states: 0,
            condition_init: None,
            insert_uniform: false,
        }
    }
}

impl ProfileConfig {
    /// Builds the profile topology. States are ordered `E0..`, `S0..`, then
    /// `D{l}, I{l}, M{l}` for every layer `l` starting at 1, then `F`, then
    /// `J0..`. In the last layer, only the kinds allowed to move on to the
    /// next layer's Match state are created.
    ///
    /// ## Errors
    ///
    /// The order must be at least 1, there must be at least one layer, the
    /// ESS must be positive, `match_emission` must hold 1 or `num_layers`
    /// entries, and `condition_init` (when given) must be a non-empty
    /// rectangular matrix of non-negative values.
    pub fn build(&self) -> Result<Topology, TopologyError> {
        trace_stage!("profile");

        if self.order < 1 {
            return Err(TopologyError::OrderTooSmall { order: self.order });
        }
        if self.num_layers == 0 {
            return Err(TopologyError::NoLayers);
        }
        let ess = check_ess(self.ess)?;
        let found = self.match_emission.len();
        if found != 1 && found != self.num_layers {
            return Err(TopologyError::MatchEmissionMismatch {
                expected: self.num_layers,
                found,
            });
        }
        if let Some(rows) = &self.condition_init {
            check_condition_init(rows)?;
        }

        let template = self
            .template
            .unwrap_or_else(|| TransitionTemplate::for_architecture(self.architecture, ess));
        let insert = if self.insert_uniform {
            EmissionKind::Uniform
        } else {
            EmissionKind::Discrete
        };

        let mut builder = ProfileBuilder::new(self.order, ess, template);
        builder.add_start_chain()?;
        builder.add_layers(self.num_layers, &self.match_emission, insert)?;
        builder.add_end_chain()?;

        let final_state = builder.push_state("F".to_string(), EmissionKind::Silent);
        let end = Context::from((0..self.order).collect::<Vec<_>>());
        if self.joining_states == 0 {
            builder.graph.add_node(end, vec![final_state], &[ess])?;
        } else {
            builder.add_joining_states(end, final_state, self.joining_states, insert)?;
        }

        Ok(Topology {
            names:          builder.names,
            emissions:      builder.emissions,
            graph:          builder.graph,
            prior:          Prior::Propagated { ess },
            condition_init: self.condition_init.clone(),
        })
    }
}

fn check_condition_init(rows: &[Vec<f64>]) -> Result<(), TopologyError> {
    let width = rows.first().map_or(0, Vec::len);
    let valid = width > 0
        && rows
            .iter()
            .all(|row| row.len() == width && row.iter().all(|v| v.is_finite() && *v >= 0.0));
    if valid {
        Ok(())
    } else {
        Err(TopologyError::ConditionInitMismatch)
    }
}

/// Incrementally populates the states and context graph of a profile HMM.
struct ProfileBuilder {
    order:      usize,
    ess:        f64,
    template:   TransitionTemplate,
    names:      Vec<String>,
    emissions:  Vec<EmissionKind>,
    graph:      ContextGraph,
    window:     LayerWindow,
    /// Contexts ending in a state of the current layer of `window`
    last_layer: ContextSet,
}

impl ProfileBuilder {
    fn new(order: usize, ess: f64, template: TransitionTemplate) -> Self {
        ProfileBuilder {
            order,
            ess,
            template,
            names: Vec::new(),
            emissions: Vec::new(),
            graph: ContextGraph::new(order),
            window: LayerWindow::default(),
            last_layer: ContextSet::new(),
        }
    }

    fn push_state(&mut self, name: String, emission: EmissionKind) -> usize {
        self.names.push(name);
        self.emissions.push(emission);
        self.names.len() - 1
    }

    /// The index of start chain state `i`.
    #[inline]
    fn start_state(&self, i: usize) -> usize {
        self.order + i
    }

    /// Adds the end chain states, then the start chain states together with
    /// the nodes leading from the empty context through the start chain.
    fn add_start_chain(&mut self) -> Result<(), GraphError> {
        for i in 0..self.order {
            self.push_state(indexed_name("E", i), EmissionKind::Silent);
        }
        for i in 0..self.order {
            let state = self.push_state(indexed_name("S", i), EmissionKind::Silent);
            let context: Vec<usize> = (0..i).map(|k| self.start_state(k)).collect();
            self.graph.add_node(context, vec![state], &[self.ess])?;
        }

        let begin: Vec<usize> = (0..self.order).map(|k| self.start_state(k)).collect();
        self.window = LayerWindow::entering(self.start_state(self.order - 1));
        self.last_layer.clear();
        self.last_layer.insert(Context::from(begin));
        Ok(())
    }

    fn add_layers(&mut self, num_layers: usize, match_emission: &[MatchEmission], insert: EmissionKind) -> Result<(), GraphError> {
        let mut reference = 0;
        for layer in 1..=num_layers {
            let created = ProfileStateArray::new(ProfileState::ALL.map(|kind| {
                layer < num_layers || self.template.allows(kind, ProfileState::Match, true)
            }));

            let match_kind = match_emission[if match_emission.len() == 1 { 0 } else { layer - 1 }];
            let mut next = ProfileStateArray::<Option<usize>>::default();
            for (kind, &create) in created.iter() {
                if !create {
                    continue;
                }
                let emission = match kind {
                    ProfileState::Delete => EmissionKind::Silent,
                    ProfileState::Insert => insert,
                    ProfileState::Match => match match_kind {
                        MatchEmission::Uniform => EmissionKind::Uniform,
                        MatchEmission::Unconditional => EmissionKind::Discrete,
                        MatchEmission::Reference => {
                            reference += 1;
                            EmissionKind::ReferenceDiscrete { reference: reference - 1 }
                        }
                    },
                };
                next[kind] = Some(self.push_state(indexed_name(kind.prefix(), layer), emission));
            }

            self.window.advance(next);
            self.expand_layer()?;
        }
        Ok(())
    }

    /// Leads the contexts of the last layer through the end chain, treating
    /// each end state as the Match state of a further layer.
    fn add_end_chain(&mut self) -> Result<(), GraphError> {
        for i in 0..self.order {
            let mut next = ProfileStateArray::<Option<usize>>::default();
            next[ProfileState::Match] = Some(i);
            self.window.advance(next);
            self.expand_layer()?;
        }
        Ok(())
    }

    /// Adds a node for every context of the current layer. Successors within
    /// the current layer are expanded in the same sweep, while successors in
    /// the next layer are collected for the following one.
    fn expand_layer(&mut self) -> Result<(), GraphError> {
        let mut next_layer = ContextSet::new();
        let mut i = 0;
        while i < self.last_layer.len() {
            let current = self.last_layer[i].clone();
            i += 1;

            let Some(kind) = current.newest().and_then(|s| self.window.kind_of(s)) else {
                continue;
            };

            let mut children = Vec::new();
            let mut prior = Vec::new();
            let mut display = Vec::new();
            for column in 0..6 {
                if let (Some(weight), Some(state)) = (self.template.weight(kind, column), self.window.slot(column)) {
                    let same_layer = column < 3;
                    let next = current.shifted(state);
                    if same_layer {
                        self.last_layer.insert(next);
                    } else {
                        next_layer.insert(next);
                    }
                    children.push(state);
                    prior.push(weight);
                    display.push(if same_layer { SAME_LAYER_WEIGHT } else { NEXT_LAYER_WEIGHT });
                }
            }
            if children.is_empty() {
                continue;
            }
            self.graph.add_weighted_node(current, children, &prior, Some(&display))?;
        }

        self.last_layer = next_layer;
        Ok(())
    }
}
