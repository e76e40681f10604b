//! Street and timed-transfer edges.

use std::sync::Arc;

use crate::domain::{TraverseMode, TraverseModeSet};
use crate::routing::{RoutingContext, State};

use super::edge::GraphEdge;
use super::error::{Rejected, TraverseResult};

/// A walkable or cyclable street segment.
#[derive(Debug, Clone)]
pub struct StreetEdge {
    name: String,
    length_m: f64,
    permission: TraverseModeSet,
}

impl StreetEdge {
    pub fn new(name: impl Into<String>, length_m: f64, permission: TraverseModeSet) -> Self {
        Self {
            name: name.into(),
            length_m,
            permission,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length_m(&self) -> f64 {
        self.length_m
    }

    pub fn permission(&self) -> TraverseModeSet {
        self.permission
    }

    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        if state.is_on_board() {
            return Err(Rejected::AlreadyOnBoard);
        }
        let mode = state.non_transit_mode();
        if !ctx.request().modes.contains(mode) || !self.permission.contains(mode) {
            return Err(Rejected::ModeNotAllowed(mode));
        }

        let thresholds = &ctx.request().environmental_thresholds;
        if !thresholds.is_empty() {
            let conditions = ctx.graph().conditions(edge.id());
            let exceeded = conditions
                .iter()
                .any(|factor| thresholds.iter().any(|t| !t.allows(factor)));
            if exceeded {
                return Err(Rejected::EnvironmentalLimit);
            }
        }

        let cost = ctx.cost();
        let seconds = cost.street_seconds(self.length_m, mode).ceil();
        let mut editor = edge.editor(state, ctx);
        editor.increment_time_in_seconds(seconds as i64);
        editor.increment_weight(cost.street_weight(seconds, mode));
        editor.set_back_mode(mode);
        editor.make_state()
    }

    /// Length at the fastest allowed speed.
    pub fn time_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        self.length_m / ctx.request().max_street_speed()
    }

    pub fn weight_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        self.time_lower_bound(ctx) * ctx.cost().min_street_reluctance()
    }
}

/// Zero-cost link between two stops where vehicles wait for each other.
///
/// Boarding after this edge is only allowed when the transfer table marks
/// the transfer as timed.
#[derive(Debug, Clone, Default)]
pub struct TimedTransfer;

impl TimedTransfer {
    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        if state.is_on_board() {
            return Err(Rejected::AlreadyOnBoard);
        }
        let mut editor = edge.editor(state, ctx);
        editor.set_back_mode(TraverseMode::Walk);
        editor.make_state()
    }
}
