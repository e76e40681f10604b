//! The closed set of edge variants and their shared traversal entry points.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::domain::TraverseMode;
use crate::routing::{RoutingContext, State, StateEditor};

use super::error::TraverseResult;
use super::model::VertexId;
use super::street::{StreetEdge, TimedTransfer};
use super::transit::{FrequencyAlight, FrequencyBoard, FrequencyDwell, FrequencyHop};

/// Index of an edge in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Variant tag of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    FrequencyBoard,
    FrequencyAlight,
    FrequencyHop,
    FrequencyDwell,
    TimedTransfer,
    Street,
}

/// Lightweight pointer to the edge a state came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeRef {
    pub id: EdgeId,
    pub kind: EdgeKind,
}

/// Edge payloads.
#[derive(Debug, Clone)]
pub enum Edge {
    FrequencyBoard(FrequencyBoard),
    FrequencyAlight(FrequencyAlight),
    FrequencyHop(FrequencyHop),
    FrequencyDwell(FrequencyDwell),
    TimedTransfer(TimedTransfer),
    Street(StreetEdge),
}

impl Edge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Edge::FrequencyBoard(_) => EdgeKind::FrequencyBoard,
            Edge::FrequencyAlight(_) => EdgeKind::FrequencyAlight,
            Edge::FrequencyHop(_) => EdgeKind::FrequencyHop,
            Edge::FrequencyDwell(_) => EdgeKind::FrequencyDwell,
            Edge::TimedTransfer(_) => EdgeKind::TimedTransfer,
            Edge::Street(_) => EdgeKind::Street,
        }
    }
}

/// An edge placed in the graph between two vertices.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    id: EdgeId,
    from: VertexId,
    to: VertexId,
    edge: Edge,
}

impl GraphEdge {
    pub(crate) fn new(id: EdgeId, from: VertexId, to: VertexId, edge: Edge) -> Self {
        Self { id, from, to, edge }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn from(&self) -> VertexId {
        self.from
    }

    pub fn to(&self) -> VertexId {
        self.to
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn kind(&self) -> EdgeKind {
        self.edge.kind()
    }

    pub fn reference(&self) -> EdgeRef {
        EdgeRef {
            id: self.id,
            kind: self.kind(),
        }
    }

    /// Vertex a traversal starts from in the given direction.
    pub fn source(&self, arrive_by: bool) -> VertexId {
        if arrive_by { self.to } else { self.from }
    }

    /// Vertex a traversal ends on in the given direction.
    pub fn target(&self, arrive_by: bool) -> VertexId {
        if arrive_by { self.from } else { self.to }
    }

    /// Editor for the child state reached through this edge.
    pub(crate) fn editor(&self, state: &Arc<State>, ctx: &RoutingContext) -> StateEditor {
        state.edit(self.reference(), self.target(ctx.arrive_by()))
    }

    /// Traverse this edge from `state`, in the request's direction.
    pub fn traverse(&self, state: &Arc<State>, ctx: &RoutingContext) -> TraverseResult {
        let result = match &self.edge {
            Edge::FrequencyBoard(e) => e.traverse(self, state, ctx),
            Edge::FrequencyAlight(e) => e.traverse(self, state, ctx),
            Edge::FrequencyHop(e) => e.traverse(self, state, ctx),
            Edge::FrequencyDwell(e) => e.traverse(self, state, ctx),
            Edge::TimedTransfer(e) => e.traverse(self, state, ctx),
            Edge::Street(e) => e.traverse(self, state, ctx),
        };
        if let Err(reason) = &result {
            trace!(edge = %self.id, %reason, "traversal rejected");
        }
        result
    }

    /// Relaxed traversal: board and alight edges always succeed without
    /// changing time or weight. Other edges traverse normally.
    pub fn optimistic_traverse(&self, state: &Arc<State>, ctx: &RoutingContext) -> TraverseResult {
        match &self.edge {
            Edge::FrequencyBoard(_) | Edge::FrequencyAlight(_) => {
                let mut editor = self.editor(state, ctx);
                editor.set_back_mode(TraverseMode::LegSwitch);
                editor.make_state()
            }
            _ => self.traverse(state, ctx),
        }
    }

    /// Lower bound on the seconds this edge adds.
    pub fn time_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        match &self.edge {
            Edge::FrequencyBoard(e) => e.time_lower_bound(ctx),
            Edge::FrequencyAlight(e) => e.time_lower_bound(ctx),
            Edge::FrequencyHop(e) => e.time_lower_bound(),
            Edge::FrequencyDwell(e) => e.time_lower_bound(),
            Edge::TimedTransfer(_) => 0.0,
            Edge::Street(e) => e.time_lower_bound(ctx),
        }
    }

    /// Lower bound on the weight this edge adds.
    pub fn weight_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        match &self.edge {
            Edge::FrequencyBoard(e) => e.weight_lower_bound(ctx),
            Edge::FrequencyAlight(e) => e.weight_lower_bound(ctx),
            Edge::FrequencyHop(e) => e.time_lower_bound(),
            Edge::FrequencyDwell(e) => e.time_lower_bound(),
            Edge::TimedTransfer(_) => 0.0,
            Edge::Street(e) => e.weight_lower_bound(ctx),
        }
    }
}
