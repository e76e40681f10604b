//! Search states and the editor that derives one state from another.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::calendar::ServiceDay;
use crate::domain::{RouteId, StopId, TraverseMode, Trip, TripId};
use crate::graph::{EdgeKind, EdgeRef, Rejected, VertexId};
use crate::pattern::BoardAlightType;

use super::request::RoutingRequest;

/// A boarding or alighting that needs the rider to act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAlightNote {
    pub stop: StopId,
    pub kind: BoardAlightType,
    pub boarding: bool,
}

/// Immutable snapshot of a partial path.
///
/// States link back to their parent, so a path is the chain of `back_state`
/// pointers from the final state to the origin.
#[derive(Clone)]
pub struct State {
    vertex: VertexId,
    time: i64,
    weight: f64,
    num_boardings: u32,
    ever_boarded: bool,
    trip: Option<Trip>,
    previous_trip: Option<Trip>,
    previous_stop: Option<StopId>,
    last_alighted_time: Option<i64>,
    service_day: Option<ServiceDay>,
    zone: Option<String>,
    back_mode: Option<TraverseMode>,
    non_transit_mode: TraverseMode,
    back_edge: Option<EdgeRef>,
    back_state: Option<Arc<State>>,
    notes: Vec<BoardAlightNote>,
    arrive_by: bool,
}

impl State {
    /// Origin state of a search at `vertex` and epoch second `time`.
    pub fn new(vertex: VertexId, time: i64, request: &RoutingRequest) -> Self {
        Self {
            vertex,
            time,
            weight: 0.0,
            num_boardings: 0,
            ever_boarded: false,
            trip: None,
            previous_trip: None,
            previous_stop: None,
            last_alighted_time: None,
            service_day: None,
            zone: None,
            back_mode: None,
            non_transit_mode: request.initial_non_transit_mode(),
            back_edge: None,
            back_state: None,
            notes: Vec::new(),
            arrive_by: request.arrive_by,
        }
    }

    /// Start editing a child of this state reached over `edge` at `vertex`.
    pub fn edit(self: &Arc<Self>, edge: EdgeRef, vertex: VertexId) -> StateEditor {
        StateEditor::new(self, edge, vertex)
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Epoch seconds.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn num_boardings(&self) -> u32 {
        self.num_boardings
    }

    pub fn ever_boarded(&self) -> bool {
        self.ever_boarded
    }

    /// Trip the path is currently riding.
    pub fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    pub fn trip_id(&self) -> Option<&TripId> {
        self.trip.as_ref().map(|t| &t.id)
    }

    pub fn route(&self) -> Option<&RouteId> {
        self.trip.as_ref().map(|t| &t.route)
    }

    pub fn is_on_board(&self) -> bool {
        self.trip.is_some()
    }

    /// Most recently boarded trip, kept after alighting.
    pub fn previous_trip(&self) -> Option<&Trip> {
        self.previous_trip.as_ref()
    }

    /// Stop of the most recent alighting.
    pub fn previous_stop(&self) -> Option<&StopId> {
        self.previous_stop.as_ref()
    }

    pub fn last_alighted_time(&self) -> Option<i64> {
        self.last_alighted_time
    }

    pub fn service_day(&self) -> Option<&ServiceDay> {
        self.service_day.as_ref()
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn back_mode(&self) -> Option<TraverseMode> {
        self.back_mode
    }

    pub fn non_transit_mode(&self) -> TraverseMode {
        self.non_transit_mode
    }

    pub fn back_edge(&self) -> Option<EdgeRef> {
        self.back_edge
    }

    /// True when the edge that produced this state is of `kind`.
    pub fn back_edge_is(&self, kind: EdgeKind) -> bool {
        self.back_edge.is_some_and(|e| e.kind == kind)
    }

    pub fn back_state(&self) -> Option<&Arc<State>> {
        self.back_state.as_ref()
    }

    /// Notes attached by the edge that produced this state.
    pub fn notes(&self) -> &[BoardAlightNote] {
        &self.notes
    }

    pub fn arrive_by(&self) -> bool {
        self.arrive_by
    }

    /// Weight added by the edge that produced this state.
    pub fn weight_delta(&self) -> f64 {
        self.back_state
            .as_ref()
            .map_or(0.0, |parent| self.weight - parent.weight)
    }

    /// Seconds elapsed since the search origin, whatever the direction.
    pub fn elapsed_seconds(&self, origin_time: i64) -> i64 {
        (self.time - origin_time).abs()
    }

    /// States from the origin to this one.
    pub fn path(self: &Arc<Self>) -> Vec<Arc<State>> {
        let mut path = vec![Arc::clone(self)];
        let mut current = self.back_state.as_ref();
        while let Some(state) = current {
            path.push(Arc::clone(state));
            current = state.back_state.as_ref();
        }
        path.reverse();
        path
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("vertex", &self.vertex)
            .field("time", &self.time)
            .field("weight", &self.weight)
            .field("num_boardings", &self.num_boardings)
            .field("trip", &self.trip_id())
            .field("back_edge", &self.back_edge)
            .finish_non_exhaustive()
    }
}

/// Staged changes to one child state.
///
/// An editor is created for a single traversal and consumed by
/// [`StateEditor::make_state`]. Invalid increments mark it defective, which
/// turns the traversal into a rejection.
#[derive(Debug)]
pub struct StateEditor {
    child: State,
    defective: bool,
}

impl StateEditor {
    pub fn new(parent: &Arc<State>, edge: EdgeRef, vertex: VertexId) -> Self {
        let mut child = State::clone(parent);
        child.vertex = vertex;
        child.back_edge = Some(edge);
        child.back_state = Some(Arc::clone(parent));
        child.notes = Vec::new();
        Self {
            child,
            defective: false,
        }
    }

    /// Move time by `seconds` in the search direction: later for depart-at
    /// searches, earlier for arrive-by searches.
    pub fn increment_time_in_seconds(&mut self, seconds: i64) {
        if seconds < 0 {
            warn!(seconds, "negative time increment");
            self.defective = true;
            return;
        }
        if self.child.arrive_by {
            self.child.time -= seconds;
        } else {
            self.child.time += seconds;
        }
    }

    pub fn increment_weight(&mut self, weight: f64) {
        if weight.is_nan() || weight < 0.0 {
            warn!(weight, "invalid weight increment");
            self.defective = true;
            return;
        }
        self.child.weight += weight;
    }

    /// Count a boarding.
    pub fn increment_num_boardings(&mut self) {
        self.child.num_boardings += 1;
        self.child.ever_boarded = true;
    }

    /// Board `trip`; it also becomes the previous trip for later transfers.
    pub fn set_trip(&mut self, trip: Trip) {
        self.child.previous_trip = Some(trip.clone());
        self.child.trip = Some(trip);
    }

    pub fn clear_trip(&mut self) {
        self.child.trip = None;
    }

    pub fn set_previous_stop(&mut self, stop: StopId) {
        self.child.previous_stop = Some(stop);
    }

    pub fn set_last_alighted_time(&mut self, time: i64) {
        self.child.last_alighted_time = Some(time);
    }

    pub fn set_service_day(&mut self, day: ServiceDay) {
        self.child.service_day = Some(day);
    }

    pub fn set_zone(&mut self, zone: Option<String>) {
        self.child.zone = zone;
    }

    pub fn set_back_mode(&mut self, mode: TraverseMode) {
        self.child.back_mode = Some(mode);
    }

    pub fn add_note(&mut self, note: BoardAlightNote) {
        self.child.notes.push(note);
    }

    /// Current staged time.
    pub fn time(&self) -> i64 {
        self.child.time
    }

    /// Commit the staged changes.
    pub fn make_state(self) -> Result<State, Rejected> {
        if self.defective {
            return Err(Rejected::Defective);
        }
        Ok(self.child)
    }
}
