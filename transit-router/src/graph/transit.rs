//! Traversal of frequency-based transit edges.
//!
//! Boarding and alighting are mirror images. Going forward in time a path
//! finds its vehicle on the board edge; going backward it finds it on the
//! alight edge. Either way the edge that finds the vehicle runs the same
//! sequence: mode check, transfer rules, trip bans, a scan of the service-day
//! window for the nearest vehicle, route bans and preferences, then the fork.
//! The other edge of the pair only records where the path left the vehicle.

use std::sync::Arc;

use tracing::error;

use crate::calendar::ServiceDay;
use crate::domain::{StopId, TraverseMode};
use crate::pattern::{BoardAlightType, FrequencyPattern};
use crate::routing::{BoardAlightNote, BoardingCost, RoutingContext, State, StateEditor};
use crate::transfer::{TransferTime, determine_transfer_penalty};

use super::edge::{EdgeKind, GraphEdge};
use super::error::{Rejected, TraverseResult};

/// Step from a stop onto a vehicle of a frequency pattern.
#[derive(Debug, Clone)]
pub struct FrequencyBoard {
    pattern: Arc<FrequencyPattern>,
    stop_index: usize,
}

/// Step off a vehicle of a frequency pattern onto a stop.
#[derive(Debug, Clone)]
pub struct FrequencyAlight {
    pattern: Arc<FrequencyPattern>,
    stop_index: usize,
}

/// Ride between two consecutive stops of a pattern.
#[derive(Debug, Clone)]
pub struct FrequencyHop {
    pattern: Arc<FrequencyPattern>,
    from_index: usize,
    to_index: usize,
}

/// Stay on board while the vehicle waits at a stop.
#[derive(Debug, Clone)]
pub struct FrequencyDwell {
    pattern: Arc<FrequencyPattern>,
    stop_index: usize,
}

impl FrequencyBoard {
    pub fn new(pattern: Arc<FrequencyPattern>, stop_index: usize) -> Self {
        Self {
            pattern,
            stop_index,
        }
    }

    pub fn pattern(&self) -> &FrequencyPattern {
        &self.pattern
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        let side = Side {
            pattern: &self.pattern,
            stop_index: self.stop_index,
            kind: EdgeKind::FrequencyBoard,
            boarding: true,
        };
        if ctx.arrive_by() {
            side.leave(edge, state, ctx)
        } else {
            side.find_vehicle(edge, state, ctx)
        }
    }

    /// Depart-at: 0 when the mode is allowed and the service runs in the
    /// window, otherwise infinity. Arrive-by: 0.
    pub fn time_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        if ctx.arrive_by() {
            0.0
        } else {
            service_reachable(&self.pattern, ctx)
        }
    }

    /// Depart-at: the time bound. Arrive-by: the smallest board cost.
    /// The board-cost bound holds per ride, not per edge: an arrive-by ride
    /// pays the board cost at its alight edge, and this edge costs less.
    pub fn weight_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        if ctx.arrive_by() {
            ctx.request().board_cost_lower_bound()
        } else {
            self.time_lower_bound(ctx)
        }
    }
}

impl FrequencyAlight {
    pub fn new(pattern: Arc<FrequencyPattern>, stop_index: usize) -> Self {
        Self {
            pattern,
            stop_index,
        }
    }

    pub fn pattern(&self) -> &FrequencyPattern {
        &self.pattern
    }

    pub fn stop_index(&self) -> usize {
        self.stop_index
    }

    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        let side = Side {
            pattern: &self.pattern,
            stop_index: self.stop_index,
            kind: EdgeKind::FrequencyAlight,
            boarding: false,
        };
        if ctx.arrive_by() {
            side.find_vehicle(edge, state, ctx)
        } else {
            side.leave(edge, state, ctx)
        }
    }

    /// Arrive-by: 0 when the mode is allowed and the service runs in the
    /// window, otherwise infinity. Depart-at: 0.
    pub fn time_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        if ctx.arrive_by() {
            service_reachable(&self.pattern, ctx)
        } else {
            0.0
        }
    }

    /// Arrive-by: the time bound. Depart-at: the smallest board cost.
    /// The board-cost bound holds per ride, not per edge: a depart-at ride
    /// pays the board cost at its board edge, and this edge costs less.
    pub fn weight_lower_bound(&self, ctx: &RoutingContext) -> f64 {
        if ctx.arrive_by() {
            self.time_lower_bound(ctx)
        } else {
            ctx.request().board_cost_lower_bound()
        }
    }
}

fn service_reachable(pattern: &FrequencyPattern, ctx: &RoutingContext) -> f64 {
    if ctx.request().modes.contains(pattern.mode())
        && ctx.service_days().any_running(pattern.service_id())
    {
        0.0
    } else {
        f64::INFINITY
    }
}

/// One end of a ride: a board or alight edge at a pattern stop.
struct Side<'a> {
    pattern: &'a FrequencyPattern,
    stop_index: usize,
    kind: EdgeKind,
    boarding: bool,
}

impl Side<'_> {
    fn stop(&self) -> Result<&StopId, Rejected> {
        self.pattern
            .stop(self.stop_index)
            .map(|s| &s.stop)
            .ok_or(Rejected::BoardAlightNotAvailable)
    }

    fn board_alight_type(&self) -> BoardAlightType {
        if self.boarding {
            self.pattern.board_type(self.stop_index)
        } else {
            self.pattern.alight_type(self.stop_index)
        }
    }

    /// Reject stops where this side is unavailable; note ones that need
    /// the rider to act.
    fn check_board_alight_type(&self, editor: &mut StateEditor) -> Result<(), Rejected> {
        let kind = self.board_alight_type();
        match kind {
            BoardAlightType::Regular => Ok(()),
            BoardAlightType::NotAvailable => Err(Rejected::BoardAlightNotAvailable),
            BoardAlightType::MustPhone | BoardAlightType::CoordinateWithDriver => {
                editor.add_note(BoardAlightNote {
                    stop: self.stop()?.clone(),
                    kind,
                    boarding: self.boarding,
                });
                Ok(())
            }
        }
    }

    /// Step off the vehicle: alight going forward, board going backward.
    fn leave(&self, edge: &GraphEdge, state: &Arc<State>, ctx: &RoutingContext) -> TraverseResult {
        // Without a dwell between them, an immediate second board/alight
        // would loop back onto the same vehicle
        if state.back_edge_is(self.kind) {
            return Err(Rejected::RepeatedBoardAlight);
        }
        let stop = self.stop()?.clone();
        let mut editor = edge.editor(state, ctx);
        self.check_board_alight_type(&mut editor)?;
        editor.clear_trip();
        editor.set_last_alighted_time(state.time());
        editor.set_previous_stop(stop);
        editor.set_back_mode(TraverseMode::LegSwitch);
        editor.make_state()
    }

    /// Find the nearest vehicle and get on it: board going forward, alight
    /// going backward.
    fn find_vehicle(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        let request = ctx.request();
        let pattern = self.pattern;
        let trip = pattern.trip();
        let forward = !ctx.arrive_by();

        if !request.modes.contains(pattern.mode()) {
            return Err(Rejected::ModeNotAllowed(pattern.mode()));
        }

        let stop = self.stop()?;
        let mut current_time = state.time();
        let mut transfer_penalty = 0.0;
        if state.ever_boarded() {
            let transfer = match (state.previous_stop(), state.previous_trip()) {
                (Some(previous_stop), Some(previous_trip)) => ctx.transfers().transfer_time(
                    previous_stop,
                    stop,
                    previous_trip,
                    trip,
                    forward,
                ),
                _ => TransferTime::Unknown,
            };
            if transfer == TransferTime::Forbidden {
                return Err(Rejected::ForbiddenTransfer);
            }
            let slack = transfer.minimum_seconds().filter(|&min| min > 0);
            if let (Some(min), Some(last_alighted)) = (slack, state.last_alighted_time()) {
                current_time = if forward {
                    current_time.max(last_alighted + i64::from(min))
                } else {
                    current_time.min(last_alighted - i64::from(min))
                };
            }
            transfer_penalty =
                determine_transfer_penalty(transfer, request.nonpreferred_transfer_penalty);

            let via_timed_edge = state.back_edge_is(EdgeKind::TimedTransfer);
            let timed = transfer == TransferTime::Timed;
            if via_timed_edge && !timed {
                return Err(Rejected::NotTimedTransfer);
            }
            if timed && !via_timed_edge {
                return Err(Rejected::TimedTransferMissing);
            }
        }

        // Frequency trips have no per-vehicle identity, so banning is
        // whole-trip only.
        if request.banned_trips.contains(&trip.id) {
            return Err(Rejected::BannedTrip);
        }

        let Some((wait, service_day)) = self.nearest_vehicle(state, current_time, ctx) else {
            return Err(Rejected::NoService);
        };
        if wait < 0 {
            return Err(Rejected::NegativeWait);
        }

        if request.trip_is_banned(trip) {
            return Err(Rejected::BannedRoute);
        }
        let preference_penalty = request.preferences_penalty_for_trip(trip);

        let mut editor = edge.editor(state, ctx);
        self.check_board_alight_type(&mut editor)?;
        editor.set_service_day(service_day.clone());
        editor.increment_time_in_seconds(wait);
        editor.increment_num_boardings();
        editor.set_trip(trip.clone());
        editor.set_zone(pattern.zone(self.stop_index).map(str::to_owned));
        editor.increment_weight(ctx.cost().boarding_delta(&BoardingCost {
            wait,
            first_boarding: !state.ever_boarded(),
            transfer_penalty,
            preference_penalty,
            non_transit_mode: state.non_transit_mode(),
        }));
        editor.set_back_mode(TraverseMode::LegSwitch);
        editor.make_state()
    }

    /// Scan yesterday, today and tomorrow for the vehicle closest to
    /// `current_time` on the search's side of it. Returns the wait from the
    /// state's own time and the day the vehicle runs on.
    fn nearest_vehicle<'c>(
        &self,
        state: &State,
        current_time: i64,
        ctx: &'c RoutingContext,
    ) -> Option<(i64, &'c ServiceDay)> {
        let pattern = self.pattern;
        let forward = !ctx.arrive_by();
        let wheelchair = ctx.request().wheelchair_accessible;
        let bikes = state.non_transit_mode() == TraverseMode::Bicycle;

        let mut hits = Vec::with_capacity(3);
        for day in ctx.service_days().iter() {
            let since_midnight = day.seconds_since_midnight(current_time);
            // Days starting after the reference time cannot run the vehicle
            if since_midnight < 0 || !day.service_id_running(pattern.service_id()) {
                continue;
            }
            let Ok(since_midnight) = i32::try_from(since_midnight) else {
                continue;
            };
            let hit = if forward {
                pattern.next_departure_time(self.stop_index, since_midnight, wheelchair, bikes, true)
            } else {
                pattern.previous_arrival_time(self.stop_index, since_midnight, wheelchair, bikes, true)
            };
            let Some(hit) = hit else {
                continue;
            };
            let wait = if forward {
                day.time(hit) - state.time()
            } else {
                state.time() - day.time(hit)
            };
            if wait < 0 {
                error!(
                    trip = %pattern.trip().id,
                    stop_index = self.stop_index,
                    wait,
                    date = %day.date(),
                    "negative wait time"
                );
            }
            hits.push((wait, day));
        }
        nearest(hits)
    }
}

/// Pick the smallest wait among per-day hits, in day order. Ties keep the
/// earlier day. A negative wait never replaces a valid one and is itself
/// replaced by any later hit, so the result is negative only when every hit
/// is.
fn nearest<T>(hits: impl IntoIterator<Item = (i64, T)>) -> Option<(i64, T)> {
    let mut best: Option<(i64, T)> = None;
    for (wait, day) in hits {
        if best
            .as_ref()
            .is_none_or(|&(best_wait, _)| best_wait < 0 || (0..best_wait).contains(&wait))
        {
            best = Some((wait, day));
        }
    }
    best
}

impl FrequencyHop {
    pub fn new(pattern: Arc<FrequencyPattern>, from_index: usize, to_index: usize) -> Self {
        Self {
            pattern,
            from_index,
            to_index,
        }
    }

    pub fn pattern(&self) -> &FrequencyPattern {
        &self.pattern
    }

    fn ride_seconds(&self) -> i64 {
        self.pattern
            .ride_time(self.from_index, self.to_index)
            .map_or(0, i64::from)
    }

    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        ride(&self.pattern, self.ride_seconds(), edge, state, ctx)
    }

    pub fn time_lower_bound(&self) -> f64 {
        self.ride_seconds() as f64
    }
}

impl FrequencyDwell {
    pub fn new(pattern: Arc<FrequencyPattern>, stop_index: usize) -> Self {
        Self {
            pattern,
            stop_index,
        }
    }

    pub fn pattern(&self) -> &FrequencyPattern {
        &self.pattern
    }

    fn dwell_seconds(&self) -> i64 {
        self.pattern.dwell_time(self.stop_index).map_or(0, i64::from)
    }

    pub(crate) fn traverse(
        &self,
        edge: &GraphEdge,
        state: &Arc<State>,
        ctx: &RoutingContext,
    ) -> TraverseResult {
        ride(&self.pattern, self.dwell_seconds(), edge, state, ctx)
    }

    pub fn time_lower_bound(&self) -> f64 {
        self.dwell_seconds() as f64
    }
}

/// Stay on the pattern's vehicle for `seconds`.
fn ride(
    pattern: &FrequencyPattern,
    seconds: i64,
    edge: &GraphEdge,
    state: &Arc<State>,
    ctx: &RoutingContext,
) -> TraverseResult {
    if state.trip_id() != Some(&pattern.trip().id) {
        return Err(Rejected::NotOnTrip);
    }
    let mut editor = edge.editor(state, ctx);
    editor.increment_time_in_seconds(seconds);
    editor.increment_weight(seconds as f64);
    editor.set_back_mode(pattern.mode());
    editor.make_state()
}
