//! Per-query routing preferences.

use std::collections::HashSet;

use crate::domain::{
    EnvironmentalFactorThreshold, RouteId, TraverseMode, TraverseModeSet, Trip, TripId,
    parse_thresholds,
};

/// Routing preferences for one query.
///
/// Defaults follow common journey-planner values: waiting is slightly cheaper
/// than riding, the first wait is discounted, and every boarding costs ten
/// minutes.
#[derive(Debug, Clone)]
pub struct RoutingRequest {
    /// Search backward from a desired arrival time.
    pub arrive_by: bool,

    /// Modes the traveller accepts.
    pub modes: TraverseModeSet,

    /// Trips that must not be used. Banning is whole-trip only.
    pub banned_trips: HashSet<TripId>,

    /// Routes that must not be used.
    pub banned_routes: HashSet<RouteId>,

    /// When non-empty, routes outside this set are penalised.
    pub preferred_routes: HashSet<RouteId>,

    /// Routes that are penalised.
    pub unpreferred_routes: HashSet<RouteId>,

    /// Penalty (seconds) for using a route outside `preferred_routes`.
    pub other_than_preferred_routes_penalty: f64,

    /// Penalty (seconds) for using a route in `unpreferred_routes`.
    pub unpreferred_route_penalty: f64,

    /// Cost multiplier for waiting at a stop.
    pub wait_reluctance: f64,

    /// Cost multiplier for the wait before the first boarding.
    pub wait_at_beginning_factor: f64,

    /// Cost multiplier for walking time.
    pub walk_reluctance: f64,

    /// Walking speed in metres per second.
    pub walk_speed: f64,

    /// Cycling speed in metres per second.
    pub bike_speed: f64,

    /// Cost of boarding while walking.
    pub walk_board_cost: f64,

    /// Cost of boarding while carrying a bicycle.
    pub bike_board_cost: f64,

    /// Cost of a transfer that is neither timed nor preferred.
    pub nonpreferred_transfer_penalty: f64,

    /// Only use wheelchair-accessible vehicles and stops.
    pub wheelchair_accessible: bool,

    /// Limits on environmental exposure along streets.
    pub environmental_thresholds: Vec<EnvironmentalFactorThreshold>,
}

impl Default for RoutingRequest {
    fn default() -> Self {
        Self {
            arrive_by: false,
            modes: TraverseModeSet::walk_and_transit(),
            banned_trips: HashSet::new(),
            banned_routes: HashSet::new(),
            preferred_routes: HashSet::new(),
            unpreferred_routes: HashSet::new(),
            other_than_preferred_routes_penalty: 300.0,
            unpreferred_route_penalty: 300.0,
            wait_reluctance: 0.95,
            wait_at_beginning_factor: 0.4,
            walk_reluctance: 2.0,
            walk_speed: 1.33,
            bike_speed: 5.0,
            walk_board_cost: 600.0,
            bike_board_cost: 600.0,
            nonpreferred_transfer_penalty: 180.0,
            wheelchair_accessible: false,
            environmental_thresholds: Vec::new(),
        }
    }
}

impl RoutingRequest {
    /// Create a request with default preferences.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arrive_by(mut self, arrive_by: bool) -> Self {
        self.arrive_by = arrive_by;
        self
    }

    pub fn with_modes(mut self, modes: TraverseModeSet) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_banned_trip(mut self, trip: TripId) -> Self {
        self.banned_trips.insert(trip);
        self
    }

    pub fn with_banned_route(mut self, route: RouteId) -> Self {
        self.banned_routes.insert(route);
        self
    }

    pub fn with_preferred_route(mut self, route: RouteId) -> Self {
        self.preferred_routes.insert(route);
        self
    }

    pub fn with_unpreferred_route(mut self, route: RouteId) -> Self {
        self.unpreferred_routes.insert(route);
        self
    }

    pub fn with_wait_reluctance(mut self, reluctance: f64) -> Self {
        self.wait_reluctance = reluctance;
        self
    }

    pub fn with_wait_at_beginning_factor(mut self, factor: f64) -> Self {
        self.wait_at_beginning_factor = factor;
        self
    }

    pub fn with_board_costs(mut self, walk: f64, bike: f64) -> Self {
        self.walk_board_cost = walk;
        self.bike_board_cost = bike;
        self
    }

    pub fn with_nonpreferred_transfer_penalty(mut self, penalty: f64) -> Self {
        self.nonpreferred_transfer_penalty = penalty;
        self
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }

    /// Parse and set environmental limits from the
    /// `ENVIRONMENTAL_{TYPE}_MAX_{AVERAGE|PEAK}=value&...` form.
    pub fn with_environmental_thresholds(mut self, thresholds: &str) -> Self {
        self.environmental_thresholds = parse_thresholds(thresholds);
        self
    }

    /// Cost of boarding a vehicle while using `non_transit_mode` off board.
    pub fn board_cost(&self, non_transit_mode: TraverseMode) -> f64 {
        match non_transit_mode {
            TraverseMode::Bicycle => self.bike_board_cost,
            _ => self.walk_board_cost,
        }
    }

    /// Smallest board cost any state could pay.
    pub fn board_cost_lower_bound(&self) -> f64 {
        self.walk_board_cost.min(self.bike_board_cost)
    }

    /// Whether the trip's route is banned for this request.
    pub fn trip_is_banned(&self, trip: &Trip) -> bool {
        self.banned_routes.contains(&trip.route)
    }

    /// Extra cost for riding a trip on a non-preferred or unpreferred route.
    pub fn preferences_penalty_for_trip(&self, trip: &Trip) -> f64 {
        let mut penalty = 0.0;
        if !self.preferred_routes.is_empty() && !self.preferred_routes.contains(&trip.route) {
            penalty += self.other_than_preferred_routes_penalty;
        }
        if self.unpreferred_routes.contains(&trip.route) {
            penalty += self.unpreferred_route_penalty;
        }
        penalty
    }

    /// Off-board speed in metres per second.
    pub fn speed(&self, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Bicycle => self.bike_speed,
            _ => self.walk_speed,
        }
    }

    /// Fastest off-board speed allowed by `modes`.
    pub fn max_street_speed(&self) -> f64 {
        if self.modes.contains(TraverseMode::Bicycle) {
            self.walk_speed.max(self.bike_speed)
        } else {
            self.walk_speed
        }
    }

    /// Off-board mode a search starts in.
    pub fn initial_non_transit_mode(&self) -> TraverseMode {
        if self.modes.contains(TraverseMode::Bicycle) && !self.modes.contains(TraverseMode::Walk) {
            TraverseMode::Bicycle
        } else {
            TraverseMode::Walk
        }
    }
}
