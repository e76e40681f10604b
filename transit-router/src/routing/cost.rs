//! Weight composition for boardings and street travel.

use crate::domain::TraverseMode;

use super::request::RoutingRequest;

/// Cost components of one boarding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardingCost {
    /// Seconds spent waiting for the vehicle.
    pub wait: i64,

    /// No vehicle has been boarded on this path yet.
    pub first_boarding: bool,

    pub transfer_penalty: f64,
    pub preference_penalty: f64,

    /// Off-board mode, which selects the board cost.
    pub non_transit_mode: TraverseMode,
}

/// Turns time and penalties into search weight for one request.
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    request: &'a RoutingRequest,
}

impl<'a> CostModel<'a> {
    pub fn new(request: &'a RoutingRequest) -> Self {
        Self { request }
    }

    /// Weight of waiting `wait` seconds. The wait before the first boarding
    /// uses `wait_at_beginning_factor`, later waits `wait_reluctance`.
    pub fn wait_cost(&self, wait: i64, first_boarding: bool) -> f64 {
        let factor = if first_boarding {
            self.request.wait_at_beginning_factor
        } else {
            self.request.wait_reluctance
        };
        wait as f64 * factor
    }

    /// Total weight added by a boarding.
    pub fn boarding_delta(&self, cost: &BoardingCost) -> f64 {
        cost.preference_penalty
            + cost.transfer_penalty
            + self.wait_cost(cost.wait, cost.first_boarding)
            + self.request.board_cost(cost.non_transit_mode)
    }

    /// Seconds to cover `length_m` metres off board.
    pub fn street_seconds(&self, length_m: f64, mode: TraverseMode) -> f64 {
        length_m / self.request.speed(mode)
    }

    /// Weight of street travel lasting `seconds`.
    pub fn street_weight(&self, seconds: f64, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Walk => seconds * self.request.walk_reluctance,
            _ => seconds,
        }
    }

    /// Smallest weight per second any street travel can have.
    pub fn min_street_reluctance(&self) -> f64 {
        if self.request.modes.contains(TraverseMode::Bicycle) {
            self.request.walk_reluctance.min(1.0)
        } else {
            self.request.walk_reluctance
        }
    }
}
