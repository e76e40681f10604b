//! Trip references carried through search states.

use serde::{Deserialize, Serialize};

use super::{RouteId, TripId};

/// A transit trip together with the route it belongs to.
///
/// Transfer rules and route preferences need the route of the trip a path
/// just left, so the two travel together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub route: RouteId,
}

impl Trip {
    pub fn new(id: TripId, route: RouteId) -> Self {
        Self { id, route }
    }
}
