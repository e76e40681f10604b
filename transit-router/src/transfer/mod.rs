//! Transfer rules between trips at stops.
//!
//! A transfer rule is attached to an ordered stop pair and may be narrowed to
//! particular routes or trips on either side. Lookups pick the most specific
//! rule that matches the trips involved, falling back to parent stations when
//! the stops themselves have no rules.

use std::collections::HashMap;

use crate::domain::{RouteId, StopId, Trip, TripId};

/// Outcome of a transfer lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferTime {
    /// No rule covers this transfer.
    Unknown,

    /// A recommended transfer point.
    Preferred,

    /// The departing vehicle waits for the arriving one. Only valid across a
    /// timed-transfer edge.
    Timed,

    /// At least this many seconds are needed between alighting and boarding.
    Minimum(u32),

    /// Transferring here is not possible.
    Forbidden,
}

impl TransferTime {
    /// Map a GTFS `transfer_type` (with its optional `min_transfer_time`).
    pub fn from_gtfs(transfer_type: u8, min_transfer_time: Option<u32>) -> Option<Self> {
        match transfer_type {
            0 => Some(TransferTime::Preferred),
            1 => Some(TransferTime::Timed),
            2 => Some(TransferTime::Minimum(min_transfer_time.unwrap_or(0))),
            3 => Some(TransferTime::Forbidden),
            _ => None,
        }
    }

    /// Seconds of slack this transfer requires, if it sets a minimum.
    pub fn minimum_seconds(self) -> Option<u32> {
        match self {
            TransferTime::Minimum(secs) => Some(secs),
            _ => None,
        }
    }
}

/// Penalty for making a transfer, given its classification.
///
/// Timed and preferred transfers are free; anything else costs
/// `nonpreferred_penalty`. A forbidden transfer costs infinity.
pub fn determine_transfer_penalty(transfer: TransferTime, nonpreferred_penalty: f64) -> f64 {
    match transfer {
        TransferTime::Timed | TransferTime::Preferred => 0.0,
        TransferTime::Forbidden => f64::INFINITY,
        TransferTime::Minimum(_) | TransferTime::Unknown => nonpreferred_penalty,
    }
}

/// One transfer rule for a stop pair, optionally narrowed by route or trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificTransfer {
    pub from_route: Option<RouteId>,
    pub to_route: Option<RouteId>,
    pub from_trip: Option<TripId>,
    pub to_trip: Option<TripId>,
    pub transfer: TransferTime,
}

impl SpecificTransfer {
    /// A rule applying to every trip pair at the stops.
    pub fn any(transfer: TransferTime) -> Self {
        Self {
            from_route: None,
            to_route: None,
            from_trip: None,
            to_trip: None,
            transfer,
        }
    }

    pub fn from_route(mut self, route: RouteId) -> Self {
        self.from_route = Some(route);
        self
    }

    pub fn to_route(mut self, route: RouteId) -> Self {
        self.to_route = Some(route);
        self
    }

    pub fn from_trip(mut self, trip: TripId) -> Self {
        self.from_trip = Some(trip);
        self
    }

    pub fn to_trip(mut self, trip: TripId) -> Self {
        self.to_trip = Some(trip);
        self
    }

    fn matches(&self, from: &Trip, to: &Trip) -> bool {
        self.from_route.as_ref().is_none_or(|r| *r == from.route)
            && self.to_route.as_ref().is_none_or(|r| *r == to.route)
            && self.from_trip.as_ref().is_none_or(|t| *t == from.id)
            && self.to_trip.as_ref().is_none_or(|t| *t == to.id)
    }

    /// Trip restrictions outrank route restrictions, per side.
    fn specificity(&self) -> u8 {
        let side = |route: &Option<RouteId>, trip: &Option<TripId>| match (route, trip) {
            (_, Some(_)) => 2,
            (Some(_), None) => 1,
            (None, None) => 0,
        };
        side(&self.from_route, &self.from_trip) + side(&self.to_route, &self.to_trip)
    }
}

/// Transfer rules keyed by (from stop, to stop).
#[derive(Debug, Clone, Default)]
pub struct TransferTable {
    rules: HashMap<(StopId, StopId), Vec<SpecificTransfer>>,
    parents: HashMap<StopId, StopId>,
}

impl TransferTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for transfers from `from` to `to`.
    pub fn add_transfer(&mut self, from: StopId, to: StopId, rule: SpecificTransfer) {
        self.rules.entry((from, to)).or_default().push(rule);
    }

    /// Record that `stop` belongs to the station `parent`.
    pub fn set_parent(&mut self, stop: StopId, parent: StopId) {
        self.parents.insert(stop, parent);
    }

    /// Number of stop pairs with at least one rule.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up the transfer from `from_trip` at `from_stop` to `to_trip` at
    /// `to_stop`.
    ///
    /// Backward searches meet the boarding before the alighting, so with
    /// `forward_in_time == false` the stop and trip pairs are swapped before
    /// the lookup.
    pub fn transfer_time(
        &self,
        from_stop: &StopId,
        to_stop: &StopId,
        from_trip: &Trip,
        to_trip: &Trip,
        forward_in_time: bool,
    ) -> TransferTime {
        let (from_stop, to_stop, from_trip, to_trip) = if forward_in_time {
            (from_stop, to_stop, from_trip, to_trip)
        } else {
            (to_stop, from_stop, to_trip, from_trip)
        };

        if let Some(found) = self.lookup(from_stop, to_stop, from_trip, to_trip) {
            return found;
        }

        let from_parent = self.parents.get(from_stop).unwrap_or(from_stop);
        let to_parent = self.parents.get(to_stop).unwrap_or(to_stop);
        if (from_parent != from_stop || to_parent != to_stop)
            && let Some(found) = self.lookup(from_parent, to_parent, from_trip, to_trip)
        {
            return found;
        }
        TransferTime::Unknown
    }

    fn lookup(
        &self,
        from_stop: &StopId,
        to_stop: &StopId,
        from_trip: &Trip,
        to_trip: &Trip,
    ) -> Option<TransferTime> {
        let key = (from_stop.clone(), to_stop.clone());
        self.rules
            .get(&key)?
            .iter()
            .filter(|rule| rule.matches(from_trip, to_trip))
            .max_by_key(|rule| rule.specificity())
            .map(|rule| rule.transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn trip(id: &str, route: &str) -> Trip {
        Trip::new(TripId::parse(id).unwrap(), RouteId::parse(route).unwrap())
    }

    #[test]
    fn gtfs_transfer_types() {
        assert_eq!(TransferTime::from_gtfs(0, None), Some(TransferTime::Preferred));
        assert_eq!(TransferTime::from_gtfs(1, None), Some(TransferTime::Timed));
        assert_eq!(TransferTime::from_gtfs(2, Some(120)), Some(TransferTime::Minimum(120)));
        assert_eq!(TransferTime::from_gtfs(3, None), Some(TransferTime::Forbidden));
        assert_eq!(TransferTime::from_gtfs(9, None), None);
    }

    #[test]
    fn only_minimum_transfers_set_slack() {
        assert_eq!(TransferTime::Minimum(120).minimum_seconds(), Some(120));
        assert_eq!(TransferTime::Timed.minimum_seconds(), None);
        assert_eq!(TransferTime::Unknown.minimum_seconds(), None);
    }

    #[test]
    fn penalty_by_kind() {
        assert_eq!(determine_transfer_penalty(TransferTime::Timed, 180.0), 0.0);
        assert_eq!(determine_transfer_penalty(TransferTime::Preferred, 180.0), 0.0);
        assert_eq!(determine_transfer_penalty(TransferTime::Minimum(60), 180.0), 180.0);
        assert_eq!(determine_transfer_penalty(TransferTime::Unknown, 180.0), 180.0);
        assert!(determine_transfer_penalty(TransferTime::Forbidden, 180.0).is_infinite());
    }

    #[test]
    fn unknown_when_no_rule() {
        let table = TransferTable::new();
        let t = table.transfer_time(&stop("A"), &stop("B"), &trip("T1", "R1"), &trip("T2", "R2"), true);
        assert_eq!(t, TransferTime::Unknown);
        assert!(table.is_empty());
    }

    #[test]
    fn most_specific_rule_wins() {
        let mut table = TransferTable::new();
        table.add_transfer(stop("A"), stop("B"), SpecificTransfer::any(TransferTime::Minimum(300)));
        table.add_transfer(
            stop("A"),
            stop("B"),
            SpecificTransfer::any(TransferTime::Minimum(120)).to_route(RouteId::parse("R2").unwrap()),
        );
        table.add_transfer(
            stop("A"),
            stop("B"),
            SpecificTransfer::any(TransferTime::Forbidden).from_trip(TripId::parse("T1").unwrap()),
        );

        let (a, b) = (stop("A"), stop("B"));
        assert_eq!(
            table.transfer_time(&a, &b, &trip("T1", "R1"), &trip("T2", "R2"), true),
            TransferTime::Forbidden
        );
        assert_eq!(
            table.transfer_time(&a, &b, &trip("T9", "R1"), &trip("T2", "R2"), true),
            TransferTime::Minimum(120)
        );
        assert_eq!(
            table.transfer_time(&a, &b, &trip("T9", "R1"), &trip("T3", "R3"), true),
            TransferTime::Minimum(300)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn backward_lookup_swaps_sides() {
        let mut table = TransferTable::new();
        table.add_transfer(
            stop("A"),
            stop("B"),
            SpecificTransfer::any(TransferTime::Forbidden)
                .from_trip(TripId::parse("TA").unwrap())
                .to_trip(TripId::parse("TB").unwrap()),
        );
        let (ta, tb) = (trip("TA", "R"), trip("TB", "R"));

        // Arrive-by meets trip B at stop B first, then trip A at stop A
        assert_eq!(
            table.transfer_time(&stop("B"), &stop("A"), &tb, &ta, false),
            TransferTime::Forbidden
        );
        assert_eq!(
            table.transfer_time(&stop("B"), &stop("A"), &tb, &ta, true),
            TransferTime::Unknown
        );
    }

    #[test]
    fn parent_station_fallback() {
        let mut table = TransferTable::new();
        table.set_parent(stop("A1"), stop("A"));
        table.set_parent(stop("B1"), stop("B"));
        table.add_transfer(stop("A"), stop("B"), SpecificTransfer::any(TransferTime::Timed));

        assert_eq!(
            table.transfer_time(&stop("A1"), &stop("B1"), &trip("T1", "R"), &trip("T2", "R"), true),
            TransferTime::Timed
        );
    }

    #[test]
    fn stop_rule_shadows_parent_rule() {
        let mut table = TransferTable::new();
        table.set_parent(stop("A1"), stop("A"));
        table.add_transfer(stop("A"), stop("B"), SpecificTransfer::any(TransferTime::Forbidden));
        table.add_transfer(stop("A1"), stop("B"), SpecificTransfer::any(TransferTime::Preferred));

        assert_eq!(
            table.transfer_time(&stop("A1"), &stop("B"), &trip("T1", "R"), &trip("T2", "R"), true),
            TransferTime::Preferred
        );
    }
}
