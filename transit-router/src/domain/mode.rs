//! Traverse modes and mode sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A way of moving along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraverseMode {
    Walk,
    Bicycle,
    Car,
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
    /// Marker mode recorded on board/alight states.
    LegSwitch,
}

impl TraverseMode {
    const ALL: [TraverseMode; 12] = [
        TraverseMode::Walk,
        TraverseMode::Bicycle,
        TraverseMode::Car,
        TraverseMode::Tram,
        TraverseMode::Subway,
        TraverseMode::Rail,
        TraverseMode::Bus,
        TraverseMode::Ferry,
        TraverseMode::CableCar,
        TraverseMode::Gondola,
        TraverseMode::Funicular,
        TraverseMode::LegSwitch,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// True for modes served by a transit vehicle.
    pub fn is_transit(self) -> bool {
        matches!(
            self,
            TraverseMode::Tram
                | TraverseMode::Subway
                | TraverseMode::Rail
                | TraverseMode::Bus
                | TraverseMode::Ferry
                | TraverseMode::CableCar
                | TraverseMode::Gondola
                | TraverseMode::Funicular
        )
    }

    /// Map a GTFS `route_type` to a mode.
    pub fn from_gtfs_route_type(route_type: u16) -> Option<Self> {
        match route_type {
            0 => Some(TraverseMode::Tram),
            1 => Some(TraverseMode::Subway),
            2 => Some(TraverseMode::Rail),
            3 => Some(TraverseMode::Bus),
            4 => Some(TraverseMode::Ferry),
            5 => Some(TraverseMode::CableCar),
            6 => Some(TraverseMode::Gondola),
            7 => Some(TraverseMode::Funicular),
            _ => None,
        }
    }
}

impl fmt::Display for TraverseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A set of allowed modes, stored as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraverseModeSet(u16);

impl TraverseModeSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Walking plus every transit mode.
    pub fn walk_and_transit() -> Self {
        TraverseMode::ALL
            .iter()
            .filter(|m| m.is_transit() || **m == TraverseMode::Walk)
            .copied()
            .collect()
    }

    /// Returns a copy of this set with `mode` added.
    pub fn with(mut self, mode: TraverseMode) -> Self {
        self.0 |= mode.bit();
        self
    }

    /// Returns a copy of this set with `mode` removed.
    pub fn without(mut self, mode: TraverseMode) -> Self {
        self.0 &= !mode.bit();
        self
    }

    pub fn contains(&self, mode: TraverseMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when at least one transit mode is allowed.
    pub fn has_transit(&self) -> bool {
        self.iter().any(TraverseMode::is_transit)
    }

    pub fn iter(&self) -> impl Iterator<Item = TraverseMode> + '_ {
        TraverseMode::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<TraverseMode> for TraverseModeSet {
    fn from_iter<I: IntoIterator<Item = TraverseMode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for TraverseModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
