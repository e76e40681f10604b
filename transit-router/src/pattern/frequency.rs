//! Frequency pattern descriptor and vehicle time lookups.

use crate::domain::{ServiceId, ServiceTime, StopId, TraverseMode, Trip};

/// Error from building an invalid pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern has fewer than two stops
    #[error("pattern for trip {0} needs at least two stops")]
    TooFewStops(String),

    /// Pattern has no headway windows
    #[error("pattern for trip {0} has no headway windows")]
    NoWindows(String),

    /// Stop times go backwards along the pattern
    #[error("pattern for trip {trip} has decreasing times at stop index {index}")]
    DecreasingTimes { trip: String, index: usize },

    /// Headway window is empty or has a non-positive headway
    #[error("invalid headway window {start}..{end} every {headway}s")]
    InvalidWindow {
        start: ServiceTime,
        end: ServiceTime,
        headway: i32,
    },
}

/// GTFS pickup / drop-off type for one stop of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardAlightType {
    #[default]
    Regular,
    NotAvailable,
    MustPhone,
    CoordinateWithDriver,
}

impl BoardAlightType {
    /// Map a GTFS `pickup_type` / `drop_off_type` code.
    pub fn from_gtfs(code: u8) -> Option<Self> {
        match code {
            0 => Some(BoardAlightType::Regular),
            1 => Some(BoardAlightType::NotAvailable),
            2 => Some(BoardAlightType::MustPhone),
            3 => Some(BoardAlightType::CoordinateWithDriver),
            _ => None,
        }
    }

    pub fn is_available(self) -> bool {
        self != BoardAlightType::NotAvailable
    }
}

/// One stop in a pattern, with offsets from the trip's start time.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternStop {
    pub stop: StopId,
    pub arrival_offset: i32,
    pub departure_offset: i32,
    pub board: BoardAlightType,
    pub alight: BoardAlightType,
    pub zone: Option<String>,
    pub headsign: Option<String>,
    pub wheelchair_accessible: bool,
}

impl PatternStop {
    /// A regular stop where the vehicle arrives and departs at `offset`.
    pub fn new(stop: StopId, offset: i32) -> Self {
        Self {
            stop,
            arrival_offset: offset,
            departure_offset: offset,
            board: BoardAlightType::Regular,
            alight: BoardAlightType::Regular,
            zone: None,
            headsign: None,
            wheelchair_accessible: true,
        }
    }

    pub fn with_dwell(mut self, seconds: i32) -> Self {
        self.departure_offset = self.arrival_offset + seconds;
        self
    }

    pub fn with_board(mut self, board: BoardAlightType) -> Self {
        self.board = board;
        self
    }

    pub fn with_alight(mut self, alight: BoardAlightType) -> Self {
        self.alight = alight;
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_headsign(mut self, headsign: impl Into<String>) -> Self {
        self.headsign = Some(headsign.into());
        self
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }
}

/// Trips start every `headway` seconds from `start` (inclusive) until `end`
/// (exclusive), in seconds since midnight.
///
/// With `exact` set, trips start exactly at `start + k * headway`. Otherwise
/// the schedule is only a headway and a rider is assumed to wait half of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadwayWindow {
    start: i32,
    end: i32,
    headway: i32,
    exact: bool,
}

impl HeadwayWindow {
    pub fn new(start: i32, end: i32, headway: i32, exact: bool) -> Result<Self, PatternError> {
        if headway <= 0 || end <= start || start < 0 {
            return Err(PatternError::InvalidWindow {
                start: ServiceTime(start),
                end: ServiceTime(end),
                headway,
            });
        }
        Ok(Self {
            start,
            end,
            headway,
            exact,
        })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn headway(&self) -> i32 {
        self.headway
    }

    /// Start time of the last trip in the window.
    fn last_start(&self) -> i32 {
        self.start + ((self.end - 1 - self.start) / self.headway) * self.headway
    }

    /// Earliest trip start at or after `t`.
    fn next_start(&self, t: i32) -> Option<i32> {
        if t >= self.end {
            return None;
        }
        if t <= self.start {
            return Some(self.start);
        }
        if self.exact {
            let k = (t - self.start + self.headway - 1) / self.headway;
            let start = self.start + k * self.headway;
            (start < self.end).then_some(start)
        } else {
            Some((t + self.headway / 2).min(self.end - 1))
        }
    }

    /// Latest trip start at or before `t`.
    fn previous_start(&self, t: i32) -> Option<i32> {
        if t < self.start {
            return None;
        }
        if self.exact {
            let aligned = self.start + ((t - self.start) / self.headway) * self.headway;
            Some(aligned.min(self.last_start()))
        } else {
            Some((t - self.headway / 2).clamp(self.start, self.end - 1))
        }
    }
}

/// A stop sequence served at a regular headway.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyPattern {
    trip: Trip,
    service_id: ServiceId,
    mode: TraverseMode,
    stops: Vec<PatternStop>,
    windows: Vec<HeadwayWindow>,
    bikes_allowed: bool,
    wheelchair_accessible: bool,
}

impl FrequencyPattern {
    /// Build a pattern, checking that stop times never go backwards.
    pub fn new(
        trip: Trip,
        service_id: ServiceId,
        mode: TraverseMode,
        stops: Vec<PatternStop>,
        windows: Vec<HeadwayWindow>,
    ) -> Result<Self, PatternError> {
        let name = trip.id.to_string();
        if stops.len() < 2 {
            return Err(PatternError::TooFewStops(name));
        }
        if windows.is_empty() {
            return Err(PatternError::NoWindows(name));
        }
        let mut previous = i32::MIN;
        for (index, stop) in stops.iter().enumerate() {
            if stop.arrival_offset < previous || stop.departure_offset < stop.arrival_offset {
                return Err(PatternError::DecreasingTimes { trip: name, index });
            }
            previous = stop.departure_offset;
        }
        Ok(Self {
            trip,
            service_id,
            mode,
            stops,
            windows,
            bikes_allowed: false,
            wheelchair_accessible: true,
        })
    }

    pub fn with_bikes_allowed(mut self, allowed: bool) -> Self {
        self.bikes_allowed = allowed;
        self
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }

    pub fn trip(&self) -> &Trip {
        &self.trip
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn mode(&self) -> TraverseMode {
        self.mode
    }

    pub fn bikes_allowed(&self) -> bool {
        self.bikes_allowed
    }

    pub fn stops(&self) -> &[PatternStop] {
        &self.stops
    }

    pub fn windows(&self) -> &[HeadwayWindow] {
        &self.windows
    }

    pub fn stop(&self, index: usize) -> Option<&PatternStop> {
        self.stops.get(index)
    }

    pub fn board_type(&self, index: usize) -> BoardAlightType {
        self.stops.get(index).map_or(BoardAlightType::NotAvailable, |s| s.board)
    }

    pub fn alight_type(&self, index: usize) -> BoardAlightType {
        self.stops.get(index).map_or(BoardAlightType::NotAvailable, |s| s.alight)
    }

    pub fn zone(&self, index: usize) -> Option<&str> {
        self.stops.get(index)?.zone.as_deref()
    }

    pub fn headsign(&self, index: usize) -> Option<&str> {
        self.stops.get(index)?.headsign.as_deref()
    }

    /// Seconds spent riding from the departure at `from` to the arrival at `to`.
    pub fn ride_time(&self, from: usize, to: usize) -> Option<i32> {
        let depart = self.stops.get(from)?.departure_offset;
        let arrive = self.stops.get(to)?.arrival_offset;
        (from < to).then_some(arrive - depart)
    }

    /// Seconds the vehicle waits at a stop.
    pub fn dwell_time(&self, index: usize) -> Option<i32> {
        let stop = self.stops.get(index)?;
        Some(stop.departure_offset - stop.arrival_offset)
    }

    fn usable(&self, stop: &PatternStop, wheelchair: bool, bikes: bool) -> bool {
        (!wheelchair || (self.wheelchair_accessible && stop.wheelchair_accessible))
            && (!bikes || self.bikes_allowed)
    }

    /// Earliest departure from `stop_index` at or after `seconds_since_midnight`.
    ///
    /// With `boarding` set the stop must allow pickups.
    pub fn next_departure_time(
        &self,
        stop_index: usize,
        seconds_since_midnight: i32,
        wheelchair: bool,
        bikes: bool,
        boarding: bool,
    ) -> Option<i32> {
        let stop = self.stops.get(stop_index)?;
        if !self.usable(stop, wheelchair, bikes) || (boarding && !stop.board.is_available()) {
            return None;
        }
        let offset = stop.departure_offset;
        self.windows
            .iter()
            .filter_map(|w| w.next_start(seconds_since_midnight - offset))
            .min()
            .map(|start| start + offset)
    }

    /// Latest arrival at `stop_index` at or before `seconds_since_midnight`.
    ///
    /// With `boarding` set the stop must allow drop-offs.
    pub fn previous_arrival_time(
        &self,
        stop_index: usize,
        seconds_since_midnight: i32,
        wheelchair: bool,
        bikes: bool,
        boarding: bool,
    ) -> Option<i32> {
        let stop = self.stops.get(stop_index)?;
        if !self.usable(stop, wheelchair, bikes) || (boarding && !stop.alight.is_available()) {
            return None;
        }
        let offset = stop.arrival_offset;
        self.windows
            .iter()
            .filter_map(|w| w.previous_start(seconds_since_midnight - offset))
            .max()
            .map(|start| start + offset)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{RouteId, TripId};
    use proptest::prelude::*;

    fn pattern(start: i32, len: i32, headway: i32, exact: bool) -> FrequencyPattern {
        FrequencyPattern::new(
            Trip::new(TripId::parse("T").unwrap(), RouteId::parse("R").unwrap()),
            ServiceId(0),
            TraverseMode::Tram,
            vec![
                PatternStop::new(StopId::parse("A").unwrap(), 0),
                PatternStop::new(StopId::parse("B").unwrap(), 240),
            ],
            vec![HeadwayWindow::new(start, start + len, headway, exact).unwrap()],
        )
        .unwrap()
    }

    proptest! {
        /// A next departure is never before the query time
        #[test]
        fn next_is_not_earlier(
            start in 0i32..50_000, len in 1i32..30_000, headway in 1i32..3600,
            exact in any::<bool>(), t in 0i32..100_000, idx in 0usize..2,
        ) {
            let p = pattern(start, len, headway, exact);
            if let Some(dep) = p.next_departure_time(idx, t, false, false, true) {
                prop_assert!(dep >= t);
            }
        }

        /// A previous arrival is never after the query time
        #[test]
        fn previous_is_not_later(
            start in 0i32..50_000, len in 1i32..30_000, headway in 1i32..3600,
            exact in any::<bool>(), t in 0i32..100_000, idx in 0usize..2,
        ) {
            let p = pattern(start, len, headway, exact);
            if let Some(arr) = p.previous_arrival_time(idx, t, false, false, true) {
                prop_assert!(arr <= t);
            }
        }

        /// Exact windows only produce trips starting on the headway grid
        #[test]
        fn exact_on_grid(
            start in 0i32..50_000, len in 1i32..30_000, headway in 1i32..3600, t in 0i32..100_000,
        ) {
            let p = pattern(start, len, headway, true);
            if let Some(dep) = p.next_departure_time(0, t, false, false, true) {
                prop_assert_eq!((dep - start) % headway, 0);
                prop_assert!(dep < start + len);
            }
            if let Some(arr) = p.previous_arrival_time(0, t, false, false, true) {
                prop_assert_eq!((arr - start) % headway, 0);
                prop_assert!(arr < start + len);
            }
        }
    }
}
