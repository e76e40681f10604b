//! JSON network descriptions.
//!
//! A network file lists the agency time zone, service calendars, stops,
//! streets, frequency patterns and transfer rules. Times use GTFS
//! "HH:MM:SS" strings and dates "YYYYMMDD", as in a GTFS feed.

use std::path::Path;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calendar::{CalendarRule, ServiceCalendar};
use crate::domain::{
    RouteId, ServiceId, StopId, TraverseMode, TraverseModeSet, Trip, TripId, parse_service_time,
};
use crate::pattern::{BoardAlightType, FrequencyPattern, HeadwayWindow, PatternStop};
use crate::transfer::{SpecificTransfer, TransferTime};

use super::error::GraphError;
use super::model::{Graph, GraphBuilder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescription {
    /// IANA time zone name of the agency.
    pub timezone: String,
    #[serde(default)]
    pub calendars: Vec<CalendarDescription>,
    #[serde(default)]
    pub stops: Vec<StopDescription>,
    #[serde(default)]
    pub street_vertices: Vec<StreetVertexDescription>,
    #[serde(default)]
    pub streets: Vec<StreetDescription>,
    #[serde(default)]
    pub patterns: Vec<PatternDescription>,
    #[serde(default)]
    pub transfers: Vec<TransferDescription>,
    #[serde(default)]
    pub timed_transfers: Vec<TimedTransferDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDescription {
    pub service: u32,
    pub start: String,
    pub end: String,
    /// Monday first. Defaults to every day.
    #[serde(default = "every_day")]
    pub weekdays: [bool; 7],
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

fn every_day() -> [bool; 7] {
    [true; 7]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopDescription {
    pub id: StopId,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub parent: Option<StopId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetVertexDescription {
    pub label: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetDescription {
    /// Vertex label or stop id.
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub length_m: Option<f64>,
    #[serde(default = "walk_and_bike")]
    pub modes: Vec<TraverseMode>,
    #[serde(default = "yes")]
    pub bidirectional: bool,
}

fn walk_and_bike() -> Vec<TraverseMode> {
    vec![TraverseMode::Walk, TraverseMode::Bicycle]
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDescription {
    pub trip: TripId,
    pub route: RouteId,
    pub service: u32,
    #[serde(default)]
    pub mode: Option<TraverseMode>,
    /// GTFS route type, used when `mode` is absent.
    #[serde(default)]
    pub route_type: Option<u16>,
    #[serde(default)]
    pub bikes_allowed: bool,
    #[serde(default = "yes")]
    pub wheelchair_accessible: bool,
    pub stops: Vec<PatternStopDescription>,
    pub frequencies: Vec<FrequencyDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternStopDescription {
    pub stop: StopId,
    /// Offset from the trip start, "H:MM:SS".
    pub arrival: String,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub pickup_type: u8,
    #[serde(default)]
    pub drop_off_type: u8,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub headsign: Option<String>,
    #[serde(default = "yes")]
    pub wheelchair_accessible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyDescription {
    pub start: String,
    pub end: String,
    pub headway_secs: i32,
    #[serde(default)]
    pub exact_times: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDescription {
    pub from_stop: StopId,
    pub to_stop: StopId,
    pub transfer_type: u8,
    #[serde(default)]
    pub min_transfer_time: Option<u32>,
    #[serde(default)]
    pub from_route: Option<RouteId>,
    #[serde(default)]
    pub to_route: Option<RouteId>,
    #[serde(default)]
    pub from_trip: Option<TripId>,
    #[serde(default)]
    pub to_trip: Option<TripId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedTransferDescription {
    pub from: StopId,
    pub to: StopId,
}

fn parse_date(s: &str) -> Result<NaiveDate, GraphError> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| GraphError::Invalid(format!("bad date {s:?}: {e}")))
}

fn board_alight_type(code: u8) -> Result<BoardAlightType, GraphError> {
    BoardAlightType::from_gtfs(code)
        .ok_or_else(|| GraphError::Invalid(format!("unknown pickup/drop-off type {code}")))
}

impl NetworkDescription {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a description from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn timezone(&self) -> Result<Tz, GraphError> {
        self.timezone
            .parse()
            .map_err(|_| GraphError::Invalid(format!("unknown time zone {}", self.timezone)))
    }

    fn calendar(&self) -> Result<ServiceCalendar, GraphError> {
        let rules = self
            .calendars
            .iter()
            .map(|c| {
                let mut rule =
                    CalendarRule::daily(ServiceId(c.service), parse_date(&c.start)?, parse_date(&c.end)?)
                        .with_weekdays(c.weekdays);
                for date in &c.added {
                    rule = rule.with_added(parse_date(date)?);
                }
                for date in &c.removed {
                    rule = rule.with_removed(parse_date(date)?);
                }
                Ok(rule)
            })
            .collect::<Result<Vec<_>, GraphError>>()?;
        Ok(ServiceCalendar::from_rules(self.timezone()?, &rules)?)
    }

    fn pattern(desc: &PatternDescription) -> Result<FrequencyPattern, GraphError> {
        let mode = desc
            .mode
            .or_else(|| desc.route_type.and_then(TraverseMode::from_gtfs_route_type))
            .ok_or_else(|| GraphError::Invalid(format!("no mode for trip {}", desc.trip)))?;

        let stops = desc
            .stops
            .iter()
            .map(|s| {
                let arrival = parse_service_time(&s.arrival)?;
                let departure = match &s.departure {
                    Some(d) => parse_service_time(d)?,
                    None => arrival,
                };
                let mut stop = PatternStop::new(s.stop.clone(), arrival)
                    .with_dwell(departure - arrival)
                    .with_board(board_alight_type(s.pickup_type)?)
                    .with_alight(board_alight_type(s.drop_off_type)?)
                    .with_wheelchair_accessible(s.wheelchair_accessible);
                if let Some(zone) = &s.zone {
                    stop = stop.with_zone(zone.clone());
                }
                if let Some(headsign) = &s.headsign {
                    stop = stop.with_headsign(headsign.clone());
                }
                Ok(stop)
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        let windows = desc
            .frequencies
            .iter()
            .map(|f| {
                Ok(HeadwayWindow::new(
                    parse_service_time(&f.start)?,
                    parse_service_time(&f.end)?,
                    f.headway_secs,
                    f.exact_times,
                )?)
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        let pattern = FrequencyPattern::new(
            Trip::new(desc.trip.clone(), desc.route.clone()),
            ServiceId(desc.service),
            mode,
            stops,
            windows,
        )?
        .with_bikes_allowed(desc.bikes_allowed)
        .with_wheelchair_accessible(desc.wheelchair_accessible);
        Ok(pattern)
    }

    /// Build the routing graph.
    pub fn build(&self) -> Result<Graph, GraphError> {
        let mut builder = GraphBuilder::new(self.calendar()?);

        for stop in &self.stops {
            builder.add_stop(stop.id.clone(), stop.lon, stop.lat)?;
            if let Some(parent) = &stop.parent {
                builder.set_parent_station(stop.id.clone(), parent.clone());
            }
        }
        for vertex in &self.street_vertices {
            builder.add_street_vertex(vertex.label.clone(), vertex.lon, vertex.lat)?;
        }
        for street in &self.streets {
            let from = builder
                .vertex_by_label(&street.from)
                .ok_or_else(|| GraphError::UnknownVertex(street.from.clone()))?;
            let to = builder
                .vertex_by_label(&street.to)
                .ok_or_else(|| GraphError::UnknownVertex(street.to.clone()))?;
            let modes: TraverseModeSet = street.modes.iter().copied().collect();
            builder.add_street(from, to, &street.name, street.length_m, modes, street.bidirectional)?;
        }
        for pattern in &self.patterns {
            builder.add_pattern(Self::pattern(pattern)?)?;
        }
        for t in &self.transfers {
            let kind = TransferTime::from_gtfs(t.transfer_type, t.min_transfer_time).ok_or_else(|| {
                GraphError::Invalid(format!("unknown transfer type {}", t.transfer_type))
            })?;
            let rule = SpecificTransfer {
                from_route: t.from_route.clone(),
                to_route: t.to_route.clone(),
                from_trip: t.from_trip.clone(),
                to_trip: t.to_trip.clone(),
                transfer: kind,
            };
            builder
                .transfers_mut()
                .add_transfer(t.from_stop.clone(), t.to_stop.clone(), rule);
        }
        for t in &self.timed_transfers {
            builder.add_timed_transfer(&t.from, &t.to)?;
        }

        let graph = builder.build();
        info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            patterns = graph.patterns().len(),
            "built graph"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;

    const NETWORK: &str = r#"{
        "timezone": "Europe/Madrid",
        "calendars": [
            {"service": 1, "start": "20240101", "end": "20241231", "removed": ["20240315"]}
        ],
        "stops": [
            {"id": "SOL", "lon": -3.7035, "lat": 40.4169},
            {"id": "ATOCHA", "lon": -3.6907, "lat": 40.4066, "parent": "ATOCHA-STATION"}
        ],
        "street_vertices": [{"label": "plaza", "lon": -3.7038, "lat": 40.4155}],
        "streets": [{"from": "plaza", "to": "SOL", "name": "Calle Mayor"}],
        "patterns": [{
            "trip": "L1", "route": "LINE1", "service": 1, "route_type": 1,
            "stops": [
                {"stop": "SOL", "arrival": "0:00:00", "headsign": "Atocha"},
                {"stop": "ATOCHA", "arrival": "0:04:00", "pickup_type": 1}
            ],
            "frequencies": [{"start": "06:00:00", "end": "24:00:00", "headway_secs": 300, "exact_times": true}]
        }],
        "transfers": [{"from_stop": "SOL", "to_stop": "ATOCHA", "transfer_type": 2, "min_transfer_time": 180}]
    }"#;

    #[test]
    fn build_from_json() {
        let graph = NetworkDescription::from_json(NETWORK).unwrap().build().unwrap();
        assert_eq!(graph.patterns().len(), 1);
        assert_eq!(graph.patterns()[0].mode(), TraverseMode::Subway);
        assert_eq!(graph.patterns()[0].board_type(1), BoardAlightType::NotAvailable);
        assert_eq!(graph.transfers().len(), 1);
        assert!(graph.stop_vertex(&StopId::parse("SOL").unwrap()).is_some());
        assert_eq!(
            graph.edges().filter(|e| e.kind() == EdgeKind::Street).count(),
            2
        );
        let cal = graph.calendar();
        let d = |s| parse_date(s).unwrap();
        assert!(cal.services_on(d("20240314")).contains(&ServiceId(1)));
        assert!(!cal.services_on(d("20240315")).contains(&ServiceId(1)));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let json = r#"{"timezone": "Mars/Olympus"}"#;
        let err = NetworkDescription::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, GraphError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_ids_at_parse_time() {
        let json = r#"{"timezone": "UTC", "stops": [{"id": "", "lon": 0, "lat": 0}]}"#;
        assert!(matches!(
            NetworkDescription::from_json(json),
            Err(GraphError::Json(_))
        ));
    }

    #[test]
    fn rejects_unknown_street_vertex() {
        let json = r#"{"timezone": "UTC", "streets": [{"from": "x", "to": "y"}]}"#;
        let err = NetworkDescription::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, GraphError::UnknownVertex(v) if v == "x"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        std::fs::write(&path, NETWORK).unwrap();
        let desc = NetworkDescription::load(&path).unwrap();
        assert_eq!(desc.timezone().unwrap(), chrono_tz::Europe::Madrid);
    }
}
