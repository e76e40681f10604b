//! Madrid acoustic network feed.
//!
//! Two CSV files make one update:
//!
//! - station positions, `;`-separated, two preamble rows, then
//!   `id;street;detail;longitude;latitude;...` with coordinates written as
//!   degrees, minutes and seconds (`3º41'27'' O`);
//! - daily levels, `,`-separated with no header:
//!   `station,year,month,day,period,LAeq,L01,L10,L50,L90,L99`, where the
//!   period is `D` (day), `T` (evening) or `N` (night).
//!
//! Only the levels of the period the clock is currently in are kept.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use geo::Point;
use tracing::{debug, warn};

use super::EnvironmentalDataSource;
use super::fetch::{fetch, http_client};
use super::noise::{NoiseMeasurement, NoiseStation, ParameterNoise};
use crate::updater::error::{ConfigError, SourceError};

pub const SOURCE_NAME: &str = "Ayuntamiento de Madrid";
pub const UNIT: &str = "db";
pub const CITY: &str = "Madrid";
pub const COUNTRY: &str = "Spain";

/// Clock the reporting periods refer to.
const TIME_ZONE: Tz = chrono_tz::Europe::Madrid;

/// Part of the day a row of levels covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentOfDay {
    /// 07:00 to 19:00
    Day,
    /// 19:00 to 23:00
    Evening,
    /// 23:00 to 07:00
    Night,
}

impl MomentOfDay {
    pub fn at(time: NaiveTime) -> Self {
        match time.hour() {
            7..19 => MomentOfDay::Day,
            19..23 => MomentOfDay::Evening,
            _ => MomentOfDay::Night,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "D" => Some(MomentOfDay::Day),
            "T" => Some(MomentOfDay::Evening),
            "N" => Some(MomentOfDay::Night),
            _ => None,
        }
    }

    /// Time the period's levels are stamped with.
    pub fn reading_time(self) -> NaiveTime {
        let hour = match self {
            MomentOfDay::Day => 13,
            MomentOfDay::Evening => 21,
            MomentOfDay::Night => 3,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
    }
}

/// Noise levels from the Madrid city council, over HTTP or local files.
#[derive(Debug)]
pub struct MadridNoiseDataSource {
    positions_url: String,
    data_url: String,
    http: reqwest::Client,
    time_of_day: Option<NaiveTime>,
    stations: Vec<NoiseStation>,
}

impl MadridNoiseDataSource {
    pub fn new(
        positions_url: impl Into<String>,
        data_url: impl Into<String>,
        header: Option<(&str, &str)>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            positions_url: positions_url.into(),
            data_url: data_url.into(),
            http: http_client(header)?,
            time_of_day: None,
            stations: Vec::new(),
        })
    }

    /// Choose levels as if the local clock read `time` instead of now.
    pub fn at_time_of_day(mut self, time: NaiveTime) -> Self {
        self.time_of_day = Some(time);
        self
    }

    fn moment(&self) -> MomentOfDay {
        let now = self
            .time_of_day
            .unwrap_or_else(|| Utc::now().with_timezone(&TIME_ZONE).time());
        MomentOfDay::at(now)
    }

    async fn load(&self) -> Result<Vec<NoiseStation>, SourceError> {
        let positions = fetch(&self.http, &self.positions_url).await?;
        let mut stations = parse_positions(&positions)?;
        let levels = fetch(&self.http, &self.data_url).await?;
        add_levels(&mut stations, &levels, self.moment())?;
        Ok(stations.into_values().collect())
    }
}

impl EnvironmentalDataSource for MadridNoiseDataSource {
    type Station = NoiseStation;

    async fn update(&mut self) -> bool {
        match self.load().await {
            Ok(stations) => {
                debug!(url = %self.data_url, stations = stations.len(), "loaded noise stations");
                self.stations = stations;
                true
            }
            Err(e) => {
                warn!(url = %self.data_url, error = %e, "failed to load noise feed");
                false
            }
        }
    }

    fn stations(&self) -> &[NoiseStation] {
        &self.stations
    }
}

/// Positions are published in ISO-8859-15; anything that is not UTF-8 is read
/// byte per char.
fn decode(field: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(field) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(field.iter().map(|&b| char::from(b)).collect()),
    }
}

fn parse_positions(body: &[u8]) -> Result<BTreeMap<u32, NoiseStation>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body);

    let mut stations = BTreeMap::new();
    for record in reader.byte_records().skip(2) {
        let record = record?;
        let values: Vec<Cow<'_, str>> = record.iter().map(decode).collect();
        let Some(key) = values.first().and_then(|id| station_key(id)) else {
            continue;
        };
        match make_station(&values) {
            Some(station) => {
                stations.insert(key, station);
            }
            None => debug!(station = %values[0], "skipping station with unreadable position"),
        }
    }
    Ok(stations)
}

/// Station ids are plain numbers; the levels file zero-pads them.
fn station_key(id: &str) -> Option<u32> {
    let id = id.trim();
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

fn make_station(values: &[Cow<'_, str>]) -> Option<NoiseStation> {
    let [id, street, detail, longitude, latitude, ..] = values else {
        return None;
    };
    Some(NoiseStation {
        id: id.trim().to_string(),
        location: format!("{street} {detail}"),
        city: CITY.to_string(),
        country: COUNTRY.to_string(),
        measurements: Vec::new(),
        point: Point::new(coordinate(longitude)?, coordinate(latitude)?),
    })
}

/// Degrees, minutes and seconds with an optional hemisphere letter; west
/// (`O`, `W`) and south are negative. Decimal commas are accepted.
fn coordinate(text: &str) -> Option<f64> {
    let text = text.replace(',', ".");
    let mut tokens = text
        .split(['º', '°', '\'', '"', ' '])
        .filter(|t| !t.is_empty());
    let degrees: f64 = tokens.next()?.parse().ok()?;
    let minutes: f64 = tokens.next()?.parse().ok()?;
    let seconds: f64 = tokens.next()?.parse().ok()?;
    let sign = match tokens.next() {
        Some("O" | "W" | "S") => -1.0,
        _ => 1.0,
    };
    Some((degrees + (minutes * 60.0 + seconds) / 3600.0) * sign)
}

fn add_levels(
    stations: &mut BTreeMap<u32, NoiseStation>,
    body: &[u8],
    moment: MomentOfDay,
) -> Result<(), SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    for record in reader.records() {
        let record = record?;
        if record.get(4).and_then(MomentOfDay::from_code) != Some(moment) {
            continue;
        }
        let Some(station) = record.get(0).and_then(station_key).and_then(|k| stations.get_mut(&k)) else {
            debug!(station = ?record.get(0), "levels for an unknown station");
            continue;
        };
        match levels(&record, moment) {
            Some(measurements) => station.measurements.extend(measurements),
            None => debug!(station = %station.id, "skipping unreadable levels"),
        }
    }
    Ok(())
}

fn levels(record: &csv::StringRecord, moment: MomentOfDay) -> Option<Vec<NoiseMeasurement>> {
    let number = |i: usize| record.get(i).map(str::trim);
    let date = NaiveDate::from_ymd_opt(
        number(1)?.parse().ok()?,
        number(2)?.parse().ok()?,
        number(3)?.parse().ok()?,
    )?;
    let last_updated = date.and_time(moment.reading_time());
    ParameterNoise::ALL
        .iter()
        .enumerate()
        .map(|(i, &parameter)| {
            Some(NoiseMeasurement {
                parameter,
                value: number(5 + i)?.parse().ok()?,
                last_updated,
                unit: UNIT.to_string(),
                source_name: SOURCE_NAME.to_string(),
            })
        })
        .collect()
}
