//! One operating day and the three-day search window.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::domain::ServiceId;

use super::error::CalendarError;

/// Seconds between local noon and the service day's reference midnight.
const HALF_DAY: i64 = 12 * 60 * 60;

/// A single service date with the services running on it.
///
/// Service times are measured from "noon minus twelve hours" local time,
/// which is midnight except on daylight-saving transition days.
#[derive(Clone)]
pub struct ServiceDay {
    date: NaiveDate,
    midnight: i64,
    running: Arc<HashSet<ServiceId>>,
}

impl ServiceDay {
    /// Build the service day for `date` in the agency time zone.
    pub fn new(
        date: NaiveDate,
        timezone: Tz,
        running: Arc<HashSet<ServiceId>>,
    ) -> Result<Self, CalendarError> {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .ok_or(CalendarError::NoLocalNoon(date))?;
        let local_noon = timezone
            .from_local_datetime(&noon)
            .earliest()
            .ok_or(CalendarError::NoLocalNoon(date))?;
        Ok(Self::from_midnight(
            date,
            local_noon.timestamp() - HALF_DAY,
            running,
        ))
    }

    /// Build a service day whose reference midnight is already known.
    pub fn from_midnight(date: NaiveDate, midnight: i64, running: Arc<HashSet<ServiceId>>) -> Self {
        Self {
            date,
            midnight,
            running,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Epoch seconds of this day's reference midnight.
    pub fn midnight(&self) -> i64 {
        self.midnight
    }

    /// Seconds from this day's midnight to `instant`. Negative when the
    /// instant falls before the day starts.
    pub fn seconds_since_midnight(&self, instant: i64) -> i64 {
        instant - self.midnight
    }

    /// Absolute epoch seconds of a service time on this day.
    pub fn time(&self, seconds_since_midnight: i32) -> i64 {
        self.midnight + i64::from(seconds_since_midnight)
    }

    pub fn service_id_running(&self, service: ServiceId) -> bool {
        self.running.contains(&service)
    }
}

impl PartialEq for ServiceDay {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date && self.midnight == other.midnight
    }
}

impl Eq for ServiceDay {}

impl fmt::Debug for ServiceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDay")
            .field("date", &self.date)
            .field("midnight", &self.midnight)
            .field("running", &self.running.len())
            .finish()
    }
}

/// Yesterday, today and tomorrow relative to a search's reference instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDays {
    days: [ServiceDay; 3],
}

impl ServiceDays {
    pub fn new(yesterday: ServiceDay, today: ServiceDay, tomorrow: ServiceDay) -> Self {
        Self {
            days: [yesterday, today, tomorrow],
        }
    }

    pub fn yesterday(&self) -> &ServiceDay {
        &self.days[0]
    }

    pub fn today(&self) -> &ServiceDay {
        &self.days[1]
    }

    pub fn tomorrow(&self) -> &ServiceDay {
        &self.days[2]
    }

    /// Days in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDay> {
        self.days.iter()
    }

    /// True when any day in the window runs `service`.
    pub fn any_running(&self, service: ServiceId) -> bool {
        self.days.iter().any(|d| d.service_id_running(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(ids: &[u32]) -> Arc<HashSet<ServiceId>> {
        Arc::new(ids.iter().copied().map(ServiceId).collect())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn utc_midnight() {
        let day = ServiceDay::new(date(2024, 3, 15), chrono_tz::UTC, running(&[1])).unwrap();
        assert_eq!(day.midnight(), 1_710_460_800);
        assert_eq!(day.seconds_since_midnight(1_710_460_800 + 3600), 3600);
        assert_eq!(day.time(90_000), 1_710_460_800 + 90_000);
        assert!(day.service_id_running(ServiceId(1)));
        assert!(!day.service_id_running(ServiceId(2)));
    }

    #[test]
    fn dst_day_uses_noon_minus_twelve_hours() {
        // London springs forward on 2024-03-31; local noon is 11:00 UTC
        let day = ServiceDay::new(date(2024, 3, 31), chrono_tz::Europe::London, running(&[]))
            .unwrap();
        let noon_utc = chrono::Utc
            .with_ymd_and_hms(2024, 3, 31, 11, 0, 0)
            .unwrap()
            .timestamp();
        assert_eq!(day.midnight(), noon_utc - HALF_DAY);
        assert_eq!(day.seconds_since_midnight(noon_utc), HALF_DAY);
    }

    #[test]
    fn negative_before_midnight() {
        let day = ServiceDay::from_midnight(date(2024, 1, 2), 1000, running(&[]));
        assert_eq!(day.seconds_since_midnight(400), -600);
    }

    #[test]
    fn window_any_running() {
        let days = ServiceDays::new(
            ServiceDay::from_midnight(date(2024, 1, 1), 0, running(&[])),
            ServiceDay::from_midnight(date(2024, 1, 2), 86_400, running(&[7])),
            ServiceDay::from_midnight(date(2024, 1, 3), 172_800, running(&[])),
        );
        assert!(days.any_running(ServiceId(7)));
        assert!(!days.any_running(ServiceId(8)));
        assert_eq!(days.today().date(), date(2024, 1, 2));
        let dates: Vec<_> = days.iter().map(ServiceDay::date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
    }
}
