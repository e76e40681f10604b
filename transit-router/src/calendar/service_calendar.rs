//! Calendar construction from weekly rules and date exceptions.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate};
use chrono_tz::Tz;
use moka::sync::Cache;
use tracing::debug;

use crate::domain::ServiceId;

use super::error::CalendarError;
use super::service_day::{ServiceDay, ServiceDays};

/// Longest date range a single rule may cover.
const MAX_RULE_DAYS: i64 = 3 * 366;

/// Number of search windows kept in the cache.
const WINDOW_CACHE_CAPACITY: u64 = 64;

/// A weekly service pattern with exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRule {
    pub service: ServiceId,

    /// First date of the rule, inclusive.
    pub start: NaiveDate,

    /// Last date of the rule, inclusive.
    pub end: NaiveDate,

    /// Running days, Monday first.
    pub weekdays: [bool; 7],

    /// Extra dates the service runs.
    pub added: Vec<NaiveDate>,

    /// Dates the service does not run despite the weekly pattern.
    pub removed: Vec<NaiveDate>,
}

impl CalendarRule {
    /// A rule running every day between `start` and `end`.
    pub fn daily(service: ServiceId, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            service,
            start,
            end,
            weekdays: [true; 7],
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn with_weekdays(mut self, weekdays: [bool; 7]) -> Self {
        self.weekdays = weekdays;
        self
    }

    pub fn with_added(mut self, date: NaiveDate) -> Self {
        self.added.push(date);
        self
    }

    pub fn with_removed(mut self, date: NaiveDate) -> Self {
        self.removed.push(date);
        self
    }

    fn validate(&self) -> Result<(), CalendarError> {
        if self.end < self.start {
            return Err(CalendarError::InvalidRange {
                service: self.service,
                start: self.start,
                end: self.end,
            });
        }
        let days = (self.end - self.start).num_days() + 1;
        if days > MAX_RULE_DAYS {
            return Err(CalendarError::RangeTooLong {
                service: self.service,
                days,
                limit: MAX_RULE_DAYS,
            });
        }
        Ok(())
    }

    /// Dates this rule runs on, before exceptions are applied.
    fn weekly_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| self.weekdays[d.weekday().num_days_from_monday() as usize])
    }
}

/// Which services run on which dates, in one agency time zone.
///
/// Cloning is cheap; clones share the date index and window cache.
#[derive(Clone)]
pub struct ServiceCalendar {
    timezone: Tz,
    by_date: Arc<BTreeMap<NaiveDate, Arc<HashSet<ServiceId>>>>,
    windows: Cache<NaiveDate, Arc<ServiceDays>>,
    nothing_running: Arc<HashSet<ServiceId>>,
}

impl ServiceCalendar {
    /// An empty calendar: no service runs on any date.
    pub fn new(timezone: Tz) -> Self {
        Self::from_index(timezone, BTreeMap::new())
    }

    /// Build a calendar by expanding weekly rules and applying exceptions.
    pub fn from_rules(timezone: Tz, rules: &[CalendarRule]) -> Result<Self, CalendarError> {
        let mut index: BTreeMap<NaiveDate, HashSet<ServiceId>> = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            for date in rule.weekly_dates() {
                index.entry(date).or_default().insert(rule.service);
            }
            for date in &rule.added {
                index.entry(*date).or_default().insert(rule.service);
            }
            for date in &rule.removed {
                if let Some(services) = index.get_mut(date) {
                    services.remove(&rule.service);
                }
            }
        }
        index.retain(|_, services| !services.is_empty());
        debug!(
            rules = rules.len(),
            dates = index.len(),
            "built service calendar"
        );
        Ok(Self::from_index(
            timezone,
            index.into_iter().map(|(d, s)| (d, Arc::new(s))).collect(),
        ))
    }

    fn from_index(timezone: Tz, by_date: BTreeMap<NaiveDate, Arc<HashSet<ServiceId>>>) -> Self {
        Self {
            timezone,
            by_date: Arc::new(by_date),
            windows: Cache::builder()
                .max_capacity(WINDOW_CACHE_CAPACITY)
                .build(),
            nothing_running: Arc::new(HashSet::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Services running on `date`.
    pub fn services_on(&self, date: NaiveDate) -> Arc<HashSet<ServiceId>> {
        self.by_date
            .get(&date)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.nothing_running))
    }

    /// First and last dates with any service.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.by_date.keys().next()?;
        let last = self.by_date.keys().next_back()?;
        Some((*first, *last))
    }

    /// Local calendar date of an instant in the agency time zone.
    pub fn local_date(&self, instant: i64) -> Result<NaiveDate, CalendarError> {
        let utc = DateTime::from_timestamp(instant, 0)
            .ok_or(CalendarError::InstantOutOfRange(instant))?;
        Ok(utc.with_timezone(&self.timezone).date_naive())
    }

    /// Service day for an arbitrary date.
    pub fn service_day(&self, date: NaiveDate) -> Result<ServiceDay, CalendarError> {
        ServiceDay::new(date, self.timezone, self.services_on(date))
    }

    /// The yesterday/today/tomorrow window around `instant`.
    ///
    /// Windows are cached per local date.
    pub fn service_days(&self, instant: i64) -> Result<Arc<ServiceDays>, CalendarError> {
        let today = self.local_date(instant)?;
        self.windows
            .try_get_with(today, || self.build_window(today).map(Arc::new))
            .map_err(|e| (*e).clone())
    }

    fn build_window(&self, today: NaiveDate) -> Result<ServiceDays, CalendarError> {
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .ok_or(CalendarError::NoLocalNoon(today))?;
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or(CalendarError::NoLocalNoon(today))?;
        Ok(ServiceDays::new(
            self.service_day(yesterday)?,
            self.service_day(today)?,
            self.service_day(tomorrow)?,
        ))
    }
}

impl fmt::Debug for ServiceCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCalendar")
            .field("timezone", &self.timezone)
            .field("dates", &self.by_date.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const WEEKDAYS_ONLY: [bool; 7] = [true, true, true, true, true, false, false];

    #[test]
    fn weekday_rule_skips_weekend() {
        // 2024-03-15 is a Friday
        let rule = CalendarRule::daily(ServiceId(1), date(2024, 3, 11), date(2024, 3, 24))
            .with_weekdays(WEEKDAYS_ONLY);
        let cal = ServiceCalendar::from_rules(chrono_tz::UTC, &[rule]).unwrap();

        assert!(cal.services_on(date(2024, 3, 15)).contains(&ServiceId(1)));
        assert!(!cal.services_on(date(2024, 3, 16)).contains(&ServiceId(1)));
        assert!(!cal.services_on(date(2024, 3, 25)).contains(&ServiceId(1)));
        assert_eq!(cal.date_range(), Some((date(2024, 3, 11), date(2024, 3, 22))));
    }

    #[test]
    fn exceptions_add_and_remove() {
        let rule = CalendarRule::daily(ServiceId(2), date(2024, 1, 1), date(2024, 1, 10))
            .with_removed(date(2024, 1, 5))
            .with_added(date(2024, 2, 1));
        let cal = ServiceCalendar::from_rules(chrono_tz::UTC, &[rule]).unwrap();

        assert!(!cal.services_on(date(2024, 1, 5)).contains(&ServiceId(2)));
        assert!(cal.services_on(date(2024, 1, 6)).contains(&ServiceId(2)));
        assert!(cal.services_on(date(2024, 2, 1)).contains(&ServiceId(2)));
    }

    #[test]
    fn reject_inverted_range() {
        let rule = CalendarRule::daily(ServiceId(3), date(2024, 2, 1), date(2024, 1, 1));
        let err = ServiceCalendar::from_rules(chrono_tz::UTC, &[rule]).unwrap_err();
        assert!(matches!(err, CalendarError::InvalidRange { .. }));
    }

    #[test]
    fn reject_huge_range() {
        let rule = CalendarRule::daily(ServiceId(3), date(2000, 1, 1), date(2030, 1, 1));
        let err = ServiceCalendar::from_rules(chrono_tz::UTC, &[rule]).unwrap_err();
        assert!(matches!(err, CalendarError::RangeTooLong { .. }));
    }

    #[test]
    fn window_around_instant() {
        let rule = CalendarRule::daily(ServiceId(4), date(2024, 3, 15), date(2024, 3, 15));
        let cal = ServiceCalendar::from_rules(chrono_tz::UTC, &[rule]).unwrap();

        // 2024-03-15T10:00:00Z
        let days = cal.service_days(1_710_496_800).unwrap();
        assert_eq!(days.yesterday().date(), date(2024, 3, 14));
        assert_eq!(days.today().date(), date(2024, 3, 15));
        assert_eq!(days.tomorrow().date(), date(2024, 3, 16));
        assert!(days.today().service_id_running(ServiceId(4)));
        assert!(!days.yesterday().service_id_running(ServiceId(4)));

        // Same local date hits the cache and returns the same window
        let again = cal.service_days(1_710_496_800 + 3600).unwrap();
        assert!(Arc::ptr_eq(&days, &again));
    }

    #[test]
    fn local_date_follows_timezone() {
        let cal = ServiceCalendar::new(chrono_tz::America::New_York);
        // 2024-03-15T02:00:00Z is still the 14th in New York
        assert_eq!(cal.local_date(1_710_468_000).unwrap(), date(2024, 3, 14));
    }

    #[test]
    fn empty_calendar_runs_nothing() {
        let cal = ServiceCalendar::new(chrono_tz::UTC);
        assert!(cal.services_on(date(2024, 3, 15)).is_empty());
        assert_eq!(cal.date_range(), None);
    }
}
