//! Calendar error types.

use chrono::NaiveDate;

use crate::domain::ServiceId;

/// Errors from building or querying a service calendar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Rule ends before it starts
    #[error("calendar rule for {service} ends ({end}) before it starts ({start})")]
    InvalidRange {
        service: ServiceId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Rule covers an unreasonable number of days
    #[error("calendar rule for {service} spans {days} days (limit {limit})")]
    RangeTooLong {
        service: ServiceId,
        days: i64,
        limit: i64,
    },

    /// Local noon does not exist on this date in the agency time zone
    #[error("no local noon on {0} in the agency time zone")]
    NoLocalNoon(NaiveDate),

    /// Instant cannot be represented as a date
    #[error("instant {0} is out of range")]
    InstantOutOfRange(i64),
}
