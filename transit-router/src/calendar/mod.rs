//! Service calendars.
//!
//! A [`ServiceCalendar`] knows which services run on which dates. For a
//! search it produces a [`ServiceDays`] window of yesterday, today and
//! tomorrow around the query instant, since service times past 24:00 belong
//! to the previous day.

mod error;
mod service_calendar;
mod service_day;

pub use error::CalendarError;
pub use service_calendar::{CalendarRule, ServiceCalendar};
pub use service_day::{ServiceDay, ServiceDays};
