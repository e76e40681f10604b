//! Service time handling.
//!
//! Transit feeds give times as "HH:MM:SS" measured from the start of the
//! service day. Hours may exceed 23 for trips that run past midnight, so these
//! are plain second offsets, not wall-clock times.

use std::fmt;

/// Seconds in one service day (ignoring daylight-saving transitions).
pub const SECONDS_PER_DAY: i32 = 24 * 60 * 60;

/// Latest service time accepted: 48 hours after the service day starts.
const MAX_SERVICE_SECONDS: i32 = 2 * SECONDS_PER_DAY;

/// Error returned when parsing an invalid service time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse a service time in "H:MM:SS" or "HH:MM:SS" form into seconds since
/// the start of the service day.
///
/// # Examples
///
/// ```
/// use transit_router::domain::parse_service_time;
///
/// assert_eq!(parse_service_time("08:30:00").unwrap(), 30_600);
/// assert_eq!(parse_service_time("7:05:10").unwrap(), 25_510);
///
/// // Overnight trips keep counting past 24h
/// assert_eq!(parse_service_time("25:00:00").unwrap(), 90_000);
///
/// assert!(parse_service_time("08:30").is_err());
/// assert!(parse_service_time("08:60:00").is_err());
/// ```
pub fn parse_service_time(s: &str) -> Result<i32, TimeError> {
    let mut parts = s.split(':');
    let (Some(h), Some(m), Some(sec), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TimeError::new("expected H:MM:SS format"));
    };

    if h.is_empty() || h.len() > 2 || !h.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("invalid hour digits"));
    }
    let hours: i32 = h
        .parse()
        .map_err(|_| TimeError::new("invalid hour digits"))?;

    let minutes =
        parse_two_digits(m.as_bytes()).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minutes > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    let seconds =
        parse_two_digits(sec.as_bytes()).ok_or_else(|| TimeError::new("invalid second digits"))?;
    if seconds > 59 {
        return Err(TimeError::new("second must be 0-59"));
    }

    let total = hours * 3600 + minutes as i32 * 60 + seconds as i32;
    if total > MAX_SERVICE_SECONDS {
        return Err(TimeError::new("service time beyond 48:00:00"));
    }
    Ok(total)
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// Seconds since the start of a service day, displayed as "HH:MM:SS".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceTime(pub i32);

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceTime({self})")
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let secs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_times() {
        assert_eq!(parse_service_time("00:00:00").unwrap(), 0);
        assert_eq!(parse_service_time("23:59:59").unwrap(), 86_399);
        assert_eq!(parse_service_time("24:00:00").unwrap(), 86_400);
        assert_eq!(parse_service_time("48:00:00").unwrap(), 172_800);
    }

    #[test]
    fn reject_bad_formats() {
        assert!(parse_service_time("").is_err());
        assert!(parse_service_time("8:30").is_err());
        assert!(parse_service_time("08:30:00:00").is_err());
        assert!(parse_service_time("123:00:00").is_err());
        assert!(parse_service_time("08:3:00").is_err());
        assert!(parse_service_time("ab:00:00").is_err());
        assert!(parse_service_time("08:00:61").is_err());
        assert!(parse_service_time("49:00:00").is_err());
    }

    #[test]
    fn error_display() {
        let err = parse_service_time("08:60:00").unwrap_err();
        assert_eq!(err.to_string(), "invalid service time: minute must be 0-59");
    }

    #[test]
    fn display_service_time() {
        assert_eq!(ServiceTime(0).to_string(), "00:00:00");
        assert_eq!(ServiceTime(90_061).to_string(), "25:01:01");
        assert_eq!(ServiceTime(-300).to_string(), "-00:05:00");
        assert_eq!(format!("{:?}", ServiceTime(3600)), "ServiceTime(01:00:00)");
    }
}
