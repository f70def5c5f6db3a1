//! Request freshness.
//!
//! The `date` header is the only replay defence: a request is accepted while
//! its timestamp is within the configured tolerance of server time, in either
//! direction. There is no nonce cache, so an identical request verifies as
//! often as it is presented inside the window.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use crate::error::AuthError;

/// Name of the timestamp header.
pub const DATE_HEADER: &str = "date";

/// IMF-fixdate, the preferred HTTP date format.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Default clock-skew tolerance.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format an instant as an IMF-fixdate.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use checkgate_auth::freshness::format_http_date;
///
/// let t = Utc.with_ymd_and_hms(2014, 1, 5, 21, 31, 40).unwrap();
/// assert_eq!(format_http_date(t), "Sun, 05 Jan 2014 21:31:40 GMT");
/// ```
#[must_use]
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date. Accepts IMF-fixdate and RFC 2822 dates with an offset.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, HTTP_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc2822(value).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Check that `date_value` lies within `tolerance` of `now`.
///
/// # Errors
///
/// Returns [`AuthError::StaleRequest`] if the date cannot be parsed or is too
/// far from `now` in either direction.
pub fn check_freshness(
    date_value: &str,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), AuthError> {
    let timestamp = parse_http_date(date_value)
        .ok_or_else(|| AuthError::stale("date header is not a valid HTTP date"))?;

    let tolerance = TimeDelta::from_std(tolerance)
        .map_err(|_| AuthError::Internal("clock skew tolerance out of range".to_owned()))?;
    let skew = (now - timestamp).abs();

    if skew > tolerance {
        return Err(AuthError::stale(format!(
            "date is {}s from server time (tolerance {}s)",
            skew.num_seconds(),
            tolerance.num_seconds()
        )));
    }
    Ok(())
}

/// Read the `date` header and check it.
///
/// # Errors
///
/// Returns [`AuthError::StaleRequest`] if the header is missing, unreadable,
/// or outside the window.
pub fn check_request_freshness(
    headers: &http::HeaderMap,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), AuthError> {
    let value = headers
        .get(DATE_HEADER)
        .ok_or_else(|| AuthError::stale("date header is missing"))?
        .to_str()
        .map_err(|_| AuthError::stale("date header is not visible ASCII"))?;
    check_freshness(value, now, tolerance)
}
