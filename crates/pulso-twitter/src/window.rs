//! One-day search windows over a `[start, end)` range.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::TwitterError;

/// A half-open `[start, end)` search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// `start` rendered the way the search API expects, e.g. `2023-05-15T00:00:00Z`.
    #[must_use]
    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Split `[start, end)` into consecutive one-day windows.
///
/// The last window ends exactly one day after its start, so a range that is
/// not a whole number of days produces a final window reaching past `end`.
/// `start == end` yields no windows.
///
/// # Errors
///
/// Returns [`TwitterError::InvalidWindow`] if `start` is later than `end`, or
/// if a window would end past the last representable instant.
pub fn generate_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Window>, TwitterError> {
    if start > end {
        return Err(TwitterError::InvalidWindow(format!(
            "start {start} cannot be later than end {end}"
        )));
    }

    let step = Duration::days(1);
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = cursor.checked_add_signed(step).ok_or_else(|| {
            TwitterError::InvalidWindow(format!("window starting at {cursor} ends out of range"))
        })?;
        windows.push(Window {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    Ok(windows)
}

/// Parse a range bound given as RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`
/// (taken as UTC), or a bare `YYYY-MM-DD` (midnight UTC).
///
/// # Errors
///
/// Returns [`TwitterError::InvalidWindow`] if `raw` matches none of these forms.
pub fn parse_bound(raw: &str) -> Result<DateTime<Utc>, TwitterError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(TwitterError::InvalidWindow(format!(
        "'{raw}' is not a valid point in time"
    )))
}
