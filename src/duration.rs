//! Free-text sanction durations
//!
//! Parses expressions like `"2 days"` or `"30 minutes"` into a span. A month is
//! a fixed 30 days, not a calendar month.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;

/// Unit names in match order, with their length in seconds.
///
/// Matching is by containment in the unit word, so the first hit wins.
const UNITS: [(&str, u64); 5] = [
    ("day", DAY),
    ("week", WEEK),
    ("month", MONTH),
    ("hour", HOUR),
    ("minute", MINUTE),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Invalid duration '{0}'. Use e.g. 10 minutes, 1 day, 2 weeks")]
    InvalidDuration(String),
}

/// Parse a duration expression.
///
/// Grammar: `<positive integer>[whitespace]<unit>[s]`, case-insensitive. Text
/// after the unit word is ignored. The amount has no upper bound; the span
/// saturates rather than overflowing.
///
/// # Errors
/// Returns [`DurationError::InvalidDuration`] on empty input, a missing, zero or
/// non-numeric amount, or an unknown unit.
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::InvalidDuration(text.trim().to_string());

    let lowered = text.trim().to_lowercase();
    let digits_end = lowered
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lowered.len());
    if digits_end == 0 {
        return Err(invalid());
    }

    // Only digits remain, so parsing can fail only on overflow
    let amount: u64 = lowered[..digits_end].parse().unwrap_or(u64::MAX);
    if amount == 0 {
        return Err(invalid());
    }

    let unit_word = lowered[digits_end..]
        .split_whitespace()
        .next()
        .ok_or_else(invalid)?;

    let seconds = UNITS
        .iter()
        .find(|(name, _)| unit_word.contains(name))
        .map(|(_, seconds)| *seconds)
        .ok_or_else(invalid)?;

    Ok(Duration::from_secs(amount.saturating_mul(seconds)))
}

/// The instant a sanction of length `span` started at `now` ends.
///
/// Saturates at the latest representable timestamp.
#[must_use]
pub fn expiry_from(now: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(span)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
