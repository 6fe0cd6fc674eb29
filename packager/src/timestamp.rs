//! Build timestamps.
//!
//! A single timestamp is chosen per run and threaded through every registry
//! entry and the index itself. It is resolved once at the edge of the
//! program (explicit override, then `SOURCE_DATE_EPOCH`, then the clock)
//! and passed in, so the pipeline never reads the wall clock itself.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Environment variable honoured for reproducible builds.
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

const RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors arising from timestamp parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The override is not an ISO 8601 / RFC 3339 date-time.
    #[error("invalid timestamp \"{value}\": expected ISO 8601, e.g. 2026-01-31T12:00:00Z")]
    Invalid {
        /// The rejected text.
        value: String,
    },

    /// `SOURCE_DATE_EPOCH` is not a representable count of seconds.
    #[error("invalid SOURCE_DATE_EPOCH \"{value}\": expected seconds since the Unix epoch")]
    InvalidEpoch {
        /// The rejected text.
        value: String,
    },
}

/// A UTC instant with whole-second precision.
///
/// Renders as `YYYY-MM-DDThh:mm:ssZ`.
///
/// # Examples
///
/// ```
/// use module_packager::timestamp::BuildTimestamp;
///
/// let ts = BuildTimestamp::parse("2026-02-03T10:20:30.999+02:00").expect("valid");
/// assert_eq!(ts.to_string(), "2026-02-03T08:20:30Z");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildTimestamp(DateTime<Utc>);

impl BuildTimestamp {
    /// Truncate `instant` to whole seconds.
    #[must_use]
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let whole = DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant);
        Self(whole)
    }

    /// Parse an RFC 3339 date-time, or a zone-less one taken as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Invalid`] if `value` matches neither form.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        let trimmed = value.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from_datetime(instant.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(trimmed, NAIVE_FORMAT)
            .map(|naive| Self::from_datetime(naive.and_utc()))
            .map_err(|_| TimestampError::Invalid {
                value: value.to_owned(),
            })
    }

    /// Interpret `value` as seconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::InvalidEpoch`] for non-integers or values
    /// outside chrono's range.
    pub fn from_epoch_seconds(value: &str) -> Result<Self, TimestampError> {
        let invalid = || TimestampError::InvalidEpoch {
            value: value.to_owned(),
        };
        let seconds: i64 = value.trim().parse().map_err(|_| invalid())?;
        DateTime::from_timestamp(seconds, 0)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// The underlying instant.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for BuildTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RENDER_FORMAT))
    }
}

impl Serialize for BuildTimestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source of the current time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Choose the run's timestamp.
///
/// A non-blank `explicit` value wins, then a non-blank
/// `source_date_epoch`, then `clock`.
///
/// # Errors
///
/// Returns a [`TimestampError`] if the chosen textual source is malformed.
/// A malformed value is never silently skipped in favour of the clock.
pub fn resolve_timestamp(
    explicit: Option<&str>,
    source_date_epoch: Option<&str>,
    clock: &dyn Clock,
) -> Result<BuildTimestamp, TimestampError> {
    fn non_blank(value: Option<&str>) -> Option<&str> {
        value.filter(|s| !s.trim().is_empty())
    }

    if let Some(value) = non_blank(explicit) {
        return BuildTimestamp::parse(value);
    }
    if let Some(value) = non_blank(source_date_epoch) {
        return BuildTimestamp::from_epoch_seconds(value);
    }
    Ok(BuildTimestamp::from_datetime(clock.now()))
}
