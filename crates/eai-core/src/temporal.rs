//! # Temporal Types: UTC Timestamps and Injectable Clocks
//!
//! `Timestamp` is a UTC instant truncated to seconds. It serializes as Unix
//! seconds, which is what the participant and event records carry on the
//! wire and in snapshots.
//!
//! Components never call `Utc::now()` directly. They hold a [`SharedClock`]
//! so the registry, the issuance engine and the signature map can be driven
//! by a [`ManualClock`] in tests (credential expiry, join-year checks).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp(format!("unix seconds {secs} out of range")))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Calendar year of this instant in UTC.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// First instant of the year after `year`, i.e. the exclusive end of `year`.
    pub fn end_of_year(year: i32) -> Option<Self> {
        let next = year.checked_add(1)?;
        Utc.with_ymd_and_hms(next, 1, 1, 0, 0, 0).single().map(Self)
    }

    /// Format as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.epoch_secs()
    }
}

impl TryFrom<i64> for Timestamp {
    type Error = ValidationError;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        Self::from_epoch_secs(secs)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Time source abstraction so components can be tested against fixed time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant with full (nanosecond) precision.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant truncated to seconds.
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_utc(self.now())
    }

    /// Current instant as nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> i64 {
        self.now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Clock handle shared between components.
pub type SharedClock = Arc<dyn Clock>;

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    /// Shared handle to the system clock.
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    /// Start the clock at the given Unix second.
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self {
            nanos: AtomicI64::new(secs.saturating_mul(1_000_000_000)),
        }
    }

    /// Start the clock at the given RFC 3339 instant (`Z` suffix).
    pub fn at(ts: &str) -> Result<Self, ValidationError> {
        Ok(Self::at_epoch_secs(Timestamp::parse(ts)?.epoch_secs()))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let delta = i64::try_from(by.as_nanos()).unwrap_or(i64::MAX);
        self.nanos.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an absolute Unix second.
    pub fn set_epoch_secs(&self, secs: i64) {
        self.nanos
            .store(secs.saturating_mul(1_000_000_000), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
