//! CF time coordinate handling.
//!
//! Time values are stored as numbers relative to an epoch, described by a
//! units string such as `seconds since 1990-01-01 00:00:00Z`.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::dataset::Variable;
use crate::error::{DatasetError, DatasetResult};
use crate::masked::{normalize, MaskedArray};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("invalid time units: {0}")]
    InvalidUnits(String),

    #[error("unsupported calendar: {0}")]
    UnsupportedCalendar(String),

    #[error("missing units attribute")]
    MissingUnits,

    #[error("time variable is not numeric")]
    NotNumeric,
}

/// Step size of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "days" | "day" | "d" => Some(TimeUnit::Days),
            "hours" | "hour" | "hrs" | "hr" | "h" => Some(TimeUnit::Hours),
            "minutes" | "minute" | "mins" | "min" => Some(TimeUnit::Minutes),
            "seconds" | "second" | "secs" | "sec" | "s" => Some(TimeUnit::Seconds),
            "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => Some(TimeUnit::Milliseconds),
            "microseconds" | "microsecond" | "usecs" | "usec" | "us" => Some(TimeUnit::Microseconds),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Hours => "hours",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Microseconds => "microseconds",
        }
    }

    fn microseconds(&self) -> f64 {
        match self {
            TimeUnit::Days => 86_400_000_000.0,
            TimeUnit::Hours => 3_600_000_000.0,
            TimeUnit::Minutes => 60_000_000.0,
            TimeUnit::Seconds => 1_000_000.0,
            TimeUnit::Milliseconds => 1_000.0,
            TimeUnit::Microseconds => 1.0,
        }
    }
}

/// Calendars that map onto the proleptic Gregorian calendar used by chrono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    #[default]
    Standard,
    ProlepticGregorian,
}

impl Calendar {
    /// Parse a CF calendar attribute. A missing attribute means `standard`.
    pub fn parse(s: Option<&str>) -> Result<Self, TimeError> {
        match s.map(|c| c.trim().to_lowercase()) {
            None => Ok(Calendar::Standard),
            Some(c) => match c.as_str() {
                "" | "standard" | "gregorian" => Ok(Calendar::Standard),
                "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
                _ => Err(TimeError::UnsupportedCalendar(c)),
            },
        }
    }
}

/// Parsed `<unit> since <epoch>` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    pub fn new(unit: TimeUnit, epoch: DateTime<Utc>) -> Self {
        Self { unit, epoch }
    }

    /// Convert a stored number to a UTC datetime.
    ///
    /// Returns `None` for non-finite or out-of-range values.
    pub fn decode(&self, value: f64) -> Option<DateTime<Utc>> {
        let micros = value * self.unit.microseconds();
        if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::microseconds(micros.round() as i64))
    }

    /// Convert a UTC datetime to a stored number.
    pub fn encode(&self, time: &DateTime<Utc>) -> f64 {
        let delta = time.signed_duration_since(self.epoch);
        match delta.num_microseconds() {
            Some(us) => us as f64 / self.unit.microseconds(),
            None => delta.num_milliseconds() as f64 * 1_000.0 / self.unit.microseconds(),
        }
    }
}

impl FromStr for TimeUnits {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeError::InvalidUnits(s.to_string());
        let lower = s.trim().to_lowercase();
        let (unit, epoch) = lower.split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit.trim()).ok_or_else(invalid)?;
        let epoch = parse_epoch(epoch.trim()).ok_or_else(invalid)?;
        Ok(Self { unit, epoch })
    }
}

impl std::fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} since {}",
            self.unit.as_str(),
            self.epoch.format("%Y-%m-%d %H:%M:%SZ")
        )
    }
}

/// Parse the reference datetime of a units string.
///
/// Accepts RFC 3339, `YYYY-MM-DD hh:mm:ss[.f]` with `T` or a space as
/// separator, an optional trailing `Z` or `UTC`, and plain dates.
fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s.to_uppercase()) {
        return Some(dt.with_timezone(&Utc));
    }

    let trimmed = s
        .trim_end_matches("utc")
        .trim_end_matches('z')
        .trim_end_matches("+00:00")
        .trim_end_matches("+0000")
        .trim();

    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Decode a time variable into masked UTC datetimes.
///
/// Masked raw values (fill, out of valid range) stay masked.
pub fn decode_times(var: &Variable) -> DatasetResult<MaskedArray> {
    let units = var
        .attribute("units")
        .and_then(|a| a.as_str())
        .ok_or_else(|| DatasetError::time(var.name(), TimeError::MissingUnits))?;
    let units: TimeUnits = units.parse().map_err(|e| DatasetError::time(var.name(), e))?;
    Calendar::parse(var.attribute("calendar").and_then(|a| a.as_str()))
        .map_err(|e| DatasetError::time(var.name(), e))?;

    let raw = normalize(var)
        .to_f64()
        .ok_or_else(|| DatasetError::time(var.name(), TimeError::NotNumeric))?;

    Ok(MaskedArray::Time(
        raw.into_iter()
            .map(|v| v.and_then(|v| units.decode(v)))
            .collect(),
    ))
}
