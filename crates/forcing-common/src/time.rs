//! CF-convention time coordinates.
//!
//! NetCDF stores time as plain numbers with a `units` attribute such as
//! `"hours since 1980-01-01 00:00:00"`. [`TimeAxis`] keeps both the raw
//! values (for writing back out) and the decoded UTC instants (for naming
//! output files).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Name of the time dimension and its coordinate variable.
pub const TIME_DIM: &str = "time";

/// Format an instant the way forcing file names expect it (`YYYYMMDDHH`).
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d%H").to_string()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time units: {0}")]
    InvalidUnits(String),

    #[error("Unsupported calendar: {0}")]
    UnsupportedCalendar(String),

    #[error("Time value {0} cannot be represented")]
    OutOfRange(f64),

    #[error("Time axes cannot be combined: {0}")]
    Incompatible(String),
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Parse a CF unit word (case-insensitive, singular/plural/abbreviated).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }

    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }
}

/// A parsed `"<unit> since <epoch>"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEncoding {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl TimeEncoding {
    pub fn new(unit: TimeUnit, epoch: DateTime<Utc>) -> Self {
        Self { unit, epoch }
    }

    /// Parse a CF `units` attribute.
    pub fn parse(units: &str) -> Result<Self, TimeParseError> {
        let invalid = || TimeParseError::InvalidUnits(units.to_string());

        let (unit, reference) = units
            .trim()
            .split_once(" since ")
            .ok_or_else(invalid)?;
        let unit = TimeUnit::from_str(unit.trim()).ok_or_else(invalid)?;
        let epoch = parse_reference(reference.trim()).ok_or_else(invalid)?;

        Ok(Self { unit, epoch })
    }

    /// Decode one raw offset to a UTC instant.
    pub fn decode(&self, value: f64) -> Result<DateTime<Utc>, TimeParseError> {
        if !value.is_finite() {
            return Err(TimeParseError::OutOfRange(value));
        }
        let millis = (value * self.unit.seconds() * 1000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return Err(TimeParseError::OutOfRange(value));
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .ok_or(TimeParseError::OutOfRange(value))
    }

    /// Encode a UTC instant as a raw offset.
    pub fn encode(&self, dt: &DateTime<Utc>) -> f64 {
        let millis = (*dt - self.epoch).num_milliseconds() as f64;
        millis / 1000.0 / self.unit.seconds()
    }

    /// Render back to a CF `units` string.
    pub fn units(&self) -> String {
        format!(
            "{} since {}",
            self.unit.as_str(),
            self.epoch.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let s = s
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim_end_matches(" +0000")
        .trim();

    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn check_calendar(calendar: Option<&str>) -> Result<(), TimeParseError> {
    match calendar.map(|c| c.to_lowercase()) {
        None => Ok(()),
        Some(c) if matches!(c.as_str(), "standard" | "gregorian" | "proleptic_gregorian") => Ok(()),
        Some(c) => Err(TimeParseError::UnsupportedCalendar(c)),
    }
}

/// The decoded `time` coordinate of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    values: Vec<f64>,
    units: String,
    calendar: Option<String>,
    instants: Vec<DateTime<Utc>>,
}

impl TimeAxis {
    /// Decode raw values using their CF `units` and optional `calendar`.
    pub fn decode(
        values: Vec<f64>,
        units: &str,
        calendar: Option<&str>,
    ) -> Result<Self, TimeParseError> {
        check_calendar(calendar)?;
        let encoding = TimeEncoding::parse(units)?;
        let instants = values
            .iter()
            .map(|v| encoding.decode(*v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            values,
            units: units.to_string(),
            calendar: calendar.map(str::to_string),
            instants,
        })
    }

    /// Concatenate axes, re-encoding everything in the first axis' units.
    pub fn concat(axes: &[TimeAxis]) -> Result<Self, TimeParseError> {
        let first = axes
            .first()
            .ok_or_else(|| TimeParseError::Incompatible("no time axes given".to_string()))?;
        let encoding = TimeEncoding::parse(&first.units)?;

        let instants: Vec<DateTime<Utc>> = axes
            .iter()
            .flat_map(|axis| axis.instants.iter().copied())
            .collect();
        let values = instants.iter().map(|dt| encoding.encode(dt)).collect();

        Ok(Self {
            values,
            units: first.units.clone(),
            calendar: first.calendar.clone(),
            instants,
        })
    }

    /// A length-1 axis holding only the entry at `index`.
    pub fn select(&self, index: usize) -> Option<Self> {
        Some(Self {
            values: vec![*self.values.get(index)?],
            units: self.units.clone(),
            calendar: self.calendar.clone(),
            instants: vec![*self.instants.get(index)?],
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn calendar(&self) -> Option<&str> {
        self.calendar.as_deref()
    }

    pub fn instants(&self) -> &[DateTime<Utc>] {
        &self.instants
    }

    pub fn first(&self) -> Option<&DateTime<Utc>> {
        self.instants.first()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
