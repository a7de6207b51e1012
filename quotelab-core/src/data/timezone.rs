//! Exchange timezone handling.
//!
//! Conversions go through chrono-tz, so offsets follow the real DST rules for
//! each date rather than a fixed UTC offset.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("unknown timezone '{0}'")]
    UnknownZone(String),

    #[error("local time {timestamp} does not exist in {zone} (DST gap)")]
    NonexistentLocalTime { timestamp: String, zone: String },

    #[error("invalid timestamp key '{0}'")]
    InvalidTimestamp(String),

    #[error("zone table {path}: {message}")]
    Table { path: String, message: String },
}

/// Parse an IANA zone name (`America/New_York`, or links like `US/Eastern`).
pub fn parse_zone(name: &str) -> Result<Tz, TimezoneError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimezoneError::UnknownZone(name.to_string()))
}

/// Convert a wall-clock time in `zone` to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant.
pub fn local_to_utc(local: NaiveDateTime, zone: Tz) -> Result<NaiveDateTime, TimezoneError> {
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| TimezoneError::NonexistentLocalTime {
            timestamp: local.to_string(),
            zone: zone.name().to_string(),
        })
}

/// Wall-clock time in `zone` at the given UTC instant.
pub fn utc_to_local(utc: NaiveDateTime, zone: Tz) -> NaiveDateTime {
    zone.from_utc_datetime(&utc).naive_local()
}

/// Read-only ticker -> exchange zone mapping used to re-adapt old files.
pub trait ZoneLookup {
    fn zone_for(&self, ticker: &str) -> Option<&str>;
}

impl ZoneLookup for BTreeMap<String, String> {
    fn zone_for(&self, ticker: &str) -> Option<&str> {
        self.get(ticker).map(String::as_str)
    }
}

impl ZoneLookup for HashMap<String, String> {
    fn zone_for(&self, ticker: &str) -> Option<&str> {
        self.get(ticker).map(String::as_str)
    }
}

/// Zone table loaded from a TOML or JSON file.
///
/// ```toml
/// default_zone = "US/Eastern"
///
/// [zones]
/// "FTSEMIB.MI" = "Europe/Rome"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTable {
    #[serde(default)]
    pub default_zone: Option<String>,
    #[serde(default)]
    pub zones: BTreeMap<String, String>,
}

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, zone: impl Into<String>) -> Self {
        self.default_zone = Some(zone.into());
        self
    }

    pub fn insert(&mut self, ticker: impl Into<String>, zone: impl Into<String>) {
        self.zones.insert(ticker.into(), zone.into());
    }

    /// Load from `path`; `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, TimezoneError> {
        let table_err = |message: String| TimezoneError::Table {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| table_err(e.to_string()))?;
        let table: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| table_err(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| table_err(e.to_string()))?
        };
        table.validate()?;
        Ok(table)
    }

    /// Every zone name in the table must be a known IANA zone.
    pub fn validate(&self) -> Result<(), TimezoneError> {
        for zone in self.default_zone.iter().chain(self.zones.values()) {
            parse_zone(zone)?;
        }
        Ok(())
    }
}

impl ZoneLookup for ZoneTable {
    fn zone_for(&self, ticker: &str) -> Option<&str> {
        self.zones
            .get(ticker)
            .or(self.default_zone.as_ref())
            .map(String::as_str)
    }
}
