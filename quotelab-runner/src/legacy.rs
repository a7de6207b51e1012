//! Legacy data adapter: one-shot migration of previously downloaded files.
//!
//! Older artifacts carry no `provider` in their metadata (or no metadata at
//! all), Alpha Vantage ones are keyed in exchange-local time, and Yahoo ones
//! may still be in the pandas "table" layout (`{"schema": .., "data": [..]}`).
//! The adapter rewrites each file in place into the current layout:
//! timestamp-keyed rows (UTC for Alpha Vantage) plus the metadata block.
//!
//! A file that cannot be migrated is skipped with a warning; the walk goes on.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quotelab_core::data::{
    attach_metadata, json_files, normalize_timestamps, parse_zone, write_document_atomic,
    DataError, TimezoneError, ZoneLookup,
};
use quotelab_core::domain::{Metadata, Provider, QuoteDocument, METADATA_KEY, TIMESTAMP_FORMAT};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level key the first migration script wrote next to the rows.
const LEGACY_TICKER_KEY: &str = "ticker";

/// Why a single file was not migrated.
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} is not a JSON object")]
    NotAnObject(PathBuf),

    #[error("{0} already carries provider metadata")]
    AlreadyMigrated(PathBuf),

    #[error("cannot infer a ticker from {0}")]
    UnknownTicker(PathBuf),

    #[error("cannot infer the interval of {0}: not in the filename nor in the metadata")]
    UnknownInterval(PathBuf),

    #[error("no timezone known for {ticker} ({path})")]
    MissingZone { path: PathBuf, ticker: String },

    #[error("unusable row in {path}: {message}")]
    BadRow { path: PathBuf, message: String },

    #[error("timezone conversion failed for {path}: {source}")]
    Timezone {
        path: PathBuf,
        #[source]
        source: TimezoneError,
    },

    #[error("failed to rewrite {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: DataError,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a directory migration.
#[derive(Debug, Default)]
pub struct AdaptSummary {
    pub migrated: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, AdaptError)>,
}

impl AdaptSummary {
    pub fn total(&self) -> usize {
        self.migrated.len() + self.skipped.len()
    }
}

/// Split a legacy file stem into `(ticker, interval segment)`.
///
/// The interval segment is the second `_`-separated part, unless that part
/// is a date (`DD-MM-YY` or `DD-MM-YYYY`), as in old Yahoo range files.
pub fn parse_stem(stem: &str) -> (&str, Option<&str>) {
    let mut parts = stem.split('_');
    let ticker = parts.next().unwrap_or_default();
    let interval = parts.next().filter(|seg| !seg.is_empty() && !is_date(seg));
    (ticker, interval)
}

fn is_date(segment: &str) -> bool {
    ["%d-%m-%y", "%d-%m-%Y"]
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(segment, fmt).is_ok())
}

/// Migrates the files of one provider.
pub struct LegacyAdapter<'a> {
    provider: Provider,
    zones: &'a dyn ZoneLookup,
}

impl<'a> LegacyAdapter<'a> {
    pub fn new(provider: Provider, zones: &'a dyn ZoneLookup) -> Self {
        Self { provider, zones }
    }

    /// Migrate every `*.json` under `dir`. Only an unreadable directory is fatal.
    pub fn adapt_dir(&self, dir: &Path) -> Result<AdaptSummary, AdaptError> {
        let files = json_files(dir).map_err(|source| AdaptError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut summary = AdaptSummary::default();
        for path in files {
            match self.adapt_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "migrated");
                    summary.migrated.push(path);
                }
                Err(e @ AdaptError::AlreadyMigrated(_)) => {
                    tracing::debug!("{e}");
                    summary.skipped.push((path, e));
                }
                Err(e) => {
                    tracing::warn!("skipping file: {e}");
                    summary.skipped.push((path, e));
                }
            }
        }
        tracing::info!(
            dir = %dir.display(),
            migrated = summary.migrated.len(),
            skipped = summary.skipped.len(),
            "legacy migration finished"
        );
        Ok(summary)
    }

    /// Migrate one file in place.
    pub fn adapt_file(&self, path: &Path) -> Result<(), AdaptError> {
        let content = std::fs::read_to_string(path).map_err(|source| AdaptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| AdaptError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let document = self.adapt_document(path, value)?;
        write_document_atomic(path, &document).map_err(|source| AdaptError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the migrated document for the file at `path` (used for
    /// ticker/interval inference and error context only).
    pub fn adapt_document(&self, path: &Path, value: Value) -> Result<QuoteDocument, AdaptError> {
        let Value::Object(mut object) = value else {
            return Err(AdaptError::NotAnObject(path.to_path_buf()));
        };

        let old_meta = object.remove(METADATA_KEY);
        if old_meta.as_ref().and_then(|m| m.get("provider")).is_some() {
            return Err(AdaptError::AlreadyMigrated(path.to_path_buf()));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (ticker, interval) = parse_stem(&stem);
        if ticker.is_empty() {
            return Err(AdaptError::UnknownTicker(path.to_path_buf()));
        }
        let interval = interval
            .map(str::to_string)
            .or_else(|| {
                old_meta
                    .as_ref()
                    .and_then(|m| m.get("interval"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| AdaptError::UnknownInterval(path.to_path_buf()))?;

        let rows = if is_table_layout(&object) {
            rekey_table(path, &object)?
        } else {
            if object.get(LEGACY_TICKER_KEY).is_some_and(Value::is_string) {
                object.remove(LEGACY_TICKER_KEY);
            }
            object
        };

        let rows = if self.provider.reports_local_time() {
            let zone_name = self
                .zones
                .zone_for(ticker)
                .ok_or_else(|| AdaptError::MissingZone {
                    path: path.to_path_buf(),
                    ticker: ticker.to_string(),
                })?;
            let tz_err = |source| AdaptError::Timezone {
                path: path.to_path_buf(),
                source,
            };
            let zone = parse_zone(zone_name).map_err(tz_err)?;
            normalize_timestamps(rows, zone).map_err(tz_err)?
        } else {
            rows
        };

        let mut document = rows;
        attach_metadata(&mut document, &Metadata::new(ticker, interval, self.provider));
        Ok(document)
    }
}

fn is_table_layout(object: &Map<String, Value>) -> bool {
    object.contains_key("schema") && object.get("data").is_some_and(Value::is_array)
}

/// Convert a pandas `orient="table"` document into timestamp-keyed rows.
fn rekey_table(path: &Path, object: &Map<String, Value>) -> Result<Map<String, Value>, AdaptError> {
    let bad_row = |message: String| AdaptError::BadRow {
        path: path.to_path_buf(),
        message,
    };
    let index_key = object
        .get("schema")
        .and_then(|s| s.get("primaryKey"))
        .and_then(|k| k.get(0))
        .and_then(Value::as_str);

    let mut rows = Map::new();
    for (i, row) in object["data"].as_array().into_iter().flatten().enumerate() {
        let Value::Object(fields) = row else {
            return Err(bad_row(format!("row {i} is not an object")));
        };
        let key = index_key
            .or_else(|| ["Datetime", "Date", "index"].into_iter().find(|k| fields.contains_key(*k)))
            .ok_or_else(|| bad_row(format!("row {i} has no index column")))?;
        let stamp = fields
            .get(key)
            .and_then(parse_table_timestamp)
            .ok_or_else(|| bad_row(format!("row {i} has an unreadable '{key}' value")))?;

        let values: Map<String, Value> = fields
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        rows.insert(stamp.format(TIMESTAMP_FORMAT).to_string(), Value::Object(values));
    }
    Ok(rows)
}

/// ISO strings with an offset are converted to UTC; naive ones are kept;
/// numbers are epoch milliseconds.
fn parse_table_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT))
            .ok(),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?).map(|dt| dt.naive_utc()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotelab_core::data::ZoneTable;
    use serde_json::json;

    #[test]
    fn stem_parsing() {
        assert_eq!(parse_stem("AAPL_1min_16_05_09_17_04_2020"), ("AAPL", Some("1min")));
        assert_eq!(parse_stem("SPY_17-04-20_to_24-04-20"), ("SPY", None));
        assert_eq!(parse_stem("SPY_24-04-20_5d"), ("SPY", None));
        assert_eq!(parse_stem("GME"), ("GME", None));
    }

    #[test]
    fn alpha_vantage_rows_rekeyed_to_utc() {
        let zones = ZoneTable::new().with_default("US/Eastern");
        let adapter = LegacyAdapter::new(Provider::AlphaVantage, &zones);
        let doc = adapter
            .adapt_document(
                Path::new("AAPL_1min_16_05_09_17_04_2020.json"),
                json!({
                    "2020-04-17 16:00:00": {"4. close": "282.80"},
                    "ticker": "AAPL"
                }),
            )
            .unwrap();
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, ["2020-04-17 20:00:00", METADATA_KEY]);
        assert_eq!(
            doc[METADATA_KEY],
            json!({"ticker": "AAPL", "interval": "1min", "provider": "alpha vantage"})
        );
    }

    #[test]
    fn alpha_vantage_without_zone_is_skipped() {
        let zones = ZoneTable::new();
        let adapter = LegacyAdapter::new(Provider::AlphaVantage, &zones);
        let err = adapter
            .adapt_document(Path::new("AAPL_1min_x.json"), json!({}))
            .unwrap_err();
        assert!(matches!(err, AdaptError::MissingZone { ref ticker, .. } if ticker == "AAPL"));
    }

    #[test]
    fn yahoo_table_layout_takes_interval_from_metadata() {
        let zones = ZoneTable::new();
        let adapter = LegacyAdapter::new(Provider::YahooFinance, &zones);
        let doc = adapter
            .adapt_document(
                Path::new("SPY_17-04-20_to_24-04-20.json"),
                json!({
                    "schema": {"fields": [], "primaryKey": ["Datetime"], "pandas_version": "0.20.0"},
                    "data": [
                        {"Datetime": "2020-04-17T13:30:00.000Z", "Open": 285.38, "Close": 285.6},
                        {"Datetime": "2020-04-17T09:31:00.000-04:00", "Open": 285.6, "Close": 285.7}
                    ],
                    "metadata": {"ticker": "SPY", "interval": "1m"}
                }),
            )
            .unwrap();
        assert_eq!(doc["2020-04-17 13:30:00"], json!({"Open": 285.38, "Close": 285.6}));
        assert_eq!(doc["2020-04-17 13:31:00"], json!({"Open": 285.6, "Close": 285.7}));
        assert_eq!(
            Metadata::from_document(&doc),
            Some(Metadata::new("SPY", "1m", Provider::YahooFinance))
        );
    }

    #[test]
    fn interval_unknown_is_skipped() {
        let zones = ZoneTable::new();
        let adapter = LegacyAdapter::new(Provider::YahooFinance, &zones);
        let err = adapter
            .adapt_document(Path::new("SPY_24-04-20_5d.json"), json!({"metadata": {"ticker": "SPY"}}))
            .unwrap_err();
        assert!(matches!(err, AdaptError::UnknownInterval(_)));
    }

    #[test]
    fn migrated_documents_are_left_alone() {
        let zones = ZoneTable::new();
        let adapter = LegacyAdapter::new(Provider::YahooFinance, &zones);
        let err = adapter
            .adapt_document(
                Path::new("SPY_5d_x.json"),
                json!({"metadata": {"ticker": "SPY", "interval": "1d", "provider": "yahoo finance"}}),
            )
            .unwrap_err();
        assert!(matches!(err, AdaptError::AlreadyMigrated(_)));
    }

    #[test]
    fn non_object_is_rejected() {
        let zones = ZoneTable::new();
        let adapter = LegacyAdapter::new(Provider::YahooFinance, &zones);
        let err = adapter
            .adapt_document(Path::new("SPY_5d.json"), json!([1, 2]))
            .unwrap_err();
        assert!(matches!(err, AdaptError::NotAnObject(_)));
    }
}
