//! Output filenames, metadata blocks and timestamp normalization.
//!
//! Filename layout:
//! - interval: `{symbol}_{interval}_{capture}.json`
//! - range: `{symbol}_{DD-MM-YYYY}_to_{DD-MM-YYYY}_{capture}.json`
//!
//! where `capture` is `HH_MM_SS_fffffffff_DD_MM_YYYY`. The capture time goes
//! down to nanoseconds, so re-fetching the same symbol never overwrites an
//! earlier artifact.

use super::timezone::{local_to_utc, parse_zone, TimezoneError};
use crate::domain::{Metadata, QuoteDocument, QuoteTable, TimeSpec, METADATA_KEY, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde_json::{Map, Value};

/// Capture timestamp layout inside filenames.
pub const CAPTURE_FORMAT: &str = "%H_%M_%S_%9f_%d_%m_%Y";

/// Build the artifact filename for `symbol` fetched over `spec` at `captured_at`.
///
/// `symbol` must have passed [`crate::domain::validate_symbol`].
pub fn build_filename(symbol: &str, spec: &TimeSpec, captured_at: NaiveDateTime) -> String {
    format!(
        "{symbol}_{}_{}.json",
        spec.label(),
        captured_at.format(CAPTURE_FORMAT)
    )
}

/// Set the metadata block of `document`, replacing any existing one.
///
/// Idempotent: the block keeps its position and applying the same metadata
/// twice leaves the document unchanged.
pub fn attach_metadata(document: &mut QuoteDocument, metadata: &Metadata) {
    document.insert(METADATA_KEY.to_string(), metadata.to_value());
}

/// Re-key every timestamp from wall-clock time in `zone` to UTC.
///
/// The metadata entry, if present, is carried over unchanged.
pub fn normalize_timestamps(
    rows: Map<String, Value>,
    zone: Tz,
) -> Result<Map<String, Value>, TimezoneError> {
    let mut normalized = Map::with_capacity(rows.len());
    for (key, values) in rows {
        if key == METADATA_KEY {
            normalized.insert(key, values);
            continue;
        }
        let local = NaiveDateTime::parse_from_str(&key, TIMESTAMP_FORMAT)
            .map_err(|_| TimezoneError::InvalidTimestamp(key.clone()))?;
        let utc = local_to_utc(local, zone)?;
        normalized.insert(utc.format(TIMESTAMP_FORMAT).to_string(), values);
    }
    Ok(normalized)
}

/// Turn a provider table into an output document.
///
/// Tables from providers that report exchange-local time are converted to
/// UTC first, using the zone the provider supplied with the data.
pub fn into_document(table: QuoteTable, metadata: &Metadata) -> Result<QuoteDocument, TimezoneError> {
    let zone = match (metadata.provider.reports_local_time(), table.timezone()) {
        (true, Some(name)) => Some(parse_zone(name)?),
        _ => None,
    };
    let rows = table.into_rows();
    let mut document = match zone {
        Some(zone) => normalize_timestamps(rows, zone)?,
        None => rows,
    };
    attach_metadata(&mut document, metadata);
    Ok(document)
}
