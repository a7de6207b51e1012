//! Quote records, output documents and the metadata block.

use super::provider::Provider;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved document key holding the metadata block.
pub const METADATA_KEY: &str = "metadata";

/// Fixed format of every timestamp key in a quote record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An output document: timestamp keys mapping to value objects, plus `metadata`.
///
/// Keys keep insertion order (serde_json `preserve_order`).
pub type QuoteDocument = Map<String, Value>;

/// Metadata attached to every output document under [`METADATA_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub ticker: String,
    pub interval: String,
    pub provider: Provider,
}

impl Metadata {
    pub fn new(ticker: impl Into<String>, interval: impl Into<String>, provider: Provider) -> Self {
        Self {
            ticker: ticker.into(),
            interval: interval.into(),
            provider,
        }
    }

    /// Read a complete metadata block back out of a document.
    pub fn from_document(document: &QuoteDocument) -> Option<Self> {
        document
            .get(METADATA_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn to_value(&self) -> Value {
        let mut block = Map::new();
        block.insert("ticker".into(), Value::String(self.ticker.clone()));
        block.insert("interval".into(), Value::String(self.interval.clone()));
        block.insert("provider".into(), Value::String(self.provider.label().into()));
        Value::Object(block)
    }
}

/// Tabular provider result: rows keyed by timestamp, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteTable {
    rows: Map<String, Value>,
    timezone: Option<String>,
}

impl QuoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the exchange zone the timestamps are expressed in.
    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        self.timezone = Some(zone.into());
        self
    }

    /// Insert a row; a repeated timestamp replaces the earlier values in place.
    pub fn push(&mut self, timestamp: NaiveDateTime, values: Value) {
        self.rows
            .insert(timestamp.format(TIMESTAMP_FORMAT).to_string(), values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn rows(&self) -> &Map<String, Value> {
        &self.rows
    }

    pub fn into_rows(self) -> Map<String, Value> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 4, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn rows_keep_provider_order() {
        let mut table = QuoteTable::new();
        table.push(ts(16, 0), json!({"close": 3.0}));
        table.push(ts(9, 30), json!({"close": 1.0}));
        table.push(ts(12, 0), json!({"close": 2.0}));
        let keys: Vec<&String> = table.rows().keys().collect();
        assert_eq!(
            keys,
            ["2020-04-17 16:00:00", "2020-04-17 09:30:00", "2020-04-17 12:00:00"]
        );
    }

    #[test]
    fn metadata_value_shape() {
        let meta = Metadata::new("AAPL", "1min", Provider::AlphaVantage);
        assert_eq!(
            meta.to_value(),
            json!({"ticker": "AAPL", "interval": "1min", "provider": "alpha vantage"})
        );
    }

    #[test]
    fn metadata_from_document() {
        let mut doc = QuoteDocument::new();
        assert!(Metadata::from_document(&doc).is_none());
        doc.insert(
            METADATA_KEY.into(),
            json!({"ticker": "SPY", "interval": "1m", "provider": "yahoo finance"}),
        );
        let meta = Metadata::from_document(&doc).unwrap();
        assert_eq!(meta, Metadata::new("SPY", "1m", Provider::YahooFinance));

        // legacy block without provider is incomplete
        doc.insert(METADATA_KEY.into(), json!({"ticker": "SPY", "interval": "1m"}));
        assert!(Metadata::from_document(&doc).is_none());
    }
}
