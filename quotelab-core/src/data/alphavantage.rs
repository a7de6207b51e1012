//! Alpha Vantage intraday provider.
//!
//! Calls `TIME_SERIES_INTRADAY` and returns rows keyed by the exchange-local
//! timestamps Alpha Vantage reports, together with the zone from
//! `Meta Data."6. Time Zone"`. The free tier allows a handful of calls per
//! minute; pacing is the bulk runner's job, this client makes one request
//! per call and never retries.

use super::provider::{DataError, FetchOutcome, IntervalSource};
use crate::domain::{AvInterval, OutputSize, Provider, QuoteTable, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

const TIME_ZONE_FIELD: &str = "6. Time Zone";

/// Alpha Vantage intraday client.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, premium hosts).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(
        &self,
        symbol: &str,
        interval: AvInterval,
        outputsize: OutputSize,
    ) -> Result<String, DataError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("outputsize", outputsize.as_str()),
                ("datatype", "json"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::AuthenticationRequired(format!(
                "Alpha Vantage rejected the API key (HTTP {status})"
            )));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited(format!("HTTP {status} for {symbol}")));
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: Provider::AlphaVantage,
                status: status.as_u16(),
            });
        }

        resp.text()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to read body for {symbol}: {e}")))
    }
}

/// Parse a `TIME_SERIES_INTRADAY` JSON body.
///
/// - `"Error Message"` about the `apikey` parameter -> `AuthenticationRequired`
/// - any other `"Error Message"` (unknown symbol, bad call) -> `Absent`
/// - `"Note"` / `"Information"` (call frequency exceeded) -> `RateLimited`
/// - zero rows -> `Absent`
pub fn parse_intraday(symbol: &str, body: &str) -> Result<FetchOutcome, DataError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;
    let root = value
        .as_object()
        .ok_or_else(|| DataError::ResponseFormatChanged("top-level value is not an object".into()))?;

    if let Some(message) = root.get("Error Message") {
        let text = message.as_str().unwrap_or_default();
        if text.to_ascii_lowercase().contains("apikey") {
            return Err(DataError::AuthenticationRequired(text.to_string()));
        }
        tracing::debug!(symbol, %message, "alpha vantage has no data");
        return Ok(FetchOutcome::Absent);
    }
    if let Some(note) = root.get("Note").or_else(|| root.get("Information")) {
        let note = note.as_str().unwrap_or("call frequency exceeded");
        return Err(DataError::RateLimited(note.to_string()));
    }

    let zone = root
        .get("Meta Data")
        .and_then(|meta| meta.get(TIME_ZONE_FIELD))
        .and_then(Value::as_str);

    let series = root
        .iter()
        .find(|(key, _)| key.starts_with("Time Series"))
        .map(|(_, v)| v)
        .ok_or_else(|| DataError::ResponseFormatChanged("no time series in response".into()))?
        .as_object()
        .ok_or_else(|| DataError::ResponseFormatChanged("time series is not an object".into()))?;

    let mut table = QuoteTable::new();
    if let Some(zone) = zone {
        table = table.with_timezone(zone);
    }
    for (key, values) in series {
        let ts = NaiveDateTime::parse_from_str(key, TIMESTAMP_FORMAT).map_err(|_| {
            DataError::ResponseFormatChanged(format!("unexpected timestamp '{key}'"))
        })?;
        table.push(ts, values.clone());
    }

    Ok(FetchOutcome::from_table(table))
}

impl IntervalSource for AlphaVantageProvider {
    fn provider(&self) -> Provider {
        Provider::AlphaVantage
    }

    fn fetch_interval(
        &self,
        symbol: &str,
        interval: AvInterval,
        outputsize: OutputSize,
    ) -> Result<FetchOutcome, DataError> {
        let body = self.request(symbol, interval, outputsize)?;
        parse_intraday(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTRADAY: &str = r#"{
        "Meta Data": {
            "1. Information": "Intraday (1min) open, high, low, close prices and volume",
            "2. Symbol": "AAPL",
            "3. Last Refreshed": "2020-04-17 16:00:00",
            "4. Interval": "1min",
            "5. Output Size": "Full size",
            "6. Time Zone": "US/Eastern"
        },
        "Time Series (1min)": {
            "2020-04-17 16:00:00": {
                "1. open": "282.3300",
                "2. high": "282.8000",
                "3. low": "282.1000",
                "4. close": "282.8000",
                "5. volume": "712302"
            },
            "2020-04-17 15:59:00": {
                "1. open": "282.5500",
                "2. high": "282.6100",
                "3. low": "282.2500",
                "4. close": "282.3300",
                "5. volume": "284411"
            }
        }
    }"#;

    #[test]
    fn parses_rows_and_zone() {
        let FetchOutcome::Found(table) = parse_intraday("AAPL", INTRADAY).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(table.len(), 2);
        assert_eq!(table.timezone(), Some("US/Eastern"));
        let first = table.rows().keys().next().unwrap();
        assert_eq!(first, "2020-04-17 16:00:00");
        assert_eq!(
            table.rows()["2020-04-17 15:59:00"]["5. volume"],
            Value::String("284411".into())
        );
    }

    #[test]
    fn error_message_is_absent() {
        let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
        assert_eq!(parse_intraday("ZZZZINVALID", body).unwrap(), FetchOutcome::Absent);
    }

    #[test]
    fn rejected_api_key_is_auth_error() {
        let body = r#"{"Error Message": "the parameter apikey is invalid or missing. Please claim your free API key on (https://www.alphavantage.co/support/#api-key)."}"#;
        let err = parse_intraday("AAPL", body).unwrap_err();
        assert!(matches!(err, DataError::AuthenticationRequired(_)), "{err:?}");
        assert!(err.is_transport());
    }

    #[test]
    fn note_is_rate_limit() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        let err = parse_intraday("AAPL", body).unwrap_err();
        assert!(matches!(err, DataError::RateLimited(ref m) if m.contains("5 calls per minute")));
        assert!(err.is_transport());
    }

    #[test]
    fn empty_series_is_absent() {
        let body = r#"{"Meta Data": {}, "Time Series (5min)": {}}"#;
        assert!(parse_intraday("AAPL", body).unwrap().is_absent());
    }

    #[test]
    fn malformed_body_is_transport_error() {
        let err = parse_intraday("AAPL", "<html>502</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
        let err = parse_intraday("AAPL", r#"{"Meta Data": {}}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
