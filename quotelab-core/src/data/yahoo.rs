//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API, either for a lookback
//! period (`range=5d`) or an explicit window (`period1`/`period2`). Handles
//! rate limiting, retries with exponential backoff, and response parsing.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! Bar timestamps come back as epoch seconds and are keyed in UTC.

use super::provider::{DataError, FetchOutcome, RangeSource};
use crate::domain::{Provider, QuoteTable, YahooInterval, YahooPeriod};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Longest wait between two retries.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff for retry `attempt` (1-based), capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Window selector for one chart request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Period(YahooPeriod),
    Dates { start: NaiveDate, end: NaiveDate },
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Build the chart API URL for a symbol and window.
    ///
    /// Date windows are half-open: `period2` is midnight UTC of `end`.
    /// Pre- and post-market bars are always included.
    fn chart_url(&self, symbol: &str, window: Window, interval: YahooInterval) -> String {
        let selector = match window {
            Window::Period(period) => format!("range={period}"),
            Window::Dates { start, end } => {
                let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
                let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
                format!("period1={start_ts}&period2={end_ts}")
            }
        };
        format!(
            "{}/{symbol}?{selector}&interval={interval}\
             &includePrePost=true&includeAdjustedClose=true",
            self.base_url
        )
    }

    /// Execute a single chart request with retry logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        window: Window,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        let url = self.chart_url(symbol, window, interval);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                tracing::debug!(symbol, attempt, ?delay, "retrying yahoo request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(DataError::RateLimited(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(DataError::AuthenticationRequired(format!(
                            "Yahoo Finance refused the request (HTTP {status})"
                        )));
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::HttpStatus {
                            provider: Provider::YahooFinance,
                            status: status.as_u16(),
                        });
                        continue;
                    }

                    // Unknown symbols come back as 404 with a chart error body.
                    let body = resp.text().map_err(|e| {
                        DataError::NetworkUnreachable(format!("failed to read body for {symbol}: {e}"))
                    })?;
                    return match parse_chart(symbol, &body) {
                        Err(DataError::ResponseFormatChanged(_)) if !status.is_success() => {
                            Err(DataError::HttpStatus {
                                provider: Provider::YahooFinance,
                                status: status.as_u16(),
                            })
                        }
                        other => other,
                    };
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }
}

/// Parse a chart API body into a quote table keyed by UTC timestamps.
///
/// A `Not Found` chart error or a response with no usable bars is `Absent`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<FetchOutcome, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => {
                    tracing::debug!(symbol, description = %err.description, "yahoo has no data");
                    Ok(FetchOutcome::Absent)
                }
                Some(err) => Err(DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(DataError::ResponseFormatChanged(
                    "empty result with no error".into(),
                )),
            };
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(FetchOutcome::Absent);
    };

    // Delisted or out-of-window symbols return a result without timestamps.
    let Some(timestamps) = data.timestamp else {
        return Ok(FetchOutcome::Absent);
    };

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut table = QuoteTable::new();
    if let Some(zone) = data.meta.and_then(|m| m.exchange_timezone_name) {
        table = table.with_timezone(zone);
    }

    for (i, &ts) in timestamps.iter().enumerate() {
        let at = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();
        let adj_close = adj_closes
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten());

        // Skip bars where all OHLCV are None (halts, holidays)
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        table.push(
            at,
            json!({
                "Open": open,
                "High": high,
                "Low": low,
                "Close": close,
                "Adj Close": adj_close.or(close),
                "Volume": volume.map(Value::from).unwrap_or(Value::Null),
            }),
        );
    }

    Ok(FetchOutcome::from_table(table))
}

impl RangeSource for YahooProvider {
    fn provider(&self) -> Provider {
        Provider::YahooFinance
    }

    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        self.fetch_with_retry(symbol, Window::Dates { start, end }, interval)
    }

    fn fetch_period(
        &self,
        symbol: &str,
        period: YahooPeriod,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        self.fetch_with_retry(symbol, Window::Period(period), interval)
    }
}
