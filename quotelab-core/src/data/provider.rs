//! Quote source traits and structured error types.
//!
//! The source traits abstract over the remote providers (Alpha Vantage and
//! Yahoo Finance) so downloaders can be exercised with mocks in tests.

use super::timezone::TimezoneError;
use crate::domain::{
    AvInterval, OutputSize, Provider, QuoteTable, TimeSpecError, YahooInterval, YahooPeriod,
};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors from talking to a provider or persisting its result.
///
/// "No data for this symbol" is deliberately absent: that is
/// [`FetchOutcome::Absent`], a normal outcome rather than a failure.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {provider}")]
    HttpStatus { provider: Provider, status: u16 },

    #[error("{resource} could not be retrieved (HTTP {status})")]
    NotServed { resource: String, status: u16 },

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Timezone(#[from] TimezoneError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DataError {
    /// True for failures of the remote exchange itself (network, protocol,
    /// throttling), as opposed to local input or persistence problems.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::HttpStatus { .. }
                | DataError::NotServed { .. }
                | DataError::RateLimited(_)
                | DataError::ResponseFormatChanged(_)
                | DataError::AuthenticationRequired(_)
        )
    }
}

impl From<TimeSpecError> for DataError {
    fn from(e: TimeSpecError) -> Self {
        DataError::InvalidRequest(e.to_string())
    }
}

/// Result of asking a provider for a symbol's data.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(QuoteTable),
    /// The provider knows nothing about the symbol, or returned zero rows.
    Absent,
}

impl FetchOutcome {
    /// `Found` for a non-empty table, `Absent` otherwise.
    pub fn from_table(table: QuoteTable) -> Self {
        if table.is_empty() {
            FetchOutcome::Absent
        } else {
            FetchOutcome::Found(table)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FetchOutcome::Absent)
    }
}

/// A provider queried by named interval (Alpha Vantage intraday).
pub trait IntervalSource: Send + Sync {
    fn provider(&self) -> Provider;

    fn fetch_interval(
        &self,
        symbol: &str,
        interval: AvInterval,
        outputsize: OutputSize,
    ) -> Result<FetchOutcome, DataError>;
}

/// A provider queried by date range or lookback period (Yahoo Finance chart).
pub trait RangeSource: Send + Sync {
    fn provider(&self) -> Provider;

    /// Rows in `[start, end)` at the given sampling interval.
    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError>;

    /// Rows for a lookback period ending now.
    fn fetch_period(
        &self,
        symbol: &str,
        period: YahooPeriod,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError>;
}

impl<T: IntervalSource + ?Sized> IntervalSource for &T {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn fetch_interval(
        &self,
        symbol: &str,
        interval: AvInterval,
        outputsize: OutputSize,
    ) -> Result<FetchOutcome, DataError> {
        (**self).fetch_interval(symbol, interval, outputsize)
    }
}

impl<T: RangeSource + ?Sized> RangeSource for &T {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        (**self).fetch_range(symbol, start, end, interval)
    }

    fn fetch_period(
        &self,
        symbol: &str,
        period: YahooPeriod,
        interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        (**self).fetch_period(symbol, period, interval)
    }
}
