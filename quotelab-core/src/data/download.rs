//! Provider downloaders: resolve a time specification into a concrete
//! provider request and return what came back, without touching the disk.

use super::provider::{DataError, FetchOutcome, IntervalSource, RangeSource};
use crate::domain::{
    validate_symbol, AvInterval, DateRange, OutputSize, Provider, TimeSpec, YahooInterval,
    YahooPeriod,
};
use chrono::NaiveDate;

/// Default Yahoo sampling interval for period downloads.
pub const DEFAULT_PERIOD_INTERVAL: YahooInterval = YahooInterval::OneDay;

/// One provider response together with the parameters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub provider: Provider,
    /// Window as it appears in the artifact filename.
    pub spec: TimeSpec,
    /// Sampling interval recorded in the metadata block.
    pub interval: String,
    pub outcome: FetchOutcome,
}

/// Downloads named-interval series (Alpha Vantage intraday).
pub struct IntervalDownloader<S> {
    source: S,
    outputsize: OutputSize,
}

impl<S: IntervalSource> IntervalDownloader<S> {
    pub fn new(source: S, outputsize: OutputSize) -> Self {
        Self { source, outputsize }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch `symbol` at `interval`.
    pub fn download_interval(
        &self,
        symbol: &str,
        interval: AvInterval,
    ) -> Result<Fetched, DataError> {
        validate_symbol(symbol)?;
        let outcome = self.source.fetch_interval(symbol, interval, self.outputsize)?;
        Ok(Fetched {
            provider: self.source.provider(),
            spec: TimeSpec::interval(interval.as_str())?,
            interval: interval.as_str().to_string(),
            outcome,
        })
    }

    /// Generic entry point; only `TimeSpec::Interval` is meaningful here.
    pub fn download(&self, symbol: &str, spec: &TimeSpec) -> Result<Fetched, DataError> {
        match spec {
            TimeSpec::Interval(name) => {
                let interval = name
                    .parse::<AvInterval>()
                    .map_err(|e| DataError::InvalidRequest(e.to_string()))?;
                self.download_interval(symbol, interval)
            }
            TimeSpec::Range(_) => Err(DataError::InvalidRequest(format!(
                "{} intraday series cannot be requested by date range",
                self.source.provider()
            ))),
        }
    }
}

/// Downloads date-range and period series (Yahoo Finance).
pub struct RangeDownloader<S> {
    source: S,
}

impl<S: RangeSource> RangeDownloader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lookback `period` ending now, sampled at `interval`.
    pub fn download_period(
        &self,
        symbol: &str,
        period: YahooPeriod,
        interval: YahooInterval,
    ) -> Result<Fetched, DataError> {
        validate_symbol(symbol)?;
        let outcome = self.source.fetch_period(symbol, period, interval)?;
        Ok(Fetched {
            provider: self.source.provider(),
            spec: TimeSpec::interval(period.as_str())?,
            interval: interval.as_str().to_string(),
            outcome,
        })
    }

    /// Explicit `[start, end)` window sampled at `interval`.
    pub fn download_dates(
        &self,
        symbol: &str,
        range: DateRange,
        interval: YahooInterval,
    ) -> Result<Fetched, DataError> {
        validate_symbol(symbol)?;
        let outcome = self
            .source
            .fetch_range(symbol, range.start(), range.end(), interval)?;
        Ok(Fetched {
            provider: self.source.provider(),
            spec: TimeSpec::Range(range),
            interval: interval.as_str().to_string(),
            outcome,
        })
    }

    /// Window sampled at the finest interval Yahoo still serves for its start date.
    pub fn download_minimum_interval(
        &self,
        symbol: &str,
        range: DateRange,
        today: NaiveDate,
    ) -> Result<Fetched, DataError> {
        let interval = YahooInterval::finest_for_start(range.start(), today);
        self.download_dates(symbol, range, interval)
    }

    /// The `days` before `today`, at the finest available interval.
    pub fn download_recent(
        &self,
        symbol: &str,
        days: i64,
        today: NaiveDate,
    ) -> Result<Fetched, DataError> {
        let range = DateRange::ending_on(today, days)?;
        self.download_minimum_interval(symbol, range, today)
    }

    /// The last seven days at one-minute resolution.
    pub fn download_last_week(&self, symbol: &str, today: NaiveDate) -> Result<Fetched, DataError> {
        self.download_recent(symbol, 7, today)
    }

    /// Generic entry point: a range uses the finest interval for its age,
    /// a named window is treated as a Yahoo period sampled daily.
    pub fn download(
        &self,
        symbol: &str,
        spec: &TimeSpec,
        today: NaiveDate,
    ) -> Result<Fetched, DataError> {
        match spec {
            TimeSpec::Range(range) => self.download_minimum_interval(symbol, *range, today),
            TimeSpec::Interval(name) => {
                let period = name
                    .parse::<YahooPeriod>()
                    .map_err(|e| DataError::InvalidRequest(e.to_string()))?;
                self.download_period(symbol, period, DEFAULT_PERIOD_INTERVAL)
            }
        }
    }
}
