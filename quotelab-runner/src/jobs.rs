//! Per-provider symbol jobs: download one symbol and persist the artifact.

use crate::bulk::SymbolDownloader;
use chrono::{Local, NaiveDate, NaiveDateTime};
use quotelab_core::data::{
    ArtifactStore, DataError, Downloaded, IntervalDownloader, IntervalSource, RangeDownloader,
    RangeSource,
};
use quotelab_core::domain::{AvInterval, Provider};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Alpha Vantage intraday series at a fixed interval.
pub struct AlphaVantageJob<S> {
    downloader: IntervalDownloader<S>,
    interval: AvInterval,
    store: ArtifactStore,
}

impl<S: IntervalSource> AlphaVantageJob<S> {
    pub fn new(downloader: IntervalDownloader<S>, interval: AvInterval, store: ArtifactStore) -> Self {
        Self {
            downloader,
            interval,
            store,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

impl<S: IntervalSource> SymbolDownloader for AlphaVantageJob<S> {
    fn provider(&self) -> Provider {
        self.downloader.source().provider()
    }

    fn download(&mut self, symbol: &str) -> Result<Downloaded, DataError> {
        let fetched = self.downloader.download_interval(symbol, self.interval)?;
        self.store.save(symbol, fetched, now())
    }
}

/// Yahoo Finance bars for the last `lookback_days`, at the finest interval
/// Yahoo still serves for that window.
pub struct YahooJob<S> {
    downloader: RangeDownloader<S>,
    lookback_days: i64,
    store: ArtifactStore,
    today: Option<NaiveDate>,
}

impl<S: RangeSource> YahooJob<S> {
    pub fn new(downloader: RangeDownloader<S>, lookback_days: i64, store: ArtifactStore) -> Self {
        Self {
            downloader,
            lookback_days,
            store,
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock for every symbol.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

impl<S: RangeSource> SymbolDownloader for YahooJob<S> {
    fn provider(&self) -> Provider {
        self.downloader.source().provider()
    }

    fn download(&mut self, symbol: &str) -> Result<Downloaded, DataError> {
        let captured_at = now();
        let today = self.today.unwrap_or(captured_at.date());
        let fetched = self
            .downloader
            .download_recent(symbol, self.lookback_days, today)?;
        self.store.save(symbol, fetched, captured_at)
    }
}
