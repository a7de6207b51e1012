//! Integration tests for the bulk download pipeline.
//!
//! A scripted provider stands in for the network; everything downstream
//! (downloaders, artifact store, orchestrator, file log) is the real thing.

use chrono::NaiveDate;
use quotelab_core::data::{
    ArtifactStore, DataError, FetchOutcome, IntervalDownloader, IntervalSource, RangeDownloader,
    RangeSource,
};
use quotelab_core::domain::{
    AvInterval, Metadata, OutputSize, Provider, QuoteDocument, QuoteTable, YahooInterval,
    YahooPeriod,
};
use quotelab_runner::{
    read_entries, AlphaVantageJob, BulkConfig, BulkOrchestrator, BulkProgress, BulkState,
    FileResultLogger, LogEntry, NoProgress, Outcome, YahooJob,
};
use serde_json::json;
use std::cell::RefCell;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Returns one bar for AAPL and nothing for any other symbol.
#[derive(Default)]
struct AaplOnly {
    calls: Mutex<Vec<String>>,
}

impl IntervalSource for AaplOnly {
    fn provider(&self) -> Provider {
        Provider::AlphaVantage
    }

    fn fetch_interval(
        &self,
        symbol: &str,
        interval: AvInterval,
        outputsize: OutputSize,
    ) -> Result<FetchOutcome, DataError> {
        assert_eq!(interval, AvInterval::OneMinute);
        assert_eq!(outputsize, OutputSize::Full);
        self.calls.lock().unwrap().push(symbol.to_string());
        if symbol != "AAPL" {
            return Ok(FetchOutcome::Absent);
        }
        let mut table = QuoteTable::new().with_timezone("US/Eastern");
        let ts = NaiveDate::from_ymd_opt(2020, 4, 17)
            .unwrap()
            .and_hms_opt(15, 59, 0)
            .unwrap();
        table.push(ts, json!({"1. open": "282.55", "4. close": "282.33"}));
        Ok(FetchOutcome::Found(table))
    }
}

#[derive(Default)]
struct States(RefCell<Vec<BulkState>>);

impl BulkProgress for States {
    fn on_state(&self, state: &BulkState, _total: usize) {
        self.0.borrow_mut().push(state.clone());
    }
}

fn json_files_in(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    files
}

#[test]
fn aapl_and_invalid_symbol_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let run_dir = tmp.path().join("data/AlphaVantage/run");
    let log_path = tmp.path().join("log.txt");

    let job = AlphaVantageJob::new(
        IntervalDownloader::new(AaplOnly::default(), OutputSize::Full),
        AvInterval::OneMinute,
        ArtifactStore::new(&run_dir),
    );
    let mut orch = BulkOrchestrator::new(
        job,
        FileResultLogger::new(&log_path).quiet(),
        BulkConfig::default(),
    );
    let progress = States::default();
    let summary = orch.run(&["AAPL", "ZZZZINVALID"], &progress);

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.cancelled);
    assert_eq!(progress.0.borrow().last(), Some(&BulkState::Done));

    let entries = read_entries(&log_path).unwrap();
    let logged: Vec<(&str, Outcome)> = entries.iter().map(|e| (e.symbol.as_str(), e.outcome)).collect();
    assert_eq!(
        logged,
        [("AAPL", Outcome::Downloaded), ("ZZZZINVALID", Outcome::Failed)]
    );

    let files = json_files_in(&run_dir);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("AAPL_1min_"), "{name}");

    let doc: QuoteDocument =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(
        Metadata::from_document(&doc),
        Some(Metadata::new("AAPL", "1min", Provider::AlphaVantage))
    );
    // 15:59 EDT
    assert!(doc.contains_key("2020-04-17 19:59:00"));
}

#[test]
fn provider_is_called_once_per_symbol_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let source = AaplOnly::default();
    let job = AlphaVantageJob::new(
        IntervalDownloader::new(&source, OutputSize::Full),
        AvInterval::OneMinute,
        ArtifactStore::new(tmp.path()),
    );
    let mut orch = BulkOrchestrator::new(job, Vec::<LogEntry>::new(), BulkConfig::default());
    let symbols = vec!["MSFT".to_string(), "AAPL".to_string(), "GME".to_string()];
    orch.run(&symbols, &NoProgress);
    let (_, log) = orch.into_parts();

    assert_eq!(*source.calls.lock().unwrap(), symbols);
    assert_eq!(log.len(), 3);
    assert_eq!(log[1].symbol, "AAPL");
    assert_eq!(log[1].outcome, Outcome::Downloaded);
}

#[test]
fn cancellation_interrupts_the_delay() {
    let tmp = tempfile::tempdir().unwrap();
    let job = AlphaVantageJob::new(
        IntervalDownloader::new(AaplOnly::default(), OutputSize::Full),
        AvInterval::OneMinute,
        ArtifactStore::new(tmp.path()),
    );
    let mut orch = BulkOrchestrator::new(
        job,
        Vec::<LogEntry>::new(),
        BulkConfig::with_delay(Duration::from_secs(60)),
    );
    let token = orch.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let start = Instant::now();
    let summary = orch.run(&["AAPL", "MSFT", "GME"], &NoProgress);
    canceller.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 1);
    assert_eq!(orch.into_parts().1.len(), 1);
}

/// `NONE1` has no data and `ERR1` fails; records when each call was made.
#[derive(Default)]
struct NoneThenError {
    calls: Mutex<Vec<(String, Instant)>>,
}

impl IntervalSource for NoneThenError {
    fn provider(&self) -> Provider {
        Provider::AlphaVantage
    }

    fn fetch_interval(
        &self,
        symbol: &str,
        _interval: AvInterval,
        _outputsize: OutputSize,
    ) -> Result<FetchOutcome, DataError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), Instant::now()));
        match symbol {
            "ERR1" => Err(DataError::HttpStatus {
                provider: Provider::AlphaVantage,
                status: 503,
            }),
            _ => Ok(FetchOutcome::Absent),
        }
    }
}

#[test]
fn delay_follows_absent_and_failed_symbols() {
    let tmp = tempfile::tempdir().unwrap();
    let source = NoneThenError::default();
    let delay = Duration::from_millis(40);
    let job = AlphaVantageJob::new(
        IntervalDownloader::new(&source, OutputSize::Full),
        AvInterval::OneMinute,
        ArtifactStore::new(tmp.path()),
    );
    let mut orch = BulkOrchestrator::new(job, Vec::<LogEntry>::new(), BulkConfig::with_delay(delay));

    let start = Instant::now();
    let summary = orch.run(&["NONE1", "ERR1"], &NoProgress);
    let elapsed = start.elapsed();

    assert_eq!(summary.absent, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.cancelled);
    assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");

    let calls = source.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].1 - calls[0].1 >= delay);
}

#[test]
fn cancel_during_delay_after_absent_symbol_stops_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let source = NoneThenError::default();
    let job = AlphaVantageJob::new(
        IntervalDownloader::new(&source, OutputSize::Full),
        AvInterval::OneMinute,
        ArtifactStore::new(tmp.path()),
    );
    let mut orch = BulkOrchestrator::new(
        job,
        Vec::<LogEntry>::new(),
        BulkConfig::with_delay(Duration::from_secs(60)),
    );
    let token = orch.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let summary = orch.run(&["NONE1", "ERR1"], &NoProgress);
    canceller.join().unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 1);
    assert_eq!(summary.absent, 1);
    let calls = source.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "NONE1");
}

/// Errors on every call, so each symbol is a transport failure.
struct Unreachable;

impl RangeSource for Unreachable {
    fn provider(&self) -> Provider {
        Provider::YahooFinance
    }

    fn fetch_range(
        &self,
        _symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        Err(DataError::NetworkUnreachable("dns failure".into()))
    }

    fn fetch_period(
        &self,
        _symbol: &str,
        _period: YahooPeriod,
        _interval: YahooInterval,
    ) -> Result<FetchOutcome, DataError> {
        Err(DataError::NetworkUnreachable("dns failure".into()))
    }
}

#[test]
fn transport_failures_do_not_abort_the_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let job = YahooJob::new(RangeDownloader::new(Unreachable), 7, ArtifactStore::new(tmp.path()));
    let mut orch = BulkOrchestrator::new(job, Vec::<LogEntry>::new(), BulkConfig::default());
    let summary = orch.run(&["SPY", "QQQ"], &NoProgress);

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.processed(), 2);
    let log = orch.into_parts().1;
    assert!(log.iter().all(|e| e.outcome == Outcome::Failed && e.provider == Provider::YahooFinance));
}
