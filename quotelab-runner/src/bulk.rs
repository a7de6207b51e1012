//! Bulk orchestrator — sequential, throttled multi-symbol downloads.
//!
//! State machine per run:
//!
//! ```text
//! Pending(n) -> Fetching(s0) -> Pending(n-1) -> ... -> Fetching(sn-1) -> Pending(0) -> Done
//! ```
//!
//! Every symbol gets exactly one downloader call and exactly one log entry,
//! whatever the outcome. The delay after each symbol is unconditional and
//! interruptible through the [`CancelToken`].

use crate::cancel::CancelToken;
use crate::result_log::{LogEntry, Outcome, ResultLogger};
use quotelab_core::data::{DataError, Downloaded};
use quotelab_core::domain::Provider;
use std::path::PathBuf;
use std::time::Duration;

/// Fetches and persists one symbol.
pub trait SymbolDownloader {
    fn provider(&self) -> Provider;

    fn download(&mut self, symbol: &str) -> Result<Downloaded, DataError>;
}

impl<D: SymbolDownloader + ?Sized> SymbolDownloader for &mut D {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn download(&mut self, symbol: &str) -> Result<Downloaded, DataError> {
        (**self).download(symbol)
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkConfig {
    /// Pause after every symbol, including the last.
    pub delay: Duration,
}

impl BulkConfig {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkState {
    Pending { remaining: usize },
    Fetching { symbol: String, index: usize },
    Done,
}

/// What happened to one symbol.
#[derive(Debug)]
pub enum SymbolOutcome {
    Saved(PathBuf),
    Absent,
    Failed(DataError),
}

impl SymbolOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SymbolOutcome::Saved(_))
    }

    /// Absent data and errors are both logged as failures.
    pub fn log_outcome(&self) -> Outcome {
        match self {
            SymbolOutcome::Saved(_) => Outcome::Downloaded,
            SymbolOutcome::Absent | SymbolOutcome::Failed(_) => Outcome::Failed,
        }
    }
}

impl From<Result<Downloaded, DataError>> for SymbolOutcome {
    fn from(result: Result<Downloaded, DataError>) -> Self {
        match result {
            Ok(Downloaded::Saved(path)) => SymbolOutcome::Saved(path),
            Ok(Downloaded::Absent) => SymbolOutcome::Absent,
            Err(e) => SymbolOutcome::Failed(e),
        }
    }
}

/// Progress callbacks for a bulk run. All methods default to no-ops.
pub trait BulkProgress {
    fn on_state(&self, _state: &BulkState, _total: usize) {}

    fn on_outcome(&self, _symbol: &str, _index: usize, _total: usize, _outcome: &SymbolOutcome) {}

    fn on_finished(&self, _summary: &BulkSummary) {}
}

/// Progress sink that ignores everything.
pub struct NoProgress;

impl BulkProgress for NoProgress {}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl BulkProgress for StdoutProgress {
    fn on_state(&self, state: &BulkState, total: usize) {
        if let BulkState::Fetching { symbol, index } = state {
            println!("[{}/{}] Fetching {symbol}...", index + 1, total);
        }
    }

    fn on_outcome(&self, symbol: &str, _index: usize, _total: usize, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Saved(path) => println!("  OK: {symbol} -> {}", path.display()),
            SymbolOutcome::Absent => println!("  NO DATA: {symbol}"),
            SymbolOutcome::Failed(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_finished(&self, summary: &BulkSummary) {
        println!(
            "\n{} download {}: {}/{} saved, {} without data, {} failed",
            summary.provider,
            if summary.cancelled { "cancelled" } else { "complete" },
            summary.downloaded,
            summary.total,
            summary.absent,
            summary.failed
        );
    }
}

/// Summary of a bulk run.
#[derive(Debug)]
pub struct BulkSummary {
    pub provider: Provider,
    pub total: usize,
    pub downloaded: usize,
    pub absent: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// Per-symbol outcomes in input order; shorter than `total` if cancelled.
    pub outcomes: Vec<(String, SymbolOutcome)>,
}

impl BulkSummary {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.downloaded == self.total
    }

    pub fn saved_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.outcomes.iter().filter_map(|(_, o)| match o {
            SymbolOutcome::Saved(path) => Some(path),
            _ => None,
        })
    }
}

/// Drives one downloader over a list of symbols.
pub struct BulkOrchestrator<D, L> {
    downloader: D,
    logger: L,
    config: BulkConfig,
    cancel: CancelToken,
}

impl<D: SymbolDownloader, L: ResultLogger> BulkOrchestrator<D, L> {
    pub fn new(downloader: D, logger: L, config: BulkConfig) -> Self {
        Self {
            downloader,
            logger,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Share an externally owned token (e.g. one wired to Ctrl-C).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process `symbols` in order.
    pub fn run<S: AsRef<str>>(&mut self, symbols: &[S], progress: &dyn BulkProgress) -> BulkSummary {
        let provider = self.downloader.provider();
        let total = symbols.len();
        let mut summary = BulkSummary {
            provider,
            total,
            downloaded: 0,
            absent: 0,
            failed: 0,
            cancelled: false,
            outcomes: Vec::with_capacity(total),
        };

        tracing::info!(%provider, total, delay = ?self.config.delay, "bulk download started");
        progress.on_state(&BulkState::Pending { remaining: total }, total);

        for (index, symbol) in symbols.iter().enumerate() {
            let symbol = symbol.as_ref();
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            progress.on_state(
                &BulkState::Fetching {
                    symbol: symbol.to_string(),
                    index,
                },
                total,
            );

            let outcome = SymbolOutcome::from(self.downloader.download(symbol));
            match &outcome {
                SymbolOutcome::Saved(_) => summary.downloaded += 1,
                SymbolOutcome::Absent => {
                    tracing::info!(symbol, %provider, "no data returned");
                    summary.absent += 1;
                }
                SymbolOutcome::Failed(e) => {
                    tracing::warn!(symbol, %provider, error = %e, "download failed");
                    summary.failed += 1;
                }
            }

            self.logger
                .record(&LogEntry::now(provider, symbol, outcome.log_outcome()));
            progress.on_outcome(symbol, index, total, &outcome);
            summary.outcomes.push((symbol.to_string(), outcome));

            let remaining = total - index - 1;
            progress.on_state(&BulkState::Pending { remaining }, total);

            if !self.config.delay.is_zero() && self.cancel.sleep(self.config.delay) {
                summary.cancelled = remaining > 0;
                break;
            }
        }

        progress.on_state(&BulkState::Done, total);
        tracing::info!(
            %provider,
            downloaded = summary.downloaded,
            absent = summary.absent,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "bulk download finished"
        );
        progress.on_finished(&summary);
        summary
    }

    pub fn into_parts(self) -> (D, L) {
        (self.downloader, self.logger)
    }
}
