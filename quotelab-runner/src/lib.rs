//! QuoteLab Runner — bulk download orchestration, result log, legacy migration.
//!
//! This crate builds on `quotelab-core` to provide:
//! - Application configuration (TOML or JSON, env override for the API key)
//! - Per-provider symbol jobs that fetch and persist one artifact
//! - The throttled, cancellable bulk orchestrator
//! - The append-only result log and its reader
//! - The legacy data adapter for files written by older versions

pub mod bulk;
pub mod cancel;
pub mod config;
pub mod jobs;
pub mod legacy;
pub mod result_log;

pub use bulk::{
    BulkConfig, BulkOrchestrator, BulkProgress, BulkState, BulkSummary, NoProgress, StdoutProgress,
    SymbolDownloader, SymbolOutcome,
};
pub use cancel::CancelToken;
pub use config::{AppConfig, ConfigError, API_KEY_ENV};
pub use jobs::{AlphaVantageJob, YahooJob};
pub use legacy::{parse_stem, AdaptError, AdaptSummary, LegacyAdapter};
pub use result_log::{
    last_downloaded, read_entries, FileResultLogger, LogEntry, Outcome, ResultLogger,
    LOG_TIME_FORMAT,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AppConfig>();
        assert_sync::<AppConfig>();
        assert_send::<BulkConfig>();
        assert_sync::<BulkConfig>();
    }

    #[test]
    fn cancel_token_is_send_sync() {
        assert_send::<CancelToken>();
        assert_sync::<CancelToken>();
    }

    #[test]
    fn summaries_are_send_sync() {
        assert_send::<BulkSummary>();
        assert_sync::<BulkSummary>();
        assert_send::<AdaptSummary>();
        assert_sync::<AdaptSummary>();
        assert_send::<LogEntry>();
        assert_sync::<LogEntry>();
    }
}
