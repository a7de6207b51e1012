//! Append-only result log.
//!
//! One line per symbol outcome, never rewritten:
//!
//! ```text
//! 16:05:09 17-04-2020 AV - Downloaded AAPL
//! 16:05:24 17-04-2020 AV - Failed to download ZZZZINVALID
//! ```
//!
//! The same message, without the timestamp, is echoed to stdout.

use chrono::{Local, NaiveDateTime};
use quotelab_core::domain::Provider;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout at the start of every log line.
pub const LOG_TIME_FORMAT: &str = "%H:%M:%S %d-%m-%Y";

const DOWNLOADED: &str = "Downloaded";
const FAILED: &str = "Failed to download";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Downloaded => DOWNLOADED,
            Outcome::Failed => FAILED,
        }
    }
}

/// One logged outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub provider: Provider,
    pub symbol: String,
    pub outcome: Outcome,
}

impl LogEntry {
    pub fn new(
        timestamp: NaiveDateTime,
        provider: Provider,
        symbol: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp,
            provider,
            symbol: symbol.into(),
            outcome,
        }
    }

    /// Entry stamped with the local wall-clock time.
    pub fn now(provider: Provider, symbol: impl Into<String>, outcome: Outcome) -> Self {
        Self::new(Local::now().naive_local(), provider, symbol, outcome)
    }

    /// `AV - Downloaded AAPL`
    pub fn message(&self) -> String {
        format!(
            "{} - {} {}",
            self.provider.service_code(),
            self.outcome.as_str(),
            self.symbol
        )
    }

    pub fn to_line(&self) -> String {
        format!("{} {}", self.timestamp.format(LOG_TIME_FORMAT), self.message())
    }

    /// Parse a line written by [`LogEntry::to_line`].
    pub fn parse_line(line: &str) -> Option<Self> {
        // "HH:MM:SS DD-MM-YYYY" is 19 bytes
        let stamp = line.get(..19)?;
        let rest = line.get(19..)?.strip_prefix(' ')?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, LOG_TIME_FORMAT).ok()?;

        let (code, rest) = rest.split_once(" - ")?;
        let provider = Provider::from_service_code(code)?;
        let (outcome, symbol) = if let Some(symbol) = rest.strip_prefix(DOWNLOADED) {
            (Outcome::Downloaded, symbol)
        } else {
            (Outcome::Failed, rest.strip_prefix(FAILED)?)
        };
        let symbol = symbol.strip_prefix(' ')?.trim_end();
        if symbol.is_empty() {
            return None;
        }

        Some(Self::new(timestamp, provider, symbol, outcome))
    }
}

/// Sink for per-symbol outcomes. One call per symbol, in order.
pub trait ResultLogger {
    fn record(&mut self, entry: &LogEntry);
}

impl<L: ResultLogger + ?Sized> ResultLogger for &mut L {
    fn record(&mut self, entry: &LogEntry) {
        (**self).record(entry)
    }
}

/// In-memory logger; keeps every entry.
impl ResultLogger for Vec<LogEntry> {
    fn record(&mut self, entry: &LogEntry) {
        self.push(entry.clone());
    }
}

/// Appends to a text file and echoes to stdout.
///
/// The file is opened per entry, so lines already written survive a crash
/// and other tools can tail it.
#[derive(Debug, Clone)]
pub struct FileResultLogger {
    path: PathBuf,
    echo: bool,
}

impl FileResultLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
        }
    }

    /// Write the file only, no stdout echo.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl ResultLogger for FileResultLogger {
    fn record(&mut self, entry: &LogEntry) {
        if self.echo {
            println!("{}", entry.message());
        }
        // Losing a log line must not stop the batch.
        if let Err(e) = self.append(&entry.to_line()) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to append to result log"
            );
        }
    }
}

/// Every parseable entry in the log at `path`. A missing file is empty.
pub fn read_entries(path: &Path) -> std::io::Result<Vec<LogEntry>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        match LogEntry::parse_line(&line) {
            Some(entry) => entries.push(entry),
            None if line.trim().is_empty() => {}
            None => tracing::debug!(%line, "skipping unrecognized log line"),
        }
    }
    Ok(entries)
}

/// The most recent successful download for `provider`, if any.
pub fn last_downloaded(path: &Path, provider: Provider) -> std::io::Result<Option<LogEntry>> {
    Ok(read_entries(path)?
        .into_iter()
        .rev()
        .find(|e| e.provider == provider && e.outcome == Outcome::Downloaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 4, 17)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn line_format() {
        let ok = LogEntry::new(at(16, 5, 9), Provider::AlphaVantage, "AAPL", Outcome::Downloaded);
        assert_eq!(ok.to_line(), "16:05:09 17-04-2020 AV - Downloaded AAPL");
        let fail = LogEntry::new(at(9, 0, 0), Provider::YahooFinance, "ZZZZ", Outcome::Failed);
        assert_eq!(fail.message(), "YF - Failed to download ZZZZ");
    }

    #[test]
    fn parse_reads_back_written_lines() {
        for entry in [
            LogEntry::new(at(16, 5, 9), Provider::AlphaVantage, "AAPL", Outcome::Downloaded),
            LogEntry::new(at(23, 59, 59), Provider::YahooFinance, "FTSEMIB.MI", Outcome::Failed),
        ] {
            assert_eq!(LogEntry::parse_line(&entry.to_line()), Some(entry));
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(LogEntry::parse_line(""), None);
        assert_eq!(LogEntry::parse_line("16:05:09 17-04-2020 XX - Downloaded AAPL"), None);
        assert_eq!(LogEntry::parse_line("16:05:09 17-04-2020 AV - Uploaded AAPL"), None);
        assert_eq!(LogEntry::parse_line("16:05:09 17-04-2020 AV - Downloaded "), None);
    }

    #[test]
    fn file_logger_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "10:00:00 16-04-2020 AV - Downloaded MSFT\n").unwrap();

        let mut logger = FileResultLogger::new(&path).quiet();
        logger.record(&LogEntry::new(at(16, 5, 9), Provider::AlphaVantage, "AAPL", Outcome::Downloaded));
        logger.record(&LogEntry::new(at(16, 5, 24), Provider::AlphaVantage, "ZZZZ", Outcome::Failed));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "10:00:00 16-04-2020 AV - Downloaded MSFT",
                "16:05:09 17-04-2020 AV - Downloaded AAPL",
                "16:05:24 17-04-2020 AV - Failed to download ZZZZ",
            ]
        );
    }

    #[test]
    fn unwritable_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for append
        let mut logger = FileResultLogger::new(dir.path()).quiet();
        logger.record(&LogEntry::new(at(1, 0, 0), Provider::YahooFinance, "SPY", Outcome::Downloaded));
    }

    #[test]
    fn last_downloaded_per_service() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(
            &path,
            "09:00:00 17-04-2020 AV - Downloaded AAPL\n\
             09:00:15 17-04-2020 AV - Downloaded MSFT\n\
             09:00:30 17-04-2020 AV - Failed to download ZZZZ\n\
             not a log line\n\
             09:01:00 17-04-2020 YF - Downloaded SPY\n",
        )
        .unwrap();

        let last_av = last_downloaded(&path, Provider::AlphaVantage).unwrap().unwrap();
        assert_eq!(last_av.symbol, "MSFT");
        let last_yf = last_downloaded(&path, Provider::YahooFinance).unwrap().unwrap();
        assert_eq!(last_yf.symbol, "SPY");
        assert_eq!(read_entries(&path).unwrap().len(), 4);
    }

    #[test]
    fn missing_log_has_no_last_entry() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(last_downloaded(&dir.path().join("log.txt"), Provider::AlphaVantage).unwrap(), None);
    }
}
