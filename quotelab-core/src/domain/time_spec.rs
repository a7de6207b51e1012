//! Time specifications: a named interval/period, or a validated date range.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Date format used when a range is rendered into a filename.
///
/// Four-digit years keep filenames distinct across centuries.
pub const WINDOW_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSpecError {
    #[error("interval name is empty")]
    EmptyInterval,

    #[error("interval name '{0}' contains a reserved character ('_', '/', '\\' or '.')")]
    ReservedCharacter(String),

    #[error("range start {start} must be before end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("a {days}-day window ending on {end} is outside the supported date range")]
    WindowOutOfRange { end: NaiveDate, days: i64 },

    #[error("invalid symbol '{0}': must be non-empty and contain no '_', '/', '\\' or whitespace")]
    InvalidSymbol(String),
}

/// A `[start, end)` date window with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeSpecError> {
        if start >= end {
            return Err(TimeSpecError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window ending on `end`.
    pub fn ending_on(end: NaiveDate, days: i64) -> Result<Self, TimeSpecError> {
        let start = chrono::Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(TimeSpecError::WindowOutOfRange { end, days })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// What window of data to request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimeSpec {
    /// Provider-defined interval or period name (`1min`, `5d`, ...).
    Interval(String),
    /// Explicit date window.
    Range(DateRange),
}

impl TimeSpec {
    pub fn interval(name: impl Into<String>) -> Result<Self, TimeSpecError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TimeSpecError::EmptyInterval);
        }
        if name.contains(['_', '/', '\\', '.']) {
            return Err(TimeSpecError::ReservedCharacter(name));
        }
        Ok(TimeSpec::Interval(name))
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, TimeSpecError> {
        DateRange::new(start, end).map(TimeSpec::Range)
    }

    /// Human-readable window used in filenames: `1min` or `17-04-2020_to_24-04-2020`.
    pub fn label(&self) -> String {
        match self {
            TimeSpec::Interval(name) => name.clone(),
            TimeSpec::Range(range) => format!(
                "{}_to_{}",
                range.start.format(WINDOW_DATE_FORMAT),
                range.end.format(WINDOW_DATE_FORMAT)
            ),
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Check that a symbol can be embedded in a filename and recovered from it.
///
/// The first `_`-separated segment of an artifact name is the ticker, so
/// tickers may not contain `_`.
pub fn validate_symbol(symbol: &str) -> Result<(), TimeSpecError> {
    let bad = symbol.is_empty()
        || symbol
            .chars()
            .any(|c| c == '_' || c == '/' || c == '\\' || c.is_whitespace());
    if bad {
        return Err(TimeSpecError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}
