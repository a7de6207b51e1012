//! Provider-defined interval and period enumerations.
//!
//! Every value round-trips through the exact string the provider's API uses,
//! both in serde and in `FromStr`/`as_str`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct IntervalError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

fn unknown<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    name: fn(T) -> &'static str,
) -> IntervalError {
    IntervalError {
        kind,
        value: value.to_string(),
        expected: all.iter().map(|v| name(*v)).collect::<Vec<_>>().join(", "),
    }
}

/// Alpha Vantage intraday sampling interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvInterval {
    #[default]
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "60min")]
    SixtyMinutes,
}

impl AvInterval {
    pub const ALL: [AvInterval; 5] = [
        AvInterval::OneMinute,
        AvInterval::FiveMinutes,
        AvInterval::FifteenMinutes,
        AvInterval::ThirtyMinutes,
        AvInterval::SixtyMinutes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AvInterval::OneMinute => "1min",
            AvInterval::FiveMinutes => "5min",
            AvInterval::FifteenMinutes => "15min",
            AvInterval::ThirtyMinutes => "30min",
            AvInterval::SixtyMinutes => "60min",
        }
    }
}

impl FromStr for AvInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| unknown("Alpha Vantage interval", s, &Self::ALL, Self::as_str))
    }
}

impl fmt::Display for AvInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alpha Vantage `outputsize`: the latest 100 points or the full history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    Compact,
    #[default]
    Full,
}

impl OutputSize {
    pub const ALL: [OutputSize; 2] = [OutputSize::Compact, OutputSize::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

impl FromStr for OutputSize {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| unknown("output size", s, &Self::ALL, Self::as_str))
    }
}

/// Yahoo Finance chart sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YahooInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl YahooInterval {
    pub const ALL: [YahooInterval; 13] = [
        YahooInterval::OneMinute,
        YahooInterval::TwoMinutes,
        YahooInterval::FiveMinutes,
        YahooInterval::FifteenMinutes,
        YahooInterval::ThirtyMinutes,
        YahooInterval::SixtyMinutes,
        YahooInterval::NinetyMinutes,
        YahooInterval::OneHour,
        YahooInterval::OneDay,
        YahooInterval::FiveDays,
        YahooInterval::OneWeek,
        YahooInterval::OneMonth,
        YahooInterval::ThreeMonths,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            YahooInterval::OneMinute => "1m",
            YahooInterval::TwoMinutes => "2m",
            YahooInterval::FiveMinutes => "5m",
            YahooInterval::FifteenMinutes => "15m",
            YahooInterval::ThirtyMinutes => "30m",
            YahooInterval::SixtyMinutes => "60m",
            YahooInterval::NinetyMinutes => "90m",
            YahooInterval::OneHour => "1h",
            YahooInterval::OneDay => "1d",
            YahooInterval::FiveDays => "5d",
            YahooInterval::OneWeek => "1wk",
            YahooInterval::OneMonth => "1mo",
            YahooInterval::ThreeMonths => "3mo",
        }
    }

    /// How far back (in days) Yahoo retains data at this granularity.
    /// `None` means no limit.
    pub fn max_lookback_days(self) -> Option<i64> {
        match self {
            YahooInterval::OneMinute => Some(7),
            YahooInterval::TwoMinutes
            | YahooInterval::FiveMinutes
            | YahooInterval::FifteenMinutes
            | YahooInterval::ThirtyMinutes
            | YahooInterval::NinetyMinutes => Some(60),
            YahooInterval::SixtyMinutes | YahooInterval::OneHour => Some(730),
            _ => None,
        }
    }

    /// Finest interval Yahoo still serves for data starting `age_days` ago.
    ///
    /// Tiers: `<= 7` days -> 1m, `<= 60` -> 2m, `<= 730` -> 1h, older -> 1d.
    pub fn finest_for_age(age_days: i64) -> Self {
        if age_days <= 7 {
            YahooInterval::OneMinute
        } else if age_days <= 60 {
            YahooInterval::TwoMinutes
        } else if age_days <= 730 {
            YahooInterval::OneHour
        } else {
            YahooInterval::OneDay
        }
    }

    /// Finest interval for a window starting on `start`, measured from `today`.
    pub fn finest_for_start(start: NaiveDate, today: NaiveDate) -> Self {
        Self::finest_for_age((today - start).num_days())
    }
}

impl FromStr for YahooInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| unknown("Yahoo interval", s, &Self::ALL, Self::as_str))
    }
}

impl fmt::Display for YahooInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yahoo Finance lookback window ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YahooPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl YahooPeriod {
    pub const ALL: [YahooPeriod; 11] = [
        YahooPeriod::OneDay,
        YahooPeriod::FiveDays,
        YahooPeriod::OneMonth,
        YahooPeriod::ThreeMonths,
        YahooPeriod::SixMonths,
        YahooPeriod::OneYear,
        YahooPeriod::TwoYears,
        YahooPeriod::FiveYears,
        YahooPeriod::TenYears,
        YahooPeriod::YearToDate,
        YahooPeriod::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            YahooPeriod::OneDay => "1d",
            YahooPeriod::FiveDays => "5d",
            YahooPeriod::OneMonth => "1mo",
            YahooPeriod::ThreeMonths => "3mo",
            YahooPeriod::SixMonths => "6mo",
            YahooPeriod::OneYear => "1y",
            YahooPeriod::TwoYears => "2y",
            YahooPeriod::FiveYears => "5y",
            YahooPeriod::TenYears => "10y",
            YahooPeriod::YearToDate => "ytd",
            YahooPeriod::Max => "max",
        }
    }
}

impl FromStr for YahooPeriod {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| unknown("Yahoo period", s, &Self::ALL, Self::as_str))
    }
}

impl fmt::Display for YahooPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
