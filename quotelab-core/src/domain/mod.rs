//! Domain types for quotelab

pub mod interval;
pub mod provider;
pub mod quote;
pub mod time_spec;

pub use interval::{AvInterval, IntervalError, OutputSize, YahooInterval, YahooPeriod};
pub use provider::Provider;
pub use quote::{Metadata, QuoteDocument, QuoteTable, METADATA_KEY, TIMESTAMP_FORMAT};
pub use time_spec::{validate_symbol, DateRange, TimeSpec, TimeSpecError};
