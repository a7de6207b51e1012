//! Provider clients, downloaders and artifact persistence

pub mod alphavantage;
pub mod artifact;
pub mod download;
pub mod gme;
pub mod normalize;
pub mod provider;
pub mod symbols;
pub mod timezone;
pub mod yahoo;

pub use alphavantage::AlphaVantageProvider;
pub use artifact::{write_document_atomic, ArtifactStore, Downloaded, RUN_FOLDER_FORMAT};
pub use download::{Fetched, IntervalDownloader, RangeDownloader, DEFAULT_PERIOD_INTERVAL};
pub use gme::{GmeDownloader, GmeMarket};
pub use normalize::{attach_metadata, build_filename, into_document, normalize_timestamps, CAPTURE_FORMAT};
pub use provider::{DataError, FetchOutcome, IntervalSource, RangeSource};
pub use symbols::{find_document, json_files, list_documents, SymbolList, SymbolListError};
pub use timezone::{local_to_utc, parse_zone, utc_to_local, TimezoneError, ZoneLookup, ZoneTable};
pub use yahoo::YahooProvider;
