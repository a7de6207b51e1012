//! QuoteLab Core — provider clients, quote documents, filename normalization.
//!
//! This crate holds everything needed to turn one symbol into one artifact:
//! - Domain types (providers, intervals, time windows, metadata blocks)
//! - Alpha Vantage and Yahoo Finance clients behind mockable source traits
//! - A document client for the Italian power exchange (GME)
//! - Downloaders that pick the request parameters for a time window
//! - Timestamp normalization to UTC and deterministic artifact filenames
//! - Atomic JSON artifact writes

pub mod data;
pub mod domain;
