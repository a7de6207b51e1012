//! Artifact store: where output documents land on disk.
//!
//! Layout: `{data_root}/{ProviderDir}/{run-folder}/{artifact}.json`
//!
//! Writes are atomic (write to `.tmp`, rename into place), so an interrupted
//! run never leaves a half-written artifact behind.

use super::download::Fetched;
use super::normalize::{build_filename, into_document};
use super::provider::{DataError, FetchOutcome};
use crate::domain::{Metadata, Provider, QuoteDocument};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Run folder layout, taken from the run's start time.
pub const RUN_FOLDER_FORMAT: &str = "%H-%M-%S_%d-%m-%Y";

/// Terminal state of one symbol download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downloaded {
    /// Artifact written to this path.
    Saved(PathBuf),
    /// The provider had no rows; nothing was written.
    Absent,
}

/// Directory that receives the artifacts of one run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{data_root}/{ProviderDir}/{HH-MM-SS_DD-MM-YYYY}` for a run started at `started_at`.
    pub fn for_run(data_root: &Path, provider: Provider, started_at: NaiveDateTime) -> Self {
        Self::new(
            data_root
                .join(provider.dir_name())
                .join(started_at.format(RUN_FOLDER_FORMAT).to_string()),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `document` as `filename` inside the store directory.
    pub fn write(&self, filename: &str, document: &QuoteDocument) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::Io(format!("failed to create {}: {e}", self.dir.display())))?;
        let path = self.dir.join(filename);
        write_document_atomic(&path, document)?;
        Ok(path)
    }

    /// Persist a fetch result: build the filename and document, write it.
    ///
    /// An absent result writes nothing.
    pub fn save(
        &self,
        symbol: &str,
        fetched: Fetched,
        captured_at: NaiveDateTime,
    ) -> Result<Downloaded, DataError> {
        let table = match fetched.outcome {
            FetchOutcome::Found(table) => table,
            FetchOutcome::Absent => return Ok(Downloaded::Absent),
        };
        let metadata = Metadata::new(symbol, fetched.interval, fetched.provider);
        let document = into_document(table, &metadata)?;
        let filename = build_filename(symbol, &fetched.spec, captured_at);
        let path = self.write(&filename, &document)?;
        tracing::debug!(symbol, path = %path.display(), "artifact written");
        Ok(Downloaded::Saved(path))
    }
}

/// Pretty-print with 4-space indentation.
pub fn to_pretty_json(document: &QuoteDocument) -> Result<Vec<u8>, DataError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document
        .serialize(&mut ser)
        .map_err(|e| DataError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Write a document to `path` atomically (tmp file + rename).
pub fn write_document_atomic(path: &Path, document: &QuoteDocument) -> Result<(), DataError> {
    let bytes = to_pretty_json(document)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes)
        .map_err(|e| DataError::Io(format!("failed to write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Io(format!("atomic rename to {} failed: {e}", path.display()))
    })
}
