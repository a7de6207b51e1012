//! Symbol list documents.
//!
//! A symbol document is a JSON object holding a list of records under a
//! configurable key, each record carrying its ticker under another key:
//!
//! ```json
//! { "tickers": [ { "ticker": "AAPL", "name": "Apple" }, { "ticker": "MSFT" } ] }
//! ```

use crate::domain::validate_symbol;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymbolListError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing list key '{0}'")]
    MissingListKey(String),

    #[error("value under '{0}' is not a list")]
    NotAList(String),

    #[error("record {index} has no string field '{key}'")]
    MissingItemKey { index: usize, key: String },

    #[error("record {index}: {message}")]
    InvalidSymbol { index: usize, message: String },
}

/// Tickers loaded once per run, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolList {
    symbols: Vec<String>,
}

impl SymbolList {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    pub fn from_file(path: &Path, list_key: &str, item_key: &str) -> Result<Self, SymbolListError> {
        let content = std::fs::read_to_string(path).map_err(|source| SymbolListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content, list_key, item_key)
    }

    pub fn from_json_str(
        content: &str,
        list_key: &str,
        item_key: &str,
    ) -> Result<Self, SymbolListError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value, list_key, item_key)
    }

    pub fn from_value(value: &Value, list_key: &str, item_key: &str) -> Result<Self, SymbolListError> {
        let rows = value
            .get(list_key)
            .ok_or_else(|| SymbolListError::MissingListKey(list_key.to_string()))?
            .as_array()
            .ok_or_else(|| SymbolListError::NotAList(list_key.to_string()))?;

        let mut symbols = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let symbol = row
                .get(item_key)
                .and_then(Value::as_str)
                .map(str::trim)
                .ok_or_else(|| SymbolListError::MissingItemKey {
                    index,
                    key: item_key.to_string(),
                })?;
            validate_symbol(symbol).map_err(|e| SymbolListError::InvalidSymbol {
                index,
                message: e.to_string(),
            })?;
            symbols.push(symbol.to_string());
        }

        Ok(Self { symbols })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

/// Names (without `.json`) of the symbol documents under `dir`, recursively, sorted.
pub fn list_documents(dir: &Path) -> std::io::Result<Vec<String>> {
    Ok(document_paths(dir)?.into_iter().map(|(name, _)| name).collect())
}

/// Path of the symbol document called `name` anywhere under `dir`.
pub fn find_document(dir: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
    Ok(document_paths(dir)?
        .into_iter()
        .find(|(stem, _)| stem == name)
        .map(|(_, path)| path))
}

/// Every `*.json` file under `dir`, recursively, sorted by path.
pub fn json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_json(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn document_paths(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut docs: Vec<(String, PathBuf)> = json_files(dir)?
        .into_iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            Some((stem, path))
        })
        .collect();
    docs.sort();
    Ok(docs)
}

fn collect_json(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            found.push(path);
        }
    }
    Ok(())
}
