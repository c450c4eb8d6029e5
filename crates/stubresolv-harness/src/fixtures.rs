//! Fixture loading and management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while loading fixture files.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixture JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no fixture JSON files found in {0}")]
    Empty(PathBuf),
}

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Operation being tested (`build_query`, `parse_response`, ...).
    pub function: String,
    /// RFC or resolver(5) section the case exercises.
    pub reference: String,
    /// Input parameters (serialized).
    pub inputs: serde_json::Value,
    /// Expected output (serialized as string for comparison).
    pub expected_output: String,
}

/// A collection of fixture cases for one operation family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Family name.
    pub family: String,
    /// UTC timestamp of capture.
    pub captured_at: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
    /// SHA-256 of the file the set was loaded from.
    #[serde(skip)]
    pub digest: Option<String>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path, recording its digest.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut set = Self::from_json(&content).map_err(|source| FixtureError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        set.digest = Some(sha256_hex(content.as_bytes()));
        Ok(set)
    }

    /// Load every `*.json` set in `dir`, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, FixtureError> {
        let entries = std::fs::read_dir(dir).map_err(|source| FixtureError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(FixtureError::Empty(dir.to_path_buf()));
        }
        paths.iter().map(|path| Self::from_file(path)).collect()
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
