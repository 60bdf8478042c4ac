//! Durable storage of highlight sets and custom colors
//!
//! Each document's spans are stored as one JSON record keyed by a stable
//! hash of the document's path:
//!
//! ```json
//! {
//!   "documentKey": "<hash>",
//!   "spans": [{ "text": "quick", "color": "yellow", "offset": 4, "length": 5 }],
//!   "savedAt": 1700000000000
//! }
//! ```
//!
//! Custom colors are stored once for all documents as a flat
//! `{ "custom-1": "rgba(...)" }` object.

use super::color::ColorTable;
use super::registry::HighlightSpan;
use crate::config::{get_data_dir, write_atomic, AnnotationSettings};
use crate::error::{Error, Result};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Subdirectory of the data directory holding one file per document.
const HIGHLIGHTS_DIR: &str = "highlights";

/// Custom color table file name.
const COLORS_FILE: &str = "colors.json";

// ─────────────────────────────────────────────────────────────────────────────
// Document Key
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identity of a document, independent of its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Wrap an already computed key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a file: hex SHA-256 of its absolute, normalized path.
    pub fn from_path(path: &Path) -> Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        let normalized = normalize_path(&absolute);

        let mut hasher = Sha256::new();
        hasher.update(normalized.to_string_lossy().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name-safe form of the key. Alphanumeric keys are used as is;
    /// any other key is hashed behind a `k-` prefix so distinct keys never
    /// share a file.
    fn file_stem(&self) -> String {
        if !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric()) {
            return self.0.clone();
        }
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("k-{}", hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Format
// ─────────────────────────────────────────────────────────────────────────────

/// One saved span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSpan {
    pub text: String,
    pub color: String,
    pub offset: usize,
    pub length: usize,
}

impl From<&HighlightSpan> for PersistedSpan {
    fn from(span: &HighlightSpan) -> Self {
        Self {
            text: span.text.clone(),
            color: span.color.name().to_string(),
            offset: span.start,
            length: span.len,
        }
    }
}

/// Every span of one document at the time it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHighlightSet {
    pub document_key: String,
    pub spans: Vec<PersistedSpan>,
    /// Milliseconds since the Unix epoch
    pub saved_at: i64,
}

impl PersistedHighlightSet {
    /// Snapshot `spans` for `key`, stamped with the current time.
    pub fn from_spans(key: &DocumentKey, spans: &[HighlightSpan]) -> Self {
        Self {
            document_key: key.as_str().to_string(),
            spans: spans.iter().map(PersistedSpan::from).collect(),
            saved_at: Utc::now().timestamp_millis(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Where highlight sets and the custom color table are kept.
pub trait HighlightStorage {
    /// Load the saved set for `key`, `None` if nothing was saved.
    fn load_set(&self, key: &DocumentKey) -> Result<Option<PersistedHighlightSet>>;

    /// Replace the saved set for the set's document.
    fn save_set(&mut self, set: &PersistedHighlightSet) -> Result<()>;

    /// Delete the saved set for `key`. Returns whether one existed.
    fn delete_set(&mut self, key: &DocumentKey) -> Result<bool>;

    fn load_colors(&self) -> Result<ColorTable>;

    fn save_colors(&mut self, colors: &ColorTable) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Stores each set as `<root>/highlights/<key>.json` and the color table as
/// `<root>/colors.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted at the configured data directory, or the platform
    /// data directory when none is configured.
    pub fn from_settings(settings: &AnnotationSettings) -> Result<Self> {
        let root = match &settings.data_dir {
            Some(dir) => dir.clone(),
            None => get_data_dir()?,
        };
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn set_path(&self, key: &DocumentKey) -> PathBuf {
        self.root
            .join(HIGHLIGHTS_DIR)
            .join(format!("{}.json", key.file_stem()))
    }

    fn colors_path(&self) -> PathBuf {
        self.root.join(COLORS_FILE)
    }
}

/// Read and parse a JSON file, `None` if it does not exist.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| Error::StoreLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| Error::StoreLoad {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::StoreSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    write_atomic(path, &json)
}

impl HighlightStorage for JsonFileStorage {
    fn load_set(&self, key: &DocumentKey) -> Result<Option<PersistedHighlightSet>> {
        let path = self.set_path(key);
        let set: Option<PersistedHighlightSet> = read_json(&path)?;
        match &set {
            Some(set) => debug!(
                "Loaded {} saved span(s) for {} from {}",
                set.spans.len(),
                key,
                path.display()
            ),
            None => debug!("No saved highlights for {}", key),
        }
        Ok(set)
    }

    fn save_set(&mut self, set: &PersistedHighlightSet) -> Result<()> {
        let path = self.set_path(&DocumentKey::new(set.document_key.clone()));
        write_json(&path, set)?;
        info!(
            "Saved {} highlight(s) for {} to {}",
            set.spans.len(),
            set.document_key,
            path.display()
        );
        Ok(())
    }

    fn delete_set(&mut self, key: &DocumentKey) -> Result<bool> {
        let path = self.set_path(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        debug!("Deleted saved highlights at {}", path.display());
        Ok(true)
    }

    fn load_colors(&self) -> Result<ColorTable> {
        Ok(read_json(&self.colors_path())?.unwrap_or_default())
    }

    fn save_colors(&mut self, colors: &ColorTable) -> Result<()> {
        write_json(&self.colors_path(), colors)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Storage that keeps everything in memory, for tests and for hosts that
/// persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    sets: HashMap<String, PersistedHighlightSet>,
    colors: ColorTable,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }
}

impl HighlightStorage for MemoryStorage {
    fn load_set(&self, key: &DocumentKey) -> Result<Option<PersistedHighlightSet>> {
        Ok(self.sets.get(key.as_str()).cloned())
    }

    fn save_set(&mut self, set: &PersistedHighlightSet) -> Result<()> {
        self.sets.insert(set.document_key.clone(), set.clone());
        Ok(())
    }

    fn delete_set(&mut self, key: &DocumentKey) -> Result<bool> {
        Ok(self.sets.remove(key.as_str()).is_some())
    }

    fn load_colors(&self) -> Result<ColorTable> {
        Ok(self.colors.clone())
    }

    fn save_colors(&mut self, colors: &ColorTable) -> Result<()> {
        self.colors = colors.clone();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
