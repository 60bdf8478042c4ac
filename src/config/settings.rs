//! User settings for the annotation engine
//!
//! `AnnotationSettings` holds the user-configurable knobs of highlighting,
//! with serde support for JSON persistence.

use crate::annotations::PaletteColor;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default search window (in characters) around a stale span's saved offset.
pub const DEFAULT_FUZZY_WINDOW: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Highlighting preferences.
///
/// Serialized to JSON and persisted to the user's config directory. All
/// fields have defaults via `Default` and `#[serde(default)]`, so a partial
/// file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    /// Color used when none is picked, and for spans whose custom color was deleted
    pub default_color: PaletteColor,

    /// Characters searched on each side of a stale span's saved range
    pub fuzzy_window: usize,

    /// Whether a stale span not found in its window is searched for in the whole document
    pub full_document_fallback: bool,

    /// Whether leaving the rendered view saves highlights before clearing them
    pub save_on_mode_switch: bool,

    /// Override for the directory highlight sets and custom colors are stored in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            default_color: PaletteColor::default(),
            fuzzy_window: DEFAULT_FUZZY_WINDOW,
            full_document_fallback: true,
            save_on_mode_switch: true,
            data_dir: None,
        }
    }
}

impl AnnotationSettings {
    /// Maximum allowed fuzzy search window.
    pub const MAX_FUZZY_WINDOW: usize = 10_000;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// Useful after loading settings from a file that might have been
    /// edited by hand.
    pub fn sanitize(&mut self) {
        self.fuzzy_window = self.fuzzy_window.min(Self::MAX_FUZZY_WINDOW);

        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                self.data_dir = None;
            }
        }
    }

    /// Deserialize settings and sanitize them.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
