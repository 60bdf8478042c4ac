//! Configuration file persistence for md-annotate
//!
//! Loads and saves `AnnotationSettings` in the platform-specific config
//! directory, falling back to defaults when the file is missing or broken.

use crate::config::AnnotationSettings;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config and data directories
pub const APP_NAME: &str = "md-annotate";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Suffix for the temporary file used during atomic writes
const TEMP_SUFFIX: &str = "tmp";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// - **Windows**: `%APPDATA%\md-annotate\`
/// - **macOS**: `~/Library/Application Support/md-annotate/`
/// - **Linux**: `~/.config/md-annotate/`
///
/// # Errors
///
/// Returns `Error::DataDirNotFound` if the directory cannot be determined
/// (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::DataDirNotFound)
}

/// Get the platform-specific data directory, where highlight sets and the
/// custom color table live.
///
/// - **Linux**: `~/.local/share/md-annotate/`
pub fn get_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::DataDirNotFound)
}

/// Get the full path to the configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomic Writes
// ─────────────────────────────────────────────────────────────────────────────

/// Write `contents` to `path` by writing a sibling temp file and renaming
/// it over the target. Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            debug!("Creating directory: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| Error::StoreSave {
                path: parent.to_path_buf(),
                source: Box::new(e),
            })?;
        }
    }

    let temp_path = path.with_extension(TEMP_SUFFIX);
    fs::write(&temp_path, contents).map_err(|e| Error::StoreSave {
        path: temp_path.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&temp_path, path).map_err(|e| Error::StoreSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load configuration from the default config file location.
///
/// Missing or corrupted files fall back to defaults with a log record.
pub fn load_config() -> AnnotationSettings {
    get_config_file_path()
        .and_then(|path| load_config_from(&path))
        .unwrap_or_warn_default(
            AnnotationSettings::default(),
            "Failed to load configuration",
        )
}

/// Load configuration from an explicit path.
///
/// A missing or empty file yields defaults; invalid JSON is an error.
pub fn load_config_from(config_path: &Path) -> Result<AnnotationSettings> {
    if !config_path.exists() {
        debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        return Ok(AnnotationSettings::default());
    }

    debug!("Loading config from: {}", config_path.display());

    let contents = fs::read_to_string(config_path).map_err(|e| Error::StoreLoad {
        path: config_path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(AnnotationSettings::default());
    }

    let settings = AnnotationSettings::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Config file at {} contains invalid JSON: {}",
            config_path.display(),
            e
        );
        Error::Parse {
            message: format!("Failed to parse config file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!(
        "Configuration loaded successfully from {}",
        config_path.display()
    );
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Save configuration to the default config file location.
pub fn save_config(settings: &AnnotationSettings) -> Result<()> {
    save_config_to(settings, &get_config_file_path()?)
}

/// Save configuration to an explicit path using an atomic write.
pub fn save_config_to(settings: &AnnotationSettings, config_path: &Path) -> Result<()> {
    debug!("Saving config to: {}", config_path.display());

    let json = serde_json::to_string_pretty(settings).map_err(|e| Error::StoreSave {
        path: config_path.to_path_buf(),
        source: Box::new(e),
    })?;
    write_atomic(config_path, &json)?;

    info!(
        "Configuration saved successfully to {}",
        config_path.display()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
