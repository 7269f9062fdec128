//! Clipboard Refresher - User settings module
//!
//! Manages application configuration, stored as JSON in the user's config
//! directory

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clipboard::{AllowList, ForeignChangePolicy, RetryPolicy, WatcherConfig, DEFAULT_RDP_PROCESSES};

/// Global settings instance
static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

/// File the global settings were loaded from and are saved to
static SETTINGS_PATH: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

const APP_DIR: &str = "clipboard-refresher";
const SETTINGS_FILE: &str = "settings.json";

/// Settings error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to load settings from {path:?}: {source}")]
    Load {
        path: PathBuf,
        source: Box<ConfigError>,
    },
    #[error("No config directory available")]
    NoConfigDir,
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Report changes as soon as the app starts
    pub enabled_on_start: bool,
    /// Remote desktop client executables (case-insensitive)
    pub rdp_processes: Vec<String>,
    /// Idle delay between polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Extra attempts when the clipboard is busy
    pub retry_attempts: u32,
    /// Gap before retry n is n times this (milliseconds)
    pub retry_base_delay_ms: u64,
    /// Pause after a failed poll (milliseconds)
    pub error_pause_ms: u64,
    /// Consecutive failed polls before the long pause
    pub error_threshold: u32,
    /// Long pause under sustained contention (milliseconds)
    pub long_pause_ms: u64,
    /// Shutdown wait for the monitor thread (milliseconds)
    pub stop_timeout_ms: u64,
    /// Treatment of text copied by non-RDP processes
    pub foreign_changes: ForeignChangePolicy,
    /// Characters of clipboard text shown in log lines
    pub log_preview_len: usize,
    /// Entries kept in the activity log
    pub activity_log_capacity: usize,
    /// Log file; defaults to one next to the executable
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_on_start: true,
            rdp_processes: DEFAULT_RDP_PROCESSES.iter().map(|s| s.to_string()).collect(),
            poll_interval_ms: 100,
            retry_attempts: 3,
            retry_base_delay_ms: 100,
            error_pause_ms: 500,
            error_threshold: 5,
            long_pause_ms: 5000,
            stop_timeout_ms: 2000,
            foreign_changes: ForeignChangePolicy::Remember,
            log_preview_len: 100,
            activity_log_capacity: 100,
            log_file: None,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load settings from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Save settings to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Allow-list built from `rdp_processes`
    pub fn allow_list(&self) -> AllowList {
        AllowList::new(&self.rdp_processes)
    }

    /// Watcher tuning derived from these settings
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry: RetryPolicy {
                retries: self.retry_attempts,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
            error_pause: Duration::from_millis(self.error_pause_ms),
            error_threshold: self.error_threshold.max(1),
            long_pause: Duration::from_millis(self.long_pause_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            allow_list: self.allow_list(),
            foreign_changes: self.foreign_changes,
            enabled: self.enabled_on_start,
        }
    }
}

/// Get current settings
pub fn get_settings() -> Settings {
    SETTINGS.read().clone()
}

/// Update the in-memory settings and return the result
pub fn update_settings<F>(update: F) -> Settings
where
    F: FnOnce(&mut Settings),
{
    let mut settings = SETTINGS.write();
    update(&mut *settings);
    settings.clone()
}

/// Write the current settings to the file they were loaded from
pub fn save_settings() -> Result<PathBuf, ConfigError> {
    let path = SETTINGS_PATH.read().clone().ok_or(ConfigError::NoConfigDir)?;
    get_settings().save_to(&path)?;
    log::info!("Settings saved to {:?}", path);
    Ok(path)
}

/// Initialize settings from `path` (or the default location).
///
/// Defaults are installed when the file cannot be used; the error is
/// returned so it can be reported once logging is up.
pub fn init_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = path.map(Path::to_path_buf).or_else(Settings::default_path);
    *SETTINGS_PATH.write() = path.clone();

    let loaded = match path {
        Some(path) => Settings::load_from(&path).map_err(|e| ConfigError::Load {
            path,
            source: Box::new(e),
        }),
        None => Err(ConfigError::NoConfigDir),
    };
    *SETTINGS.write() = loaded.as_ref().cloned().unwrap_or_default();
    loaded
}

/// Settings file `init_settings` resolved, if any
pub fn settings_path() -> Option<PathBuf> {
    SETTINGS_PATH.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let settings = Settings {
            rdp_processes: vec!["mstsc.exe".into()],
            foreign_changes: ForeignChangePolicy::Forget,
            log_file: Some(PathBuf::from("refresher.log")),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "poll_interval_ms": 250, "foreign_changes": "forget" }"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.foreign_changes, ForeignChangePolicy::Forget);
        assert_eq!(settings.error_threshold, 5);
        assert_eq!(settings.rdp_processes.len(), DEFAULT_RDP_PROCESSES.len());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn global_settings_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();

        let err = init_settings(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load settings"));
        assert_eq!(get_settings(), Settings::default());
        assert_eq!(settings_path(), Some(path.clone()));

        let updated = update_settings(|s| s.enabled_on_start = false);
        assert!(!updated.enabled_on_start);
        assert!(!get_settings().enabled_on_start);

        assert_eq!(save_settings().unwrap(), path);
        let reloaded = init_settings(Some(&path)).unwrap();
        assert!(!reloaded.enabled_on_start);
        assert_eq!(get_settings(), reloaded);
    }

    #[test]
    fn watcher_config_follows_settings() {
        let settings = Settings {
            retry_attempts: 2,
            retry_base_delay_ms: 50,
            error_threshold: 0,
            enabled_on_start: false,
            rdp_processes: vec!["MSRDC.EXE".into()],
            ..Settings::default()
        };
        let config = settings.watcher_config();
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.retry.delay_for(2), Duration::from_millis(100));
        assert_eq!(config.error_threshold, 1);
        assert!(!config.enabled);
        assert!(config.allow_list.contains("msrdc.exe"));
        assert!(!config.allow_list.contains("mstsc.exe"));
    }
}
