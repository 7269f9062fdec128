//! Clipboard Refresher - Re-announces remote desktop clipboard text
//!
//! Watches the system clipboard, detects text placed there by a remote
//! desktop client, and writes it back so clipboard history tools record it.

pub mod clipboard;
pub mod config;
pub mod logging;
pub mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use clipboard::{ClipboardBackend, ForegroundResolver, SystemClipboard, SystemForegroundResolver};
use config::Settings;
use shell::{Refresher, ShellError};

/// Startup options, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Settings file instead of the default location
    pub config: Option<PathBuf>,
    /// Log file instead of the configured one
    pub log_file: Option<PathBuf>,
    /// Start with monitoring disabled
    pub disabled: bool,
    /// Debug-level logging
    pub verbose: bool,
}

/// Load settings, apply command line overrides and start logging.
///
/// Settings come first because they can name the log file, so problems
/// loading them are logged only after the logger exists.
pub fn bootstrap(options: &RunOptions) -> Settings {
    let loaded = config::init_settings(options.config.as_deref());
    let settings = config::update_settings(|settings| {
        if options.disabled {
            settings.enabled_on_start = false;
        }
    });

    let log_file = options.log_file.clone().or_else(|| settings.log_file.clone());
    logging::init_logging(log_file.as_deref(), options.verbose);

    match loaded {
        Ok(_) => match config::settings_path() {
            Some(path) if path.exists() => log::info!("Settings loaded from {:?}", path),
            Some(path) => log::info!("No settings file at {:?}, using defaults", path),
            None => {}
        },
        Err(e) => log::warn!("{}, using defaults", e),
    }
    settings
}

/// Application main entry point
pub fn run(options: RunOptions) -> Result<(), ShellError> {
    let settings = bootstrap(&options);

    log::info!("Starting Clipboard Refresher");
    log::info!(
        "Watching RDP processes: {}",
        settings.allow_list().sorted().join(", ")
    );

    let backend: Arc<dyn ClipboardBackend> = Arc::new(SystemClipboard::new());
    let resolver: Arc<dyn ForegroundResolver> = Arc::new(SystemForegroundResolver::new());
    let refresher = Refresher::new(&settings, backend, resolver);

    refresher.start()?;
    log::info!("Application started successfully");

    let result = refresher.run_console();
    if let Err(e) = &result {
        log::error!("Console stopped with error: {}", e);
        refresher.on_quit();
    }

    log::info!("Application stopped");
    result
}
