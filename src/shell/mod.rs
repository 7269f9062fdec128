//! Clipboard Refresher - Host shell
//!
//! Wires the watcher's output back into the clipboard so clipboard history
//! tools pick it up, and drives the console menu and activity log.

pub mod activity_log;
pub mod menu;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::clipboard::{
    ClipboardBackend, ClipboardError, ClipboardWatcher, ForegroundResolver, RetryPolicy,
};
use crate::config::{self, ConfigError, Settings};

pub use activity_log::{ActivityLog, Level, LogEntry};
pub use menu::{MenuCommand, UnknownCommand};

/// Host shell error type
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a menu command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Keep running and show this text
    Continue(String),
    Quit,
}

/// Set on quit; cuts write-back retry gaps short
#[derive(Default)]
struct Shutdown {
    requested: Mutex<bool>,
    signal: Condvar,
}

impl Shutdown {
    fn request(&self) {
        *self.requested.lock() = true;
        self.signal.notify_all();
    }

    fn reset(&self) {
        *self.requested.lock() = false;
    }

    /// Sleep for `timeout` unless shutdown is requested. Returns whether to
    /// keep going.
    fn pause(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut requested = self.requested.lock();
        while !*requested {
            if self.signal.wait_until(&mut requested, deadline).timed_out() {
                return !*requested;
            }
        }
        false
    }
}

/// Re-writes remote desktop clipboard text
struct ClipboardRefresh {
    backend: Arc<dyn ClipboardBackend>,
    retry: RetryPolicy,
    activity: Arc<ActivityLog>,
    shutdown: Arc<Shutdown>,
}

impl ClipboardRefresh {
    fn on_clipboard_update(&self, content: &str) {
        let preview_len = config::get_settings().log_preview_len;
        log::info!("Processing RDP clipboard content: {}...", preview(content, preview_len));
        self.activity
            .info(format!("RDP clipboard content: {}...", preview(content, preview_len * 2)));

        // Our own write bumps the revision; the watcher sees identical text and stays quiet
        let written = self
            .retry
            .run(|| self.backend.write_text(content), |delay| self.shutdown.pause(delay));
        match written {
            Ok(()) => log::debug!("Successfully updated clipboard with processed content"),
            Err(e) => self.activity.error(format!("Failed to update clipboard: {}", e)),
        }
    }
}

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// The running application: watcher plus user-facing controls
pub struct Refresher {
    watcher: ClipboardWatcher,
    activity: Arc<ActivityLog>,
    shutdown: Arc<Shutdown>,
}

impl Refresher {
    pub fn new(
        settings: &Settings,
        backend: Arc<dyn ClipboardBackend>,
        resolver: Arc<dyn ForegroundResolver>,
    ) -> Self {
        let activity = Arc::new(ActivityLog::new(settings.activity_log_capacity));
        let shutdown = Arc::new(Shutdown::default());
        let watcher_config = settings.watcher_config();
        let refresh = ClipboardRefresh {
            backend: Arc::clone(&backend),
            retry: watcher_config.retry,
            activity: Arc::clone(&activity),
            shutdown: Arc::clone(&shutdown),
        };

        let watcher = ClipboardWatcher::new(watcher_config, backend, resolver, move |text| {
            refresh.on_clipboard_update(text);
            Ok(())
        });

        Self {
            watcher,
            activity,
            shutdown,
        }
    }

    pub fn start(&self) -> Result<(), ShellError> {
        self.shutdown.reset();
        self.watcher.start()?;
        self.activity.info("Application started");
        Ok(())
    }

    /// Toggle callback: enable or disable reporting
    pub fn on_toggle(&self, enabled: bool) {
        self.watcher.set_enabled(enabled);
        self.activity.info(format!(
            "Monitoring {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Quit callback: stop monitoring
    pub fn on_quit(&self) {
        self.activity.info("Exiting application...");
        self.shutdown.request();
        self.watcher.stop();
    }

    /// Save the settings file, starting monitoring in its current state
    pub fn save_settings(&self) -> Result<PathBuf, ShellError> {
        let enabled = self.watcher.is_enabled();
        config::update_settings(|settings| settings.enabled_on_start = enabled);
        let path = config::save_settings()?;
        self.activity.info(format!("Settings saved to {}", path.display()));
        Ok(path)
    }

    pub fn status_line(&self) -> String {
        let state = self.watcher.state();
        format!(
            "Monitoring: {} | Monitor thread: {} | RDP processes: {}",
            if state.enabled { "enabled" } else { "disabled" },
            if state.running { "running" } else { "stopped" },
            self.watcher.config().allow_list.sorted().join(", ")
        )
    }

    pub fn handle_command(&self, command: MenuCommand) -> MenuOutcome {
        match command {
            MenuCommand::Toggle => {
                self.on_toggle(!self.watcher.is_enabled());
                MenuOutcome::Continue(self.status_line())
            }
            MenuCommand::Enable => {
                self.on_toggle(true);
                MenuOutcome::Continue(self.status_line())
            }
            MenuCommand::Disable => {
                self.on_toggle(false);
                MenuOutcome::Continue(self.status_line())
            }
            MenuCommand::Status => MenuOutcome::Continue(self.status_line()),
            MenuCommand::ShowLog => {
                if self.activity.is_empty() {
                    MenuOutcome::Continue("Activity log is empty".into())
                } else {
                    MenuOutcome::Continue(self.activity.render().trim_end().to_string())
                }
            }
            MenuCommand::ClearLog => {
                self.activity.clear();
                MenuOutcome::Continue("Activity log cleared".into())
            }
            MenuCommand::Save => match self.save_settings() {
                Ok(path) => MenuOutcome::Continue(format!("Settings saved to {}", path.display())),
                Err(e) => {
                    self.activity.error(format!("Failed to save settings: {}", e));
                    MenuOutcome::Continue(format!("Failed to save settings: {}", e))
                }
            },
            MenuCommand::Help => MenuOutcome::Continue(MenuCommand::HELP.into()),
            MenuCommand::Quit => {
                self.on_quit();
                MenuOutcome::Quit
            }
        }
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn watcher(&self) -> &ClipboardWatcher {
        &self.watcher
    }

    /// Serve the console menu until `quit` or Ctrl+C
    pub fn run_console(&self) -> Result<(), ShellError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(self.control_loop());
        // A pending stdin read cannot be cancelled
        runtime.shutdown_timeout(Duration::from_millis(100));
        result
    }

    async fn control_loop(&self) -> Result<(), ShellError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        println!("Clipboard Refresher running. Type 'help' for commands, Ctrl+C to exit.");

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    log::info!("Shutdown requested by user (Ctrl+C)");
                    self.on_quit();
                    return Ok(());
                }
                line = lines.next_line(), if stdin_open => {
                    match line? {
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => match line.parse::<MenuCommand>() {
                            Ok(command) => match self.handle_command(command) {
                                MenuOutcome::Continue(output) => println!("{}", output),
                                MenuOutcome::Quit => return Ok(()),
                            },
                            Err(e) => println!("{}", e),
                        },
                        None => {
                            log::info!("Console input closed, press Ctrl+C to exit");
                            stdin_open = false;
                        }
                    }
                }
            }
        }
    }
}
