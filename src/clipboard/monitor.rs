//! Clipboard Refresher - Clipboard monitoring module
//!
//! Polls the clipboard revision counter on a dedicated thread, reads the
//! text only when the counter moves, attributes the change to the
//! foreground process and reports changes made by allow-listed remote
//! desktop clients.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::backend::{ClipboardBackend, ClipboardError, RetryPolicy};
use super::foreground::ForegroundResolver;
use super::models::{AllowList, ClipboardSnapshot, ForeignChangePolicy, MonitorState};

/// Error returned by a change handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type ChangeHandler = Arc<dyn Fn(&str) -> Result<(), HandlerError> + Send + Sync>;

/// Watcher tuning
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Idle delay between polls
    pub poll_interval: Duration,
    /// Retry for a busy clipboard inside one poll
    pub retry: RetryPolicy,
    /// Pause after a failed poll
    pub error_pause: Duration,
    /// Consecutive failed polls before switching to `long_pause`
    pub error_threshold: u32,
    /// Pause after failed polls once the threshold is reached
    pub long_pause: Duration,
    /// How long `stop()` waits for the loop to exit
    pub stop_timeout: Duration,
    pub allow_list: AllowList,
    pub foreign_changes: ForeignChangePolicy,
    /// Initial value of the enabled flag
    pub enabled: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            error_pause: Duration::from_millis(500),
            error_threshold: 5,
            long_pause: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(2),
            allow_list: AllowList::default(),
            foreign_changes: ForeignChangePolicy::default(),
            enabled: true,
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    running: bool,
    /// Bumped by every `start()`; a loop exits once its generation is stale
    generation: u64,
    /// Highest generation whose loop has exited
    finished: u64,
}

/// State shared between the watcher handle and its loop thread
struct Shared {
    enabled: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    signal: Condvar,
}

impl Shared {
    fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            lifecycle: Mutex::new(Lifecycle::default()),
            signal: Condvar::new(),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let lifecycle = self.lifecycle.lock();
        lifecycle.running && lifecycle.generation == generation
    }

    /// Sleep for `timeout` unless stopped first. Returns whether the loop
    /// of `generation` should keep going.
    fn pause(&self, generation: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut lifecycle = self.lifecycle.lock();
        while lifecycle.running && lifecycle.generation == generation {
            if self.signal.wait_until(&mut lifecycle, deadline).timed_out() {
                return lifecycle.running && lifecycle.generation == generation;
            }
        }
        false
    }

    /// Record that the loop of `generation` has exited. A loop that is
    /// still current (it unwound) also stops counting as running.
    fn mark_finished(&self, generation: u64) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.generation == generation {
            lifecycle.running = false;
        }
        lifecycle.finished = lifecycle.finished.max(generation);
        self.signal.notify_all();
    }
}

/// Marks the loop as exited even if it unwinds
struct ExitGuard<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("Clipboard monitor loop panicked, monitoring stopped");
        }
        self.shared.mark_finished(self.generation);
    }
}

/// Pause chosen after a failed poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    /// Below the threshold: `error_pause`
    Short,
    /// Threshold just reached: `long_pause`, reported once
    EnterLong,
    /// Still failing past the threshold: `long_pause`
    Long,
}

impl Backoff {
    /// A threshold of zero behaves like one
    fn after(consecutive_errors: u32, threshold: u32) -> Self {
        let threshold = threshold.max(1);
        if consecutive_errors < threshold {
            Backoff::Short
        } else if consecutive_errors == threshold {
            Backoff::EnterLong
        } else {
            Backoff::Long
        }
    }
}

/// One poll step: revision tracking, de-duplication and attribution
pub(crate) struct Poller {
    backend: Arc<dyn ClipboardBackend>,
    resolver: Arc<dyn ForegroundResolver>,
    allow_list: AllowList,
    foreign_changes: ForeignChangePolicy,
    retry: RetryPolicy,
    last_revision: Option<u32>,
    snapshot: ClipboardSnapshot,
}

impl Poller {
    pub(crate) fn new(
        backend: Arc<dyn ClipboardBackend>,
        resolver: Arc<dyn ForegroundResolver>,
        config: &WatcherConfig,
    ) -> Self {
        Self {
            backend,
            resolver,
            allow_list: config.allow_list.clone(),
            foreign_changes: config.foreign_changes,
            retry: config.retry,
            last_revision: None,
            snapshot: ClipboardSnapshot::default(),
        }
    }

    /// Poll once. Returns the text to announce, if any.
    ///
    /// `wait` performs retry gaps and returns `false` to abandon them.
    pub(crate) fn poll(
        &mut self,
        enabled: bool,
        wait: &mut dyn FnMut(Duration) -> bool,
    ) -> Result<Option<String>, ClipboardError> {
        let retry = self.retry;
        let backend = &self.backend;

        let revision = retry.run(|| backend.revision(), &mut *wait)?;
        if self.last_revision == Some(revision) {
            return Ok(None);
        }

        if !enabled {
            // Keep up with the counter so re-enabling does not replay this change
            log::debug!("[Monitor] Revision {} skipped, monitoring disabled", revision);
            self.last_revision = Some(revision);
            return Ok(None);
        }

        let text = retry.run(|| backend.read_text(), &mut *wait)?;
        self.last_revision = Some(revision);

        let text = match text {
            Some(text) => text,
            None => {
                log::debug!("[Monitor] Revision {} has no text content", revision);
                return Ok(None);
            }
        };

        if self.snapshot.matches(&text) {
            log::debug!("[Monitor] Clipboard content hasn't changed");
            return Ok(None);
        }

        let process = self.resolver.foreground_process();
        match process.as_deref() {
            Some(name) if self.allow_list.contains(name) => {
                log::info!("[Monitor] Clipboard updated by RDP process: {}", name);
                self.snapshot.remember(text.clone());
                Ok(Some(text))
            }
            other => {
                log::debug!("[Monitor] Clipboard updated by non-RDP process: {:?}", other);
                match self.foreign_changes {
                    ForeignChangePolicy::Remember => self.snapshot.remember(text),
                    ForeignChangePolicy::Forget => self.snapshot.forget(),
                }
                Ok(None)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> &ClipboardSnapshot {
        &self.snapshot
    }
}

/// Clipboard watcher
///
/// Owns at most one poll loop at a time. The change handler runs on the
/// loop thread; its errors and panics are logged and never stop the loop.
pub struct ClipboardWatcher {
    config: WatcherConfig,
    backend: Arc<dyn ClipboardBackend>,
    resolver: Arc<dyn ForegroundResolver>,
    handler: ChangeHandler,
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardWatcher {
    /// Create a stopped watcher
    ///
    /// on_change: called with the new text for every reported change
    pub fn new<F>(
        config: WatcherConfig,
        backend: Arc<dyn ClipboardBackend>,
        resolver: Arc<dyn ForegroundResolver>,
        on_change: F,
    ) -> Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared::new(config.enabled));
        Self {
            config,
            backend,
            resolver,
            handler: Arc::new(on_change),
            shared,
            thread: Mutex::new(None),
        }
    }

    /// Start the poll loop. Does nothing if it is already running.
    pub fn start(&self) -> std::io::Result<()> {
        let generation = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.running {
                log::warn!("Clipboard monitor is already running");
                return Ok(());
            }
            lifecycle.running = true;
            lifecycle.generation += 1;
            lifecycle.generation
        };

        let shared = Arc::clone(&self.shared);
        let handler = Arc::clone(&self.handler);
        let poller = Poller::new(Arc::clone(&self.backend), Arc::clone(&self.resolver), &self.config);
        let config = self.config.clone();

        let spawned = thread::Builder::new()
            .name("clipboard-monitor".into())
            .spawn(move || run_loop(shared, generation, poller, handler, config));

        match spawned {
            Ok(handle) => {
                // A loop left behind by a timed-out stop() is detached here
                *self.thread.lock() = Some(handle);
                log::info!("Clipboard monitor started");
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to spawn clipboard monitor thread: {}", e);
                let mut lifecycle = self.shared.lifecycle.lock();
                if lifecycle.generation == generation {
                    lifecycle.running = false;
                }
                lifecycle.finished = lifecycle.finished.max(generation);
                Err(e)
            }
        }
    }

    /// Stop the poll loop, waiting up to the configured timeout for it to
    /// exit. The loop may still be finishing an iteration when this returns.
    pub fn stop(&self) {
        let (generation, deadline) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if !lifecycle.running {
                return;
            }
            lifecycle.running = false;
            self.shared.signal.notify_all();
            (lifecycle.generation, Instant::now() + self.config.stop_timeout)
        };

        let exited = {
            let mut lifecycle = self.shared.lifecycle.lock();
            while lifecycle.finished < generation {
                if self.shared.signal.wait_until(&mut lifecycle, deadline).timed_out() {
                    break;
                }
            }
            lifecycle.finished >= generation
        };

        let handle = self.thread.lock().take();
        if exited {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    log::error!("Clipboard monitor thread panicked");
                }
            }
        } else {
            log::warn!(
                "Clipboard monitor did not exit within {:?}, leaving it to finish",
                self.config.stop_timeout
            );
        }

        log::info!("Clipboard monitor stopped");
    }

    /// Enable or disable reporting. Takes effect at the next poll.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
        log::info!(
            "Clipboard monitoring {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.shared.lifecycle.lock().running
    }

    pub fn state(&self) -> MonitorState {
        MonitorState {
            running: self.is_running(),
            enabled: self.is_enabled(),
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }
}

impl Drop for ClipboardWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    shared: Arc<Shared>,
    generation: u64,
    mut poller: Poller,
    handler: ChangeHandler,
    config: WatcherConfig,
) {
    let _guard = ExitGuard {
        shared: &shared,
        generation,
    };
    log::info!(
        "Clipboard monitor running with {}ms interval",
        config.poll_interval.as_millis()
    );

    let mut wait = |delay: Duration| shared.pause(generation, delay);
    let mut consecutive_errors: u32 = 0;

    while shared.is_current(generation) {
        let enabled = shared.enabled.load(Ordering::SeqCst);

        let delay = match poller.poll(enabled, &mut wait) {
            Ok(change) => {
                consecutive_errors = 0;
                if let Some(text) = change {
                    deliver(&handler, &text);
                }
                config.poll_interval
            }
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                match Backoff::after(consecutive_errors, config.error_threshold) {
                    Backoff::Short => {
                        log::warn!("Error in clipboard monitoring loop: {}", e);
                        config.error_pause
                    }
                    Backoff::EnterLong => {
                        log::error!(
                            "Clipboard unavailable for {} consecutive polls, backing off for {:?}: {}",
                            consecutive_errors,
                            config.long_pause,
                            e
                        );
                        config.long_pause
                    }
                    Backoff::Long => {
                        log::debug!("Clipboard still unavailable: {}", e);
                        config.long_pause
                    }
                }
            }
        };

        if !wait(delay) {
            break;
        }
    }

    log::info!("Clipboard monitor loop exited");
}

fn deliver(handler: &ChangeHandler, text: &str) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(text))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("Error in clipboard update callback: {}", e),
        Err(_) => log::error!("Clipboard update callback panicked"),
    }
}
