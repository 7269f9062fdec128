//! Clipboard Refresher - Clipboard backend abstraction
//!
//! The OS clipboard is a process-wide resource. Every backend call opens it,
//! performs a single query or update, and releases it before returning.

use std::time::Duration;

/// Clipboard access error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    /// Another process holds the clipboard open
    #[error("Clipboard is busy: {0}")]
    Busy(String),
    #[error("Failed to read clipboard: {0}")]
    Read(String),
    #[error("Failed to write clipboard: {0}")]
    Write(String),
}

impl ClipboardError {
    /// Only contention is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, ClipboardError::Busy(_))
    }
}

/// Access to the system clipboard
///
/// Implementations must release the clipboard on every path, including
/// errors, before returning.
pub trait ClipboardBackend: Send + Sync {
    /// Current clipboard revision counter
    fn revision(&self) -> Result<u32, ClipboardError>;

    /// Current plain-text payload; `None` for non-text or empty content
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;

    /// Empty the clipboard and set `text` as its Unicode text payload
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Bounded retry for transient clipboard contention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    /// Gap before retry `n` is `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Gap before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    /// Run `op`, retrying transient failures.
    ///
    /// `wait` performs each gap and returns `false` to abandon the remaining
    /// retries (the last error is returned then).
    pub fn run<T, F, W>(&self, mut op: F, mut wait: W) -> Result<T, ClipboardError>
    where
        F: FnMut() -> Result<T, ClipboardError>,
        W: FnMut(Duration) -> bool,
    {
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    log::debug!("[Clipboard] {}, retry {} in {:?}", e, retry, delay);
                    if !wait(delay) {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
