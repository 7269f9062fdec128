//! Clipboard Refresher - Activity log
//!
//! Rolling, user-facing record of what the app did. Every entry is also
//! forwarded to the `log` facade.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// Severity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

/// One activity log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level.as_str(),
            self.message
        )
    }
}

/// Bounded activity log, oldest entries dropped first
#[derive(Debug)]
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Info => log::info!("{}", message),
            Level::Warning => log::warn!("{}", message),
            Level::Error => log::error!("{}", message),
        }

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Local::now(),
            level,
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    /// Copy of the current entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// All entries, one formatted line each
    pub fn render(&self) -> String {
        self.entries
            .lock()
            .iter()
            .map(|entry| format!("{}\n", entry))
            .collect()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_most_recent_entries() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.info(format!("message {}", i));
        }
        let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["message 2", "message 3", "message 4"]);
    }

    #[test]
    fn render_formats_level_and_message() {
        let log = ActivityLog::new(10);
        log.push(Level::Warning, "careful");
        log.error("broken");
        let rendered = log.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] [WARNING] careful"));
        assert!(lines[1].ends_with("] [ERROR] broken"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn clear_empties_the_log() {
        let log = ActivityLog::default();
        log.info("one");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.render(), "");
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let log = ActivityLog::new(0);
        log.info("a");
        log.info("b");
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].message, "b");
    }
}
