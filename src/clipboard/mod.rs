//! Clipboard Refresher - Clipboard module
//!
//! Provides clipboard change detection and attribution

pub mod backend;
pub mod foreground;
pub mod models;
pub mod monitor;
pub mod platform;

pub use backend::{ClipboardBackend, ClipboardError, RetryPolicy};
pub use foreground::{executable_basename, ForegroundResolver, SystemForegroundResolver};
pub use models::{AllowList, ClipboardSnapshot, ForeignChangePolicy, MonitorState, DEFAULT_RDP_PROCESSES};
pub use monitor::{ClipboardWatcher, HandlerError, WatcherConfig};
pub use platform::SystemClipboard;
