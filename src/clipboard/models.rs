//! Clipboard Refresher - Clipboard data models
//!
//! Small, ephemeral state owned by the watcher. Nothing here is persisted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Executables that can route clipboard data out of a remote session
pub const DEFAULT_RDP_PROCESSES: &[&str] = &[
    "mstsc.exe",     // Windows Remote Desktop
    "msrdc.exe",     // Microsoft Remote Desktop (newer client)
    "mremoteng.exe", // mRemoteNG
    "1remote.exe",   // 1Remote
    "rdpclip.exe",   // RDP clipboard monitor
];

/// Last plain-text payload the watcher observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    pub text: Option<String>,
}

impl ClipboardSnapshot {
    /// Whether `text` equals the remembered payload (by value)
    pub fn matches(&self, text: &str) -> bool {
        self.text.as_deref() == Some(text)
    }

    pub fn remember(&mut self, text: String) {
        self.text = Some(text);
    }

    pub fn forget(&mut self) {
        self.text = None;
    }
}

/// Lifecycle flags of a watcher at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorState {
    /// A poll loop exists
    pub running: bool,
    /// Detected changes are attributed and reported
    pub enabled: bool,
}

/// What to do with the remembered text when a change comes from a
/// process outside the allow-list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignChangePolicy {
    /// Remember it, so an identical later RDP change is not re-announced
    #[default]
    Remember,
    /// Clear it, so an identical later RDP change is announced
    Forget,
}

/// Immutable set of lowercase executable basenames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    /// Build from any list of names; entries are trimmed and lowercased
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Case-insensitive membership test
    pub fn contains(&self, process_name: &str) -> bool {
        self.names.contains(&process_name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order (for logging and display)
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_RDP_PROCESSES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allow_list_has_known_clients() {
        let list = AllowList::default();
        assert_eq!(list.len(), 5);
        assert!(list.contains("mstsc.exe"));
        assert!(list.contains("rdpclip.exe"));
        assert!(!list.contains("notepad.exe"));
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let list = AllowList::new(["MSTSC.EXE", "  mRemoteNG.exe "]);
        assert!(list.contains("mstsc.exe"));
        assert!(list.contains("MRemoteNG.EXE"));
        assert_eq!(list.sorted(), vec!["mremoteng.exe", "mstsc.exe"]);
    }

    #[test]
    fn allow_list_drops_blank_entries() {
        let list = AllowList::new(["", "   "]);
        assert!(list.is_empty());
        assert!(!list.contains(""));
    }

    #[test]
    fn snapshot_compares_by_value() {
        let mut snapshot = ClipboardSnapshot::default();
        assert!(!snapshot.matches("A"));
        snapshot.remember(String::from("A"));
        assert!(snapshot.matches("A"));
        assert!(!snapshot.matches("a"));
        snapshot.forget();
        assert_eq!(snapshot, ClipboardSnapshot::default());
    }
}
