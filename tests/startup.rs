use std::fs;
use std::sync::Arc;

use clipboard_refresher_lib::clipboard::{ClipboardBackend, ClipboardError};
use clipboard_refresher_lib::config::{self, Settings};
use clipboard_refresher_lib::shell::{MenuCommand, MenuOutcome, Refresher};
use clipboard_refresher_lib::{bootstrap, RunOptions};

struct EmptyClipboard;

impl ClipboardBackend for EmptyClipboard {
    fn revision(&self) -> Result<u32, ClipboardError> {
        Ok(0)
    }

    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(None)
    }

    fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Ok(())
    }
}

// The logger and settings are process-wide, so startup is checked in one test
#[test]
fn malformed_settings_are_reported_and_overrides_reach_the_global() {
    let dir = tempfile::tempdir().unwrap();
    let settings_file = dir.path().join("settings.json");
    let log_file = dir.path().join("refresher.log");
    fs::write(&settings_file, "{ not json").unwrap();

    let settings = bootstrap(&RunOptions {
        config: Some(settings_file.clone()),
        log_file: Some(log_file.clone()),
        disabled: true,
        verbose: false,
    });
    log::logger().flush();

    let logged = fs::read_to_string(&log_file).unwrap();
    assert!(logged.contains("Log file location"));
    assert!(logged.contains("Failed to load settings"));
    assert!(logged.contains("using defaults"));

    assert!(!settings.enabled_on_start);
    assert_eq!(config::get_settings(), settings);
    assert_eq!(
        Settings {
            enabled_on_start: true,
            ..settings.clone()
        },
        Settings::default()
    );

    let refresher = Refresher::new(&settings, Arc::new(EmptyClipboard), Arc::new(|| None::<String>));
    assert!(!refresher.watcher().is_enabled());
    refresher.handle_command(MenuCommand::Enable);
    match refresher.handle_command(MenuCommand::Save) {
        MenuOutcome::Continue(text) => assert!(text.starts_with("Settings saved to")),
        MenuOutcome::Quit => panic!("unexpected quit"),
    }

    let saved = Settings::load_from(&settings_file).unwrap();
    assert!(saved.enabled_on_start);
    assert_eq!(saved, config::get_settings());
}
