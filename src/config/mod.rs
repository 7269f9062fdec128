//! Clipboard Refresher - Configuration module

pub mod settings;

pub use settings::{
    get_settings, init_settings, save_settings, settings_path, update_settings, ConfigError, Settings,
};
