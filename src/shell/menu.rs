//! Clipboard Refresher - Console menu
//!
//! Line-based stand-in for a tray menu: each line read from stdin is one
//! menu item id.

use std::str::FromStr;

/// Menu items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    /// Flip monitoring on/off
    Toggle,
    Enable,
    Disable,
    Status,
    /// Print the activity log
    ShowLog,
    ClearLog,
    /// Persist settings, with the current monitoring state as the start state
    Save,
    Help,
    Quit,
}

impl MenuCommand {
    pub const HELP: &'static str = "\
Commands:
  toggle   enable or disable monitoring
  enable   enable monitoring
  disable  disable monitoring
  status   show monitor state
  log      show the activity log
  clear    clear the activity log
  save     save settings, starting with the current monitoring state
  help     show this help
  quit     exit the application";
}

/// Unrecognised menu input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown command '{0}', type 'help' for a list of commands")]
pub struct UnknownCommand(pub String);

impl FromStr for MenuCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "toggle" | "t" => Ok(MenuCommand::Toggle),
            "enable" | "on" => Ok(MenuCommand::Enable),
            "disable" | "off" => Ok(MenuCommand::Disable),
            "status" | "s" => Ok(MenuCommand::Status),
            "log" | "show log" | "l" => Ok(MenuCommand::ShowLog),
            "clear" => Ok(MenuCommand::ClearLog),
            "save" => Ok(MenuCommand::Save),
            "help" | "h" | "?" => Ok(MenuCommand::Help),
            "quit" | "exit" | "q" => Ok(MenuCommand::Quit),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_menu_ids_and_aliases() {
        assert_eq!("toggle".parse(), Ok(MenuCommand::Toggle));
        assert_eq!("  Show Log \n".parse(), Ok(MenuCommand::ShowLog));
        assert_eq!("EXIT".parse(), Ok(MenuCommand::Quit));
        assert_eq!("off".parse(), Ok(MenuCommand::Disable));
        assert_eq!("?".parse(), Ok(MenuCommand::Help));
        assert_eq!("Save".parse(), Ok(MenuCommand::Save));
    }

    #[test]
    fn rejects_unknown_input() {
        let err = "paste".parse::<MenuCommand>().unwrap_err();
        assert_eq!(err, UnknownCommand("paste".into()));
        assert!(err.to_string().contains("help"));
    }
}
