use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Re-announces clipboard text copied from remote desktop sessions
#[derive(Debug, Parser)]
#[command(name = "clipboard-refresher", version, about)]
struct Cli {
    /// Settings file (JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Start with monitoring disabled
    #[arg(long)]
    disabled: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = clipboard_refresher_lib::RunOptions {
        config: cli.config,
        log_file: cli.log_file,
        disabled: cli.disabled,
        verbose: cli.verbose,
    };

    match clipboard_refresher_lib::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}
