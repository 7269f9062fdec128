//! Clipboard Refresher - Logging setup
//!
//! Console and log file receive the same env_logger output.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_FILE_NAME: &str = "clipboard_refresher.log";

/// Writes every record to stderr and the log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Console failures are ignored
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Log file next to the executable, or in the local data directory
pub fn default_log_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(LOG_FILE_NAME)))
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("clipboard-refresher").join(LOG_FILE_NAME)))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global logger.
///
/// `RUST_LOG` overrides the default filter. Returns the log file in use, or
/// `None` when only the console is written.
pub fn init_logging(log_file: Option<&Path>, verbose: bool) -> Option<PathBuf> {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    builder.format_timestamp_millis();

    let path = log_file.map(Path::to_path_buf).or_else(default_log_path);
    let mut file_error = None;
    let used = match path {
        Some(path) => match open_log_file(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
                Some(path)
            }
            Err(e) => {
                file_error = Some((path, e));
                None
            }
        },
        None => None,
    };

    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {}", e);
    }

    match (&used, file_error) {
        (Some(path), _) => log::info!("Log file location: {:?}", path),
        (None, Some((path, e))) => log::warn!("Cannot open log file {:?}: {}, logging to console only", path, e),
        (None, None) => log::warn!("No log file location available, logging to console only"),
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn tee_writes_through_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join(LOG_FILE_NAME);
        let mut tee = TeeWriter {
            file: open_log_file(&path).unwrap(),
        };
        tee.write_all(b"hello log\n").unwrap();
        tee.flush().unwrap();

        let mut content = String::new();
        File::open(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello log\n");
    }

    #[test]
    fn log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        for line in ["one\n", "two\n"] {
            let mut file = open_log_file(&path).unwrap();
            file.write_all(line.as_bytes()).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
