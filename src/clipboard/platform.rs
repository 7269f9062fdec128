//! Clipboard Refresher - System clipboard backends
//!
//! Windows talks to the Win32 clipboard directly so the real sequence
//! number is available. Other targets go through arboard and synthesise
//! the revision counter from observed text changes.

use super::backend::{ClipboardBackend, ClipboardError};

#[cfg(windows)]
pub use self::win::SystemClipboard;

#[cfg(not(windows))]
pub use self::portable::SystemClipboard;

#[cfg(windows)]
mod win {
    use clipboard_win::{formats, raw, Clipboard, Getter, Setter};
    use windows::Win32::System::DataExchange::GetClipboardSequenceNumber;

    use super::{ClipboardBackend, ClipboardError};

    const CF_UNICODETEXT: u32 = 13;

    /// Win32 clipboard
    #[derive(Debug, Default)]
    pub struct SystemClipboard;

    impl SystemClipboard {
        pub fn new() -> Self {
            Self
        }

        /// The returned guard closes the clipboard when dropped
        fn open() -> Result<Clipboard, ClipboardError> {
            Clipboard::new().map_err(|e| ClipboardError::Busy(e.to_string()))
        }
    }

    impl ClipboardBackend for SystemClipboard {
        fn revision(&self) -> Result<u32, ClipboardError> {
            let _clip = Self::open()?;
            Ok(unsafe { GetClipboardSequenceNumber() })
        }

        fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            let _clip = Self::open()?;
            if !raw::is_format_avail(CF_UNICODETEXT) {
                return Ok(None);
            }

            let mut text = String::new();
            formats::Unicode
                .read_clipboard(&mut text)
                .map_err(|e| ClipboardError::Read(e.to_string()))?;
            Ok(Some(text).filter(|t| !t.is_empty()))
        }

        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            let _clip = Self::open()?;
            raw::empty().map_err(|e| ClipboardError::Write(e.to_string()))?;
            formats::Unicode
                .write_clipboard(&text)
                .map_err(|e| ClipboardError::Write(e.to_string()))
        }
    }
}

#[cfg(not(windows))]
mod portable {
    use arboard::Clipboard;
    use parking_lot::Mutex;

    use super::{ClipboardBackend, ClipboardError};

    #[derive(Debug, Default)]
    struct Observed {
        revision: u32,
        text: Option<String>,
    }

    /// arboard clipboard with a synthesised revision counter
    ///
    /// The counter increments whenever the observed text differs from the
    /// previous observation, so the watcher's read-skipping still applies.
    #[derive(Debug, Default)]
    pub struct SystemClipboard {
        observed: Mutex<Observed>,
    }

    impl SystemClipboard {
        pub fn new() -> Self {
            Self::default()
        }

        fn open() -> Result<Clipboard, ClipboardError> {
            Clipboard::new().map_err(access_error)
        }

        fn fetch_text() -> Result<Option<String>, ClipboardError> {
            let mut clipboard = Self::open()?;
            match clipboard.get_text() {
                Ok(text) => Ok(Some(text).filter(|t| !t.is_empty())),
                Err(arboard::Error::ContentNotAvailable) => Ok(None),
                Err(e) => Err(access_error(e)),
            }
        }
    }

    fn access_error(e: arboard::Error) -> ClipboardError {
        match e {
            arboard::Error::ClipboardOccupied => ClipboardError::Busy(e.to_string()),
            other => ClipboardError::Read(other.to_string()),
        }
    }

    impl ClipboardBackend for SystemClipboard {
        fn revision(&self) -> Result<u32, ClipboardError> {
            let text = Self::fetch_text()?;
            let mut observed = self.observed.lock();
            if observed.text != text {
                observed.revision = observed.revision.wrapping_add(1);
                observed.text = text;
            }
            Ok(observed.revision)
        }

        fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            Self::fetch_text()
        }

        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            let mut clipboard = Self::open()?;
            clipboard
                .clear()
                .map_err(|e| ClipboardError::Write(e.to_string()))?;
            clipboard
                .set_text(text)
                .map_err(|e| match e {
                    arboard::Error::ClipboardOccupied => ClipboardError::Busy(e.to_string()),
                    other => ClipboardError::Write(other.to_string()),
                })
        }
    }
}
