//! Clipboard Refresher - Foreground process resolver
//!
//! Maps the focused top-level window to the lowercase basename of the
//! executable that owns it. This is a best-effort query: every failure
//! becomes `None`, and nothing is cached between calls.

/// Source of foreground-process attribution
pub trait ForegroundResolver: Send + Sync {
    fn foreground_process(&self) -> Option<String>;
}

impl<F> ForegroundResolver for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn foreground_process(&self) -> Option<String> {
        self()
    }
}

/// Lowercase file name of a full executable path.
///
/// Accepts both `\` and `/` separators. Returns `None` for an empty name.
pub fn executable_basename(path: &str) -> Option<String> {
    let name = path.rsplit(['\\', '/']).next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Resolver backed by the OS window manager
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemForegroundResolver;

impl SystemForegroundResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ForegroundResolver for SystemForegroundResolver {
    fn foreground_process(&self) -> Option<String> {
        match imp::foreground_executable_path() {
            Ok(path) => executable_basename(&path),
            Err(e) => {
                log::debug!("[Foreground] Could not get foreground window process: {}", e);
                None
            }
        }
    }
}

#[cfg(windows)]
mod imp {
    use windows::core::PWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

    pub fn foreground_executable_path() -> Result<String, String> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            return Err("no foreground window".into());
        }

        let mut pid: u32 = 0;
        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32)) };
        if pid == 0 {
            return Err("foreground window has no owning process".into());
        }

        let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map_err(|e| format!("OpenProcess({}) failed: {}", pid, e))?;

        let mut buf = [0u16; 1024];
        let mut size = buf.len() as u32;
        let queried = unsafe {
            QueryFullProcessImageNameW(process, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut size)
        };
        // The process may have exited in between; the handle is closed either way
        unsafe {
            let _ = CloseHandle(process);
        }
        queried.map_err(|e| format!("QueryFullProcessImageNameW({}) failed: {}", pid, e))?;

        Ok(String::from_utf16_lossy(&buf[..size as usize]))
    }
}

#[cfg(not(windows))]
mod imp {
    pub fn foreground_executable_path() -> Result<String, String> {
        Err("foreground attribution is only available on Windows".into())
    }
}
