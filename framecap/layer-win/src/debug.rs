//! Debugger-attach aid for the library's own load path.
//!
//! `FRAMECAP_WAIT_FOR_DEBUGGER` controls whether a freshly-loaded capture
//! library parks until a debugger attaches: `1` waits in every process, any
//! other non-empty value waits only in processes whose executable name
//! matches it (case-insensitively, extension dropped).

use winapi::um::{debugapi::IsDebuggerPresent, synchapi::Sleep};

const FRAMECAP_WAIT_FOR_DEBUGGER: &str = "FRAMECAP_WAIT_FOR_DEBUGGER";

pub fn should_wait_for_debugger() -> bool {
    let filter = match std::env::var(FRAMECAP_WAIT_FOR_DEBUGGER) {
        Ok(value) if !value.is_empty() => value,
        _ => return false,
    };

    if filter == "1" {
        return true;
    }

    current_process_name().eq_ignore_ascii_case(&filter)
}

fn current_process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem()?.to_str().map(String::from))
        .unwrap_or_default()
}

/// Park until a debugger shows up.
pub fn wait_for_debugger() {
    while unsafe { IsDebuggerPresent() } == 0 {
        unsafe { Sleep(100) };
    }
}
