//! Process-global capture-library state fed by the boot sequence.
//!
//! Accessors degrade to no-ops or defaults if a lock is poisoned: this code
//! runs inside the application being captured, and a state hiccup must never
//! take the target down.

use std::sync::{Mutex, OnceLock};

use framecap_layer_lib::options::CaptureOptions;

static LOG_FILE: Mutex<Option<String>> = Mutex::new(None);
static OPTIONS: Mutex<Option<CaptureOptions>> = Mutex::new(None);
static CONTROL_IDENT: OnceLock<u32> = OnceLock::new();

/// The identifier the controller reads back during boot and later uses to
/// reconnect over the control channel. Minted once per process from the
/// process id, which is never zero.
pub fn control_ident() -> u32 {
    *CONTROL_IDENT.get_or_init(std::process::id)
}

pub fn set_log_file(path: String) {
    tracing::info!("log file set to `{path}`");
    if let Ok(mut log_file) = LOG_FILE.lock() {
        *log_file = Some(path);
    }
}

pub fn log_file() -> Option<String> {
    LOG_FILE.lock().ok().and_then(|guard| (*guard).clone())
}

pub fn set_capture_options(options: CaptureOptions) {
    tracing::debug!("capture options received: {options:?}");
    if let Ok(mut slot) = OPTIONS.lock() {
        *slot = Some(options);
    }
}

pub fn capture_options() -> CaptureOptions {
    OPTIONS
        .lock()
        .ok()
        .and_then(|guard| *guard)
        .unwrap_or_default()
}
