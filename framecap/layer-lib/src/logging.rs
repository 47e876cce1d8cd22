//! Tracing initialisation for the controller and the capture library.
//!
//! The capture library runs inside processes whose stderr is usually not
//! visible, so a file target is the primary mode there: either up front via
//! the `FRAMECAP_LOG_FILE` environment variable, or later when the controller
//! pushes a path through the library's boot sequence.

use std::{fs::OpenOptions, sync::Arc};

use tracing_subscriber::{prelude::*, EnvFilter};

/// Initial log destination for the capture library, read at load time.
pub const FRAMECAP_LOG_FILE: &str = "FRAMECAP_LOG_FILE";

/// Install the global subscriber: a log file if `FRAMECAP_LOG_FILE` is set,
/// stderr otherwise. Safe to call more than once; later calls lose and are
/// ignored.
pub fn init_tracing() {
    match std::env::var(FRAMECAP_LOG_FILE) {
        Ok(log_file) if !log_file.is_empty() => {
            if !init_file_tracing(&log_file) {
                init_stderr_tracing();
            }
        }
        _ => init_stderr_tracing(),
    }
}

/// Point tracing at `log_file`. Returns `false` when the file cannot be
/// opened or a subscriber is already installed.
pub fn init_file_tracing(log_file: &str) -> bool {
    let file = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("framecap: failed to open log file '{log_file}': {e}");
            return false;
        }
    };

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_thread_ids(true)
                .with_target(true)
                .with_ansi(false)
                .compact(),
        )
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            "framecap logging for process {} goes to `{log_file}`",
            std::process::id()
        );
    }

    installed
}

fn init_stderr_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .with(EnvFilter::from_default_env())
        .try_init();
}
