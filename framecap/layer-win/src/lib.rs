#![cfg(windows)]

//! The framecap capture library.
//!
//! This is the DLL the controller injects into target processes. Beyond the
//! graphics hooking it hosts (not part of this crate's scope), it exposes the
//! boot surface the controller drives over remote-thread calls right after
//! the remote `LoadLibraryW`: set the log path, set capture options, read the
//! control identifier back, and stage-then-apply environment edits.
//!
//! Every exported boot function takes exactly one pointer, the signature a
//! remote thread entry point gets; see [`exports`].

mod debug;
mod env_apply;
pub mod exports;
mod state;

pub use state::{capture_options, control_ident, log_file};

use std::thread;

use winapi::{
    shared::minwindef::{BOOL, DWORD, FALSE, HINSTANCE, LPVOID, TRUE},
    um::winnt::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH, DLL_THREAD_ATTACH, DLL_THREAD_DETACH},
};

fn dll_attach() -> BOOL {
    if debug::should_wait_for_debugger() {
        debug::wait_for_debugger();
    }

    // Keep DllMain itself trivial; real initialisation happens off the
    // loader lock.
    let _ = thread::spawn(|| {
        framecap_layer_lib::logging::init_tracing();
        tracing::info!(
            "capture library loaded into process {} (control ident {})",
            std::process::id(),
            state::control_ident(),
        );
    });

    TRUE
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(
    _module: HINSTANCE,
    reason_for_call: DWORD,
    _reserved: LPVOID,
) -> BOOL {
    match reason_for_call {
        DLL_PROCESS_ATTACH => dll_attach(),
        DLL_PROCESS_DETACH => TRUE,
        DLL_THREAD_ATTACH | DLL_THREAD_DETACH => TRUE,
        // Invalid reason for call.
        _ => FALSE,
    }
}
