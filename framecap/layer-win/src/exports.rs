//! Exported boot entry points.
//!
//! ABI contract: each takes exactly one pointer and returns nothing, because
//! each is invoked as the start routine of a thread the controller creates in
//! this process, with the argument buffer living in this process's memory.
//! Composite payloads therefore arrive as short call sequences against
//! staging entry points (name, then value, then op), not as structs.
//!
//! The controller resolves these by name in its own copy of the library and
//! calls them here through the mapping-base delta, so the symbol names are
//! load-bearing.

use std::ffi::c_void;

use framecap_layer_lib::{env::EnvOp, logging, options::CaptureOptions};
use framecap_wstr::from_cstr_ptr;

use crate::{env_apply, state};

/// Longest string payload accepted from the controller. Paths and
/// environment values are far below this.
const MAX_PAYLOAD: usize = 32 * 1024;

/// Write the control identifier into the 4-byte buffer `ident` points at.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_GetTargetControlIdent(ident: *mut u32) {
    if !ident.is_null() {
        unsafe { *ident = state::control_ident() };
    }
}

/// Copy the capture-options blob into library state.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_SetCaptureOptions(options: *const CaptureOptions) {
    if !options.is_null() {
        state::set_capture_options(unsafe { *options });
    }
}

/// Set the log file from a NUL-terminated UTF-8 path.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_SetLogFile(log: *const i8) {
    if log.is_null() {
        return;
    }

    let path = unsafe { from_cstr_ptr(log, MAX_PAYLOAD) };
    logging::init_file_tracing(&path);
    state::set_log_file(path);
}

/// Stage the name of the next environment modification.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_EnvModName(name: *const i8) {
    if !name.is_null() {
        env_apply::stage_name(unsafe { from_cstr_ptr(name, MAX_PAYLOAD) });
    }
}

/// Stage the value of the next environment modification.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_EnvModValue(value: *const i8) {
    if !value.is_null() {
        env_apply::stage_value(unsafe { from_cstr_ptr(value, MAX_PAYLOAD) });
    }
}

/// Complete the staged record with its operation and queue it.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_EnvMod(op: *const u32) {
    if op.is_null() {
        return;
    }

    match EnvOp::from_u32(unsafe { *op }) {
        Some(op) => env_apply::commit(op),
        None => tracing::error!("unexpected environment modification op {}", unsafe { *op }),
    }
}

/// Merge all queued environment modifications into the live environment.
/// The argument is unused; the call itself is the trigger.
#[no_mangle]
pub unsafe extern "system" fn RENDERDOC_ApplyEnvMods(_ignored: *mut c_void) {
    env_apply::apply();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Drives the boot surface the way the controller does, just in-process:
    // name, value, op, then apply, against this process's live environment.
    // One test, because the staging record and queue are process-global.
    #[test]
    fn env_mod_sequence_applies_to_live_environment() {
        let name = b"FRAMECAP_EXPORT_TEST\0";
        let first = b"base\0";
        let second = b"suffix\0";

        unsafe {
            RENDERDOC_EnvModName(name.as_ptr() as *const i8);
            RENDERDOC_EnvModValue(first.as_ptr() as *const i8);
            RENDERDOC_EnvMod(&(EnvOp::Replace as u32));

            RENDERDOC_EnvModName(name.as_ptr() as *const i8);
            RENDERDOC_EnvModValue(second.as_ptr() as *const i8);
            RENDERDOC_EnvMod(&(EnvOp::AppendSemicolon as u32));

            RENDERDOC_ApplyEnvMods(std::ptr::null_mut());
        }

        assert_eq!(
            std::env::var("FRAMECAP_EXPORT_TEST").unwrap(),
            "base;suffix"
        );

        // The queue drained; a second apply changes nothing.
        unsafe { RENDERDOC_ApplyEnvMods(std::ptr::null_mut()) };
        assert_eq!(
            std::env::var("FRAMECAP_EXPORT_TEST").unwrap(),
            "base;suffix"
        );

        // An op the wire does not know is dropped without committing the
        // staged record.
        unsafe {
            RENDERDOC_EnvModName(b"FRAMECAP_BAD_OP\0".as_ptr() as *const i8);
            RENDERDOC_EnvModValue(b"x\0".as_ptr() as *const i8);
            RENDERDOC_EnvMod(&99u32);
            RENDERDOC_ApplyEnvMods(std::ptr::null_mut());
        }
        assert!(std::env::var("FRAMECAP_BAD_OP").is_err());
    }

    #[test]
    fn control_ident_is_written_and_non_zero() {
        let mut ident = 0u32;
        unsafe { RENDERDOC_GetTargetControlIdent(&mut ident) };
        assert_ne!(ident, 0);

        // Null is tolerated.
        unsafe { RENDERDOC_GetTargetControlIdent(std::ptr::null_mut()) };
    }
}
