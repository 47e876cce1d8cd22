//! Deferred environment modification.
//!
//! The controller cannot rewrite this process's startup environment (it may
//! not have launched it at all), so edits arrive one field at a time through
//! the boot entry points: name, value, then op. The op call completes the
//! staged record and queues it. A final apply call merges the whole queue
//! into the live environment block and clears it.
//!
//! The queue and staging record are process-global. The remote-call protocol
//! serialises access by construction, the mutex covers everyone else. A
//! poisoned lock degrades to dropping the edit rather than panicking inside
//! the application being captured.

use std::sync::{Mutex, MutexGuard};

use framecap_layer_lib::env::{
    environment_map, merge_modifications, EnvOp, EnvironmentModification,
};
use framecap_wstr::{env_block_pairs, multi_string_len, to_wide};
use winapi::um::processenv::{
    FreeEnvironmentStringsW, GetEnvironmentStringsW, SetEnvironmentVariableW,
};

struct EnvModState {
    staged_name: String,
    staged_value: String,
    pending: Vec<EnvironmentModification>,
}

static ENV_STATE: Mutex<EnvModState> = Mutex::new(EnvModState {
    staged_name: String::new(),
    staged_value: String::new(),
    pending: Vec::new(),
});

fn state() -> Option<MutexGuard<'static, EnvModState>> {
    ENV_STATE.lock().ok()
}

pub fn stage_name(name: String) {
    if let Some(mut state) = state() {
        state.staged_name = name;
    }
}

pub fn stage_value(value: String) {
    if let Some(mut state) = state() {
        state.staged_value = value;
    }
}

/// Complete the staged record with its op and queue it.
pub fn commit(op: EnvOp) {
    let Some(mut state) = state() else { return };

    let modification = EnvironmentModification::new(
        state.staged_name.clone(),
        state.staged_value.clone(),
        op,
    );
    state.pending.push(modification);
}

/// Merge every queued edit into the live environment and clear the queue.
///
/// Runs once per batch at a well-defined boot point; a second call with
/// nothing queued is a no-op.
pub fn apply() {
    let pending = match state() {
        Some(mut state) => std::mem::take(&mut state.pending),
        None => return,
    };
    if pending.is_empty() {
        return;
    }

    tracing::debug!("applying {} environment modification(s)", pending.len());

    let mut map = environment_map(read_live_environment());

    for (name, value) in merge_modifications(&mut map, &pending) {
        let ok = unsafe {
            SetEnvironmentVariableW(to_wide(&name).as_ptr(), to_wide(&value).as_ptr())
        };
        if ok == 0 {
            tracing::error!("failed setting environment variable `{name}`");
        }
    }
}

/// Snapshot the live environment block into `(name, value)` pairs.
fn read_live_environment() -> Vec<(String, String)> {
    unsafe {
        let block = GetEnvironmentStringsW();
        if block.is_null() {
            return Vec::new();
        }

        // 32K wide characters bounds the block: the OS caps individual
        // variables well below that and we only need the double NUL.
        let pairs = match multi_string_len(block, 0x8000) {
            Some(len) => env_block_pairs(std::slice::from_raw_parts(block, len)),
            None => Vec::new(),
        };

        FreeEnvironmentStringsW(block);
        pairs
    }
}
