use winapi::um::{
    handleapi::{CloseHandle, INVALID_HANDLE_VALUE},
    winnt::HANDLE,
};

/// An open kernel handle (process, thread, snapshot) owned by the
/// orchestrator.
///
/// Construction filters out the null and `INVALID_HANDLE_VALUE` sentinels
/// the open/create/snapshot APIs report failure with, so a value of this
/// type always refers to something the OS gave us, and is closed exactly
/// once when it goes out of scope. That gives every orchestration step the
/// one-close discipline for free, early returns included.
#[derive(Debug)]
pub struct OwnedHandle(HANDLE);

impl OwnedHandle {
    /// Take ownership of `handle`, or `None` if it is one of the failure
    /// sentinels. The caller picks the error to surface, typically from
    /// the last-error code.
    pub fn try_from(handle: HANDLE) -> Option<Self> {
        if handle.is_null() || handle == INVALID_HANDLE_VALUE {
            return None;
        }
        Some(Self(handle))
    }

    /// Raw handle for Win32 calls. Stays owned; do not close it.
    pub fn get(&self) -> HANDLE {
        self.0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}
