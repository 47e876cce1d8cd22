//! Formatting of raw Win32 error codes.

use std::fmt::{Debug, Display};

use framecap_wstr::from_wide;
use thiserror::Error;
use winapi::{
    shared::ntdef::{MAKELANGID, SUBLANG_ENGLISH_US},
    um::{
        errhandlingapi::GetLastError,
        winbase::{FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM},
        winnt::LANG_ENGLISH,
    },
};

/// A `GetLastError` code, rendered through `FormatMessageW` when displayed.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub struct WindowsError(pub u32);

impl WindowsError {
    /// Capture the calling thread's last error code.
    pub fn last_error() -> Self {
        Self(unsafe { GetLastError() })
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// en-US rendition of the error code, if the system knows it.
    fn formatted(&self) -> Option<String> {
        let mut buf = [0u16; 256];

        let english_us = MAKELANGID(LANG_ENGLISH, SUBLANG_ENGLISH_US);

        let written = unsafe {
            FormatMessageW(
                FORMAT_MESSAGE_FROM_SYSTEM,
                std::ptr::null(),
                self.0,
                english_us as _,
                buf.as_mut_ptr(),
                buf.len() as u32,
                std::ptr::null_mut(),
            )
        };
        if written == 0 {
            return None;
        }

        // Strip the trailing carriage return and newline.
        Some(from_wide(buf).trim_end().to_string())
    }
}

impl Display for WindowsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.formatted() {
            Some(message) => write!(f, "{message} ({:#010x})", self.0),
            None => write!(f, "Windows error {:#010x}", self.0),
        }
    }
}

impl Debug for WindowsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
