//! Error plumbing shared by the controller and the capture library.

#[cfg(windows)]
pub mod windows;
