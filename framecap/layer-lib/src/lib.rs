//! Logic shared between the framecap controller and the capture library:
//! the environment-modification model, capture options and their
//! command-line marshalling, error formatting and tracing setup.
//!
//! Win32 FFI is confined to `cfg(windows)` submodules so the crate builds and
//! its pure logic tests run on any host.

pub mod env;
pub mod error;
pub mod logging;
pub mod options;

/// File name of the capture library, as produced by the `framecap-layer-win`
/// crate. The controller locates it next to its own executable and the module
/// locator searches for this name inside the target.
pub const CAPTURE_LIB_FILE: &str = "framecap_layer_win.dll";
