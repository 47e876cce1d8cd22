//! Controller-side injection core of the framecap capture tool.
//!
//! Loads the capture library into a target process (either one this crate
//! launches suspended, or one already running) and drives the library's boot
//! sequence (log path, capture options, control identifier, environment
//! edits) over one-pointer remote-thread calls, before the target executes
//! any real work.
//!
//! When a 64-bit controller faces a 32-bit (WoW64) target, the work is
//! delegated to a sibling 32-bit helper executable; see [`delegate`] for the
//! command-line marshalling of that hand-off.
//!
//! The Win32-facing modules only exist on Windows; [`delegate`] and [`util`]
//! are pure and build everywhere.

pub mod delegate;
pub mod util;

#[cfg(windows)]
pub mod error;
#[cfg(windows)]
mod handle;
#[cfg(windows)]
pub mod memory;
#[cfg(windows)]
pub mod modules;
#[cfg(windows)]
pub mod process;
#[cfg(windows)]
pub mod remote_call;

#[cfg(windows)]
pub use error::{InjectError, InjectResult};
#[cfg(windows)]
pub use handle::OwnedHandle;
#[cfg(windows)]
pub use process::{inject_into_process, launch_and_inject, launch_process, start_global_hook};
