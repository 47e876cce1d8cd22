//! Controller error kinds. Each maps to one logged failure category and, at
//! the helper-executable boundary, to the zero control identifier.

use std::path::PathBuf;

use framecap_layer_lib::error::windows::WindowsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("could not open target process {0}: {1}")]
    TargetOpenFailed(u32, WindowsError),

    #[error("could not determine bitness of process {0}: {1}")]
    BitnessQueryFailed(u32, WindowsError),

    #[error("cannot capture a 64-bit target from a 32-bit controller (pid {0})")]
    UnsupportedBitnessPair(u32),

    #[error("could not spawn 32-bit helper `{}` - missing files?", .0.display())]
    DelegateSpawnFailed(PathBuf, #[source] WindowsError),

    #[error("32-bit helper reported failure injecting into process {0}")]
    DelegateFailed(u32),

    #[error("remote allocation of {0} bytes failed: {1}")]
    RemoteAllocFailed(usize, WindowsError),

    #[error("writing {0} bytes into the target failed: {1}")]
    RemoteWriteFailed(usize, WindowsError),

    #[error("reading {0} bytes back from the target failed: {1}")]
    RemoteReadFailed(usize, WindowsError),

    #[error("could not create a remote thread at {0:#x}: {1}")]
    RemoteThreadFailed(usize, WindowsError),

    #[error("remote call issued with an empty argument buffer")]
    EmptyCallPayload,

    #[error("could not snapshot modules of process {0}: {1}")]
    ModuleSnapshotFailed(u32, WindowsError),

    #[error("target process {0} died during injection - crashed during early startup?")]
    TargetDied(u32),

    #[error("module `{name}` not found among {searched} modules of process {pid}")]
    ModuleNotFound {
        pid: u32,
        name: String,
        searched: usize,
    },

    #[error("could not load capture library `{}`: {}", .0.display(), .1)]
    CaptureLibraryLoadFailed(PathBuf, #[source] WindowsError),

    #[error("capture library is missing required export `{0}` - corrupted or stale file?")]
    ExportMissing(&'static str),

    #[error("could not launch `{0}`: {1}")]
    LaunchFailed(String, #[source] WindowsError),

    #[error("could not resume the target's primary thread: {0}")]
    ResumeFailed(WindowsError),
}

pub type InjectResult<T> = Result<T, InjectError>;
