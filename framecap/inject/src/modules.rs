//! Module location: finding the capture library inside the target after the
//! remote `LoadLibraryW`, and owning the controller's local copy of it.

use std::path::{Path, PathBuf};

use framecap_layer_lib::{error::windows::WindowsError, CAPTURE_LIB_FILE};
use framecap_wstr::{from_wide, to_wide};
use winapi::{
    shared::{
        minwindef::{HMODULE, MAX_PATH},
        winerror::ERROR_BAD_LENGTH,
    },
    um::{
        errhandlingapi::GetLastError,
        handleapi::INVALID_HANDLE_VALUE,
        libloaderapi::{GetModuleFileNameW, GetModuleHandleW, GetProcAddress, LoadLibraryW},
        minwinbase::STILL_ACTIVE,
        processthreadsapi::{GetExitCodeProcess, OpenProcess},
        tlhelp32::{
            CreateToolhelp32Snapshot, Module32FirstW, Module32NextW, MODULEENTRY32W,
            TH32CS_SNAPMODULE,
        },
        winnt::PROCESS_QUERY_INFORMATION,
    },
};

use crate::{
    error::{InjectError, InjectResult},
    handle::OwnedHandle,
    util::module_name_matches,
};

/// Total snapshot attempts. The snapshot API transiently fails with
/// `ERROR_BAD_LENGTH` while the target's module list is mid-update; the
/// retry exists solely for that code and runs without backoff.
const SNAPSHOT_ATTEMPTS: u32 = 10;

/// Find the load address of a module of `pid` whose short name contains
/// `name` (case-insensitively).
///
/// On a miss the target's liveness is probed so the caller can tell an
/// injection failure from a target that crashed during early startup.
pub fn find_remote_module(pid: u32, name: &str) -> InjectResult<usize> {
    let mut snapshot = INVALID_HANDLE_VALUE;

    for _ in 0..SNAPSHOT_ATTEMPTS {
        snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPMODULE, pid) };

        if snapshot == INVALID_HANDLE_VALUE {
            let err = unsafe { GetLastError() };
            tracing::warn!("module snapshot of process {pid} failed: {:#010x}", err);

            if err == ERROR_BAD_LENGTH {
                continue;
            }
        }

        break;
    }

    let snapshot = OwnedHandle::try_from(snapshot).ok_or_else(|| {
        InjectError::ModuleSnapshotFailed(pid, WindowsError::last_error())
    })?;

    let mut entry: MODULEENTRY32W = unsafe { std::mem::zeroed() };
    entry.dwSize = std::mem::size_of::<MODULEENTRY32W>() as u32;

    if unsafe { Module32FirstW(snapshot.get(), &mut entry) } == 0 {
        return Err(InjectError::ModuleSnapshotFailed(
            pid,
            WindowsError::last_error(),
        ));
    }

    let mut searched = 0;
    loop {
        searched += 1;

        if module_name_matches(&from_wide(&entry.szModule[..]), name) {
            return Ok(entry.modBaseAddr as usize);
        }

        if unsafe { Module32NextW(snapshot.get(), &mut entry) } == 0 {
            break;
        }
    }

    if target_is_gone(pid) {
        Err(InjectError::TargetDied(pid))
    } else {
        Err(InjectError::ModuleNotFound {
            pid,
            name: name.to_string(),
            searched,
        })
    }
}

/// Whether `pid` can no longer be opened or has an exit code.
fn target_is_gone(pid: u32) -> bool {
    let process = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION, 0, pid) };
    let Some(process) = OwnedHandle::try_from(process) else {
        return true;
    };

    let mut exit_code = 0u32;
    if unsafe { GetExitCodeProcess(process.get(), &mut exit_code) } == 0 {
        return false;
    }

    exit_code != STILL_ACTIVE
}

fn controller_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}

/// The controller's own copy of the capture library.
///
/// Owning a local copy serves three purposes: it yields the absolute path
/// written into the target for `LoadLibraryW`, its exports provide the local
/// addresses for the delta computation of remote calls, and resolving a
/// known export up front catches a corrupted or stale library file before
/// any process is touched.
#[derive(Debug)]
pub struct CaptureLibrary {
    module: HMODULE,
    path: PathBuf,
}

impl CaptureLibrary {
    /// Load (or re-use) the capture library sitting next to the controller's
    /// executable.
    pub fn load() -> InjectResult<Self> {
        let module = unsafe { GetModuleHandleW(to_wide(CAPTURE_LIB_FILE).as_ptr()) };
        let module = if !module.is_null() {
            module
        } else {
            let path = controller_dir().join(CAPTURE_LIB_FILE);
            let module = unsafe { LoadLibraryW(to_wide(path.to_string_lossy()).as_ptr()) };
            if module.is_null() {
                return Err(InjectError::CaptureLibraryLoadFailed(
                    path,
                    WindowsError::last_error(),
                ));
            }
            module
        };

        let mut buf = [0u16; MAX_PATH];
        unsafe { GetModuleFileNameW(module, buf.as_mut_ptr(), buf.len() as u32) };

        Ok(Self {
            module,
            path: PathBuf::from(from_wide(&buf[..])),
        })
    }

    /// Load address in the controller's own address space.
    pub fn base(&self) -> usize {
        self.module as usize
    }

    /// Absolute path of the library file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the library (and so the controller's tooling) lives in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Local address of an exported boot function.
    pub fn export(&self, name: &'static str) -> InjectResult<usize> {
        let name_nul = format!("{name}\0");
        let addr = unsafe { GetProcAddress(self.module, name_nul.as_ptr() as _) };
        if addr.is_null() {
            return Err(InjectError::ExportMissing(name));
        }
        Ok(addr as usize)
    }
}
