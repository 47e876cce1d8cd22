//! Injection orchestrator.
//!
//! Single-threaded and synchronous by design: every remote-thread call blocks
//! on the remote thread's exit before the next one is issued, because the
//! capture library's boot entry points mutate shared process-global state and
//! rely on strict serialisation. The whole dance happens in the window before
//! the target runs user code (freshly attached, or launched suspended).

use std::path::PathBuf;

use framecap_layer_lib::{
    env::EnvironmentModification, error::windows::WindowsError, options::CaptureOptions,
    CAPTURE_LIB_FILE,
};
use framecap_wstr::{to_wide, to_wide_fixed};
use winapi::{
    shared::minwindef::{DWORD, MAX_PATH},
    um::{
        debugapi::CheckRemoteDebuggerPresent,
        libloaderapi::{GetModuleHandleW, GetProcAddress},
        processthreadsapi::{
            CreateProcessW, OpenProcess, ResumeThread, PROCESS_INFORMATION, STARTUPINFOW,
        },
        synchapi::{Sleep, WaitForSingleObject},
        winbase::{CREATE_SUSPENDED, CREATE_UNICODE_ENVIRONMENT, INFINITE},
        winnt::{
            HANDLE, PROCESS_CREATE_THREAD, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
            PROCESS_VM_READ, PROCESS_VM_WRITE, SYNCHRONIZE,
        },
        wow64apiset::IsWow64Process,
    },
};

use crate::{
    delegate::{global_hook_cmdline, HELPER_EXE},
    error::{InjectError, InjectResult},
    handle::OwnedHandle,
    modules::{find_remote_module, CaptureLibrary},
    remote_call::invoke,
    util::dirname,
};

/// Export resolved up front as the capture-library sanity check.
const SANITY_EXPORT: &str = "RENDERDOC_SetLogFile";

/// A child created suspended, holding its process and primary-thread handles.
struct ChildProcess {
    pid: u32,
    process: OwnedHandle,
    thread: OwnedHandle,
}

impl ChildProcess {
    fn resume(&self) -> InjectResult<()> {
        // ResumeThread reports failure as (DWORD)-1.
        if unsafe { ResumeThread(self.thread.get()) } == u32::MAX {
            return Err(InjectError::ResumeFailed(WindowsError::last_error()));
        }
        Ok(())
    }
}

/// Cause the capture library to load inside an already-running process and
/// drive its boot sequence. Returns the non-zero control identifier minted by
/// the library.
///
/// With `wait_for_exit` set, blocks until the target exits before returning;
/// the identifier is still the pre-exit value.
pub fn inject_into_process(
    pid: u32,
    env: &[EnvironmentModification],
    logfile: Option<&str>,
    options: Option<&CaptureOptions>,
    wait_for_exit: bool,
) -> InjectResult<u32> {
    let process = unsafe {
        OpenProcess(
            PROCESS_CREATE_THREAD
                | PROCESS_QUERY_INFORMATION
                | PROCESS_VM_OPERATION
                | PROCESS_VM_WRITE
                | PROCESS_VM_READ
                | SYNCHRONIZE,
            0,
            pid,
        )
    };
    let process = OwnedHandle::try_from(process)
        .ok_or_else(|| InjectError::TargetOpenFailed(pid, WindowsError::last_error()))?;

    if let Some(options) = options {
        if options.delay_for_debugger > 0 {
            wait_for_debugger_attach(process.get(), options.delay_for_debugger);
        }
    }

    let library = CaptureLibrary::load()?;

    let mut target_wow64 = 0;
    if unsafe { IsWow64Process(process.get(), &mut target_wow64) } == 0 {
        return Err(InjectError::BitnessQueryFailed(
            pid,
            WindowsError::last_error(),
        ));
    }

    #[cfg(target_pointer_width = "32")]
    {
        use winapi::um::processthreadsapi::GetCurrentProcess;

        let mut self_wow64 = 0;
        if unsafe { IsWow64Process(GetCurrentProcess(), &mut self_wow64) } == 0 {
            return Err(InjectError::BitnessQueryFailed(
                std::process::id(),
                WindowsError::last_error(),
            ));
        }

        // A WoW64 controller facing a native 64-bit target has no road in.
        if self_wow64 != 0 && target_wow64 == 0 {
            return Err(InjectError::UnsupportedBitnessPair(pid));
        }
    }

    #[cfg(target_pointer_width = "64")]
    {
        if target_wow64 != 0 {
            return delegate_to_x86(pid, &process, env, logfile, options, wait_for_exit, &library);
        }
    }

    tracing::info!("injecting capture library into process {pid}");

    inject_library(process.get(), &library)?;

    let remote_base = find_remote_module(pid, CAPTURE_LIB_FILE).map_err(|e| {
        tracing::error!("cannot locate {CAPTURE_LIB_FILE} in remote process {pid}: {e}");
        e
    })?;

    if let Some(logfile) = logfile {
        let mut data = nul_terminated(logfile);
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_SetLogFile",
            &mut data,
            false,
        )?;
    }

    if let Some(options) = options {
        let mut data = options.as_bytes().to_vec();
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_SetCaptureOptions",
            &mut data,
            false,
        )?;
    }

    let mut ident_buf = [0u8; 4];
    boot_call(
        process.get(),
        &library,
        remote_base,
        "RENDERDOC_GetTargetControlIdent",
        &mut ident_buf,
        true,
    )?;
    let control_ident = u32::from_ne_bytes(ident_buf);

    let mut sent_any_env = false;
    for modification in env {
        let name = modification.name.trim();
        if name.is_empty() {
            continue;
        }

        let mut name_bytes = nul_terminated(name);
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_EnvModName",
            &mut name_bytes,
            false,
        )?;

        let mut value_bytes = nul_terminated(&modification.value);
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_EnvModValue",
            &mut value_bytes,
            false,
        )?;

        let mut op_bytes = (modification.op as u32).to_ne_bytes().to_vec();
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_EnvMod",
            &mut op_bytes,
            false,
        )?;

        sent_any_env = true;
    }

    if sent_any_env {
        // The argument is unused; the call is the trigger.
        let mut dummy = vec![0u8; 4];
        boot_call(
            process.get(),
            &library,
            remote_base,
            "RENDERDOC_ApplyEnvMods",
            &mut dummy,
            false,
        )?;
    }

    if wait_for_exit {
        unsafe { WaitForSingleObject(process.get(), INFINITE) };
    }

    Ok(control_ident)
}

/// Spawn a child suspended and resume it untouched. Returns its pid.
pub fn launch_process(app: &str, workdir: &str, cmdline: &str) -> InjectResult<u32> {
    let child = run_process(app, workdir, cmdline)?;

    tracing::info!("launched process `{app}` with `{cmdline}`");

    child.resume()?;
    Ok(child.pid)
}

/// Spawn a child suspended, inject while not a single instruction of it has
/// run, then resume. With `wait_for_exit` set, additionally waits for the
/// child to finish.
pub fn launch_and_inject(
    app: &str,
    workdir: &str,
    cmdline: &str,
    env: &[EnvironmentModification],
    logfile: Option<&str>,
    options: Option<&CaptureOptions>,
    wait_for_exit: bool,
) -> InjectResult<u32> {
    // Resolve a known export up front: a corrupted or stale capture library
    // should fail the operation before any child exists.
    CaptureLibrary::load()?.export(SANITY_EXPORT)?;

    let child = run_process(app, workdir, cmdline)?;

    // On failure the child is abandoned as-is: primary thread suspended,
    // handles closed on drop.
    let control_ident = inject_into_process(child.pid, env, logfile, options, false)?;

    child.resume()?;

    if wait_for_exit {
        unsafe { WaitForSingleObject(child.thread.get(), INFINITE) };
    }

    Ok(control_ident)
}

/// Start the global-hook service: the helper executable is spawned with the
/// hook arguments, and on a 64-bit controller the `x86/` sibling is spawned
/// as well so both bitnesses are covered.
pub fn start_global_hook(
    pathmatch: &str,
    logfile: &str,
    options: &CaptureOptions,
) -> InjectResult<()> {
    if pathmatch.is_empty() {
        return Ok(());
    }

    let library = CaptureLibrary::load()?;
    let options_hex = options.to_hex();

    let helper = library.dir().join(HELPER_EXE);
    spawn_helper(&helper, pathmatch, logfile, &options_hex)?;

    #[cfg(target_pointer_width = "64")]
    {
        let helper = library.dir().join("x86").join(HELPER_EXE);
        spawn_helper(&helper, pathmatch, logfile, &options_hex)?;
    }

    Ok(())
}

fn spawn_helper(
    helper: &std::path::Path,
    pathmatch: &str,
    logfile: &str,
    options_hex: &str,
) -> InjectResult<()> {
    let cmdline =
        global_hook_cmdline(&helper.to_string_lossy(), pathmatch, logfile, options_hex);

    spawn_cmdline(&cmdline, 0)
        .map_err(|e| InjectError::DelegateSpawnFailed(PathBuf::from(helper), e))?;

    Ok(())
}

/// Hand the whole injection request to the sibling 32-bit helper, which
/// repeats it from a 32-bit world. Its exit code is the control identifier.
#[cfg(target_pointer_width = "64")]
fn delegate_to_x86(
    pid: u32,
    target: &OwnedHandle,
    env: &[EnvironmentModification],
    logfile: Option<&str>,
    options: Option<&CaptureOptions>,
    wait_for_exit: bool,
    library: &CaptureLibrary,
) -> InjectResult<u32> {
    use winapi::um::processthreadsapi::GetExitCodeProcess;

    use crate::delegate::delegate_cmdline;

    let helper = library.dir().join("x86").join(HELPER_EXE);
    let options_hex = options.copied().unwrap_or_default().to_hex();

    let cmdline = delegate_cmdline(
        &helper.to_string_lossy(),
        pid,
        logfile.unwrap_or(""),
        &options_hex,
        env,
    );

    tracing::info!(
        "delegating injection into WoW64 process {pid} to `{}`",
        helper.display()
    );

    let child = spawn_cmdline(&cmdline, CREATE_SUSPENDED)
        .map_err(|e| InjectError::DelegateSpawnFailed(helper, e))?;

    child.resume()?;
    unsafe { WaitForSingleObject(child.thread.get(), INFINITE) };

    let mut exit_code = 0;
    unsafe { GetExitCodeProcess(child.process.get(), &mut exit_code) };

    if wait_for_exit {
        unsafe { WaitForSingleObject(target.get(), INFINITE) };
    }

    if exit_code == 0 {
        return Err(InjectError::DelegateFailed(pid));
    }
    Ok(exit_code)
}

/// Write the capture library's path into the target and `LoadLibraryW` it
/// there.
///
/// The remote call lands on this process's own `LoadLibraryW` address:
/// kernel32 is mapped at one fixed base per architecture, so controller and
/// target agree on it.
fn inject_library(process: HANDLE, library: &CaptureLibrary) -> InjectResult<()> {
    let kernel32 = unsafe { GetModuleHandleW(to_wide("kernel32.dll").as_ptr()) };
    if kernel32.is_null() {
        return Err(InjectError::ExportMissing("LoadLibraryW"));
    }

    let load_library = unsafe { GetProcAddress(kernel32, "LoadLibraryW\0".as_ptr() as _) };
    if load_library.is_null() {
        return Err(InjectError::ExportMissing("LoadLibraryW"));
    }

    let path_buf = to_wide_fixed::<{ MAX_PATH + 1 }>(&library.path().to_string_lossy());
    let mut path_bytes: Vec<u8> = path_buf.iter().flat_map(|u| u.to_le_bytes()).collect();

    invoke(process, load_library as usize, &mut path_bytes, false)
}

/// Call one exported boot function of the capture library inside the target.
///
/// The local export address plus the base delta between the two mappings
/// yields the remote address. This presumes no relocation delta between the
/// loads; the capture library is built with consistent base semantics.
fn boot_call(
    process: HANDLE,
    library: &CaptureLibrary,
    remote_base: usize,
    name: &'static str,
    data: &mut [u8],
    in_out: bool,
) -> InjectResult<()> {
    tracing::debug!("injecting call to {name}");

    let local = library.export(name)?;
    let remote = local.wrapping_add(remote_base).wrapping_sub(library.base());

    invoke(process, remote, data, in_out)
}

/// Poll for a debugger on the target before injecting, a developer ergonomic
/// driven by the capture options.
fn wait_for_debugger_attach(process: HANDLE, delay_seconds: u32) {
    tracing::debug!("waiting up to {delay_seconds}s for a debugger to attach to the target");

    let mut waited_ms = 0u32;
    loop {
        let mut attached = 0;
        unsafe { CheckRemoteDebuggerPresent(process, &mut attached) };
        if attached != 0 {
            tracing::debug!(
                "debugger attach detected after {:.2}s",
                waited_ms as f32 / 1000.0
            );
            return;
        }

        unsafe { Sleep(10) };
        waited_ms += 10;

        if waited_ms > delay_seconds * 1000 {
            tracing::debug!("no debugger after {delay_seconds}s, proceeding anyway");
            return;
        }
    }
}

/// Launch discipline shared by the public launch operations: quoted
/// application path plus the caller's command line verbatim, the caller's
/// working directory or the application's own, and always suspended with a
/// Unicode environment so there is a window to inject before the first
/// instruction runs.
fn run_process(app: &str, workdir: &str, cmdline: &str) -> InjectResult<ChildProcess> {
    let mut params = format!("\"{app}\"");
    if !cmdline.is_empty() {
        params.push(' ');
        params.push_str(cmdline);
    }

    let workdir = if workdir.is_empty() {
        dirname(app)
    } else {
        workdir
    };
    let workdir_wide = to_wide(workdir);

    let mut startup_info: STARTUPINFOW = unsafe { std::mem::zeroed() };
    startup_info.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
    let mut process_info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

    // The parameter buffer must be writable; CreateProcessW may edit it.
    let mut params_wide = to_wide(&params);

    let ok = unsafe {
        CreateProcessW(
            std::ptr::null(),
            params_wide.as_mut_ptr(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
            CREATE_SUSPENDED | CREATE_UNICODE_ENVIRONMENT,
            std::ptr::null_mut(),
            if workdir.is_empty() {
                std::ptr::null()
            } else {
                workdir_wide.as_ptr()
            },
            &mut startup_info,
            &mut process_info,
        )
    };
    if ok == 0 {
        return Err(InjectError::LaunchFailed(
            app.to_string(),
            WindowsError::last_error(),
        ));
    }

    child_from_process_information(process_info)
        .map_err(|e| InjectError::LaunchFailed(app.to_string(), e))
}

/// Spawn a fully-formed command line (helper invocations build their own
/// quoting).
fn spawn_cmdline(cmdline: &str, creation_flags: DWORD) -> Result<ChildProcess, WindowsError> {
    let mut startup_info: STARTUPINFOW = unsafe { std::mem::zeroed() };
    startup_info.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
    let mut process_info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

    let mut cmdline_wide = to_wide(cmdline);

    let ok = unsafe {
        CreateProcessW(
            std::ptr::null(),
            cmdline_wide.as_mut_ptr(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
            creation_flags,
            std::ptr::null_mut(),
            std::ptr::null(),
            &mut startup_info,
            &mut process_info,
        )
    };
    if ok == 0 {
        return Err(WindowsError::last_error());
    }

    child_from_process_information(process_info)
}

/// Wrap the handles a successful `CreateProcessW` returned.
fn child_from_process_information(
    process_info: PROCESS_INFORMATION,
) -> Result<ChildProcess, WindowsError> {
    match (
        OwnedHandle::try_from(process_info.hProcess),
        OwnedHandle::try_from(process_info.hThread),
    ) {
        (Some(process), Some(thread)) => Ok(ChildProcess {
            pid: process_info.dwProcessId,
            process,
            thread,
        }),
        _ => Err(WindowsError::last_error()),
    }
}

fn nul_terminated(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
