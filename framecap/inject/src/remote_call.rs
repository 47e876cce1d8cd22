//! Remote-thread call primitive.
//!
//! A call into another process is a thread created there whose start routine
//! is the callee and whose single argument is a buffer this side wrote into
//! the target beforehand. Thread entry points take exactly one pointer, so
//! every typed payload is serialised into a flat byte buffer and composite
//! calls become short sequences of one-argument calls against staging entry
//! points in the capture library.

use framecap_layer_lib::error::windows::WindowsError;
use winapi::um::{
    processthreadsapi::CreateRemoteThread,
    synchapi::WaitForSingleObject,
    winbase::INFINITE,
    winnt::HANDLE,
};

use crate::{
    error::{InjectError, InjectResult},
    handle::OwnedHandle,
    memory::RemoteAlloc,
};

/// Call `fn_addr` inside the target with `arg` as its single argument.
///
/// Blocks until the remote thread terminates. With `in_out` set, the
/// (possibly mutated) buffer is read back into `arg` afterwards. The remote
/// buffer outlives the remote thread and is freed, and the thread handle
/// closed, on every exit path.
pub fn invoke(
    process: HANDLE,
    fn_addr: usize,
    arg: &mut [u8],
    in_out: bool,
) -> InjectResult<()> {
    if arg.is_empty() {
        return Err(InjectError::EmptyCallPayload);
    }

    let remote = RemoteAlloc::alloc(process, arg.len())?;
    remote.write(arg)?;

    let thread = unsafe {
        CreateRemoteThread(
            process,
            std::ptr::null_mut(),
            0,
            Some(std::mem::transmute(fn_addr)),
            remote.addr(),
            0,
            std::ptr::null_mut(),
        )
    };
    let thread = OwnedHandle::try_from(thread).ok_or_else(|| {
        InjectError::RemoteThreadFailed(fn_addr, WindowsError::last_error())
    })?;

    unsafe { WaitForSingleObject(thread.get(), INFINITE) };

    if in_out {
        remote.read(arg)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use winapi::{
        shared::minwindef::{DWORD, LPVOID},
        um::processthreadsapi::GetCurrentProcess,
    };

    use super::*;

    // The current process is a perfectly good remote target for the
    // primitive itself.
    unsafe extern "system" fn double_in_place(arg: LPVOID) -> DWORD {
        let value = arg as *mut u32;
        unsafe { *value = (*value).wrapping_mul(2) };
        0
    }

    #[test]
    fn invoke_writes_argument_and_reads_back_mutation() {
        let mut buf = 21u32.to_ne_bytes();

        invoke(
            unsafe { GetCurrentProcess() },
            double_in_place as usize,
            &mut buf,
            true,
        )
        .unwrap();

        assert_eq!(u32::from_ne_bytes(buf), 42);
    }

    #[test]
    fn invoke_without_read_back_leaves_argument_untouched() {
        let mut buf = 7u32.to_ne_bytes();

        invoke(
            unsafe { GetCurrentProcess() },
            double_in_place as usize,
            &mut buf,
            false,
        )
        .unwrap();

        assert_eq!(u32::from_ne_bytes(buf), 7);
    }

    #[test]
    fn invoke_rejects_empty_payload() {
        let mut empty = [0u8; 0];
        let result = invoke(
            unsafe { GetCurrentProcess() },
            double_in_place as usize,
            &mut empty,
            false,
        );

        assert!(matches!(result, Err(InjectError::EmptyCallPayload)));
    }
}
