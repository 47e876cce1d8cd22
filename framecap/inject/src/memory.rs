//! Remote-memory primitive: allocate in a foreign process, move bytes in and
//! out, release.
//!
//! Allocations are executable as well as writable because the same allocator
//! serves both argument buffers and the string consumed by the remote
//! `LoadLibraryW` call; sizes are byte-exact with no alignment assumptions
//! beyond the pointer argument of the host ABI.

use framecap_layer_lib::error::windows::WindowsError;
use winapi::{
    shared::minwindef::LPVOID,
    um::{
        memoryapi::{ReadProcessMemory, VirtualAllocEx, VirtualFreeEx, WriteProcessMemory},
        winnt::{HANDLE, MEM_COMMIT, MEM_RELEASE, PAGE_EXECUTE_READWRITE},
    },
};

use crate::error::{InjectError, InjectResult};

/// A committed region in the target's address space, released on drop so
/// every early-exit path of the caller still frees it.
#[derive(Debug)]
pub struct RemoteAlloc {
    process: HANDLE,
    addr: LPVOID,
    size: usize,
}

impl RemoteAlloc {
    /// Commit `size` bytes in the target. The caller's process handle must
    /// stay open for the lifetime of the allocation.
    pub fn alloc(process: HANDLE, size: usize) -> InjectResult<Self> {
        let addr = unsafe {
            VirtualAllocEx(
                process,
                std::ptr::null_mut(),
                size,
                MEM_COMMIT,
                PAGE_EXECUTE_READWRITE,
            )
        };
        if addr.is_null() {
            return Err(InjectError::RemoteAllocFailed(
                size,
                WindowsError::last_error(),
            ));
        }

        Ok(Self {
            process,
            addr,
            size,
        })
    }

    /// Address of the region inside the target.
    pub fn addr(&self) -> LPVOID {
        self.addr
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy `data` into the region. `data` must not exceed the allocation.
    pub fn write(&self, data: &[u8]) -> InjectResult<()> {
        debug_assert!(data.len() <= self.size);

        let ok = unsafe {
            WriteProcessMemory(
                self.process,
                self.addr,
                data.as_ptr() as _,
                data.len(),
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(InjectError::RemoteWriteFailed(
                data.len(),
                WindowsError::last_error(),
            ));
        }

        Ok(())
    }

    /// Copy the (possibly mutated) region contents back out.
    pub fn read(&self, out: &mut [u8]) -> InjectResult<()> {
        debug_assert!(out.len() <= self.size);

        let ok = unsafe {
            ReadProcessMemory(
                self.process,
                self.addr,
                out.as_mut_ptr() as _,
                out.len(),
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(InjectError::RemoteReadFailed(
                out.len(),
                WindowsError::last_error(),
            ));
        }

        Ok(())
    }
}

impl Drop for RemoteAlloc {
    fn drop(&mut self) {
        unsafe { VirtualFreeEx(self.process, self.addr, 0, MEM_RELEASE) };
    }
}
