//! Owned process handle and remote memory primitives.
//!
//! Wraps the Win32 handle with the access rights the trainer needs and
//! implements the backend traits on top of it. Closing is idempotent
//! and also happens on drop.

use crate::modules::{self, RemoteModule};
use crate::traits::{ExitStatus, PointerWidth, RemoteMemory, TargetProcess};
use async_trait::async_trait;
use rewind_common::{Error, Result};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;
use windows::Win32::Foundation::{CloseHandle, BOOL, ERROR_ACCESS_DENIED, HANDLE, WAIT_OBJECT_0};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, WaitForSingleObject, INFINITE,
    PROCESS_QUERY_INFORMATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// An opened target process.
pub struct ProcessHandle {
    handle: HANDLE,
    pid: u32,
    width: PointerWidth,
    closed: AtomicBool,
}

impl ProcessHandle {
    /// Open `pid` with read, write, and query-information access.
    pub fn open(pid: u32) -> Result<ProcessHandle> {
        let access = PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_QUERY_INFORMATION;
        let handle = unsafe { OpenProcess(access, false, pid) }.map_err(|e| {
            if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                Error::PermissionDenied(format!("OpenProcess({}): {}", pid, e))
            } else {
                Error::Internal(format!("OpenProcess({}) failed: {}", pid, e))
            }
        })?;

        let width = match detect_pointer_width(handle) {
            Ok(width) => width,
            Err(e) => {
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Err(e);
            }
        };

        Ok(ProcessHandle {
            handle,
            pid,
            width,
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn raw(&self) -> HANDLE {
        self.handle
    }

    fn read_into(&self, address: usize, buffer: &mut [u8]) -> Result<()> {
        let mut copied = 0usize;
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                Some(&mut copied),
            )
        }
        .map_err(|e| Error::RemoteReadFailed {
            address,
            message: e.to_string(),
        })?;

        if copied != buffer.len() {
            return Err(Error::RemoteReadFailed {
                address,
                message: format!("short read: {} of {} bytes", copied, buffer.len()),
            });
        }
        Ok(())
    }
}

/// On a 64-bit OS a WOW64 target is 32-bit; everything else is 64-bit.
fn detect_pointer_width(handle: HANDLE) -> Result<PointerWidth> {
    let mut wow64 = BOOL(0);
    unsafe { IsWow64Process(handle, &mut wow64) }
        .map_err(|e| Error::Internal(format!("IsWow64Process failed: {}", e)))?;

    Ok(if wow64.as_bool() {
        PointerWidth::Bits32
    } else {
        PointerWidth::Bits64
    })
}

impl RemoteMemory for ProcessHandle {
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    fn write_bytes(&self, address: usize, data: &[u8]) -> Result<()> {
        let mut copied = 0usize;
        unsafe {
            WriteProcessMemory(
                self.handle,
                address as *const c_void,
                data.as_ptr() as *const c_void,
                data.len(),
                Some(&mut copied),
            )
        }
        .map_err(|e| Error::RemoteWriteFailed {
            address,
            message: e.to_string(),
        })?;

        if copied != data.len() {
            return Err(Error::RemoteWriteFailed {
                address,
                message: format!("short write: {} of {} bytes", copied, data.len()),
            });
        }
        Ok(())
    }

    fn read_ptr(&self, address: usize) -> Result<usize> {
        match self.width {
            PointerWidth::Bits32 => {
                let mut word = [0u8; 4];
                self.read_into(address, &mut word)?;
                Ok(u32::from_le_bytes(word) as usize)
            }
            PointerWidth::Bits64 => {
                let mut word = [0u8; 8];
                self.read_into(address, &mut word)?;
                usize::try_from(u64::from_le_bytes(word)).map_err(|_| Error::RemoteReadFailed {
                    address,
                    message: "pointer value exceeds the host address space".to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl TargetProcess for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn modules(&self) -> Result<Vec<RemoteModule>> {
        modules::process_modules(self)
    }

    async fn wait_for_exit(&self) -> ExitStatus {
        let handle = self.handle;
        let pid = self.pid;

        let waited = tokio::task::spawn_blocking(move || unsafe {
            if WaitForSingleObject(handle, INFINITE) != WAIT_OBJECT_0 {
                // The handle was closed out from under the wait; the
                // session is tearing down and the result is unused.
                return ExitStatus::Code(u32::MAX);
            }

            let mut code = 0u32;
            match GetExitCodeProcess(handle, &mut code) {
                Ok(()) if code == 0 => ExitStatus::Clean,
                Ok(()) => ExitStatus::Code(code),
                Err(e) => {
                    warn!(target: "rewind_core::handle", pid, error = %e, "failed to read exit code");
                    ExitStatus::Code(u32::MAX)
                }
            }
        })
        .await;

        waited.unwrap_or(ExitStatus::Code(u32::MAX))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            unsafe {
                let _ = CloseHandle(self.handle);
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.close();
    }
}
