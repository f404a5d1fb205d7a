//! Remote module enumeration.
//!
//! Enumeration is two-pass: probe the required table size first, then
//! enumerate into an adequate buffer, retrying if the module list grew
//! in between. Large targets routinely exceed a first-guess buffer.

/// A module mapped into the target's address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModule {
    /// Case-folded file name, e.g. `physics.dll`.
    pub name: String,
    /// Load base in the target's address space.
    pub base: usize,
    /// Mapped image size in bytes.
    pub size: usize,
}

impl RemoteModule {
    /// Case-insensitive file-name comparison.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Base file name of a module path, as stored in [`RemoteModule::name`].
pub fn module_name_from_path(path: &str) -> String {
    path.rsplit(['\\', '/'])
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase()
}

#[cfg(windows)]
pub use self::win32::process_modules;

#[cfg(windows)]
mod win32 {
    use super::{module_name_from_path, RemoteModule};
    use crate::handle::ProcessHandle;
    use rewind_common::{Error, Result};
    use windows::Win32::Foundation::{GetLastError, ERROR_PARTIAL_COPY, HMODULE, MAX_PATH};
    use windows::Win32::System::ProcessStatus::{
        K32EnumProcessModulesEx, K32GetModuleFileNameExW, K32GetModuleInformation,
        LIST_MODULES_ALL, MODULEINFO,
    };

    const HMODULE_SIZE: usize = std::mem::size_of::<HMODULE>();

    /// `ERROR_PARTIAL_COPY` shows up on WOW64 targets mid-enumeration and
    /// does not invalidate the data the call produced.
    fn enum_error_is_fatal() -> bool {
        unsafe { GetLastError() != ERROR_PARTIAL_COPY }
    }

    /// Enumerate the modules of an opened target.
    ///
    /// The handle must have been opened with read and query access.
    pub fn process_modules(handle: &ProcessHandle) -> Result<Vec<RemoteModule>> {
        let raw = handle.raw();

        // Probe pass: ask for the required table size.
        let mut needed = 0u32;
        let ok = unsafe {
            K32EnumProcessModulesEx(raw, std::ptr::null_mut(), 0, &mut needed, LIST_MODULES_ALL)
        };
        if !ok.as_bool() && enum_error_is_fatal() {
            return Err(Error::Internal(format!(
                "K32EnumProcessModulesEx size probe failed: {}",
                windows::core::Error::from_win32()
            )));
        }
        if needed == 0 {
            return Err(Error::Internal(
                "module enumeration reported an empty module table".to_string(),
            ));
        }

        let mut handles: Vec<HMODULE>;
        loop {
            handles = vec![HMODULE::default(); (needed as usize).div_ceil(HMODULE_SIZE)];
            let capacity = (handles.len() * HMODULE_SIZE) as u32;

            let ok = unsafe {
                K32EnumProcessModulesEx(
                    raw,
                    handles.as_mut_ptr(),
                    capacity,
                    &mut needed,
                    LIST_MODULES_ALL,
                )
            };
            if !ok.as_bool() && enum_error_is_fatal() {
                return Err(Error::Internal(format!(
                    "K32EnumProcessModulesEx failed: {}",
                    windows::core::Error::from_win32()
                )));
            }

            // The list can grow between the probe and the enumeration.
            if needed > capacity {
                continue;
            }

            handles.truncate(needed as usize / HMODULE_SIZE);
            break;
        }

        let mut modules = Vec::with_capacity(handles.len());
        for module_handle in handles {
            modules.push(lookup_module(raw, module_handle)?);
        }
        Ok(modules)
    }

    fn lookup_module(
        process: windows::Win32::Foundation::HANDLE,
        module: HMODULE,
    ) -> Result<RemoteModule> {
        let mut path_buffer = [0u16; MAX_PATH as usize];
        let len = unsafe { K32GetModuleFileNameExW(process, module, &mut path_buffer) };
        if len == 0 {
            return Err(Error::Internal(format!(
                "K32GetModuleFileNameExW failed: {}",
                windows::core::Error::from_win32()
            )));
        }
        let path = String::from_utf16_lossy(&path_buffer[..len as usize]);

        let mut info = MODULEINFO::default();
        let ok = unsafe {
            K32GetModuleInformation(
                process,
                module,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
        };
        if !ok.as_bool() {
            return Err(Error::Internal(format!(
                "K32GetModuleInformation failed: {}",
                windows::core::Error::from_win32()
            )));
        }

        Ok(RemoteModule {
            name: module_name_from_path(&path),
            base: info.lpBaseOfDll as usize,
            size: info.SizeOfImage as usize,
        })
    }
}
