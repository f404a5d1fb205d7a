//! Process discovery.
//!
//! Toolhelp snapshot enumeration with case-folded executable names, plus
//! the Win32 implementation of the discovery/attach backend.

use crate::handle::ProcessHandle;
use crate::traits::{ProcessHost, TargetProcess};
use rewind_common::{Error, Result};
use std::sync::Arc;
use windows::Win32::Foundation::CloseHandle;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningProcess {
    pub pid: u32,
    /// Case-folded executable base name.
    pub exe_name: String,
}

/// Enumerate the running processes.
pub fn running_processes() -> Result<Vec<RunningProcess>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| Error::Internal(format!("CreateToolhelp32Snapshot failed: {}", e)))?;

    let mut processes = Vec::new();
    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let name_len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let exe_name =
                    String::from_utf16_lossy(&entry.szExeFile[..name_len]).to_ascii_lowercase();

                processes.push(RunningProcess {
                    pid: entry.th32ProcessID,
                    exe_name,
                });

                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
    }

    Ok(processes)
}

/// Find the first process whose executable base name equals `exe_name`.
pub fn find_process(exe_name: &str) -> Result<Option<u32>> {
    let wanted = exe_name.to_ascii_lowercase();
    Ok(running_processes()?
        .into_iter()
        .find(|p| p.exe_name == wanted)
        .map(|p| p.pid))
}

/// Win32 implementation of the discovery/attach backend.
pub struct Win32Host;

impl ProcessHost for Win32Host {
    fn find_process(&self, exe_name: &str) -> Result<Option<u32>> {
        find_process(exe_name)
    }

    fn open_process(&self, pid: u32) -> Result<Arc<dyn TargetProcess>> {
        Ok(Arc::new(ProcessHandle::open(pid)?))
    }
}
