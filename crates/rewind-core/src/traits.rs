//! Backend trait definitions.
//!
//! These traits are the seam between the runtime (sessions, supervisors)
//! and the operating system. The Win32 implementations live in this
//! crate behind `cfg(windows)`; test suites substitute in-memory fakes.

use crate::modules::RemoteModule;
use async_trait::async_trait;
use rewind_common::{Error, Result};
use std::sync::Arc;

/// Pointer width of an attached target, captured once at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    /// Size in bytes of a pointer-sized word in the target.
    pub fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

/// How a watched target finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exit code zero.
    Clean,
    /// Any other exit code.
    Code(u32),
}

impl ExitStatus {
    /// The terminal session cause for this exit.
    pub fn into_error(self) -> Error {
        match self {
            ExitStatus::Clean => Error::TargetExitedCleanly,
            ExitStatus::Code(status) => Error::TargetExited { status },
        }
    }
}

/// Remote memory primitives available on an opened target.
///
/// All methods are callable from any thread.
pub trait RemoteMemory: Send + Sync {
    /// Read exactly `len` bytes at `address`.
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>>;

    /// Write all of `data` at `address`.
    fn write_bytes(&self, address: usize, data: &[u8]) -> Result<()>;

    /// Read one pointer-sized word at `address`, zero-extended.
    fn read_ptr(&self, address: usize) -> Result<usize>;
}

/// One opened target process.
#[async_trait]
pub trait TargetProcess: RemoteMemory {
    fn pid(&self) -> u32;

    fn pointer_width(&self) -> PointerWidth;

    /// Enumerate the modules currently mapped into the target.
    fn modules(&self) -> Result<Vec<RemoteModule>>;

    /// Resolves when the target terminates.
    async fn wait_for_exit(&self) -> ExitStatus;

    /// Release the underlying OS handle. Idempotent.
    fn close(&self);
}

/// Discovery and attach entry points for the host OS.
pub trait ProcessHost: Send + Sync {
    /// Find a running process whose executable base name equals
    /// `exe_name` (case-folded). Returns the first match.
    fn find_process(&self, exe_name: &str) -> Result<Option<u32>>;

    /// Open the process with read/write/query access.
    fn open_process(&self, pid: u32) -> Result<Arc<dyn TargetProcess>>;
}
