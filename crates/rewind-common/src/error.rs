//! Error types shared by all rewind crates.

use thiserror::Error;

/// Workspace-wide error taxonomy.
///
/// Variants are cheap to clone so a terminal cause can be recorded once
/// and handed to every observer (supervisor, notifier, logs).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("access to the target process was denied: {0}")]
    PermissionDenied(String),

    #[error("required module not loaded in target: {0}")]
    MissingModule(String),

    #[error("failed to install keyboard hook: {0}")]
    HookInstallFailed(String),

    #[error("keyboard hook stopped: {0}")]
    HookDied(String),

    #[error("remote read failed at {address:#x}: {message}")]
    RemoteReadFailed { address: usize, message: String },

    #[error("remote write failed at {address:#x}: {message}")]
    RemoteWriteFailed { address: usize, message: String },

    #[error("target exited with status {status}")]
    TargetExited { status: u32 },

    #[error("target exited cleanly")]
    TargetExitedCleanly,

    #[error("no active targets in configuration")]
    NoActiveTargets,

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when this cause means the target went away on its own with a
    /// zero exit status. Supervisors report such stops without an error.
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Error::TargetExitedCleanly)
    }
}
