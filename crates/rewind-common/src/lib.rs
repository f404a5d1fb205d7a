//! Shared types for the rewind workspace.
//!
//! Error taxonomy, logging bootstrap, and the trainer configuration
//! model consumed by every other crate.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    ActionRef, Config, PointerSpec, RegionPointer, SaveRestoreGroup, TargetSpec, WriteAction,
    WritePointer,
};
pub use error::{Error, Result};
pub use logging::{init_logging, LogConfig};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};
