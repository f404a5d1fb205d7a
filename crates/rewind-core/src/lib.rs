//! OS primitives for the rewind runtime.
//!
//! Process discovery, remote memory access, module enumeration, the
//! process-wide keyboard hook, and the pointer-chain resolver. The
//! backend traits in [`traits`] keep the runtime portable; the Win32
//! implementations are gated behind `cfg(windows)`.

pub mod hook;
pub mod modules;
pub mod resolve;
pub mod traits;

#[cfg(windows)]
pub mod handle;
#[cfg(windows)]
pub mod process;

pub use hook::{HookRegistration, KeySubscriber, KeyboardHook};
pub use modules::RemoteModule;
pub use resolve::resolve_chain;
pub use traits::{ExitStatus, PointerWidth, ProcessHost, RemoteMemory, TargetProcess};

#[cfg(windows)]
pub use handle::ProcessHandle;
#[cfg(windows)]
pub use hook::LowLevelKeyboardHook;
#[cfg(windows)]
pub use process::Win32Host;
