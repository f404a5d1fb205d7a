//! Session lifecycle notifications.

use rewind_common::Error;
use tracing::{info, warn};

/// Consumed by supervisors to surface session lifecycle changes to a UI.
pub trait Notifier: Send + Sync {
    /// A session for `exe_name` reached its running state.
    fn on_started(&self, exe_name: &str);

    /// A session for `exe_name` terminated. `error` is absent iff the
    /// target exited cleanly.
    fn on_stopped(&self, exe_name: &str, error: Option<&Error>);
}

/// Logs lifecycle events. Stands in when no UI is attached.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn on_started(&self, exe_name: &str) {
        info!(target: "rewind_agent::notify", exe = exe_name, "target attached");
    }

    fn on_stopped(&self, exe_name: &str, error: Option<&Error>) {
        match error {
            None => info!(target: "rewind_agent::notify", exe = exe_name, "target stopped"),
            Some(e) => {
                warn!(target: "rewind_agent::notify", exe = exe_name, error = %e, "target stopped")
            }
        }
    }
}
