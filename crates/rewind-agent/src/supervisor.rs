//! Per-target supervision.
//!
//! A supervisor polls for its target process, attaches a [`Session`]
//! when the process appears, and watches the session until it ends.
//! Attach failures that describe the target (not yet startable,
//! missing module) put the supervisor back into polling; anything else
//! is terminal and propagates to the agent.

use crate::notifier::Notifier;
use crate::session::Session;
use rewind_common::{Error, Result, TargetSpec};
use rewind_core::hook::{KeySubscriber, KeyboardHook};
use rewind_core::traits::ProcessHost;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Interval between process-table polls, and the back-off after a
/// session ends.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The first poll fires near-immediately so a target that is already
/// running attaches without waiting a full interval.
const FIRST_POLL: Duration = Duration::from_millis(1);

/// Watches one target spec and maintains at most one live session.
pub struct Supervisor {
    spec: Arc<TargetSpec>,
    host: Arc<dyn ProcessHost>,
    keyboard: Arc<dyn KeyboardHook>,
    notifier: Arc<dyn Notifier>,
}

fn attach_is_retryable(error: &Error) -> bool {
    matches!(
        error,
        Error::PermissionDenied(_) | Error::MissingModule(_)
    )
}

impl Supervisor {
    pub fn new(
        spec: Arc<TargetSpec>,
        host: Arc<dyn ProcessHost>,
        keyboard: Arc<dyn KeyboardHook>,
        notifier: Arc<dyn Notifier>,
    ) -> Supervisor {
        Supervisor {
            spec,
            host,
            keyboard,
            notifier,
        }
    }

    /// Run until cancelled or a terminal failure. The returned error is
    /// the supervisor's terminal cause; cooperative shutdown yields
    /// [`Error::Cancelled`].
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Error {
        info!(
            target: "rewind_agent::supervisor",
            exe = %self.spec.exe_name,
            "watching for target"
        );

        let mut delay = FIRST_POLL;
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Error::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            let pid = match self.host.find_process(&self.spec.exe_name) {
                Ok(Some(pid)) => pid,
                Ok(None) => {
                    delay = POLL_INTERVAL;
                    continue;
                }
                // Losing the process table is an agent-side fault.
                Err(e) => return e,
            };

            let session = match self.attach(pid) {
                Ok(session) => session,
                Err(e) if attach_is_retryable(&e) => {
                    warn!(
                        target: "rewind_agent::supervisor",
                        exe = %self.spec.exe_name,
                        pid,
                        error = %e,
                        "attach failed, still watching"
                    );
                    delay = POLL_INTERVAL;
                    continue;
                }
                Err(e) => return e,
            };

            info!(
                target: "rewind_agent::supervisor",
                exe = %self.spec.exe_name,
                pid,
                "session running"
            );
            self.notifier.on_started(&self.spec.exe_name);

            tokio::select! {
                _ = shutdown.changed() => {
                    session.terminate(Error::Cancelled);
                    session.done().await;
                    return Error::Cancelled;
                }
                _ = session.done() => {}
            }

            let cause = session
                .terminal_error()
                .unwrap_or_else(|| Error::Internal("session ended without a cause".to_string()));

            if cause.is_clean_exit() {
                info!(
                    target: "rewind_agent::supervisor",
                    exe = %self.spec.exe_name,
                    "session ended, target exited"
                );
                self.notifier.on_stopped(&self.spec.exe_name, None);
            } else {
                warn!(
                    target: "rewind_agent::supervisor",
                    exe = %self.spec.exe_name,
                    error = %cause,
                    "session ended"
                );
                self.notifier.on_stopped(&self.spec.exe_name, Some(&cause));
            }

            delay = POLL_INTERVAL;
        }
    }

    /// Open the target, register on the keyboard hook, and construct the
    /// session. Partial resources are released on failure.
    fn attach(&self, pid: u32) -> Result<Arc<Session>> {
        let target = self.host.open_process(pid)?;

        let session = match Session::attach(Arc::clone(&self.spec), Arc::clone(&target)) {
            Ok(session) => session,
            Err(e) => {
                target.close();
                return Err(e);
            }
        };

        let subscriber: Arc<dyn KeySubscriber> = Arc::clone(&session) as Arc<dyn KeySubscriber>;
        let registration = match self.keyboard.register(subscriber) {
            Ok(registration) => registration,
            Err(e) => {
                target.close();
                return Err(e);
            }
        };

        session.install_hook(registration);
        Ok(session)
    }
}
