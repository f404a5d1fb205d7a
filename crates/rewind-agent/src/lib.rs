//! The rewind agent runtime.
//!
//! An [`Agent`] owns one [`Supervisor`](supervisor::Supervisor) per
//! active target spec and fans their terminal errors into one channel.
//! The agent is single-instance per process: the keyboard hook the
//! sessions share is a process-wide resource.

pub mod notifier;
pub mod session;
pub mod supervisor;

#[cfg(test)]
mod testutil;

use notifier::Notifier;
use rewind_common::{Config, Error, Result, TargetSpec};
use rewind_core::hook::KeyboardHook;
use rewind_core::traits::ProcessHost;
use std::sync::Arc;
use supervisor::Supervisor;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

pub use notifier::LogNotifier;
pub use session::Session;

/// Runs supervisors for every active target spec.
pub struct Agent {
    host: Arc<dyn ProcessHost>,
    keyboard: Arc<dyn KeyboardHook>,
    notifier: Arc<dyn Notifier>,
}

impl Agent {
    pub fn new(
        host: Arc<dyn ProcessHost>,
        keyboard: Arc<dyn KeyboardHook>,
        notifier: Arc<dyn Notifier>,
    ) -> Agent {
        Agent {
            host,
            keyboard,
            notifier,
        }
    }

    /// Run until a supervisor fails or `shutdown` fires.
    ///
    /// Disabled specs are filtered out; an empty remainder fails with
    /// [`Error::NoActiveTargets`]. Cooperative shutdown cancels every
    /// supervisor and yields the [`Error::Cancelled`] sentinel.
    pub async fn run(&self, config: Config, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let active: Vec<Arc<TargetSpec>> = config
            .targets
            .into_iter()
            .filter(|spec| !spec.disabled)
            .map(Arc::new)
            .collect();

        if active.is_empty() {
            return Err(Error::NoActiveTargets);
        }

        info!(target: "rewind_agent", targets = active.len(), "agent starting");

        let (cancel_tx, _) = watch::channel(false);
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::with_capacity(active.len());
        for spec in active {
            let supervisor = Supervisor::new(
                Arc::clone(&spec),
                Arc::clone(&self.host),
                Arc::clone(&self.keyboard),
                Arc::clone(&self.notifier),
            );
            let cancel_rx = cancel_tx.subscribe();
            let exit_tx = exit_tx.clone();

            tasks.push(tokio::spawn(async move {
                let cause = supervisor.run(cancel_rx).await;
                let _ = exit_tx.send((spec.exe_name.clone(), cause));
            }));
        }
        drop(exit_tx);

        let result = tokio::select! {
            _ = shutdown.changed() => {
                info!(target: "rewind_agent", "shutdown requested");
                Err(Error::Cancelled)
            }
            exited = exit_rx.recv() => match exited {
                Some((exe_name, cause)) => {
                    error!(
                        target: "rewind_agent",
                        exe = %exe_name,
                        error = %cause,
                        "supervisor stopped"
                    );
                    Err(cause)
                }
                None => Err(Error::Internal(
                    "all supervisors exited without reporting".to_string(),
                )),
            },
        };

        // Wind the rest down before returning.
        let _ = cancel_tx.send(true);
        for task in tasks {
            let _ = task.await;
        }

        result
    }
}
