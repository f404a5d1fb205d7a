//! One attached target.
//!
//! A session owns the opened process handle, the resolved module bases,
//! the saved-state table, and the keyboard-hook registration. It lives
//! from a successful attach until the first of: target exit, hook
//! death, a failed remote operation inside the keydown handler, or an
//! explicit stop. Saved state does not outlive the session.

use parking_lot::Mutex;
use rewind_common::config::{ActionRef, PointerSpec, RegionPointer, WritePointer};
use rewind_common::{Error, Result, TargetSpec};
use rewind_core::hook::{HookRegistration, KeySubscriber};
use rewind_core::modules::RemoteModule;
use rewind_core::resolve::resolve_chain;
use rewind_core::traits::TargetProcess;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Saved bytes for one snapshot pointer. Allocated on first save and
/// discarded with the session.
struct SavedSlot {
    populated: bool,
    buffer: Vec<u8>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("primary_base", &self.primary_base)
            .field("terminated", &self.terminated.load(Ordering::Relaxed))
            .finish()
    }
}

/// One attach to one target process.
pub struct Session {
    spec: Arc<TargetSpec>,
    target: Arc<dyn TargetProcess>,
    /// Base of the target's main executable module.
    primary_base: usize,
    /// Modules referenced by pointer overrides, resolved at attach.
    modules: HashMap<String, RemoteModule>,
    slots: Mutex<HashMap<String, SavedSlot>>,
    hook: Mutex<Option<HookRegistration>>,
    terminated: AtomicBool,
    cause: Mutex<Option<Error>>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl Session {
    /// Resolve the modules the target spec references and build the saved-state
    /// table. Fails with [`Error::MissingModule`] if the target has not
    /// loaded a required module; the caller releases the handle.
    pub fn attach(spec: Arc<TargetSpec>, target: Arc<dyn TargetProcess>) -> Result<Arc<Session>> {
        let all_modules = target.modules()?;

        let primary = all_modules
            .iter()
            .find(|m| m.name_matches(&spec.exe_name))
            .ok_or_else(|| Error::MissingModule(spec.exe_name.clone()))?;
        let primary_base = primary.base;

        let mut modules = HashMap::new();
        for name in spec.required_module_names() {
            let module = all_modules
                .iter()
                .find(|m| m.name_matches(&name))
                .ok_or_else(|| Error::MissingModule(name.clone()))?;
            modules.insert(name, module.clone());
        }

        let slots = spec
            .save_restores
            .iter()
            .flat_map(|group| &group.pointers)
            .map(|region| {
                (
                    region.spec.name.clone(),
                    SavedSlot {
                        populated: false,
                        buffer: Vec::new(),
                    },
                )
            })
            .collect();

        let (done_tx, done_rx) = watch::channel(false);

        debug!(
            target: "rewind_agent::session",
            exe = %spec.exe_name,
            pid = target.pid(),
            base = format!("{:#x}", primary_base),
            "attached"
        );

        Ok(Arc::new(Session {
            spec,
            target,
            primary_base,
            modules,
            slots: Mutex::new(slots),
            hook: Mutex::new(None),
            terminated: AtomicBool::new(false),
            cause: Mutex::new(None),
            done_tx,
            done_rx,
        }))
    }

    /// Adopt the keyboard-hook registration and spawn the two exit
    /// observers: target-process exit and hook death.
    pub fn install_hook(self: &Arc<Session>, registration: HookRegistration) {
        let hook_done = registration.take_done();
        *self.hook.lock() = Some(registration);

        // Lost the race against a terminator; release immediately.
        if self.terminated.load(Ordering::SeqCst) {
            if let Some(registration) = self.hook.lock().take() {
                registration.release();
            }
        }

        if let Some(done) = hook_done {
            let session = Arc::clone(self);
            tokio::spawn(async move {
                // A dropped sender means the registration was released
                // during normal teardown; only a delivered cause counts.
                if let Ok(cause) = done.await {
                    session.terminate(cause);
                }
            });
        }

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let status = session.target.wait_for_exit().await;
            session.terminate(status.into_error());
        });
    }

    /// First-writer-wins terminal transition: records the cause,
    /// releases the hook registration, and closes the process handle.
    /// Later calls are no-ops.
    pub fn terminate(&self, cause: Error) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!(
            target: "rewind_agent::session",
            exe = %self.spec.exe_name,
            cause = %cause,
            "session terminating"
        );

        *self.cause.lock() = Some(cause);
        if let Some(registration) = self.hook.lock().take() {
            registration.release();
        }
        self.target.close();
        let _ = self.done_tx.send(true);
    }

    /// Resolves once the session has terminated.
    pub async fn done(&self) {
        let mut done = self.done_rx.clone();
        while !*done.borrow_and_update() {
            if done.changed().await.is_err() {
                return;
            }
        }
    }

    /// The terminal cause, once terminated.
    pub fn terminal_error(&self) -> Option<Error> {
        self.cause.lock().clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn handle_key_down(&self, vk: u32) -> Result<()> {
        for action in self.spec.actions_for_key(vk) {
            match *action {
                ActionRef::SaveRestore(index) => {
                    let group = &self.spec.save_restores[index];
                    if vk == group.save_key as u32 {
                        for region in &group.pointers {
                            self.save_region(region)?;
                        }
                    } else if vk == group.restore_key as u32 {
                        for region in &group.pointers {
                            self.restore_region(region)?;
                        }
                    }
                }
                ActionRef::Writer(index) => {
                    let writer = &self.spec.writers[index];
                    for write in &writer.pointers {
                        self.write_payload(write)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Module base for a pointer: the primary module unless overridden.
    /// Overrides were validated at attach, so a miss here is a bug.
    fn base_for(&self, pointer: &PointerSpec) -> Result<usize> {
        match &pointer.module {
            None => Ok(self.primary_base),
            Some(name) => self
                .modules
                .get(name)
                .map(|module| module.base)
                .ok_or_else(|| Error::MissingModule(name.clone())),
        }
    }

    fn effective_address(&self, pointer: &PointerSpec) -> Result<usize> {
        let base = self.base_for(pointer)?;
        resolve_chain(base, &pointer.offsets, |addr| self.target.read_ptr(addr))
    }

    fn save_region(&self, region: &RegionPointer) -> Result<()> {
        let address = self.effective_address(&region.spec)?;
        let bytes = self.target.read_bytes(address, region.size)?;

        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&region.spec.name).ok_or_else(|| {
            Error::Internal(format!("no slot for pointer {:?}", region.spec.name))
        })?;
        slot.buffer = bytes;
        slot.populated = true;

        info!(
            target: "rewind_agent::session",
            exe = %self.spec.exe_name,
            pointer = %region.spec.name,
            address = format!("{:#x}", address),
            "saved region"
        );
        Ok(())
    }

    fn restore_region(&self, region: &RegionPointer) -> Result<()> {
        let bytes = {
            let slots = self.slots.lock();
            match slots.get(&region.spec.name) {
                Some(slot) if slot.populated => slot.buffer.clone(),
                // Restore before any save is a no-op.
                _ => return Ok(()),
            }
        };

        let address = self.effective_address(&region.spec)?;
        self.target.write_bytes(address, &bytes)?;

        info!(
            target: "rewind_agent::session",
            exe = %self.spec.exe_name,
            pointer = %region.spec.name,
            address = format!("{:#x}", address),
            "restored region"
        );
        Ok(())
    }

    fn write_payload(&self, write: &WritePointer) -> Result<()> {
        let address = self.effective_address(&write.spec)?;
        self.target.write_bytes(address, &write.data)?;

        info!(
            target: "rewind_agent::session",
            exe = %self.spec.exe_name,
            pointer = %write.spec.name,
            address = format!("{:#x}", address),
            "wrote payload"
        );
        Ok(())
    }
}

impl KeySubscriber for Session {
    /// Runs on the hook thread. A failed remote operation means the
    /// target's address space can no longer be trusted; the session
    /// terminates and the supervisor re-polls.
    fn on_key_down(&self, vk: u32) {
        if self.terminated.load(Ordering::SeqCst) {
            return;
        }

        if let Err(err) = self.handle_key_down(vk) {
            error!(
                target: "rewind_agent::session",
                exe = %self.spec.exe_name,
                error = %err,
                "keydown handler failed"
            );
            self.terminate(err);
        }
    }
}
