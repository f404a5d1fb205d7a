//! In-memory backend fakes shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use rewind_common::{Error, Result};
use rewind_core::hook::{HookRegistration, KeySubscriber, KeyboardHook};
use rewind_core::modules::RemoteModule;
use rewind_core::traits::{ExitStatus, PointerWidth, ProcessHost, RemoteMemory, TargetProcess};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

/// Byte-addressed fake target process.
pub struct MockTarget {
    pid: u32,
    width: PointerWidth,
    modules: Vec<RemoteModule>,
    memory: Mutex<HashMap<usize, u8>>,
    closed: AtomicBool,
    exit: watch::Sender<Option<ExitStatus>>,
}

impl MockTarget {
    pub fn new(pid: u32, width: PointerWidth, modules: Vec<RemoteModule>) -> Arc<MockTarget> {
        let (exit, _) = watch::channel(None);
        Arc::new(MockTarget {
            pid,
            width,
            modules,
            memory: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            exit,
        })
    }

    pub fn put_bytes(&self, address: usize, bytes: &[u8]) {
        let mut memory = self.memory.lock();
        for (i, byte) in bytes.iter().enumerate() {
            memory.insert(address + i, *byte);
        }
    }

    /// Store a pointer-sized word the way the target's width lays it out.
    pub fn put_ptr(&self, address: usize, value: usize) {
        match self.width {
            PointerWidth::Bits32 => self.put_bytes(address, &(value as u32).to_le_bytes()),
            PointerWidth::Bits64 => self.put_bytes(address, &(value as u64).to_le_bytes()),
        }
    }

    /// Read back memory for assertions; `None` if any byte is unmapped.
    pub fn bytes(&self, address: usize, len: usize) -> Option<Vec<u8>> {
        let memory = self.memory.lock();
        (0..len)
            .map(|i| memory.get(&(address + i)).copied())
            .collect()
    }

    /// Simulate the target terminating.
    pub fn exit_with(&self, status: ExitStatus) {
        self.exit.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(status);
                true
            } else {
                false
            }
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RemoteMemory for MockTarget {
    fn read_bytes(&self, address: usize, len: usize) -> Result<Vec<u8>> {
        let memory = self.memory.lock();
        (0..len)
            .map(|i| memory.get(&(address + i)).copied())
            .collect::<Option<Vec<u8>>>()
            .ok_or(Error::RemoteReadFailed {
                address,
                message: "unmapped".to_string(),
            })
    }

    fn write_bytes(&self, address: usize, data: &[u8]) -> Result<()> {
        self.put_bytes(address, data);
        Ok(())
    }

    fn read_ptr(&self, address: usize) -> Result<usize> {
        let word = self.read_bytes(address, self.width.bytes())?;
        let mut value = 0usize;
        for byte in word.iter().rev() {
            value = (value << 8) | *byte as usize;
        }
        Ok(value)
    }
}

#[async_trait]
impl TargetProcess for MockTarget {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn modules(&self) -> Result<Vec<RemoteModule>> {
        Ok(self.modules.clone())
    }

    async fn wait_for_exit(&self) -> ExitStatus {
        let mut exit = self.exit.subscribe();
        loop {
            if let Some(status) = *exit.borrow_and_update() {
                return status;
            }
            if exit.changed().await.is_err() {
                return ExitStatus::Code(u32::MAX);
            }
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // A wait on a closed handle stops blocking.
        self.exit.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(ExitStatus::Code(u32::MAX));
                true
            } else {
                false
            }
        });
    }
}

struct KeyboardSubscriber {
    id: u64,
    handler: Arc<dyn KeySubscriber>,
    done: Option<oneshot::Sender<Error>>,
}

#[derive(Default)]
struct KeyboardInner {
    subscribers: Mutex<Vec<KeyboardSubscriber>>,
    next_id: AtomicU64,
    fail_install: AtomicBool,
}

/// Broadcast keyboard fake mirroring the process-wide hook.
#[derive(Clone, Default)]
pub struct FakeKeyboard {
    inner: Arc<KeyboardInner>,
}

impl FakeKeyboard {
    pub fn new() -> FakeKeyboard {
        FakeKeyboard::default()
    }

    /// Make future registrations fail with `HookInstallFailed`.
    pub fn fail_installs(&self) {
        self.inner.fail_install.store(true, Ordering::SeqCst);
    }

    /// Deliver a keydown to every live subscriber, in order.
    pub fn press(&self, vk: u32) {
        let handlers: Vec<Arc<dyn KeySubscriber>> = {
            let subscribers = self.inner.subscribers.lock();
            subscribers.iter().map(|s| Arc::clone(&s.handler)).collect()
        };
        for handler in handlers {
            handler.on_key_down(vk);
        }
    }

    /// Simulate the hook dying out from under its subscribers.
    pub fn kill(&self, cause: &str) {
        let mut subscribers = self.inner.subscribers.lock();
        for subscriber in subscribers.iter_mut() {
            if let Some(done) = subscriber.done.take() {
                let _ = done.send(Error::HookDied(cause.to_string()));
            }
        }
        subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl KeyboardHook for FakeKeyboard {
    fn register(&self, subscriber: Arc<dyn KeySubscriber>) -> Result<HookRegistration> {
        if self.inner.fail_install.load(Ordering::SeqCst) {
            return Err(Error::HookInstallFailed("refused by test".to_string()));
        }

        let (done_tx, done_rx) = oneshot::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.lock().push(KeyboardSubscriber {
            id,
            handler: subscriber,
            done: Some(done_tx),
        });

        let inner = Arc::clone(&self.inner);
        Ok(HookRegistration::new(
            Box::new(move || {
                inner.subscribers.lock().retain(|s| s.id != id);
            }),
            done_rx,
        ))
    }
}

#[derive(Default)]
struct HostInner {
    processes: Mutex<HashMap<String, u32>>,
    targets: Mutex<HashMap<u32, Arc<MockTarget>>>,
    find_error: Mutex<Option<Error>>,
    open_error: Mutex<Option<Error>>,
}

/// Configurable process table standing in for the OS.
#[derive(Clone, Default)]
pub struct FakeHost {
    inner: Arc<HostInner>,
}

impl FakeHost {
    pub fn new() -> FakeHost {
        FakeHost::default()
    }

    pub fn add_target(&self, exe_name: &str, target: Arc<MockTarget>) {
        self.inner
            .processes
            .lock()
            .insert(exe_name.to_ascii_lowercase(), target.pid());
        self.inner.targets.lock().insert(target.pid(), target);
    }

    pub fn remove_process(&self, exe_name: &str) {
        self.inner
            .processes
            .lock()
            .remove(&exe_name.to_ascii_lowercase());
    }

    pub fn set_find_error(&self, error: Option<Error>) {
        *self.inner.find_error.lock() = error;
    }

    pub fn set_open_error(&self, error: Option<Error>) {
        *self.inner.open_error.lock() = error;
    }
}

impl ProcessHost for FakeHost {
    fn find_process(&self, exe_name: &str) -> Result<Option<u32>> {
        if let Some(error) = self.inner.find_error.lock().clone() {
            return Err(error);
        }
        Ok(self
            .inner
            .processes
            .lock()
            .get(&exe_name.to_ascii_lowercase())
            .copied())
    }

    fn open_process(&self, pid: u32) -> Result<Arc<dyn TargetProcess>> {
        if let Some(error) = self.inner.open_error.lock().clone() {
            return Err(error);
        }
        let target = self
            .inner
            .targets
            .lock()
            .get(&pid)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("no such pid {}", pid)))?;
        Ok(target)
    }
}

/// A notification observed by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    Started(String),
    Stopped(String, Option<Error>),
}

/// Records notifications for assertions.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<NotifyEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> RecordingNotifier {
        RecordingNotifier::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().clone()
    }
}

impl crate::notifier::Notifier for RecordingNotifier {
    fn on_started(&self, exe_name: &str) {
        self.events
            .lock()
            .push(NotifyEvent::Started(exe_name.to_string()));
    }

    fn on_stopped(&self, exe_name: &str, error: Option<&Error>) {
        self.events
            .lock()
            .push(NotifyEvent::Stopped(exe_name.to_string(), error.cloned()));
    }
}
