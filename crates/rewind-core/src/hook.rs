//! Process-wide low-level keyboard hook.
//!
//! The OS hook is a process-wide resource, so at most one is installed
//! at a time. Subscribers register against a shared broadcast: every
//! keydown is delivered serially, on the hook thread, to each live
//! subscriber in registration order. Keyup and syskey events are
//! discarded before delivery.
//!
//! The hook is installed lazily when the first registration is created
//! and removed when the last one is released. If the hook dies while
//! subscribers are live, each registration's `done` signal completes
//! with the cause.

use parking_lot::Mutex;
use rewind_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Receives keydown events. The handler runs on the hook thread and
/// must complete promptly; the OS silently bypasses hooks that stall.
pub trait KeySubscriber: Send + Sync {
    fn on_key_down(&self, vk: u32);
}

/// A source of global keydown events.
pub trait KeyboardHook: Send + Sync {
    /// Register a subscriber on the shared hook, installing the OS hook
    /// if this is the first registration.
    fn register(&self, subscriber: Arc<dyn KeySubscriber>) -> Result<HookRegistration>;
}

/// One subscriber's registration on the shared hook.
///
/// Releasing is idempotent and also happens on drop. The last release
/// removes the OS hook.
pub struct HookRegistration {
    released: AtomicBool,
    releaser: Box<dyn Fn() + Send + Sync>,
    done: Mutex<Option<oneshot::Receiver<Error>>>,
}

impl HookRegistration {
    pub fn new(
        releaser: Box<dyn Fn() + Send + Sync>,
        done: oneshot::Receiver<Error>,
    ) -> HookRegistration {
        HookRegistration {
            released: AtomicBool::new(false),
            releaser,
            done: Mutex::new(Some(done)),
        }
    }

    /// Stop receiving events. Safe to call more than once.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            (self.releaser)();
        }
    }

    /// The receiver completes with a cause if the underlying hook dies
    /// while this registration is live. Yields `None` after the first
    /// call.
    pub fn take_done(&self) -> Option<oneshot::Receiver<Error>> {
        self.done.lock().take()
    }
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(windows)]
pub use self::win32::LowLevelKeyboardHook;

#[cfg(windows)]
mod win32 {
    use super::*;
    use once_cell::sync::Lazy;
    use tracing::{debug, error};
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
        TranslateMessage, UnhookWindowsHookEx, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYDOWN,
        WM_QUIT,
    };

    struct Subscriber {
        id: u64,
        handler: Arc<dyn KeySubscriber>,
        done: Option<oneshot::Sender<Error>>,
    }

    #[derive(Default)]
    struct Registry {
        subscribers: Vec<Subscriber>,
        /// Thread running the message loop, when the hook is installed.
        thread_id: Option<u32>,
        next_id: u64,
    }

    static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

    /// The Win32 `WH_KEYBOARD_LL` hook.
    pub struct LowLevelKeyboardHook;

    impl KeyboardHook for LowLevelKeyboardHook {
        fn register(&self, subscriber: Arc<dyn KeySubscriber>) -> Result<HookRegistration> {
            let (done_tx, done_rx) = oneshot::channel();

            let mut registry = REGISTRY.lock();
            if registry.thread_id.is_none() {
                registry.thread_id = Some(spawn_hook_thread()?);
            }

            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.push(Subscriber {
                id,
                handler: subscriber,
                done: Some(done_tx),
            });
            debug!(target: "rewind_core::hook", id, "keyboard subscriber registered");

            Ok(HookRegistration::new(
                Box::new(move || unregister(id)),
                done_rx,
            ))
        }
    }

    fn unregister(id: u64) {
        let mut registry = REGISTRY.lock();
        registry.subscribers.retain(|s| s.id != id);
        debug!(target: "rewind_core::hook", id, "keyboard subscriber released");

        if registry.subscribers.is_empty() {
            if let Some(thread_id) = registry.thread_id.take() {
                unsafe {
                    let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
            }
        }
    }

    /// Fail every live registration and forget the hook thread so the
    /// next registration reinstalls.
    fn hook_died(cause: &str) {
        error!(target: "rewind_core::hook", cause, "keyboard hook died");

        let mut registry = REGISTRY.lock();
        registry.thread_id = None;
        for subscriber in registry.subscribers.iter_mut() {
            if let Some(done) = subscriber.done.take() {
                let _ = done.send(Error::HookDied(cause.to_string()));
            }
        }
        registry.subscribers.clear();
    }

    fn dispatch_key_down(vk: u32) {
        // Snapshot the handlers so a subscriber releasing itself from
        // inside its handler does not deadlock on the registry.
        let handlers: Vec<Arc<dyn KeySubscriber>> = {
            let registry = REGISTRY.lock();
            registry
                .subscribers
                .iter()
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        for handler in handlers {
            handler.on_key_down(vk);
        }
    }

    unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if code >= 0 && wparam.0 as u32 == WM_KEYDOWN {
            let event = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            dispatch_key_down(event.vkCode);
        }
        CallNextHookEx(None, code, wparam, lparam)
    }

    /// Start the hook thread and wait for the install result.
    fn spawn_hook_thread() -> Result<u32> {
        let (install_tx, install_rx) = std::sync::mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("rewind-keyboard-hook".to_string())
            .spawn(move || {
                let thread_id = unsafe { GetCurrentThreadId() };

                let install = unsafe {
                    GetModuleHandleW(None).and_then(|module| {
                        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), module, 0)
                    })
                };
                let hook = match install {
                    Ok(hook) => {
                        let _ = install_tx.send(Ok(thread_id));
                        hook
                    }
                    Err(e) => {
                        let _ = install_tx.send(Err(Error::HookInstallFailed(format!(
                            "SetWindowsHookExW: {}",
                            e
                        ))));
                        return;
                    }
                };

                let mut msg = MSG::default();
                loop {
                    let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    if status.0 == 0 {
                        // WM_QUIT: the last registration was released.
                        break;
                    }
                    if status.0 == -1 {
                        unsafe {
                            let _ = UnhookWindowsHookEx(hook);
                        }
                        hook_died("GetMessageW failed");
                        return;
                    }
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }

                unsafe {
                    let _ = UnhookWindowsHookEx(hook);
                }
            });

        spawned.map_err(|e| Error::HookInstallFailed(format!("hook thread spawn: {}", e)))?;

        install_rx
            .recv()
            .map_err(|_| Error::HookInstallFailed("hook thread exited during install".to_string()))?
    }
}
