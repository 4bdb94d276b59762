//! UI-thread dispatcher
//!
//! A single OS thread owns every native toolkit call and every managed
//! signal closure. This module provides the process-wide rendezvous for
//! "run this closure on that thread":
//! - fire-and-forget scheduling from any thread ([`UiDispatcher::run_on_ui_thread`])
//! - blocking scheduling ([`UiDispatcher::sync_ui`])
//! - thread-identity checks
//!
//! Closures enqueued from other threads flow through an unbounded queue. A
//! dedicated drainer thread hands each one to the injected idle adapter,
//! which schedules it into the toolkit's event loop (the toolkit's idle-add
//! primitive on the default platform, the OS main queue where the OS owns
//! the app's main thread). The adapter is the platform seam: a single
//! injected function.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crate::error::{BindingError, BindingResult};

/// A closure scheduled for execution on the UI thread
pub type DispatchJob = Box<dyn FnOnce() + Send + 'static>;

/// The platform seam: schedules one job into the UI event loop.
///
/// Jobs handed to the adapter are already panic-wrapped; the adapter only
/// has to make sure they run on the UI thread, in hand-over order.
pub type IdleAdapter = Arc<dyn Fn(DispatchJob) + Send + Sync + 'static>;

/// Process-wide UI-thread rendezvous.
///
/// Constructible as a value so tests can run an isolated dispatcher; the
/// process singleton lives inside [`crate::Binding`].
pub struct UiDispatcher {
    ui_thread: OnceLock<ThreadId>,
    queue: Sender<DispatchJob>,
}

impl UiDispatcher {
    /// Create a dispatcher and spawn its queue-drainer thread.
    ///
    /// The drainer consumes enqueued closures and hands each one to
    /// `adapter`. It exits when the dispatcher is dropped.
    #[must_use]
    pub fn new(adapter: IdleAdapter) -> Self {
        let (tx, rx) = mpsc::channel::<DispatchJob>();
        let spawned = thread::Builder::new()
            .name("gantry-dispatch".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    adapter(job);
                }
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn dispatch drainer: {e}");
        }
        Self { ui_thread: OnceLock::new(), queue: tx }
    }

    /// Pin the calling OS thread as the UI thread.
    ///
    /// Called once during toolkit initialisation, from the thread that runs
    /// the native event loop. Later calls are ignored.
    pub fn mark_ui_thread(&self) {
        let id = thread::current().id();
        if self.ui_thread.set(id).is_err() {
            log::debug!("UI thread already pinned; ignoring");
        }
    }

    /// Whether the calling thread is the pinned UI thread
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        self.ui_thread.get() == Some(&thread::current().id())
    }

    /// Assert that the caller is on the UI thread
    pub fn require_ui_thread(&self) -> BindingResult<()> {
        if self.is_ui_thread() {
            Ok(())
        } else {
            Err(BindingError::WrongThread)
        }
    }

    /// Run a closure on the UI thread, fire-and-forget.
    ///
    /// On the UI thread the closure runs synchronously before this returns;
    /// from any other thread it is enqueued and this returns immediately.
    /// Closures enqueued from one thread run in enqueue order. Never fails.
    pub fn run_on_ui_thread<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            run_caught(f);
            return;
        }
        let job: DispatchJob = Box::new(move || run_caught(f));
        if self.queue.send(job).is_err() {
            log::error!("dispatch queue closed; dropping closure");
        }
    }

    /// Enqueue a closure unconditionally, even when already on the UI
    /// thread.
    ///
    /// Trampolines use this instead of [`Self::run_on_ui_thread`] for
    /// no-return closures: deferring keeps a single execution model and
    /// keeps managed panics out of native signal re-entrancy.
    pub fn enqueue<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job: DispatchJob = Box::new(move || run_caught(f));
        if self.queue.send(job).is_err() {
            log::error!("dispatch queue closed; dropping closure");
        }
    }

    /// Run a closure on the UI thread and block until it completes.
    ///
    /// Fails with [`BindingError::Deadlock`] when called from the UI thread:
    /// blocking there would wait on a queue only this thread can drain.
    pub fn sync_ui<F>(&self, f: F) -> BindingResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_ui_thread() {
            return Err(BindingError::Deadlock);
        }
        let (done_tx, done_rx) = mpsc::channel::<()>();
        self.run_on_ui_thread(move || {
            f();
            let _ = done_tx.send(());
        });
        // If the closure panicked, the sender was dropped during unwinding
        // and recv reports disconnection.
        done_rx
            .recv()
            .map_err(|_| BindingError::ClosurePanic("sync_ui closure panicked".into()))
    }
}

impl std::fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("ui_thread", &self.ui_thread.get())
            .finish()
    }
}

/// Run a closure with panic containment.
///
/// A panic must never cross back into native code; it is caught here,
/// logged, and the UI thread keeps running.
pub(crate) fn run_caught<F: FnOnce()>(f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        log::error!("closure panicked on the UI thread: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}
