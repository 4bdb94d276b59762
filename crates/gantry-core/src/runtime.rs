//! The binding runtime
//!
//! [`Binding`] ties the four core components together: the UI-thread
//! dispatcher, the callback registry, the resize state machine and the CSS
//! provider cache. It is the trampolines' entry point ([`Binding::fire`])
//! and the owner of the quiescence timers.
//!
//! A `Binding` is an ordinary value so tests can run several isolated
//! instances; the process singleton lives in [`crate::init`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::css::{CssCache, StyleBackend};
use crate::dispatch::{IdleAdapter, UiDispatcher};
use crate::error::BindingError;
use crate::handle::{AsNativeHandle, NativeHandle};
use crate::registry::{CallbackId, CallbackRegistry, SignalHook};
use crate::resize::{ResizePhase, ResizeTracker};
use crate::signal::{self, SignalArgs, SignalClosure, SignalName};
use crate::task::PROGRESS_INTERVAL;

/// Construction parameters for a [`Binding`]
pub struct BindingConfig {
    /// The platform idle-source seam: toolkit idle-add, or the OS main
    /// queue where the OS owns the app's main thread
    pub idle_adapter: IdleAdapter,
    /// The native signal connect/disconnect seam
    pub signal_hook: Arc<dyn SignalHook>,
    /// The native stylesheet seam
    pub style_backend: Arc<dyn StyleBackend>,
    /// Resize quiescence threshold
    pub quiesce_delay: Duration,
    /// Background-task progress rate limit
    pub progress_interval: Duration,
}

impl BindingConfig {
    /// Config with the default timing constants
    #[must_use]
    pub fn new(
        idle_adapter: IdleAdapter,
        signal_hook: Arc<dyn SignalHook>,
        style_backend: Arc<dyn StyleBackend>,
    ) -> Self {
        Self {
            idle_adapter,
            signal_hook,
            style_backend,
            quiesce_delay: crate::resize::QUIESCE_DELAY,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Override the resize quiescence threshold
    #[must_use]
    pub fn with_quiesce_delay(mut self, delay: Duration) -> Self {
        self.quiesce_delay = delay;
        self
    }

    /// Override the progress rate limit
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// The assembled binding core
pub struct Binding {
    dispatcher: Arc<UiDispatcher>,
    registry: CallbackRegistry,
    css: CssCache,
    resize: ResizeTracker,
    progress_interval: Duration,
}

impl Binding {
    /// Assemble a binding from its seams
    #[must_use]
    pub fn new(config: BindingConfig) -> Arc<Self> {
        Arc::new(Self {
            dispatcher: Arc::new(UiDispatcher::new(config.idle_adapter)),
            registry: CallbackRegistry::new(config.signal_hook),
            css: CssCache::new(config.style_backend),
            resize: ResizeTracker::new(config.quiesce_delay),
            progress_interval: config.progress_interval,
        })
    }

    /// The UI-thread dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<UiDispatcher> {
        &self.dispatcher
    }

    /// The callback registry
    #[must_use]
    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// The CSS provider cache
    #[must_use]
    pub fn css(&self) -> &CssCache {
        &self.css
    }

    /// The resize tracker
    #[must_use]
    pub fn resize(&self) -> &ResizeTracker {
        &self.resize
    }

    pub(crate) fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    /// Register a closure for a signal on an object.
    ///
    /// Returns [`CallbackId::INVALID`] when the object yields a null
    /// handle. Registrations against the synthetic resize signals start
    /// tracking the window's resize state.
    pub fn connect(
        &self,
        object: &dyn AsNativeHandle,
        signal: impl Into<SignalName>,
        closure: SignalClosure,
    ) -> CallbackId {
        let handle = object.native_handle();
        let id = self.registry.connect(handle, signal.into(), closure);
        if let Some(record) = self.registry.record(id) {
            if record.source.is_synthetic() {
                self.resize.ensure(handle);
            }
        }
        id
    }

    /// Remove one registration. Idempotent. Drops the window's resize
    /// state when its last registration goes away.
    pub fn disconnect(&self, id: CallbackId) {
        let object = self.registry.record(id).map(|r| r.object);
        self.registry.disconnect(id);
        if let Some(object) = object {
            if self.registry.count_for(object) == 0 {
                self.resize.remove(object);
            }
        }
    }

    /// Remove every registration on an object and its resize state.
    /// Idempotent.
    pub fn disconnect_all(&self, object: &dyn AsNativeHandle) {
        let handle = object.native_handle();
        self.registry.disconnect_all(handle);
        self.resize.remove(handle);
    }

    /// Trampoline entry point: look up a registration and run its closure
    /// with the given native arguments.
    ///
    /// No-return closures are always deferred through the dispatcher, even
    /// though trampolines already run on the UI thread. Return-value
    /// closures (bool-returning signals, query-tooltip) run synchronously
    /// right here: the native caller consumes the result before the
    /// trampoline returns, so deferring is not an option.
    pub fn fire(&self, id: CallbackId, args: SignalArgs) -> Option<bool> {
        let Some(record) = self.registry.record(id) else {
            log::warn!("{}", BindingError::UnknownCallback(id));
            return None;
        };
        if record.arity.has_return {
            match signal::invoke(&record.closure, args) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("suppressing {} on {}: {e}", record.signal, record.object);
                    None
                }
            }
        } else {
            let closure = record.closure;
            let signal = record.signal;
            let object = record.object;
            self.dispatcher.enqueue(move || {
                if let Err(e) = signal::invoke(&closure, args) {
                    log::error!("suppressing {signal} on {object}: {e}");
                }
            });
            None
        }
    }

    /// Trampoline entry point for the single-scalar trampoline, which
    /// cannot know whether its parameter is a response code or a list
    /// position; the registration's source decides.
    pub fn fire_scalar(&self, id: CallbackId, raw: i64) -> Option<bool> {
        let Some(record) = self.registry.record(id) else {
            log::warn!("{}", BindingError::UnknownCallback(id));
            return None;
        };
        self.fire(id, SignalArgs::from_scalar(record.source, raw))
    }

    /// Deliver a synthetic signal to every closure registered for
    /// `(object, signal)`, in registration order. Used by the resize state
    /// machine; the CSS swap closures and user resize handlers coexist on
    /// the same signal.
    pub fn fire_signal(&self, object: NativeHandle, signal: &SignalName) {
        for closure in self.registry.closures_for(object, signal) {
            let signal = signal.clone();
            self.dispatcher.enqueue(move || {
                if let Err(e) = signal::invoke(&closure, SignalArgs::None) {
                    log::error!("suppressing {signal} on {object}: {e}");
                }
            });
        }
    }

    /// Feed one native size-change notification into the resize state
    /// machine.
    ///
    /// Called by the window wrapper's property-change closure with the
    /// freshly queried window size. Zero or negative sizes are dropped, as
    /// are notifications for untracked (destroyed) windows.
    pub fn notify_size_change(self: &Arc<Self>, window: NativeHandle, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        match self.resize.apply(window, width, height) {
            None => {}
            Some(ResizePhase::Started) => {
                self.fire_signal(window, &signal::RESIZE_START);
                self.arm_quiescence(window);
            }
            Some(ResizePhase::Updated) => {
                self.fire_signal(window, &signal::RESIZE_UPDATE);
                self.arm_quiescence(window);
            }
        }
    }

    /// Register the CSS swap closures for a window: resize start overlays
    /// the lightweight provider, resize end removes it.
    pub fn setup_optimized_resize(
        self: &Arc<Self>,
        window: &dyn AsNativeHandle,
    ) -> (CallbackId, CallbackId) {
        let weak = Arc::downgrade(self);
        let start = {
            let weak = weak.clone();
            SignalClosure::unit(move || {
                if let Some(binding) = weak.upgrade() {
                    if let Err(e) = binding.css.begin_resize_mode() {
                        log::warn!("resize overlay unavailable: {e}");
                    }
                }
            })
        };
        let end = SignalClosure::unit(move || {
            if let Some(binding) = weak.upgrade() {
                binding.css.end_resize_mode();
            }
        });
        let start_id = self.connect(window, signal::RESIZE_START, start);
        let end_id = self.connect(window, signal::RESIZE_END, end);
        (start_id, end_id)
    }

    /// Process-shutdown finaliser: sever every surviving native
    /// connection.
    pub fn teardown(&self) {
        self.registry.teardown();
    }

    /// Arm (or re-arm) the quiescence timer for a window.
    ///
    /// Each size change spawns a short-lived timer; a timer that wakes
    /// after a later change finds `last_event` too fresh and does nothing,
    /// leaving the later timer to finish the resize.
    fn arm_quiescence(self: &Arc<Self>, window: NativeHandle) {
        let weak = Arc::downgrade(self);
        let delay = self.resize.quiesce_delay();
        let spawned = thread::Builder::new().name("gantry-quiesce".into()).spawn(move || {
            thread::sleep(delay);
            let Some(binding) = weak.upgrade() else { return };
            let check = binding.clone();
            binding.dispatcher.run_on_ui_thread(move || {
                if check.resize.try_finish(window) {
                    check.fire_signal(window, &signal::RESIZE_END);
                }
            });
        });
        if let Err(e) = spawned {
            log::error!("failed to spawn quiescence timer: {e}");
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("registrations", &self.registry.len())
            .finish()
    }
}
