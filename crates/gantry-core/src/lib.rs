//! gantry-core - callback dispatch and UI-thread marshalling for a GTK4
//! binding
//!
//! This crate is the hard kernel of a native-toolkit binding: everything a
//! widget wrapper needs to route native signals to managed closures and
//! back, without touching FFI itself. The toolkit is reached through three
//! narrow seams (an idle-source adapter, a signal hook and a style
//! backend), which the `gantry-gtk4` crate implements with real GTK4 calls
//! and tests implement with mocks.
//!
//! # Core Components
//!
//! - [`UiDispatcher`]: pins the UI thread and schedules closures onto it
//! - [`CallbackRegistry`]: maps native signal connections to managed
//!   closures and tracks per-object handler lifetimes
//! - [`ResizeTracker`]: folds raw size notifications into
//!   start/update/end resize events with a quiescence timer
//! - [`CssCache`]: content-addressed stylesheet providers and the
//!   resize-time priority swap
//! - [`Binding`]: the assembled runtime; one per process in normal use,
//!   many isolated instances in tests
//!
//! # Threading model
//!
//! Every native toolkit call and every managed signal closure runs on the
//! single pinned UI thread. Other threads funnel work through
//! [`run_on_ui_thread`] / [`sync_ui`]. Managed closures must not block.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for binding operations
pub mod error;

/// Opaque native object handles
pub mod handle;

/// UI-thread dispatcher
pub mod dispatch;

/// Signal names, sources, closure shapes and marshalling
pub mod signal;

/// The Unified Callback System registry
pub mod registry;

/// Resize state machine
pub mod resize;

/// CSS provider cache and priority swap
pub mod css;

/// Background tasks with UI-thread delivery
pub mod task;

/// The assembled binding runtime
pub mod runtime;

use std::sync::{Arc, OnceLock};

// Re-exports for convenience
pub use css::{priority, ContentHash, CssCache, ProviderRef, StyleBackend, RESIZE_STYLESHEET};
pub use dispatch::{DispatchJob, IdleAdapter, UiDispatcher};
pub use error::{BindingError, BindingResult};
pub use handle::{AsNativeHandle, NativeHandle};
pub use registry::{CallbackId, CallbackRecord, CallbackRegistry, NativeHandlerId, SignalHook};
pub use resize::{ResizePhase, ResizeTracker, QUIESCE_DELAY};
pub use runtime::{Binding, BindingConfig};
pub use signal::{
    Arity, ResponseType, SignalArgs, SignalClosure, SignalName, SignalSource, QUERY_TOOLTIP,
    RESIZE_END, RESIZE_START, RESIZE_UPDATE,
};
pub use task::{CancelToken, ProgressFn, TaskContext, PROGRESS_INTERVAL};

static BINDING: OnceLock<Arc<Binding>> = OnceLock::new();

/// Install the process-wide binding.
///
/// Called once by the toolkit backend after native initialisation, from
/// the thread that will run the event loop. The caller is responsible for
/// pinning that thread via `binding.dispatcher().mark_ui_thread()`.
///
/// # Errors
/// Fails if a binding was already installed.
pub fn init(config: BindingConfig) -> BindingResult<Arc<Binding>> {
    let binding = Binding::new(config);
    BINDING
        .set(binding.clone())
        .map_err(|_| BindingError::ToolkitInit("binding already initialised".into()))?;
    Ok(binding)
}

/// The process-wide binding, if initialised
#[must_use]
pub fn binding() -> Option<&'static Arc<Binding>> {
    BINDING.get()
}

fn required() -> BindingResult<&'static Arc<Binding>> {
    binding().ok_or_else(|| BindingError::ToolkitInit("binding not initialised".into()))
}

/// Run a closure on the UI thread, fire-and-forget.
///
/// Before initialisation the closure is dropped with an error log; there
/// is no UI thread to run it on.
pub fn run_on_ui_thread<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    match binding() {
        Some(b) => b.dispatcher().run_on_ui_thread(f),
        None => log::error!("run_on_ui_thread before init; dropping closure"),
    }
}

/// Run a closure on the UI thread and block until it completes
pub fn sync_ui<F>(f: F) -> BindingResult<()>
where
    F: FnOnce() + Send + 'static,
{
    required()?.dispatcher().sync_ui(f)
}

/// Whether the calling thread is the UI thread (false before init)
#[must_use]
pub fn is_ui_thread() -> bool {
    binding().is_some_and(|b| b.dispatcher().is_ui_thread())
}

/// Assert that the caller is on the UI thread
pub fn require_ui_thread() -> BindingResult<()> {
    required()?.dispatcher().require_ui_thread()
}

/// Register a closure for a native signal on an object.
///
/// Returns [`CallbackId::INVALID`] when the object yields no handle or the
/// binding is not initialised.
pub fn connect(
    object: &dyn AsNativeHandle,
    signal: impl Into<SignalName>,
    closure: SignalClosure,
) -> CallbackId {
    match binding() {
        Some(b) => b.connect(object, signal, closure),
        None => {
            log::error!("connect before init");
            CallbackId::INVALID
        }
    }
}

/// Remove one signal registration. Idempotent.
pub fn disconnect(id: CallbackId) {
    if let Some(b) = binding() {
        b.disconnect(id);
    }
}

/// Remove every registration on an object. Idempotent.
pub fn disconnect_all(object: &dyn AsNativeHandle) {
    if let Some(b) = binding() {
        b.disconnect_all(object);
    }
}

/// Load a stylesheet through the content-addressed provider cache
pub fn load_css(content: &str) -> BindingResult<ProviderRef> {
    required()?.css().load_css(content)
}

/// Read a stylesheet file and load it through the cache
pub fn load_css_file(path: &std::path::Path) -> BindingResult<ProviderRef> {
    required()?.css().load_css_file(path)
}

/// Attach a provider to the default display at the given priority
pub fn add_provider_for_display(provider: ProviderRef, priority: u32) -> BindingResult<()> {
    required()?.css().add_for_display(provider, priority);
    Ok(())
}

/// Run a task off the UI thread; deliver progress and completion on it
pub fn background_task<T, F, D>(
    task: F,
    on_done: D,
    on_progress: Option<ProgressFn>,
) -> BindingResult<CancelToken>
where
    T: Send + 'static,
    F: FnOnce(&TaskContext) -> T + Send + 'static,
    D: FnOnce(T) + Send + 'static,
{
    Ok(required()?.background_task(task, on_done, on_progress))
}

/// Process-shutdown finaliser: sever every surviving native connection
pub fn shutdown() {
    if let Some(b) = binding() {
        b.teardown();
    }
}
