//! Idle-adapter implementations
//!
//! The default adapter schedules each job as a one-shot GLib idle source.
//! The job travels as a `Box<Option<DispatchJob>>`: the source function
//! takes and runs it, the destroy notify frees the box whether or not the
//! source ever ran.

#![allow(unsafe_code)]

use std::sync::Arc;

use gantry_core::{DispatchJob, IdleAdapter};
use glib_sys::{gboolean, gpointer, GFALSE, G_PRIORITY_DEFAULT_IDLE};

unsafe extern "C" fn run_job(data: gpointer) -> gboolean {
    let slot = &mut *data.cast::<Option<DispatchJob>>();
    if let Some(job) = slot.take() {
        job();
    }
    GFALSE
}

unsafe extern "C" fn drop_job(data: gpointer) {
    drop(Box::from_raw(data.cast::<Option<DispatchJob>>()));
}

/// Adapter over `g_idle_add_full`: jobs run on the GLib main loop thread
/// in scheduling order.
#[must_use]
pub fn glib_idle_adapter() -> IdleAdapter {
    Arc::new(|job: DispatchJob| {
        let data = Box::into_raw(Box::new(Some(job)));
        unsafe {
            glib_sys::g_idle_add_full(
                G_PRIORITY_DEFAULT_IDLE,
                Some(run_job),
                data.cast(),
                Some(drop_job),
            );
        }
    })
}

/// Adapter over the OS main queue, for applications whose main thread is
/// owned by AppKit rather than the GLib loop.
#[cfg(target_os = "macos")]
#[must_use]
pub fn main_queue_adapter() -> IdleAdapter {
    Arc::new(|job: DispatchJob| {
        dispatch::Queue::main().exec_async(move || job());
    })
}
