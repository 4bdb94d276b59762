//! C trampolines connected to native signals
//!
//! Each trampoline matches one C signal signature. The connection's
//! user-data carries the callback id; the trampoline rebuilds it, packs the
//! C arguments into [`SignalArgs`] and hands both to the binding. Panics
//! are caught at this boundary: unwinding must never cross back into GTK.

#![allow(unsafe_code)]

use std::ffi::{c_int, c_uint};
use std::panic::{self, AssertUnwindSafe};

use gantry_core::{CallbackId, NativeHandle, SignalArgs};
use glib_sys::{gboolean, gpointer, GFALSE, GTRUE};
use gobject_sys::GObject;

fn callback_id(user_data: gpointer) -> CallbackId {
    CallbackId::new(user_data as usize as u64)
}

/// Look up the binding and fire; any panic is logged and swallowed.
fn deliver(user_data: gpointer, args: SignalArgs) -> Option<bool> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        gantry_core::binding().and_then(|binding| binding.fire(callback_id(user_data), args))
    }));
    match result {
        Ok(value) => value,
        Err(_) => {
            log::error!("panic in signal delivery for {}", callback_id(user_data));
            None
        }
    }
}

fn deliver_scalar(user_data: gpointer, raw: i64) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(binding) = gantry_core::binding() {
            binding.fire_scalar(callback_id(user_data), raw);
        }
    }));
    if result.is_err() {
        log::error!("panic in signal delivery for {}", callback_id(user_data));
    }
}

/// `fn(instance, user_data)`: clicked, activate, map, ...
pub(crate) unsafe extern "C" fn no_args(_instance: *mut GObject, user_data: gpointer) {
    deliver(user_data, SignalArgs::None);
}

/// `fn(instance, pspec, user_data)`: `notify::*` property signals; the
/// pspec is dropped, wrappers re-query the property they care about.
pub(crate) unsafe extern "C" fn notify(
    _instance: *mut GObject,
    _pspec: gpointer,
    user_data: gpointer,
) {
    deliver(user_data, SignalArgs::None);
}

/// `fn(instance, gint, user_data)`: dialog `response`
pub(crate) unsafe extern "C" fn scalar_int(
    _instance: *mut GObject,
    value: c_int,
    user_data: gpointer,
) {
    deliver_scalar(user_data, i64::from(value));
}

/// `fn(instance, guint, user_data)`: list-view `activate`
pub(crate) unsafe extern "C" fn scalar_uint(
    _instance: *mut GObject,
    value: c_uint,
    user_data: gpointer,
) {
    deliver_scalar(user_data, i64::from(value));
}

/// `fn(instance, guint, guint, user_data)`: `selection-changed`
pub(crate) unsafe extern "C" fn selection_changed(
    _instance: *mut GObject,
    position: c_uint,
    n_items: c_uint,
    user_data: gpointer,
) {
    deliver(user_data, SignalArgs::Selection(position, n_items));
}

/// `fn(instance, guint, guint, guint, user_data)`: `items-changed`
pub(crate) unsafe extern "C" fn items_changed(
    _instance: *mut GObject,
    position: c_uint,
    removed: c_uint,
    added: c_uint,
    user_data: gpointer,
) {
    deliver(user_data, SignalArgs::Items(position, removed, added));
}

/// `fn(instance, user_data) -> gboolean`: bool-returning signals; the
/// closure runs synchronously, GTK consumes the result immediately.
pub(crate) unsafe extern "C" fn with_return(
    _instance: *mut GObject,
    user_data: gpointer,
) -> gboolean {
    if deliver(user_data, SignalArgs::None) == Some(true) {
        GTRUE
    } else {
        GFALSE
    }
}

/// `fn(widget, gint, gint, gboolean, tooltip, user_data) -> gboolean`:
/// `query-tooltip`
pub(crate) unsafe extern "C" fn query_tooltip(
    _widget: *mut GObject,
    x: c_int,
    y: c_int,
    keyboard_mode: gboolean,
    tooltip: *mut GObject,
    user_data: gpointer,
) -> gboolean {
    let args = SignalArgs::Tooltip {
        x,
        y,
        keyboard: keyboard_mode != GFALSE,
        tooltip: NativeHandle::from_raw(tooltip as usize),
    };
    if deliver(user_data, args) == Some(true) {
        GTRUE
    } else {
        GFALSE
    }
}
