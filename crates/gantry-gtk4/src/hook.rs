//! The native signal hook over GObject signal machinery

#![allow(unsafe_code)]

use std::ffi::CString;
use std::mem;

use gantry_core::{
    Arity, BindingError, BindingResult, CallbackId, NativeHandle, NativeHandlerId, SignalHook,
    SignalName,
};
use glib_sys::gpointer;
use gobject_sys::{g_signal_connect_data, g_signal_handler_disconnect, GCallback, GObject};

use crate::trampolines;

/// Selects the trampoline matching a signal's C signature and connects it
/// with the callback id as user-data.
#[derive(Debug, Default)]
pub struct GtkSignalHook;

/// Trampoline selection: the signal name pins the specialised argument
/// lists, the closure shape picks the C signature for everything else. A
/// parameter-taking closure must never get the no-argument trampoline:
/// GTK would then bind the signal's parameter as the user-data slot.
fn select_trampoline(signal: &SignalName, arity: Arity) -> GCallback {
    let raw: *const () = match signal.as_str() {
        "response" => trampolines::scalar_int as *const (),
        "activate" if arity.has_params => trampolines::scalar_uint as *const (),
        "selection-changed" => trampolines::selection_changed as *const (),
        "items-changed" => trampolines::items_changed as *const (),
        "query-tooltip" => trampolines::query_tooltip as *const (),
        name if name.starts_with("notify") => trampolines::notify as *const (),
        _ if arity.has_return => trampolines::with_return as *const (),
        _ if arity.has_params => trampolines::scalar_int as *const (),
        _ => trampolines::no_args as *const (),
    };
    // GCallback erases the concrete signature; GTK invokes the trampoline
    // with the signal's real C signature.
    unsafe { Some(mem::transmute::<*const (), unsafe extern "C" fn()>(raw)) }
}

impl SignalHook for GtkSignalHook {
    fn connect(
        &self,
        object: NativeHandle,
        signal: &SignalName,
        arity: Arity,
        id: CallbackId,
    ) -> BindingResult<NativeHandlerId> {
        let c_signal = CString::new(signal.as_str())
            .map_err(|_| BindingError::ToolkitInit(format!("signal name {signal} contains NUL")))?;
        let trampoline = select_trampoline(signal, arity);
        let handler = unsafe {
            g_signal_connect_data(
                object.as_raw() as *mut GObject,
                c_signal.as_ptr(),
                trampoline,
                id.raw() as usize as gpointer,
                None,
                0,
            )
        };
        if handler == 0 {
            return Err(BindingError::ToolkitInit(format!(
                "signal {signal} does not exist on {object}"
            )));
        }
        Ok(NativeHandlerId::from_raw(handler as u64))
    }

    fn disconnect(&self, object: NativeHandle, handler: NativeHandlerId) {
        unsafe {
            g_signal_handler_disconnect(object.as_raw() as *mut GObject, handler.raw() as _);
        }
    }
}
