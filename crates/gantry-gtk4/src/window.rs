//! Top-level window wrapper
//!
//! Thin: the window owns its native pointer and feeds size notifications
//! into the core's resize state machine. Everything else (signal routing,
//! CSS, quiescence) happens in gantry-core.

#![allow(unsafe_code)]

use std::ffi::CString;

use gantry_core::{
    AsNativeHandle, BindingError, BindingResult, CallbackId, NativeHandle, SignalClosure,
    RESIZE_END, RESIZE_START, RESIZE_UPDATE,
};
use gtk4_sys::{
    gtk_window_destroy, gtk_window_get_default_size, gtk_window_new, gtk_window_present,
    gtk_window_set_default_size, gtk_window_set_title, GtkWindow,
};

/// A top-level GTK window
#[derive(Debug)]
pub struct Window {
    handle: NativeHandle,
}

impl Window {
    /// Create a window with a title and initial size.
    ///
    /// # Errors
    /// Fails off the UI thread or when GTK cannot create the window.
    pub fn new(title: &str, width: i32, height: i32) -> BindingResult<Self> {
        gantry_core::require_ui_thread()?;
        let raw = unsafe { gtk_window_new() };
        if raw.is_null() {
            return Err(BindingError::ToolkitInit("gtk_window_new failed".into()));
        }
        let window = Self { handle: NativeHandle::from_raw(raw as usize) };
        if let Ok(c_title) = CString::new(title) {
            unsafe { gtk_window_set_title(window.as_ptr(), c_title.as_ptr()) };
        }
        unsafe { gtk_window_set_default_size(window.as_ptr(), width, height) };
        window.track_size_changes();
        Ok(window)
    }

    fn as_ptr(&self) -> *mut GtkWindow {
        self.handle.as_raw() as *mut GtkWindow
    }

    /// Feed default-size property notifications into the resize state
    /// machine. The notify closure re-queries the size; the pspec carries
    /// nothing useful.
    fn track_size_changes(&self) {
        let handle = self.handle;
        for property in ["notify::default-width", "notify::default-height"] {
            gantry_core::connect(
                self,
                property,
                SignalClosure::unit(move || {
                    if let Some(binding) = gantry_core::binding() {
                        let (width, height) = query_default_size(handle);
                        binding.notify_size_change(handle, width, height);
                    }
                }),
            );
        }
    }

    /// Current default size as (width, height)
    #[must_use]
    pub fn default_size(&self) -> (i32, i32) {
        query_default_size(self.handle)
    }

    /// Show the window
    pub fn present(&self) {
        unsafe { gtk_window_present(self.as_ptr()) };
    }

    /// Run a closure when a drag-resize begins
    pub fn on_resize_start(&self, f: impl Fn() + Send + Sync + 'static) -> CallbackId {
        gantry_core::connect(self, RESIZE_START, SignalClosure::unit(f))
    }

    /// Run a closure for each size change during a drag-resize
    pub fn on_resize_update(&self, f: impl Fn() + Send + Sync + 'static) -> CallbackId {
        gantry_core::connect(self, RESIZE_UPDATE, SignalClosure::unit(f))
    }

    /// Run a closure when a drag-resize quiesces
    pub fn on_resize_end(&self, f: impl Fn() + Send + Sync + 'static) -> CallbackId {
        gantry_core::connect(self, RESIZE_END, SignalClosure::unit(f))
    }

    /// Swap in the lightweight resize stylesheet while this window is
    /// being drag-resized.
    pub fn setup_css_optimized_resize(&self) -> (CallbackId, CallbackId) {
        match gantry_core::binding() {
            Some(binding) => binding.setup_optimized_resize(self),
            None => {
                log::error!("setup_css_optimized_resize before init");
                (CallbackId::INVALID, CallbackId::INVALID)
            }
        }
    }

    /// Destroy the window. Registrations are severed first so late signal
    /// emissions during destruction find nothing.
    pub fn destroy(self) {
        gantry_core::disconnect_all(&self);
        unsafe { gtk_window_destroy(self.as_ptr()) };
    }
}

impl AsNativeHandle for Window {
    fn native_handle(&self) -> NativeHandle {
        self.handle
    }
}

fn query_default_size(handle: NativeHandle) -> (i32, i32) {
    let mut width = 0;
    let mut height = 0;
    unsafe {
        gtk_window_get_default_size(handle.as_raw() as *mut GtkWindow, &mut width, &mut height);
    }
    (width, height)
}
