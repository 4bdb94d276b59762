//! The style backend over GTK CSS providers

#![allow(unsafe_code)]

use gantry_core::{BindingError, BindingResult, NativeHandle, StyleBackend};
use gtk4_sys::{
    gtk_css_provider_load_from_data, gtk_css_provider_new,
    gtk_style_context_add_provider_for_display, gtk_style_context_remove_provider_for_display,
    GtkStyleProvider,
};

/// Creates CSS providers and attaches them to the default display.
///
/// Must only be used from the UI thread; the CSS cache guarantees this by
/// construction since every caller is a UI-thread closure.
#[derive(Debug, Default)]
pub struct GtkStyleBackend;

impl StyleBackend for GtkStyleBackend {
    fn create_provider(&self, content: &str) -> BindingResult<NativeHandle> {
        unsafe {
            let provider = gtk_css_provider_new();
            if provider.is_null() {
                return Err(BindingError::Style("gtk_css_provider_new failed".into()));
            }
            // Length-delimited: no NUL termination required.
            #[allow(clippy::cast_possible_wrap)]
            gtk_css_provider_load_from_data(
                provider,
                content.as_ptr().cast(),
                content.len() as isize,
            );
            Ok(NativeHandle::from_raw(provider as usize))
        }
    }

    fn add_for_display(&self, provider: NativeHandle, priority: u32) {
        unsafe {
            let display = gdk4_sys::gdk_display_get_default();
            if display.is_null() {
                log::error!("no default display; dropping provider {provider}");
                return;
            }
            gtk_style_context_add_provider_for_display(
                display,
                provider.as_raw() as *mut GtkStyleProvider,
                priority,
            );
        }
    }

    fn remove_for_display(&self, provider: NativeHandle) {
        unsafe {
            let display = gdk4_sys::gdk_display_get_default();
            if display.is_null() {
                return;
            }
            gtk_style_context_remove_provider_for_display(
                display,
                provider.as_raw() as *mut GtkStyleProvider,
            );
        }
    }
}
