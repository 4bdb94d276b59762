//! Toolkit initialisation and the main loop

#![allow(unsafe_code)]

use std::env;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gantry_core::{Binding, BindingConfig, BindingError, BindingResult};
use glib_sys::{
    g_main_loop_new, g_main_loop_quit, g_main_loop_run, g_main_loop_unref, GMainLoop, GFALSE,
};

use crate::hook::GtkSignalHook;
use crate::idle::glib_idle_adapter;
use crate::style::GtkStyleBackend;

static MAIN_LOOP: AtomicUsize = AtomicUsize::new(0);

/// Initialise GTK4 and install the process-wide binding.
///
/// Must be called from the thread that will run the main loop; that thread
/// is pinned as the UI thread. `GANTRY_RENDERER` selects the GSK renderer
/// when the environment has not already chosen one.
///
/// # Errors
/// Fails when GTK cannot initialise (usually no display) or a binding was
/// already installed.
pub fn initialize_toolkit() -> BindingResult<Arc<Binding>> {
    configure_renderer();
    let ok = unsafe { gtk4_sys::gtk_init_check() };
    if ok == GFALSE {
        return Err(BindingError::ToolkitInit(
            "gtk_init_check failed (no display?)".into(),
        ));
    }
    let config = BindingConfig::new(
        glib_idle_adapter(),
        Arc::new(GtkSignalHook),
        Arc::new(GtkStyleBackend),
    );
    let binding = gantry_core::init(config)?;
    binding.dispatcher().mark_ui_thread();
    log::info!("GTK4 initialised, UI thread pinned");
    Ok(binding)
}

fn configure_renderer() {
    if env::var_os("GSK_RENDERER").is_none() {
        if let Some(renderer) = env::var_os("GANTRY_RENDERER") {
            log::debug!("selecting GSK renderer {renderer:?}");
            env::set_var("GSK_RENDERER", renderer);
        }
    }
}

/// Run the GLib main loop until [`quit_main_loop`] is called.
///
/// Blocks the calling (UI) thread.
pub fn run_main_loop() {
    unsafe {
        let main_loop = g_main_loop_new(ptr::null_mut(), GFALSE);
        MAIN_LOOP.store(main_loop as usize, Ordering::SeqCst);
        g_main_loop_run(main_loop);
        MAIN_LOOP.store(0, Ordering::SeqCst);
        g_main_loop_unref(main_loop);
    }
}

/// Stop the running main loop. Safe from any thread; a no-op when the loop
/// is not running.
pub fn quit_main_loop() {
    let raw = MAIN_LOOP.load(Ordering::SeqCst);
    if raw != 0 {
        unsafe { g_main_loop_quit(raw as *mut GMainLoop) };
    }
}
