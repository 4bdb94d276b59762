//! GTK4 backend for the gantry binding core
//!
//! Implements gantry-core's three seams with real GTK4 calls:
//! - the idle adapter over `g_idle_add_full` (or the macOS main queue)
//! - the signal hook over `g_signal_connect_data` plus the C trampolines
//! - the style backend over CSS providers on the default display
//!
//! Everything here is behind the `ffi` cargo feature, which links the
//! system GTK4 libraries. Without it the crate is an empty shell and the
//! workspace builds on hosts with no GTK development packages;
//! gantry-core's mock-backed tests cover the toolkit-independent logic.

pub use gantry_core;

#[cfg(feature = "ffi")]
mod app;
#[cfg(feature = "ffi")]
mod hook;
#[cfg(feature = "ffi")]
mod idle;
#[cfg(feature = "ffi")]
mod style;
#[cfg(feature = "ffi")]
mod trampolines;
#[cfg(feature = "ffi")]
mod window;

#[cfg(feature = "ffi")]
pub use app::{initialize_toolkit, quit_main_loop, run_main_loop};
#[cfg(feature = "ffi")]
pub use hook::GtkSignalHook;
#[cfg(feature = "ffi")]
pub use idle::glib_idle_adapter;
#[cfg(all(feature = "ffi", target_os = "macos"))]
pub use idle::main_queue_adapter;
#[cfg(feature = "ffi")]
pub use style::GtkStyleBackend;
#[cfg(feature = "ffi")]
pub use window::Window;
