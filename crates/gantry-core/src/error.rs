//! Error types for the gantry binding core

use thiserror::Error;

use crate::registry::CallbackId;

/// Binding-related errors
#[derive(Debug, Error)]
pub enum BindingError {
    /// Native toolkit initialisation failed; the caller must abort
    #[error("Failed to initialise toolkit: {0}")]
    ToolkitInit(String),

    /// An operation that requires the UI thread ran somewhere else
    #[error("Operation requires the UI thread")]
    WrongThread,

    /// `sync_ui` called from the UI thread; blocking there would deadlock
    /// the event loop on itself
    #[error("sync_ui called from the UI thread")]
    Deadlock,

    /// A trampoline fired for a callback id with no registration
    #[error("No callback registered for id {0}")]
    UnknownCallback(CallbackId),

    /// The registered closure's shape does not match the signal's arguments
    #[error("Callback shape mismatch: closure expects {expected}, signal delivered {actual}")]
    CallbackType {
        /// Shape of the registered closure
        expected: &'static str,
        /// Shape of the arguments the native signal delivered
        actual: &'static str,
    },

    /// The object's native handle could not be extracted (null handle)
    #[error("Object has no native handle")]
    InvalidHandle,

    /// A managed closure panicked; caught at the dispatch boundary
    #[error("Closure panicked: {0}")]
    ClosurePanic(String),

    /// Stylesheet loading or provider creation failed
    #[error("Stylesheet error: {0}")]
    Style(String),
}

/// Result type alias for binding operations
pub type BindingResult<T> = Result<T, BindingError>;
