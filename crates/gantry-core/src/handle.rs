//! Opaque native object handles
//!
//! The core never dereferences a native object. Widget wrappers hand their
//! underlying pointer to the core as a [`NativeHandle`], which is compared
//! only by bit identity and used as a registry key. A handle is valid only
//! while the wrapper that produced it owns the native object; wrappers must
//! call `disconnect_all` before releasing it.

/// Opaque pointer value identifying a native object.
///
/// Compared only by bit identity; never dereferenced by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(usize);

impl NativeHandle {
    /// The null handle. Objects without a native counterpart yield this.
    pub const NULL: Self = Self(0);

    /// Create a handle from a raw pointer value
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Get the raw pointer value
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Check whether this is the null handle
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Extraction seam between widget wrappers and the core.
///
/// Every widget wrapper (and the adjustment, action and list-item-factory
/// wrappers) implements this. Implementers must return the same handle for
/// the whole lifetime of the wrapped object.
pub trait AsNativeHandle {
    /// The native handle of the wrapped object
    fn native_handle(&self) -> NativeHandle;
}

impl AsNativeHandle for NativeHandle {
    fn native_handle(&self) -> NativeHandle {
        *self
    }
}
