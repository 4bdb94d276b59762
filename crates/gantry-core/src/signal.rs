//! Signal names, sources, closure shapes and argument marshalling
//!
//! This module is the type-level half of the Unified Callback System:
//! - [`SignalName`]: the native signal identifier, string-compared
//! - [`SignalSource`]: disambiguates widget kinds that reuse a signal name
//! - [`SignalClosure`]: a typed enum of the managed closure shapes the
//!   binding supports (one variant per marshalling-table row)
//! - [`SignalArgs`]: the raw values a trampoline extracted from a native
//!   emission
//! - [`invoke`]: the marshalling step that pairs the two

use std::borrow::Cow;
use std::fmt;

use crate::error::{BindingError, BindingResult};
use crate::handle::NativeHandle;

/// A short ASCII string identifying a native signal
/// (e.g. `clicked`, `notify::default-width`, `query-tooltip`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalName(Cow<'static, str>);

impl SignalName {
    /// Create a signal name from a static string
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a signal name from an owned string
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The signal name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for SignalName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for SignalName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Synthetic signal emitted when a drag-resize begins
pub const RESIZE_START: SignalName = SignalName::from_static("resize-start");
/// Synthetic signal emitted for each size change while resizing
pub const RESIZE_UPDATE: SignalName = SignalName::from_static("resize-update");
/// Synthetic signal emitted once the resize has quiesced
pub const RESIZE_END: SignalName = SignalName::from_static("resize-end");
/// The tooltip query signal; its trampoline returns a value synchronously
pub const QUERY_TOOLTIP: SignalName = SignalName::from_static("query-tooltip");

/// Discriminator resolving ambiguity when different widget kinds reuse the
/// same signal name with different semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalSource {
    /// A plain no-argument signal (`clicked`, `activate` on buttons, ...)
    Generic,
    /// `activate` on a list view: carries the activated row position
    ListItemActivate,
    /// `activate` on an action: no managed arguments
    ActionActivate,
    /// `selection-changed` on a selection model: position and count
    ListSelectionChanged,
    /// Synthetic: drag-resize began
    ResizeStart,
    /// Synthetic: size changed while resizing
    ResizeUpdate,
    /// Synthetic: drag-resize quiesced
    ResizeEnd,
    /// `response` on a dialog: carries the response code
    DialogResponse,
    /// `query-tooltip`: pointer coordinates plus a tooltip object; returns
    /// whether to show the tooltip
    TooltipQuery,
    /// `items-changed` on a list model: position, removed, added
    ItemsChanged,
}

impl SignalSource {
    /// Whether this source is synthesised by the resize state machine
    /// rather than connected to a native signal.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::ResizeStart | Self::ResizeUpdate | Self::ResizeEnd)
    }
}

/// Declared parameter/return shape of a registered closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// The closure consumes signal parameters
    pub has_params: bool,
    /// The closure produces a return value the native side consumes
    pub has_return: bool,
}

/// Dialog response codes, mirroring the native toolkit's constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// No response (dialog destroyed)
    None,
    /// Programmatic rejection
    Reject,
    /// Programmatic acceptance
    Accept,
    /// Window closed via the window manager
    DeleteEvent,
    /// "OK" button
    Ok,
    /// "Cancel" button
    Cancel,
    /// "Close" button
    Close,
    /// "Yes" button
    Yes,
    /// "No" button
    No,
    /// "Apply" button
    Apply,
    /// "Help" button
    Help,
    /// An application-defined response code (non-negative)
    Other(i32),
}

impl ResponseType {
    /// Convert from the native response code
    #[must_use]
    pub fn from_raw(code: i32) -> Self {
        match code {
            -1 => Self::None,
            -2 => Self::Reject,
            -3 => Self::Accept,
            -4 => Self::DeleteEvent,
            -5 => Self::Ok,
            -6 => Self::Cancel,
            -7 => Self::Close,
            -8 => Self::Yes,
            -9 => Self::No,
            -10 => Self::Apply,
            -11 => Self::Help,
            other => Self::Other(other),
        }
    }

    /// Convert to the native response code
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::None => -1,
            Self::Reject => -2,
            Self::Accept => -3,
            Self::DeleteEvent => -4,
            Self::Ok => -5,
            Self::Cancel => -6,
            Self::Close => -7,
            Self::Yes => -8,
            Self::No => -9,
            Self::Apply => -10,
            Self::Help => -11,
            Self::Other(code) => code,
        }
    }
}

/// A managed closure, typed by shape.
///
/// One variant per row of the marshalling table. The dynamic original kept
/// untyped closures and introspected them at dispatch; here the variant
/// itself carries the shape, and mismatches surface as
/// [`BindingError::CallbackType`] at marshalling time.
pub enum SignalClosure {
    /// `fn()`: Generic, ActionActivate, the synthetic resize sources
    Unit(Box<dyn Fn() + Send + Sync>),
    /// `fn(i32)`: generic single-scalar signals
    Scalar(Box<dyn Fn(i32) + Send + Sync>),
    /// `fn(ResponseType)`: DialogResponse
    Response(Box<dyn Fn(ResponseType) + Send + Sync>),
    /// `fn(usize)`: ListItemActivate
    Position(Box<dyn Fn(usize) + Send + Sync>),
    /// `fn(usize, usize)`: ListSelectionChanged
    Selection(Box<dyn Fn(usize, usize) + Send + Sync>),
    /// `fn(usize, usize, usize)`: ItemsChanged
    Items(Box<dyn Fn(usize, usize, usize) + Send + Sync>),
    /// `fn() -> bool`: signals whose return value controls native behaviour
    Return(Box<dyn Fn() -> bool + Send + Sync>),
    /// `fn(i32, i32, bool, NativeHandle) -> bool`: TooltipQuery
    Tooltip(Box<dyn Fn(i32, i32, bool, NativeHandle) -> bool + Send + Sync>),
}

impl SignalClosure {
    /// Wrap a no-argument closure
    pub fn unit(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self::Unit(Box::new(f))
    }

    /// Wrap a single-scalar closure
    pub fn scalar(f: impl Fn(i32) + Send + Sync + 'static) -> Self {
        Self::Scalar(Box::new(f))
    }

    /// Wrap a dialog-response closure
    pub fn response(f: impl Fn(ResponseType) + Send + Sync + 'static) -> Self {
        Self::Response(Box::new(f))
    }

    /// Wrap a list-position closure
    pub fn position(f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        Self::Position(Box::new(f))
    }

    /// Wrap a selection-changed closure
    pub fn selection(f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        Self::Selection(Box::new(f))
    }

    /// Wrap an items-changed closure
    pub fn items(f: impl Fn(usize, usize, usize) + Send + Sync + 'static) -> Self {
        Self::Items(Box::new(f))
    }

    /// Wrap a bool-returning closure
    pub fn returning(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self::Return(Box::new(f))
    }

    /// Wrap a tooltip-query closure
    pub fn tooltip(f: impl Fn(i32, i32, bool, NativeHandle) -> bool + Send + Sync + 'static) -> Self {
        Self::Tooltip(Box::new(f))
    }

    /// Declared parameter/return shape of this closure
    #[must_use]
    pub fn arity(&self) -> Arity {
        match self {
            Self::Unit(_) => Arity { has_params: false, has_return: false },
            Self::Scalar(_) | Self::Response(_) | Self::Position(_) | Self::Selection(_) | Self::Items(_) => {
                Arity { has_params: true, has_return: false }
            }
            Self::Return(_) => Arity { has_params: false, has_return: true },
            Self::Tooltip(_) => Arity { has_params: true, has_return: true },
        }
    }

    /// Shape name for diagnostics
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Unit(_) => "fn()",
            Self::Scalar(_) => "fn(i32)",
            Self::Response(_) => "fn(ResponseType)",
            Self::Position(_) => "fn(usize)",
            Self::Selection(_) => "fn(usize, usize)",
            Self::Items(_) => "fn(usize, usize, usize)",
            Self::Return(_) => "fn() -> bool",
            Self::Tooltip(_) => "fn(i32, i32, bool, Tooltip) -> bool",
        }
    }
}

impl fmt::Debug for SignalClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalClosure").field(&self.shape_name()).finish()
    }
}

/// Raw argument values a trampoline extracted from a native emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalArgs {
    /// No arguments
    None,
    /// One scalar parameter
    Scalar(i64),
    /// Dialog response code
    Response(i32),
    /// List position
    Position(u32),
    /// Selection position and count
    Selection(u32, u32),
    /// Items-changed position, removed, added
    Items(u32, u32, u32),
    /// Tooltip query arguments
    Tooltip {
        /// Pointer x coordinate
        x: i32,
        /// Pointer y coordinate
        y: i32,
        /// Triggered by keyboard navigation
        keyboard: bool,
        /// Opaque native tooltip object
        tooltip: NativeHandle,
    },
}

impl SignalArgs {
    /// Interpret a raw scalar parameter according to the registration's
    /// signal source. Used by the single-scalar trampoline, which cannot
    /// know on its own whether the value is a response code or a position.
    #[must_use]
    pub fn from_scalar(source: SignalSource, raw: i64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        match source {
            SignalSource::DialogResponse => Self::Response(raw as i32),
            SignalSource::ListItemActivate => Self::Position(raw as u32),
            _ => Self::Scalar(raw),
        }
    }

    /// Shape name for diagnostics
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::None => "()",
            Self::Scalar(_) => "(i64)",
            Self::Response(_) => "(response)",
            Self::Position(_) => "(position)",
            Self::Selection(..) => "(position, count)",
            Self::Items(..) => "(position, removed, added)",
            Self::Tooltip { .. } => "(x, y, keyboard, tooltip)",
        }
    }
}

/// Derive the [`SignalSource`] for a registration from the signal name and
/// the registered closure's shape.
///
/// The closure shape stands in for the widget kind: `activate` with a
/// position closure is a list activation, with a unit closure an action
/// activation.
#[must_use]
pub fn classify(signal: &SignalName, closure: &SignalClosure) -> SignalSource {
    match signal.as_str() {
        "response" => SignalSource::DialogResponse,
        "selection-changed" => SignalSource::ListSelectionChanged,
        "items-changed" => SignalSource::ItemsChanged,
        "query-tooltip" => SignalSource::TooltipQuery,
        "resize-start" => SignalSource::ResizeStart,
        "resize-update" => SignalSource::ResizeUpdate,
        "resize-end" => SignalSource::ResizeEnd,
        "activate" => match closure {
            SignalClosure::Position(_) => SignalSource::ListItemActivate,
            _ => SignalSource::ActionActivate,
        },
        _ => SignalSource::Generic,
    }
}

/// Marshal native arguments into a managed closure and run it.
///
/// Returns the closure's return value for the return-shaped variants.
/// A shape mismatch yields [`BindingError::CallbackType`]; the caller logs
/// it and suppresses the event. One mismatch is tolerated: a scalar
/// parameter delivered to a unit closure is accepted with the argument
/// dropped, matching signals whose parameter the handler does not care
/// about.
pub fn invoke(closure: &SignalClosure, args: SignalArgs) -> BindingResult<Option<bool>> {
    #[allow(clippy::cast_possible_truncation)]
    match (closure, args) {
        (SignalClosure::Unit(f), SignalArgs::None | SignalArgs::Scalar(_)) => {
            f();
            Ok(None)
        }
        (SignalClosure::Scalar(f), SignalArgs::Scalar(v)) => {
            f(v as i32);
            Ok(None)
        }
        (SignalClosure::Response(f), SignalArgs::Response(code)) => {
            f(ResponseType::from_raw(code));
            Ok(None)
        }
        (SignalClosure::Position(f), SignalArgs::Position(pos)) => {
            f(pos as usize);
            Ok(None)
        }
        (SignalClosure::Selection(f), SignalArgs::Selection(pos, count)) => {
            f(pos as usize, count as usize);
            Ok(None)
        }
        (SignalClosure::Items(f), SignalArgs::Items(pos, removed, added)) => {
            f(pos as usize, removed as usize, added as usize);
            Ok(None)
        }
        (SignalClosure::Return(f), SignalArgs::None) => Ok(Some(f())),
        (SignalClosure::Tooltip(f), SignalArgs::Tooltip { x, y, keyboard, tooltip }) => {
            Ok(Some(f(x, y, keyboard, tooltip)))
        }
        (closure, args) => Err(BindingError::CallbackType {
            expected: closure.shape_name(),
            actual: args.shape_name(),
        }),
    }
}
