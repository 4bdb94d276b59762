//! Resize state machine
//!
//! The toolkit reports window size changes as raw property notifications,
//! many per second during a drag-resize. This module folds them into a
//! three-event stream per window: start (first change after quiescence),
//! update (each further change), end (no change for the quiescence delay).
//!
//! The tracker only manages state; event emission and the quiescence timer
//! live on [`crate::Binding`], which owns the dispatcher the closures must
//! run on.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::handle::NativeHandle;

/// Default quiescence threshold: a resize ends after this long without a
/// size change.
pub const QUIESCE_DELAY: Duration = Duration::from_millis(200);

/// Per-window resize state
#[derive(Debug, Clone, Copy)]
struct ResizeState {
    is_resizing: bool,
    last_event: Instant,
    started: Instant,
    width: i32,
    height: i32,
}

impl ResizeState {
    fn new() -> Self {
        let now = Instant::now();
        Self { is_resizing: false, last_event: now, started: now, width: 0, height: 0 }
    }
}

/// Transition produced by a size-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    /// First change after quiescence: emit `resize-start`
    Started,
    /// Change while already resizing: emit `resize-update`
    Updated,
}

/// Tracks resize state for every window with a resize registration.
///
/// State is created lazily when a resize callback is registered and
/// destroyed with the window's registrations.
pub struct ResizeTracker {
    quiesce: Duration,
    windows: Mutex<HashMap<NativeHandle, ResizeState>>,
}

impl ResizeTracker {
    /// Create a tracker with the given quiescence delay
    #[must_use]
    pub fn new(quiesce: Duration) -> Self {
        Self { quiesce, windows: Mutex::new(HashMap::new()) }
    }

    /// The configured quiescence delay
    #[must_use]
    pub fn quiesce_delay(&self) -> Duration {
        self.quiesce
    }

    /// Start tracking a window (no-op if already tracked)
    pub fn ensure(&self, window: NativeHandle) {
        self.lock().entry(window).or_insert_with(ResizeState::new);
    }

    /// Stop tracking a window
    pub fn remove(&self, window: NativeHandle) {
        self.lock().remove(&window);
    }

    /// Whether a window is tracked
    #[must_use]
    pub fn is_tracked(&self, window: NativeHandle) -> bool {
        self.lock().contains_key(&window)
    }

    /// Whether a window is currently mid-resize
    #[must_use]
    pub fn is_resizing(&self, window: NativeHandle) -> bool {
        self.lock().get(&window).is_some_and(|s| s.is_resizing)
    }

    /// Record a size-change notification.
    ///
    /// Returns the transition to emit, or `None` when the event must be
    /// dropped: the window is untracked (already destroyed) or the size did
    /// not actually change (spurious property notification).
    pub fn apply(&self, window: NativeHandle, width: i32, height: i32) -> Option<ResizePhase> {
        let mut windows = self.lock();
        let state = windows.get_mut(&window)?;
        if state.width == width && state.height == height {
            return None;
        }
        let now = Instant::now();
        state.width = width;
        state.height = height;
        state.last_event = now;
        if state.is_resizing {
            Some(ResizePhase::Updated)
        } else {
            state.is_resizing = true;
            state.started = now;
            Some(ResizePhase::Started)
        }
    }

    /// Quiescence check: if the window is mid-resize and no change arrived
    /// for the full quiescence delay, mark the resize finished and return
    /// `true` (the caller emits `resize-end`). A stale timer whose window
    /// saw a later change returns `false`; the later timer will fire.
    pub fn try_finish(&self, window: NativeHandle) -> bool {
        let mut windows = self.lock();
        let Some(state) = windows.get_mut(&window) else {
            return false;
        };
        if state.is_resizing && state.last_event.elapsed() >= self.quiesce {
            state.is_resizing = false;
            log::debug!(
                "resize on {window} settled after {:?} at {}x{}",
                state.started.elapsed(),
                state.width,
                state.height
            );
            true
        } else {
            false
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<NativeHandle, ResizeState>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResizeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeTracker")
            .field("quiesce", &self.quiesce)
            .field("tracked", &self.lock().len())
            .finish()
    }
}

impl Default for ResizeTracker {
    fn default() -> Self {
        Self::new(QUIESCE_DELAY)
    }
}
