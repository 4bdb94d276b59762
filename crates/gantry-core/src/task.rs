//! Background tasks with UI-thread delivery
//!
//! Long-running work must stay off the UI thread, but its progress and
//! completion closures must run on it. [`Binding::background_task`] spawns
//! a worker thread and funnels both through the dispatcher. Cancellation is
//! cooperative: the task polls its token, and a cancelled task's completion
//! closure still runs (it is responsible for checking the token).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::dispatch::UiDispatcher;
use crate::runtime::Binding;

/// Minimum interval between progress deliveries. A drag-resize repaints at
/// frame rate; progress updates faster than this are dropped, except the
/// final (fraction ≥ 1.0) one.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Cooperative cancellation handle for a background task
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress closure, executed on the UI thread with a fraction in `0..=1`
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Handle given to a running task for progress reports and cancellation
/// checks.
pub struct TaskContext {
    dispatcher: Arc<UiDispatcher>,
    token: CancelToken,
    on_progress: Option<Arc<dyn Fn(f64) + Send + Sync>>,
    last_progress: Mutex<Option<Instant>>,
    interval: Duration,
}

impl TaskContext {
    pub(crate) fn new(
        dispatcher: Arc<UiDispatcher>,
        token: CancelToken,
        on_progress: Option<ProgressFn>,
        interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            token,
            on_progress: on_progress.map(Arc::from),
            last_progress: Mutex::new(None),
            interval,
        }
    }

    /// Whether the task's token was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Report progress; delivered to the UI thread, rate-limited to one
    /// update per [`PROGRESS_INTERVAL`]. A fraction at or above 1.0 always
    /// goes through.
    pub fn progress(&self, fraction: f64) {
        let Some(callback) = &self.on_progress else { return };
        {
            let mut last = self.last_progress.lock().unwrap_or_else(PoisonError::into_inner);
            let due = fraction >= 1.0
                || last.map_or(true, |at| at.elapsed() >= self.interval);
            if !due {
                return;
            }
            *last = Some(Instant::now());
        }
        let callback = callback.clone();
        self.dispatcher.run_on_ui_thread(move || callback(fraction.clamp(0.0, 1.0)));
    }
}

impl Binding {
    /// Run `task` on a worker thread; deliver progress and the completion
    /// closure on the UI thread.
    ///
    /// The returned token cancels cooperatively: the task observes it
    /// through its [`TaskContext`]. The completion closure runs even after
    /// cancellation and must check the token itself.
    pub fn background_task<T, F, D>(
        &self,
        task: F,
        on_done: D,
        on_progress: Option<ProgressFn>,
    ) -> CancelToken
    where
        T: Send + 'static,
        F: FnOnce(&TaskContext) -> T + Send + 'static,
        D: FnOnce(T) + Send + 'static,
    {
        let token = CancelToken::new();
        let context = TaskContext::new(
            self.dispatcher().clone(),
            token.clone(),
            on_progress,
            self.progress_interval(),
        );
        let dispatcher = self.dispatcher().clone();
        let spawned = thread::Builder::new().name("gantry-task".into()).spawn(move || {
            let result = task(&context);
            dispatcher.run_on_ui_thread(move || on_done(result));
        });
        if let Err(e) = spawned {
            log::error!("failed to spawn background task: {e}");
        }
        token
    }
}
