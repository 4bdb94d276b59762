//! The Unified Callback System registry
//!
//! Maps native signal connections back to managed closures. Each
//! registration is a [`CallbackRecord`] held in three indexes that must
//! always agree:
//! - `by_id`: callback id → record (trampoline lookup by user-data)
//! - `handlers_by_object`: object → its handler ids (cascade disconnect)
//! - `by_object_signal`: object → signal → closure (lookup for callers that
//!   identify by object and signal, such as the resize state machine)
//!
//! Lock discipline: every lock is taken for a single index operation and
//! released before any native call. The toolkit may re-enter a trampoline
//! from inside `signal_connect` or `signal_handler_disconnect`; because the
//! record is inserted into `by_id` before the native connect and no lock is
//! held across native calls, a re-entrant emission always finds its closure.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{BindingError, BindingResult};
use crate::handle::NativeHandle;
use crate::signal::{self, Arity, SignalClosure, SignalName, SignalSource};

/// Globally unique, monotonically increasing callback identifier.
///
/// Assigned at registration and returned to the caller as an opaque handle
/// for later disconnection. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Sentinel returned when registration fails (id 0 is never assigned)
    pub const INVALID: Self = Self(0);

    /// Create a callback id from a raw value
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is a real registration id
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle the native toolkit returns when a signal is connected.
///
/// Needed to sever that specific connection. Synthetic registrations (the
/// resize sources) have no native connection and carry [`Self::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandlerId(u64);

impl NativeHandlerId {
    /// No native connection
    pub const NONE: Self = Self(0);

    /// Create a handler id from the toolkit's raw value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The toolkit's raw value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether a native connection exists
    #[must_use]
    pub const fn is_connected(self) -> bool {
        self.0 != 0
    }
}

/// Seam to the native toolkit's signal machinery.
///
/// The GTK backend implements this with `g_signal_connect_data` plus
/// trampoline selection; tests implement it with a mock that records
/// connections and can fire them.
pub trait SignalHook: Send + Sync {
    /// Connect the trampoline matching `arity` (and the signal, for the
    /// specialised argument lists) to `signal` on `object`, with `id` as
    /// the user-data the trampoline will get back.
    fn connect(
        &self,
        object: NativeHandle,
        signal: &SignalName,
        arity: Arity,
        id: CallbackId,
    ) -> BindingResult<NativeHandlerId>;

    /// Sever one native connection
    fn disconnect(&self, object: NativeHandle, handler: NativeHandlerId);
}

/// The authoritative per-registration record
#[derive(Debug, Clone)]
pub struct CallbackRecord {
    /// Registration id
    pub id: CallbackId,
    /// The signal emitter
    pub object: NativeHandle,
    /// The connected signal
    pub signal: SignalName,
    /// Disambiguated signal semantics
    pub source: SignalSource,
    /// The managed closure
    pub closure: Arc<SignalClosure>,
    /// Declared closure shape
    pub arity: Arity,
    /// The native connection, [`NativeHandlerId::NONE`] for synthetic sources
    pub native_handler: NativeHandlerId,
}

/// The process-wide callback registry.
///
/// Also constructible as an isolated value for tests; the process singleton
/// lives inside [`crate::Binding`].
pub struct CallbackRegistry {
    hook: Arc<dyn SignalHook>,
    next_id: AtomicU64,
    by_id: RwLock<HashMap<CallbackId, CallbackRecord>>,
    handlers_by_object: RwLock<HashMap<NativeHandle, HashMap<CallbackId, NativeHandlerId>>>,
    by_object_signal: RwLock<HashMap<NativeHandle, HashMap<SignalName, Arc<SignalClosure>>>>,
}

impl CallbackRegistry {
    /// Create a registry over a native signal hook
    #[must_use]
    pub fn new(hook: Arc<dyn SignalHook>) -> Self {
        Self {
            hook,
            next_id: AtomicU64::new(1),
            by_id: RwLock::new(HashMap::new()),
            handlers_by_object: RwLock::new(HashMap::new()),
            by_object_signal: RwLock::new(HashMap::new()),
        }
    }

    /// Register a closure for a native signal on an object.
    ///
    /// Returns [`CallbackId::INVALID`] when the object's handle is null or
    /// the native connect fails; errors are logged, not raised, because
    /// most callers are widget constructors with no error path of their
    /// own.
    pub fn connect(
        &self,
        object: NativeHandle,
        signal: SignalName,
        closure: SignalClosure,
    ) -> CallbackId {
        if object.is_null() {
            log::error!("connect({signal}): {}", BindingError::InvalidHandle);
            return CallbackId::INVALID;
        }
        let closure = Arc::new(closure);
        let source = signal::classify(&signal, &closure);
        let arity = closure.arity();
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // The record goes into by_id before the native connect so that a
        // re-entrant emission during signal_connect already finds it.
        {
            let mut by_id = write(&self.by_id);
            by_id.insert(
                id,
                CallbackRecord {
                    id,
                    object,
                    signal: signal.clone(),
                    source,
                    closure: closure.clone(),
                    arity,
                    native_handler: NativeHandlerId::NONE,
                },
            );
        }

        let native_handler = if source.is_synthetic() {
            // Resize events are synthesised by the state machine; there is
            // no native signal to connect.
            NativeHandlerId::NONE
        } else {
            match self.hook.connect(object, &signal, arity, id) {
                Ok(handler) => handler,
                Err(e) => {
                    log::error!("connect({signal}) on {object}: {e}");
                    write(&self.by_id).remove(&id);
                    return CallbackId::INVALID;
                }
            }
        };

        if let Some(record) = write(&self.by_id).get_mut(&id) {
            record.native_handler = native_handler;
        }
        write(&self.handlers_by_object)
            .entry(object)
            .or_default()
            .insert(id, native_handler);
        write(&self.by_object_signal)
            .entry(object)
            .or_default()
            .insert(signal, closure);
        id
    }

    /// Remove one registration: sever the native connection, then remove
    /// the record from all indexes. Idempotent.
    pub fn disconnect(&self, id: CallbackId) {
        let record = read(&self.by_id).get(&id).cloned();
        let Some(record) = record else { return };

        if record.native_handler.is_connected() {
            self.hook.disconnect(record.object, record.native_handler);
        }
        self.remove_indexes(&record);
    }

    /// Sever every registration on an object.
    ///
    /// Order matters on a re-entrant toolkit: every native handler is
    /// disconnected first, while the records are still present, then the
    /// indexes are cleared. A final signal fired from inside a native
    /// disconnect still finds its closure. Idempotent.
    pub fn disconnect_all(&self, object: NativeHandle) {
        let records: Vec<CallbackRecord> = read(&self.by_id)
            .values()
            .filter(|r| r.object == object)
            .cloned()
            .collect();
        if records.is_empty() {
            return;
        }

        for record in &records {
            if record.native_handler.is_connected() {
                self.hook.disconnect(object, record.native_handler);
            }
        }
        {
            let mut by_id = write(&self.by_id);
            for record in &records {
                by_id.remove(&record.id);
            }
        }
        write(&self.handlers_by_object).remove(&object);
        write(&self.by_object_signal).remove(&object);
    }

    /// Latest closure registered for `(object, signal)`, for callers that
    /// identify a registration by object and signal rather than callback
    /// id.
    #[must_use]
    pub fn lookup(&self, object: NativeHandle, signal: &SignalName) -> Option<Arc<SignalClosure>> {
        read(&self.by_object_signal)
            .get(&object)
            .and_then(|signals| signals.get(signal))
            .cloned()
    }

    /// Every closure registered for `(object, signal)`, in registration
    /// order. Multiple registrations on one signal coexist; the synthetic
    /// resize emitter must reach all of them, not just the latest.
    #[must_use]
    pub fn closures_for(&self, object: NativeHandle, signal: &SignalName) -> Vec<Arc<SignalClosure>> {
        let mut matching: Vec<(CallbackId, Arc<SignalClosure>)> = read(&self.by_id)
            .values()
            .filter(|r| r.object == object && r.signal == *signal)
            .map(|r| (r.id, r.closure.clone()))
            .collect();
        matching.sort_unstable_by_key(|(id, _)| *id);
        matching.into_iter().map(|(_, closure)| closure).collect()
    }

    /// Fetch a record by id (trampoline path)
    #[must_use]
    pub fn record(&self, id: CallbackId) -> Option<CallbackRecord> {
        read(&self.by_id).get(&id).cloned()
    }

    /// Number of registrations on an object
    #[must_use]
    pub fn count_for(&self, object: NativeHandle) -> usize {
        read(&self.handlers_by_object).get(&object).map_or(0, HashMap::len)
    }

    /// Total number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.by_id).len()
    }

    /// Whether the registry holds no registrations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.by_id).is_empty()
    }

    /// Process-shutdown finaliser: sever every surviving native connection
    /// and clear all indexes.
    pub fn teardown(&self) {
        let objects: HashSet<NativeHandle> =
            read(&self.by_id).values().map(|r| r.object).collect();
        for object in objects {
            self.disconnect_all(object);
        }
    }

    fn remove_indexes(&self, record: &CallbackRecord) {
        write(&self.by_id).remove(&record.id);
        {
            let mut handlers = write(&self.handlers_by_object);
            if let Some(per_object) = handlers.get_mut(&record.object) {
                per_object.remove(&record.id);
                if per_object.is_empty() {
                    handlers.remove(&record.object);
                }
            }
        }
        {
            // Only drop the (object, signal) closure if it is still this
            // record's closure; a later registration on the same signal
            // replaced it and must stay.
            let mut by_signal = write(&self.by_object_signal);
            if let Some(signals) = by_signal.get_mut(&record.object) {
                let same = signals
                    .get(&record.signal)
                    .is_some_and(|c| Arc::ptr_eq(c, &record.closure));
                if same {
                    signals.remove(&record.signal);
                }
                if signals.is_empty() {
                    by_signal.remove(&record.object);
                }
            }
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registrations", &self.len())
            .finish()
    }
}

// Lock poisoning only happens after a panic that already got logged; the
// registry data is a set of independent rows, safe to keep serving.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
