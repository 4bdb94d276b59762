//! Shared mock toolkit and UI-loop harness for the integration suites.
//!
//! The harness runs a dedicated "UI" thread fed by the idle adapter, the
//! way the real backend feeds the GTK main loop, and a mock toolkit that
//! records signal connections and can fire them like native emissions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, Weak};

use gantry_core::{
    Arity, Binding, BindingConfig, BindingResult, CallbackId, DispatchJob, IdleAdapter,
    NativeHandle, NativeHandlerId, SignalArgs, SignalHook, SignalName, StyleBackend,
};

struct Connection {
    object: NativeHandle,
    signal: String,
    callback: CallbackId,
}

/// Mock native toolkit: signal hook plus style backend.
#[derive(Default)]
pub struct MockToolkit {
    next_handler: AtomicU64,
    next_provider: AtomicU64,
    connections: Mutex<HashMap<u64, Connection>>,
    attached: Mutex<Vec<(NativeHandle, u32)>>,
    binding: Mutex<Option<Weak<Binding>>>,
    /// When set, the next `connect` re-enters the binding with an
    /// immediate emission, the way a re-entrant toolkit can fire a signal
    /// from inside `signal_connect`.
    pub fire_during_connect: AtomicBool,
}

impl MockToolkit {
    pub fn attach_binding(&self, binding: &Arc<Binding>) {
        *self.binding.lock().unwrap() = Some(Arc::downgrade(binding));
    }

    /// Live native handler count on an object.
    pub fn handler_count(&self, object: NativeHandle) -> usize {
        self.connections
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.object == object)
            .count()
    }

    /// Emulate a native signal emission: invoke the trampoline path for
    /// every live connection on `(object, signal)`, in connection order.
    /// Returns the last return value for return-shaped signals.
    pub fn fire(
        &self,
        binding: &Binding,
        object: NativeHandle,
        signal: &str,
        args: SignalArgs,
    ) -> Option<bool> {
        let mut targets: Vec<(u64, CallbackId)> = self
            .connections
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| c.object == object && c.signal == signal)
            .map(|(handler, c)| (*handler, c.callback))
            .collect();
        targets.sort_unstable_by_key(|(handler, _)| *handler);

        let mut result = None;
        for (_, id) in targets {
            if let SignalArgs::Scalar(raw) = args {
                result = binding.fire_scalar(id, raw).or(result);
            } else {
                result = binding.fire(id, args).or(result);
            }
        }
        result
    }

    /// Number of providers attached to the display at a priority.
    pub fn attached_at(&self, priority: u32) -> usize {
        self.attached.lock().unwrap().iter().filter(|(_, p)| *p == priority).count()
    }
}

impl SignalHook for MockToolkit {
    fn connect(
        &self,
        object: NativeHandle,
        signal: &SignalName,
        _arity: Arity,
        id: CallbackId,
    ) -> BindingResult<NativeHandlerId> {
        let raw = self.next_handler.fetch_add(1, Ordering::SeqCst) + 1;
        self.connections.lock().unwrap().insert(
            raw,
            Connection { object, signal: signal.as_str().to_owned(), callback: id },
        );
        if self.fire_during_connect.swap(false, Ordering::SeqCst) {
            let binding = self.binding.lock().unwrap().clone();
            if let Some(binding) = binding.and_then(|w| w.upgrade()) {
                binding.fire(id, SignalArgs::None);
            }
        }
        Ok(NativeHandlerId::from_raw(raw))
    }

    fn disconnect(&self, _object: NativeHandle, handler: NativeHandlerId) {
        self.connections.lock().unwrap().remove(&handler.raw());
    }
}

impl StyleBackend for MockToolkit {
    fn create_provider(&self, _content: &str) -> BindingResult<NativeHandle> {
        let raw = self.next_provider.fetch_add(1, Ordering::SeqCst) + 0x5001;
        Ok(NativeHandle::from_raw(raw as usize))
    }

    fn add_for_display(&self, provider: NativeHandle, priority: u32) {
        self.attached.lock().unwrap().push((provider, priority));
    }

    fn remove_for_display(&self, provider: NativeHandle) {
        self.attached.lock().unwrap().retain(|(h, _)| *h != provider);
    }
}

/// An isolated binding with its own UI loop and mock toolkit.
pub struct Harness {
    pub binding: Arc<Binding>,
    pub toolkit: Arc<MockToolkit>,
    _ui_queue: Sender<DispatchJob>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    pub fn with_config(tweak: impl FnOnce(BindingConfig) -> BindingConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let (tx, rx) = mpsc::channel::<DispatchJob>();
        std::thread::Builder::new()
            .name("test-ui".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .expect("spawn test UI loop");

        let adapter: IdleAdapter = {
            let tx = tx.clone();
            Arc::new(move |job| {
                let _ = tx.send(job);
            })
        };
        let toolkit = Arc::new(MockToolkit::default());
        let config = tweak(BindingConfig::new(adapter, toolkit.clone(), toolkit.clone()));
        let binding = Binding::new(config);
        toolkit.attach_binding(&binding);

        // Pin the loop thread as the UI thread before any test traffic.
        let pin = binding.clone();
        let (ack_tx, ack_rx) = mpsc::channel();
        binding.dispatcher().run_on_ui_thread(move || {
            pin.dispatcher().mark_ui_thread();
            let _ = ack_tx.send(());
        });
        ack_rx.recv().expect("pin UI thread");

        Self { binding, toolkit, _ui_queue: tx }
    }

    /// Emulate a native emission through the mock toolkit.
    pub fn fire(&self, object: NativeHandle, signal: &str, args: SignalArgs) -> Option<bool> {
        self.toolkit.fire(&self.binding, object, signal, args)
    }

    /// Wait until every closure enqueued so far has run on the UI loop.
    pub fn flush(&self) {
        self.binding.dispatcher().sync_ui(|| {}).expect("flush UI queue");
    }
}

pub fn obj(raw: usize) -> NativeHandle {
    NativeHandle::from_raw(raw)
}
