//! Unified Callback System: round-trip, cascade and marshalling behaviour

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use common::{obj, Harness};
use gantry_core::{CallbackId, NativeHandle, SignalArgs, SignalClosure, SignalName};

#[test]
fn connect_fire_disconnect_round_trip() {
    let harness = Harness::new();
    let button = obj(0x100);

    let counter = Arc::new(AtomicU32::new(0));
    let seen = counter.clone();
    let id = harness.binding.connect(
        &button,
        "clicked",
        SignalClosure::unit(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert!(id.is_valid());

    for _ in 0..3 {
        harness.fire(button, "clicked", SignalArgs::None);
    }
    harness.flush();
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    harness.binding.disconnect(id);
    harness.fire(button, "clicked", SignalArgs::None);
    harness.flush();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(harness.toolkit.handler_count(button), 0);
}

#[test]
fn callback_ids_are_unique() {
    let harness = Harness::new();
    let mut ids = Vec::new();
    for raw in 1..=20_usize {
        let object = obj(0x1000 + raw);
        ids.push(harness.binding.connect(&object, "clicked", SignalClosure::unit(|| {})));
        ids.push(harness.binding.connect(&object, "notify", SignalClosure::unit(|| {})));
    }
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}

#[test]
fn cascade_disconnect_removes_everything() {
    let harness = Harness::new();
    let window = obj(0x200);
    let survivor = obj(0x300);

    let counter = Arc::new(AtomicU32::new(0));
    for signal in ["clicked", "map", "unmap", "realize", "notify"] {
        let seen = counter.clone();
        harness.binding.connect(
            &window,
            SignalName::from(signal),
            SignalClosure::unit(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }
    let kept = harness.binding.connect(&survivor, "clicked", SignalClosure::unit(|| {}));
    assert_eq!(harness.toolkit.handler_count(window), 5);

    harness.binding.disconnect_all(&window);
    assert_eq!(harness.binding.registry().count_for(window), 0);
    assert_eq!(harness.toolkit.handler_count(window), 0);
    assert!(harness.binding.registry().record(kept).is_some());

    // Late native emissions find nothing.
    harness.fire(window, "clicked", SignalArgs::None);
    harness.flush();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // Idempotent.
    harness.binding.disconnect_all(&window);
}

#[test]
fn null_handle_yields_sentinel_id() {
    let harness = Harness::new();
    let id = harness.binding.connect(&NativeHandle::NULL, "clicked", SignalClosure::unit(|| {}));
    assert_eq!(id, CallbackId::INVALID);
    assert!(harness.binding.registry().is_empty());
}

#[test]
fn reentrant_emission_during_connect_finds_closure() {
    let harness = Harness::new();
    let button = obj(0x400);

    let counter = Arc::new(AtomicU32::new(0));
    let seen = counter.clone();
    harness.toolkit.fire_during_connect.store(true, Ordering::SeqCst);
    let id = harness.binding.connect(
        &button,
        "clicked",
        SignalClosure::unit(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert!(id.is_valid());
    harness.flush();
    // The emission fired from inside signal_connect already found the
    // registration.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn tooltip_query_returns_synchronously() {
    let harness = Harness::new();
    let label = obj(0x500);

    harness.binding.connect(
        &label,
        "query-tooltip",
        SignalClosure::tooltip(|_, y, _, _| y < 100),
    );

    // No flush: the return value must be available before the trampoline
    // returns to native code.
    let args = SignalArgs::Tooltip { x: 10, y: 50, keyboard: false, tooltip: obj(0x501) };
    assert_eq!(harness.fire(label, "query-tooltip", args), Some(true));

    let args = SignalArgs::Tooltip { x: 10, y: 150, keyboard: false, tooltip: obj(0x501) };
    assert_eq!(harness.fire(label, "query-tooltip", args), Some(false));
}

#[test]
fn scalar_marshalling_follows_signal_source() {
    let harness = Harness::new();
    let dialog = obj(0x600);
    let list = obj(0x700);

    let response = Arc::new(AtomicU32::new(0));
    let seen = response.clone();
    harness.binding.connect(
        &dialog,
        "response",
        SignalClosure::response(move |r| {
            seen.store(r.to_raw().unsigned_abs(), Ordering::SeqCst);
        }),
    );

    let position = Arc::new(AtomicU32::new(u32::MAX));
    let seen = position.clone();
    harness.binding.connect(
        &list,
        "activate",
        SignalClosure::position(move |p| {
            seen.store(u32::try_from(p).unwrap(), Ordering::SeqCst);
        }),
    );

    // Both arrive through the single-scalar trampoline path; the
    // registration's source decides the interpretation.
    harness.fire(dialog, "response", SignalArgs::Scalar(-5));
    harness.fire(list, "activate", SignalArgs::Scalar(7));
    harness.flush();
    assert_eq!(response.load(Ordering::SeqCst), 5);
    assert_eq!(position.load(Ordering::SeqCst), 7);
}

#[test]
fn selection_and_items_marshalling() {
    let harness = Harness::new();
    let model = obj(0x800);

    let seen = Arc::new(AtomicU32::new(0));
    let sel = seen.clone();
    harness.binding.connect(
        &model,
        "selection-changed",
        SignalClosure::selection(move |pos, count| {
            sel.store(u32::try_from(pos * 100 + count).unwrap(), Ordering::SeqCst);
        }),
    );
    harness.fire(model, "selection-changed", SignalArgs::Selection(3, 2));
    harness.flush();
    assert_eq!(seen.load(Ordering::SeqCst), 302);

    let store = obj(0x900);
    let totals = Arc::new(AtomicU32::new(0));
    let sums = totals.clone();
    harness.binding.connect(
        &store,
        "items-changed",
        SignalClosure::items(move |pos, removed, added| {
            sums.store(u32::try_from(pos * 100 + removed * 10 + added).unwrap(), Ordering::SeqCst);
        }),
    );
    harness.fire(store, "items-changed", SignalArgs::Items(1, 2, 3));
    harness.flush();
    assert_eq!(totals.load(Ordering::SeqCst), 123);
}

#[test]
fn shape_mismatch_suppresses_event() {
    let harness = Harness::new();
    let widget = obj(0xa00);

    let counter = Arc::new(AtomicU32::new(0));
    let seen = counter.clone();
    harness.binding.connect(
        &widget,
        "selection-changed",
        SignalClosure::selection(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    );

    // Wrong argument shape: logged and suppressed, nothing crashes.
    harness.fire(widget, "selection-changed", SignalArgs::None);
    harness.flush();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // The registration still works for well-shaped emissions.
    harness.fire(widget, "selection-changed", SignalArgs::Selection(0, 1));
    harness.flush();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_callback_is_suppressed() {
    let harness = Harness::new();
    assert_eq!(harness.binding.fire(CallbackId::new(424_242), SignalArgs::None), None);
}

#[test]
fn teardown_severs_surviving_connections() {
    let harness = Harness::new();
    let a = obj(0xb00);
    let b = obj(0xc00);
    harness.binding.connect(&a, "clicked", SignalClosure::unit(|| {}));
    harness.binding.connect(&b, "clicked", SignalClosure::unit(|| {}));

    harness.binding.teardown();
    assert!(harness.binding.registry().is_empty());
    assert_eq!(harness.toolkit.handler_count(a), 0);
    assert_eq!(harness.toolkit.handler_count(b), 0);
}
