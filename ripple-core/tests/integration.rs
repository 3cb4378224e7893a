//! Integration Tests for the Reactive System
//!
//! These tests verify that signals, derived values and effects work together
//! across flushes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ripple_core::{ReactiveError, Runtime};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (Rc::clone(&count), count)
}

fn bump(count: &Cell<usize>) {
    count.set(count.get() + 1);
}

/// Only the last of several synchronous writes is visible after settling.
#[test]
fn last_write_wins_after_settling() {
    let rt = Runtime::new();
    let (count, set_count) = rt.create_signal(0);
    let observed = Rc::new(RefCell::new(Vec::new()));

    let observed_clone = Rc::clone(&observed);
    let reader = count.clone();
    rt.create_effect(move || observed_clone.borrow_mut().push(reader.get()));

    set_count.set(1);
    set_count.set(2);
    set_count.set(3);
    rt.run_microtasks();

    assert_eq!(count.get(), 3);
    // The effect never saw 1 or 2
    assert_eq!(*observed.borrow(), vec![0, 3]);
}

/// Three writes before the microtask collapse into one extra run.
#[test]
fn batching_collapses_writes() {
    let rt = Runtime::new();
    let (count, set_count) = rt.create_signal(0);
    let (runs, runs_clone) = counter();

    rt.create_effect(move || {
        count.get();
        bump(&runs_clone);
    });
    assert_eq!(runs.get(), 1);

    set_count.set(1);
    set_count.set(2);
    set_count.set(3);
    rt.run_microtasks();

    assert_eq!(runs.get(), 2);
}

/// An effect tracking two signals sees each update.
#[test]
fn effect_tracks_multiple_signals() {
    let rt = Runtime::new();
    let (a, set_a) = rt.create_signal(1);
    let (b, set_b) = rt.create_signal(2);
    let sum = Rc::new(Cell::new(0));

    let sum_clone = Rc::clone(&sum);
    rt.create_effect(move || sum_clone.set(a.get() + b.get()));
    assert_eq!(sum.get(), 3);

    set_a.set(3);
    rt.run_microtasks();
    assert_eq!(sum.get(), 5);

    set_b.set(4);
    rt.run_microtasks();
    assert_eq!(sum.get(), 7);
}

/// A chain of derived values settles within one flush.
#[test]
fn derived_chain_settles() {
    let rt = Runtime::new();
    let (a, set_a) = rt.create_signal(1);
    let (b, set_b) = rt.create_signal(2);
    let sum = rt.create_derived(move || a.get() + b.get());
    let sum_reader = sum.clone();
    let doubled = rt.create_derived(move || sum_reader.get() * 2);

    rt.run_microtasks();
    assert_eq!(sum.get(), 3);
    assert_eq!(doubled.get(), 6);

    set_a.set(3);
    assert_eq!(rt.run_microtasks(), 1);
    assert_eq!(sum.get(), 5);
    assert_eq!(doubled.get(), 10);

    set_b.set(4);
    assert_eq!(rt.run_microtasks(), 1);
    assert_eq!(sum.get(), 7);
    assert_eq!(doubled.get(), 14);
}

/// Writes to an unrelated signal do not recompute a derived value.
#[test]
fn derived_only_recomputes_for_its_dependencies() {
    let rt = Runtime::new();
    let (a, set_a) = rt.create_signal(1);
    let (b, _set_b) = rt.create_signal(2);
    let (_unrelated, set_unrelated) = rt.create_signal(0);
    let (computed, computed_clone) = counter();

    let sum = rt.create_derived(move || {
        bump(&computed_clone);
        a.get() + b.get()
    });

    rt.run_microtasks();
    assert_eq!(sum.get(), 3);
    assert_eq!(computed.get(), 1);

    set_unrelated.set(99);
    rt.run_microtasks();
    assert_eq!(computed.get(), 1);

    set_a.set(3);
    rt.run_microtasks();
    assert_eq!(sum.get(), 5);
    assert_eq!(computed.get(), 2);
}

/// A computation below two derived values sharing one source runs once.
#[test]
fn diamond_runs_once_per_flush() {
    let rt = Runtime::new();
    let (source, set_source) = rt.create_signal(1);

    let left_source = source.clone();
    let left = rt.create_derived(move || left_source.get() + 1);
    let right_source = source.clone();
    let right = rt.create_derived(move || right_source.get() * 10);

    let (runs, runs_clone) = counter();
    let seen = Rc::new(Cell::new(0));
    let seen_clone = Rc::clone(&seen);
    let (l, r) = (left.clone(), right.clone());
    rt.create_effect(move || {
        bump(&runs_clone);
        seen_clone.set(l.get() + r.get());
    });
    assert_eq!(runs.get(), 1);
    assert_eq!(seen.get(), 12);

    set_source.set(2);
    rt.run_microtasks();

    assert_eq!(runs.get(), 2);
    assert_eq!(seen.get(), 23);
    assert_eq!(left.recompute_count(), 2);
    assert_eq!(right.recompute_count(), 2);
}

/// Branches of different length still meet at the sink once per flush.
#[test]
fn uneven_diamond_runs_once_per_flush() {
    let rt = Runtime::new();
    let (source, set_source) = rt.create_signal(1);

    let short_source = source.clone();
    let short = rt.create_derived(move || short_source.get() + 1);
    let mid_source = source.clone();
    let mid = rt.create_derived(move || mid_source.get());
    let mid_reader = mid.clone();
    let long = rt.create_derived(move || mid_reader.get() * 10);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    let (s, l) = (short.clone(), long.clone());
    let sink = rt.create_effect(move || seen_clone.borrow_mut().push(s.get() + l.get()));
    assert_eq!(*seen.borrow(), vec![12]);

    set_source.set(2);
    rt.run_microtasks();

    // No glitch value such as 3 + 10 in between
    assert_eq!(*seen.borrow(), vec![12, 23]);
    assert_eq!(sink.run_count(), 2);
    assert_eq!(long.recompute_count(), 2);

    set_source.set(3);
    rt.run_microtasks();
    assert_eq!(*seen.borrow(), vec![12, 23, 34]);
    assert_eq!(sink.run_count(), 3);
}

/// An effect that appends to the signal it reads settles instead of looping.
#[test]
fn self_appending_effect_settles() {
    let rt = Runtime::new();
    let (tick, set_tick) = rt.create_signal(0);
    let log = rt.signal(Vec::new());

    let log_rw = log.clone();
    let effect = rt.create_effect(move || {
        let t = tick.get();
        let mut entries = log_rw.get();
        entries.push(t);
        log_rw.set(entries);
    });

    for t in 1..=3 {
        set_tick.set(t);
        rt.run_microtasks();
    }

    assert_eq!(effect.run_count(), 4);
    assert_eq!(log.get_untracked(), vec![0, 1, 2, 3]);
    assert_eq!(rt.pending_count(), 0);
    assert!(!rt.is_flushing());
}

/// A conditional read is dropped once its branch is no longer taken.
#[test]
fn dynamic_dependencies_are_cleaned_up() {
    let rt = Runtime::new();
    let (show, set_show) = rt.create_signal(true);
    let (x, set_x) = rt.create_signal(0);
    let (runs, runs_clone) = counter();

    let x_reader = x.clone();
    let effect = rt.create_effect(move || {
        bump(&runs_clone);
        if show.get() {
            x_reader.get();
        }
    });
    assert_eq!(effect.dependency_count(), 2);

    set_x.set(1);
    rt.run_microtasks();
    assert_eq!(runs.get(), 2);

    set_show.set(false);
    rt.run_microtasks();
    assert_eq!(runs.get(), 3);
    assert_eq!(effect.dependency_count(), 1);
    assert_eq!(x.subscriber_count(), 0);

    // x no longer reaches the effect
    set_x.set(2);
    rt.run_microtasks();
    assert_eq!(runs.get(), 3);

    // Taking the branch again resubscribes
    set_show.set(true);
    rt.run_microtasks();
    set_x.set(3);
    rt.run_microtasks();
    assert_eq!(runs.get(), 5);
}

/// Dependents of two signals updated together run in enqueue order.
#[test]
fn dependents_run_in_enqueue_order() {
    let rt = Runtime::new();
    let (a, set_a) = rt.create_signal(0);
    let (b, set_b) = rt.create_signal(0);
    let order = Rc::new(RefCell::new(Vec::new()));

    for (name, signal) in [("b1", b.clone()), ("a1", a.clone()), ("b2", b.clone())] {
        let order = Rc::clone(&order);
        rt.create_effect(move || {
            signal.get();
            order.borrow_mut().push(name);
        });
    }
    order.borrow_mut().clear();

    set_a.set(1);
    set_b.set(1);
    rt.run_microtasks();

    assert_eq!(*order.borrow(), vec!["a1", "b1", "b2"]);
}

/// A reader that starts depending on a derived value runs after it.
#[test]
fn reader_created_before_derived_still_sees_fresh_value() {
    let rt = Runtime::new();
    let (a, set_a) = rt.create_signal(1);
    let (b, set_b) = rt.create_signal(1);
    let seen = Rc::new(RefCell::new(Vec::new()));

    // The effect subscribes to `a` before the derived value exists
    let derived_slot: Rc<RefCell<Option<ripple_core::Derived<i32>>>> = Rc::default();
    let slot = Rc::clone(&derived_slot);
    let seen_clone = Rc::clone(&seen);
    let effect = rt.create_effect(move || {
        let extra = slot.borrow().as_ref().map(|d| d.get()).unwrap_or(0);
        seen_clone.borrow_mut().push(a.get() + extra);
    });
    *derived_slot.borrow_mut() = Some(rt.create_derived(move || b.get() * 100));

    // Re-run once so the effect also reads the derived value
    set_a.set(2);
    rt.run_microtasks();
    assert_eq!(*seen.borrow(), vec![1, 102]);

    // The effect became due first, but runs after the derived value
    set_a.set(3);
    set_b.set(2);
    rt.run_microtasks();
    assert_eq!(*seen.borrow(), vec![1, 102, 203]);
    assert_eq!(effect.run_count(), 3);
}

/// A panicking effect does not block other effects or later flushes.
#[test]
fn failures_are_isolated_per_computation() {
    let rt = Runtime::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let errors_clone = Rc::clone(&errors);
    rt.on_error(move |err| {
        errors_clone
            .borrow_mut()
            .push(matches!(err, ReactiveError::ComputationPanicked { .. }))
    });

    let (count, set_count) = rt.create_signal(0);
    let healthy = Rc::new(Cell::new(0));

    let failing = count.clone();
    rt.create_effect(move || {
        if failing.get() > 0 {
            panic!("effect failed");
        }
    });
    let healthy_clone = Rc::clone(&healthy);
    rt.create_effect(move || healthy_clone.set(count.get()));

    set_count.set(1);
    rt.run_microtasks();
    set_count.set(2);
    rt.run_microtasks();

    assert_eq!(healthy.get(), 2);
    assert_eq!(*errors.borrow(), vec![true, true]);
    assert!(!rt.is_flushing());
}

/// Independent runtimes do not share tracking or scheduling.
#[test]
fn runtimes_are_isolated() {
    let first = Runtime::new();
    let second = Runtime::new();

    let (count, set_count) = first.create_signal(0);
    let (runs, runs_clone) = counter();
    second.create_effect(move || {
        count.get();
        bump(&runs_clone);
    });

    // The read happened while a computation of another runtime was running
    set_count.set(1);
    assert_eq!(first.run_microtasks(), 0);
    assert_eq!(second.run_microtasks(), 0);
    assert_eq!(runs.get(), 1);
}

/// The counter component from the demo slides: a count with derived flags.
#[test]
fn counter_component() {
    let rt = Runtime::new();
    let (count, set_count) = rt.create_signal(0u64);

    let n = count.clone();
    let prime = rt.create_derived(move || {
        let n = n.get();
        let mut i = 2;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        n > 1
    });

    let n = count.clone();
    let fib = rt.create_derived(move || {
        let is_square = |x: u64| {
            let s = (x as f64).sqrt() as u64;
            s * s == x
        };
        let sq = n.get() * n.get();
        is_square(5 * sq + 4) || (5 * sq >= 4 && is_square(5 * sq - 4))
    });

    let label = Rc::new(RefCell::new(String::new()));
    let label_clone = Rc::clone(&label);
    let (p, f) = (prime.clone(), fib.clone());
    let view = rt.create_effect(move || {
        let mut kind = String::new();
        if f.get() {
            kind.push_str("fib");
        }
        if p.get() {
            kind.push_str("prime");
        }
        let text = match count.get() {
            0 => "click me".to_string(),
            n => format!("click x{n} {kind}"),
        };
        *label_clone.borrow_mut() = text;
    });
    assert_eq!(*label.borrow(), "click me");

    let mut expected = Vec::new();
    for _ in 0..5 {
        set_count.update(|n| n + 1);
        rt.run_microtasks();
        expected.push(label.borrow().clone());
    }

    assert_eq!(
        expected,
        vec![
            "click x1 fib",
            "click x2 fibprime",
            "click x3 fibprime",
            "click x4 ",
            "click x5 fibprime",
        ]
    );
    // One render per click
    assert_eq!(view.run_count(), 6);
}
