//! Tests for ending a drain pass early
//!
//! A key press in the bridge's own window, or a handler returning
//! `Dispatch::Stop`, ends the current pass and leaves the rest queued.

use test_harness::fixtures::{stroke, touch_begin, touch_end, touch_server};
use test_harness::{Recording, TestBridge};
use xtouch::backend::RawEvent;
use xtouch::{PassEnd, TouchPhase};

#[test]
fn key_press_halts_delivery_for_this_call() {
    let mut bridge = TestBridge::new(touch_server()).unwrap();
    let surface = bridge.surface();

    bridge.inject_all([
        touch_begin(1, 10.0, 10.0),
        RawEvent::KeyPress { surface },
        touch_end(1, 12.0, 12.0),
    ]);

    let summary = bridge.poll().unwrap();
    assert!(summary.stopped_by_key());
    assert_eq!(summary.delivered, 1);
    assert_eq!(bridge.pending(), 1, "event after key press should stay queued");

    let summary = bridge.poll().unwrap();
    assert_eq!(summary.end, PassEnd::Drained);
    let phases: Vec<_> = bridge.samples().iter().map(|s| s.phase).collect();
    assert_eq!(phases, vec![TouchPhase::Down, TouchPhase::Up]);
}

#[test]
fn key_press_first_delivers_nothing() {
    let mut bridge = TestBridge::new(touch_server()).unwrap();
    let surface = bridge.surface();

    bridge.inject(RawEvent::KeyPress { surface });
    bridge.inject_all(stroke(2, &[(0.0, 0.0), (5.0, 5.0)]));

    let summary = bridge.poll().unwrap();
    assert_eq!(summary.end, PassEnd::KeyPress);
    assert_eq!(summary.delivered, 0);
    assert_eq!(bridge.pending(), 2);
}

#[test]
fn consecutive_key_presses_each_end_a_pass() {
    let mut bridge = TestBridge::new(touch_server()).unwrap();
    let surface = bridge.surface();

    bridge.inject_all([
        RawEvent::KeyPress { surface },
        RawEvent::KeyPress { surface },
    ]);

    assert!(bridge.poll().unwrap().stopped_by_key());
    assert!(bridge.poll().unwrap().stopped_by_key());
    assert_eq!(bridge.poll().unwrap().end, PassEnd::Drained);
}

#[test]
fn handler_stop_leaves_rest_queued() {
    let mut bridge = TestBridge::new(touch_server()).unwrap();
    let stopper = Recording::stopping_after(2);
    bridge.replace_handler(&stopper);

    bridge.inject_all(stroke(1, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));

    let summary = bridge.poll().unwrap();
    assert_eq!(summary.end, PassEnd::HandlerStop);
    assert_eq!(stopper.len(), 2);
    assert_eq!(bridge.pending(), 1);
}
