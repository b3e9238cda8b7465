// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::event::timeout_millis;
use super::{PollState, WaitError, WaitHandle};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn new_handle_is_not_ready() {
    let handle = WaitHandle::new().expect("handle");
    assert_eq!(handle.state().unwrap(), PollState::NotReady);
}

#[test]
fn poll_times_out_without_raise() {
    let handle = WaitHandle::new().expect("handle");

    let start = Instant::now();
    let result = handle.poll(Some(Duration::from_millis(30)));

    assert!(matches!(result, Err(WaitError::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn raise_then_poll_reports_signal() {
    let handle = WaitHandle::new().expect("handle");
    handle.raise();

    let state = handle.poll(Some(Duration::from_millis(10))).expect("poll");
    assert_eq!(state, PollState::SignalAvailable);
}

#[test]
fn repeated_raises_coalesce_into_one_wakeup() {
    let handle = WaitHandle::new().expect("handle");
    handle.raise();
    handle.raise();
    handle.raise();

    assert_eq!(
        handle.poll(Some(Duration::from_millis(10))).unwrap(),
        PollState::SignalAvailable
    );
    handle.reset();

    // The event was drained by the first poll; nothing else is pending.
    assert!(matches!(
        handle.poll(Some(Duration::from_millis(10))),
        Err(WaitError::Timeout)
    ));
}

#[test]
fn raise_after_reset_wakes_again() {
    let handle = WaitHandle::new().expect("handle");
    handle.raise();
    handle.poll(Some(Duration::from_millis(10))).unwrap();
    handle.reset();

    handle.raise();
    assert_eq!(
        handle.poll(Some(Duration::from_millis(10))).unwrap(),
        PollState::SignalAvailable
    );
}

#[test]
fn raise_from_other_thread_wakes_blocked_poll() {
    let handle = Arc::new(WaitHandle::new().expect("handle"));
    let raiser = Arc::clone(&handle);

    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        raiser.raise();
    });

    let start = Instant::now();
    let state = handle.poll(None).expect("poll");
    assert_eq!(state, PollState::SignalAvailable);
    assert!(start.elapsed() >= Duration::from_millis(20));

    worker.join().unwrap();
}

#[test]
fn unknown_state_byte_is_reported() {
    let handle = WaitHandle::new().expect("handle");
    handle.force_state(7);

    assert!(matches!(handle.state(), Err(WaitError::UnexpectedState(7))));
}

#[cfg(unix)]
#[test]
fn broken_event_reports_io_error() {
    let handle = WaitHandle::new().expect("handle");
    handle.break_event().expect("break event");

    let start = Instant::now();
    let result = handle.poll(Some(Duration::from_secs(1)));

    assert!(matches!(result, Err(WaitError::Io(_))), "got {:?}", result);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn timeout_millis_rounds_and_saturates() {
    assert_eq!(timeout_millis(None), None);
    assert_eq!(timeout_millis(Some(Duration::ZERO)), Some(0));
    assert_eq!(timeout_millis(Some(Duration::from_micros(10))), Some(1));
    assert_eq!(timeout_millis(Some(Duration::from_micros(2_500))), Some(2));
    assert_eq!(timeout_millis(Some(Duration::from_secs(3))), Some(3_000));
    assert_eq!(timeout_millis(Some(Duration::MAX)), Some(u64::MAX));
}
