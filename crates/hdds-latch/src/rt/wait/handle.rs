// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-event wait handle.
//!
//! The handle carries a poll state next to the OS event. `raise` flips the
//! state to [`PollState::SignalAvailable`] and writes the event only on the
//! `NotReady -> SignalAvailable` edge, so repeated raises coalesce into one
//! wakeup. `poll` blocks on the event, drains it, and reports the state seen
//! after wakeup; the caller decides when to `reset` it.

use super::event::{self, EventHandle};
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Errors returned by [`WaitHandle::poll`].
#[derive(Debug)]
pub enum WaitError {
    /// No wakeup within the requested timeout.
    Timeout,
    /// The OS wait primitive failed.
    Io(io::Error),
    /// The handle woke with a state byte outside [`PollState`].
    UnexpectedState(u8),
}

/// Observable state of a [`WaitHandle`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Nothing raised since the last reset.
    NotReady = 0,
    /// A signal was raised and not yet reset.
    SignalAvailable = 1,
}

impl PollState {
    const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PollState::NotReady),
            1 => Some(PollState::SignalAvailable),
            _ => None,
        }
    }
}

/// Event-backed handle a thread can block on until it is raised.
pub struct WaitHandle {
    event: EventHandle,
    state: AtomicU8,
}

impl WaitHandle {
    /// Create a handle in the [`PollState::NotReady`] state.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            event: event::create_event()?,
            state: AtomicU8::new(PollState::NotReady as u8),
        })
    }

    /// Mark the handle ready and wake a blocked [`poll`](Self::poll).
    ///
    /// Never blocks and never allocates.
    #[inline]
    pub fn raise(&self) {
        let prev = self
            .state
            .swap(PollState::SignalAvailable as u8, Ordering::AcqRel);
        if prev != PollState::SignalAvailable as u8 {
            event::signal_event(&self.event);
        }
    }

    /// Current state without waiting.
    pub fn state(&self) -> Result<PollState, WaitError> {
        let raw = self.state.load(Ordering::Acquire);
        PollState::from_raw(raw).ok_or(WaitError::UnexpectedState(raw))
    }

    /// Block until the handle is raised or `timeout` elapses (`None` = forever).
    ///
    /// May return `Ok(PollState::NotReady)` after a stale or spurious wakeup.
    pub fn poll(&self, timeout: Option<Duration>) -> Result<PollState, WaitError> {
        event::wait_event(&self.event, timeout)?;
        event::drain_event(&self.event);
        self.state()
    }

    /// Return to [`PollState::NotReady`] so the next raise is observable.
    #[inline]
    pub fn reset(&self) {
        // Swap rather than store: the acquire half pairs with `raise`, so any
        // raise that saw the old state is visible to the caller afterwards.
        self.state
            .swap(PollState::NotReady as u8, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub(crate) fn force_state(&self, raw: u8) {
        self.state.store(raw, Ordering::Release);
    }

    /// Make every later `poll` fail at the OS level. Do not `raise` a broken
    /// handle.
    #[cfg(all(test, unix))]
    pub(crate) fn break_event(&self) -> io::Result<()> {
        event::break_event(&self.event)
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        event::close_event(&self.event);
    }
}

impl std::fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitHandle")
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
