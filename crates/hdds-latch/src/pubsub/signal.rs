// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-subscriber notification state.

use crate::rt::WaitHandle;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot "has unread data" signal plus the handle a waiter blocks on.
///
/// The pending flag saturates at one: any number of raises before a take
/// leave exactly one pending notification.
#[derive(Debug)]
pub(crate) struct SubscriberSignal {
    pending: AtomicBool,
    handle: WaitHandle,
}

impl SubscriberSignal {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            pending: AtomicBool::new(false),
            handle: WaitHandle::new()?,
        })
    }

    /// Set pending, then wake any waiter. Interrupt-safe.
    ///
    /// The flag is published before the handle so a waiter that observes the
    /// handle always finds the flag set.
    #[inline]
    pub(crate) fn raise(&self) {
        self.pending.store(true, Ordering::Release);
        self.handle.raise();
    }

    #[inline]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending notification, reporting whether one was present.
    #[inline]
    pub(crate) fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub(crate) fn handle(&self) -> &WaitHandle {
        &self.handle
    }
}
