// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscriber handle: freshness check, reads and blocking wait.

use super::registry::SlotRef;
use super::signal::SubscriberSignal;
use super::topic::Topic;
use crate::error::{Error, Result};
use crate::rt::{PollState, WaitError};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`Subscriber::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// A publish (or [`Subscriber::notify`]) arrived and was consumed.
    Ready,
    /// Nothing arrived within the timeout.
    TimedOut,
}

/// Registration of one consumer on one channel of a [`Topic`].
///
/// Created by [`Topic::register`]; detaches from the topic when dropped.
/// A subscriber has a single logical reader: share it across threads by
/// reference, but expect concurrent readers to consume each other's
/// notifications.
pub struct Subscriber<'t> {
    topic: &'t Topic,
    channel: usize,
    slot: SlotRef,
    signal: Arc<SubscriberSignal>,
}

impl<'t> Subscriber<'t> {
    pub(super) fn new(
        topic: &'t Topic,
        channel: usize,
        slot: SlotRef,
        signal: Arc<SubscriberSignal>,
    ) -> Self {
        Self {
            topic,
            channel,
            slot,
            signal,
        }
    }

    /// Topic this subscriber is bound to.
    pub fn topic(&self) -> &'t Topic {
        self.topic
    }

    /// Channel index fixed at registration.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Whether a publish arrived since the last read or successful wait.
    ///
    /// One atomic load; does not consume the notification.
    #[inline]
    pub fn has_update(&self) -> bool {
        self.signal.is_pending()
    }

    /// Run `f` over the latest value without copying it.
    ///
    /// Consumes the pending notification. Returns `None` before the topic is
    /// initialized. `f` runs inside the critical section, so keep it short;
    /// publishing to the same topic from `f` fails with
    /// [`Error::InvalidState`]. A subscriber of the same topic dropped
    /// from `f` gives its slot back once the outermost `peek` returns.
    pub fn peek<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.topic.with_channel(self.channel, &self.signal, f)
    }

    /// Raw pointer to the live channel buffer.
    ///
    /// Consumes the pending notification. The buffer stays allocated for the
    /// topic's lifetime, but a concurrent publish may overwrite it while the
    /// caller reads: dereferencing is only sound while no publish can run.
    pub fn peek_ptr(&self) -> Option<NonNull<[u8]>> {
        self.peek(|value| NonNull::from(value))
    }

    /// Copy the latest value into the front of `dest`.
    ///
    /// Returns `Ok(false)` before the topic is initialized. Consumes the
    /// pending notification only when the copy happens.
    pub fn copy(&self, dest: &mut [u8]) -> Result<bool> {
        let Some(required) = self.topic.element_size() else {
            return Ok(false);
        };
        if dest.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                actual: dest.len(),
            });
        }

        let copied = self.peek(|value| dest[..value.len()].copy_from_slice(value));
        Ok(copied.is_some())
    }

    /// Owned copy of the latest value, `None` before the topic is initialized.
    pub fn read(&self) -> Option<Vec<u8>> {
        let mut value = vec![0u8; self.topic.element_size()?];
        match self.copy(&mut value) {
            Ok(true) => Some(value),
            _ => None,
        }
    }

    /// Typed copy of the latest value.
    ///
    /// `Ok(None)` before the topic is initialized; [`Error::SizeMismatch`]
    /// when `T` is not exactly the element size.
    pub fn read_pod<T: bytemuck::Pod>(&self) -> Result<Option<T>> {
        let Some(expected) = self.topic.element_size() else {
            return Ok(None);
        };
        let actual = std::mem::size_of::<T>();
        if actual != expected {
            return Err(Error::SizeMismatch { expected, actual });
        }

        let mut value = T::zeroed();
        let copied = self.copy(bytemuck::bytes_of_mut(&mut value))?;
        Ok(copied.then_some(value))
    }

    /// Raise this subscriber's notification without publishing.
    ///
    /// Wakes a blocked [`wait`](Self::wait), e.g. to request shutdown.
    pub fn notify(&self) {
        self.signal.raise();
    }

    /// Block until notified or until `timeout` elapses.
    ///
    /// - `Some(Duration::ZERO)` checks without suspending.
    /// - `None` waits indefinitely.
    ///
    /// On [`WaitStatus::Ready`] the notification is consumed, so the next
    /// call waits for the next publish. Wakeups for a notification already
    /// consumed by [`copy`](Self::copy) or [`peek`](Self::peek) are absorbed
    /// and the wait continues with the remaining time.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<WaitStatus> {
        if self.signal.take() {
            return Ok(WaitStatus::Ready);
        }
        if timeout == Some(Duration::ZERO) {
            return Ok(WaitStatus::TimedOut);
        }

        // An unrepresentable deadline is as good as no deadline.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let handle = self.signal.handle();

        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitStatus::TimedOut);
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            match handle.poll(remaining) {
                Ok(PollState::SignalAvailable) => {
                    handle.reset();
                    if self.signal.take() {
                        log::trace!(
                            "[subscriber] '{}' channel {} woke",
                            self.topic.name(),
                            self.channel
                        );
                        return Ok(WaitStatus::Ready);
                    }
                    log::trace!(
                        "[subscriber] '{}' channel {} stale wakeup, re-arming",
                        self.topic.name(),
                        self.channel
                    );
                }
                Ok(PollState::NotReady) => {
                    log::trace!(
                        "[subscriber] '{}' channel {} spurious wakeup",
                        self.topic.name(),
                        self.channel
                    );
                }
                Err(WaitError::Timeout) => return Ok(WaitStatus::TimedOut),
                Err(WaitError::Io(e)) => return Err(Error::WaitFailed(e)),
                Err(WaitError::UnexpectedState(raw)) => {
                    log::warn!(
                        "[subscriber] '{}' channel {} woke with unknown state {}",
                        self.topic.name(),
                        self.channel,
                        raw
                    );
                    return Err(Error::InvalidState(format!(
                        "wait handle reported state {}",
                        raw
                    )));
                }
            }
        }
    }
}

impl Drop for Subscriber<'_> {
    fn drop(&mut self) {
        self.topic.detach(self.slot, self.channel);
    }
}

impl fmt::Debug for Subscriber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic.name())
            .field("channel", &self.channel)
            .field("slot", &self.slot.index)
            .field("pending", &self.signal.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_zero_timeout_does_not_block() {
        let topic = Topic::new("zero", 2).expect("topic");
        let sub = topic.register(0).expect("register");

        let start = Instant::now();
        assert_eq!(sub.wait(Some(Duration::ZERO)).unwrap(), WaitStatus::TimedOut);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_pending_signal_returns_ready_immediately() {
        let topic = Topic::new("pending", 2).expect("topic");
        let sub = topic.register(1).expect("register");
        topic.publish(1, &[7, 7]).unwrap();

        assert_eq!(sub.wait(Some(Duration::ZERO)).unwrap(), WaitStatus::Ready);
        assert!(!sub.has_update());
        assert_eq!(sub.wait(Some(Duration::ZERO)).unwrap(), WaitStatus::TimedOut);
    }

    #[test]
    fn test_stale_wakeup_is_absorbed() {
        let topic = Topic::new("stale", 1).expect("topic");
        let sub = topic.register(0).expect("register");

        // The copy consumes the notification but leaves the handle raised.
        topic.publish(0, &[1]).unwrap();
        let mut out = [0u8; 1];
        assert!(sub.copy(&mut out).unwrap());

        let start = Instant::now();
        let status = sub.wait(Some(Duration::from_millis(40))).unwrap();
        assert_eq!(status, WaitStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let topic = Topic::new("notify", 1).expect("topic");
        let sub = topic.register(3).expect("register");

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                sub.notify();
            });
            assert_eq!(
                sub.wait(Some(Duration::from_secs(5))).unwrap(),
                WaitStatus::Ready
            );
        });
    }

    #[test]
    fn test_unknown_handle_state_is_surfaced() {
        let topic = Topic::new("corrupt", 1).expect("topic");
        let sub = topic.register(0).expect("register");

        let handle = sub.signal.handle();
        handle.raise();
        handle.force_state(9);

        let err = sub.wait(Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_primitive_failure_is_surfaced() {
        let topic = Topic::new("broken", 1).expect("topic");
        let sub = topic.register(0).expect("register");
        sub.signal.handle().break_event().expect("break event");

        let start = Instant::now();
        let err = sub.wait(Some(Duration::from_secs(2))).unwrap_err();
        assert!(matches!(err, Error::WaitFailed(_)), "got {:?}", err);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_copy_rejects_short_buffer_without_consuming() {
        let topic = Topic::new("short", 4).expect("topic");
        let sub = topic.register(0).expect("register");
        topic.publish(0, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u8; 3];
        let err = sub.copy(&mut out).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                required: 4,
                actual: 3
            }
        ));
        assert!(sub.has_update());
    }

    #[test]
    fn test_copy_into_larger_buffer_fills_prefix() {
        let topic = Topic::new("prefix", 2).expect("topic");
        let sub = topic.register(0).expect("register");
        topic.publish(0, &[9, 8]).unwrap();

        let mut out = [0xFFu8; 4];
        assert!(sub.copy(&mut out).unwrap());
        assert_eq!(out, [9, 8, 0xFF, 0xFF]);
    }

    #[test]
    fn test_read_pod_checks_size() {
        let topic = Topic::new("pod", 4).expect("topic");
        let sub = topic.register(0).expect("register");
        topic.publish_pod(0, &0x0102_0304u32).unwrap();

        assert_eq!(sub.read_pod::<u32>().unwrap(), Some(0x0102_0304));
        assert!(matches!(
            sub.read_pod::<u16>(),
            Err(Error::SizeMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_peek_ptr_sees_live_buffer() {
        let topic = Topic::new("ptr", 3).expect("topic");
        let sub = topic.register(2).expect("register");
        topic.publish(2, &[4, 5, 6]).unwrap();

        let ptr = sub.peek_ptr().expect("initialized");
        assert!(!sub.has_update());
        // SAFETY: no publisher runs concurrently in this test.
        let bytes = unsafe { ptr.as_ref() };
        assert_eq!(bytes, &[4, 5, 6]);

        topic.publish(2, &[7, 8, 9]).unwrap();
        // SAFETY: as above.
        assert_eq!(unsafe { ptr.as_ref() }, &[7, 8, 9]);
    }
}
