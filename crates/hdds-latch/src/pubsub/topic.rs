// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic storage and the publish path.

use super::registry::{Registry, SlotRef};
use super::signal::SubscriberSignal;
use super::subscriber::Subscriber;
use crate::config::{DEFAULT_MAX_SUBSCRIBERS, MAX_CHANNELS};
use crate::error::{Error, Result};
use crate::rt::critical::{critical_section, CriticalSection, IrqCell};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Mutable topic state; only reachable inside a critical section.
struct TopicState {
    /// Empty until `init`, then exactly `MAX_CHANNELS` buffers.
    channels: Vec<Box<[u8]>>,
    registry: Registry,
    publish_counts: [u64; MAX_CHANNELS],
}

/// A named latest-value topic with [`MAX_CHANNELS`] channels.
///
/// Declare it as a `static` and initialize it once at boot, or build one in
/// place with [`Topic::new`]. Every channel holds one value of
/// `element_size` bytes; a publish overwrites it and notifies the
/// subscribers bound to that channel.
///
/// ```rust
/// use hdds_latch::Topic;
///
/// static SPEED: Topic = Topic::declare("speed");
///
/// SPEED.init(8).expect("init");
/// let sub = SPEED.register(2).expect("register");
/// SPEED.publish_pod(2, &42.5f64).expect("publish");
/// assert_eq!(sub.read_pod::<f64>().expect("read"), Some(42.5));
/// ```
pub struct Topic {
    name: &'static str,
    max_subscribers: usize,
    initialized: AtomicBool,
    element_size: AtomicUsize,
    state: IrqCell<TopicState>,
    /// Slots dropped while `state` was borrowed; released on the next
    /// critical section that can take `state` mutably.
    detached: IrqCell<Vec<SlotRef>>,
}

/// Result of a [`Topic::detach`] attempt.
enum Detach {
    Released,
    Unknown,
    Deferred,
}

/// Point-in-time snapshot of a topic, see [`Topic::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStats {
    /// Topic name.
    pub name: &'static str,
    /// Bytes per value, `0` before `init`.
    pub element_size: usize,
    /// Whether `init` has completed.
    pub initialized: bool,
    /// Subscribers currently attached.
    pub subscribers: usize,
    /// Successful publishes per channel.
    pub publish_counts: [u64; MAX_CHANNELS],
}

impl Topic {
    /// Declare an uninitialized topic with the default subscriber capacity.
    pub const fn declare(name: &'static str) -> Self {
        Self::declare_with_capacity(name, DEFAULT_MAX_SUBSCRIBERS)
    }

    /// Declare an uninitialized topic accepting at most `max_subscribers`.
    pub const fn declare_with_capacity(name: &'static str, max_subscribers: usize) -> Self {
        Self {
            name,
            max_subscribers,
            initialized: AtomicBool::new(false),
            element_size: AtomicUsize::new(0),
            state: IrqCell::new(TopicState {
                channels: Vec::new(),
                registry: Registry::new(),
                publish_counts: [0; MAX_CHANNELS],
            }),
            detached: IrqCell::new(Vec::new()),
        }
    }

    /// Declare and initialize in one step.
    pub fn new(name: &'static str, element_size: usize) -> Result<Self> {
        let topic = Self::declare(name);
        topic.init(element_size)?;
        Ok(topic)
    }

    /// Allocate the zeroed channel buffers. Must be called exactly once.
    ///
    /// Subscribers registered before `init` stay attached. The topic is
    /// reported initialized only after every buffer is in place.
    pub fn init(&self, element_size: usize) -> Result<()> {
        if element_size == 0 {
            return Err(Error::InvalidElementSize);
        }
        if self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }

        // Allocate outside the critical section.
        let mut channels = Vec::new();
        channels
            .try_reserve_exact(MAX_CHANNELS)
            .map_err(|_| Error::OutOfMemory)?;
        for _ in 0..MAX_CHANNELS {
            channels.push(zeroed_buffer(element_size)?);
        }

        critical_section(|cs| -> Result<()> {
            let mut state = self.state.borrow_mut(cs)?;
            if !state.channels.is_empty() {
                return Err(Error::AlreadyInitialized);
            }
            state.registry.reserve(self.max_subscribers)?;
            state.channels = channels;
            self.element_size.store(element_size, Ordering::Relaxed);
            Ok(())
        })?;
        self.initialized.store(true, Ordering::Release);

        log::debug!(
            "[topic] '{}' initialized: {} channels x {} bytes",
            self.name,
            MAX_CHANNELS,
            element_size
        );
        Ok(())
    }

    /// Attach a subscriber to `channel`.
    ///
    /// Allowed before `init`; reads report no value until the topic is
    /// initialized.
    pub fn register(&self, channel: usize) -> Result<Subscriber<'_>> {
        check_channel(channel)?;
        let signal = Arc::new(SubscriberSignal::new()?);

        let slot = critical_section(|cs| -> Result<Option<SlotRef>> {
            self.reclaim_detached(cs);
            let mut state = self.state.borrow_mut(cs)?;
            state
                .registry
                .allocate(channel, Arc::clone(&signal), self.max_subscribers)
        })?;

        let Some(slot) = slot else {
            log::warn!(
                "[topic] '{}' rejected subscriber on channel {}: registry full (max {})",
                self.name,
                channel,
                self.max_subscribers
            );
            return Err(Error::ResourceLimitExceeded(format!(
                "topic '{}' accepts at most {} subscribers",
                self.name, self.max_subscribers
            )));
        };

        log::debug!(
            "[topic] '{}' subscriber attached: channel={} slot={}",
            self.name,
            channel,
            slot.index
        );
        Ok(Subscriber::new(self, channel, slot, signal))
    }

    /// Overwrite the value on `channel` and notify its subscribers.
    ///
    /// Safe to call from interrupt context: never blocks on consumers, never
    /// allocates on success and logs nothing.
    pub fn publish(&self, channel: usize, data: &[u8]) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        check_channel(channel)?;
        let expected = self.element_size.load(Ordering::Relaxed);
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        critical_section(|cs| -> Result<()> {
            let mut state = self.state.borrow_mut(cs)?;
            let state = &mut *state;
            let buffer = state
                .channels
                .get_mut(channel)
                .ok_or_else(|| Error::InvalidState("channel buffer missing".into()))?;
            buffer.copy_from_slice(data);
            state.publish_counts[channel] = state.publish_counts[channel].wrapping_add(1);
            state
                .registry
                .for_each_on_channel(channel, SubscriberSignal::raise);
            Ok(())
        })
    }

    /// Publish a plain-old-data value; its size must equal the element size.
    pub fn publish_pod<T: bytemuck::Pod>(&self, channel: usize, value: &T) -> Result<()> {
        self.publish(channel, bytemuck::bytes_of(value))
    }

    /// Topic name given at declaration.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `init` has completed.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Bytes per value, or `None` before `init`.
    pub fn element_size(&self) -> Option<usize> {
        self.is_initialized()
            .then(|| self.element_size.load(Ordering::Relaxed))
    }

    /// Maximum number of simultaneously attached subscribers.
    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    /// Snapshot of counters and occupancy.
    pub fn stats(&self) -> Result<TopicStats> {
        let initialized = self.is_initialized();
        let element_size = if initialized {
            self.element_size.load(Ordering::Relaxed)
        } else {
            0
        };

        critical_section(|cs| -> Result<TopicStats> {
            self.reclaim_detached(cs);
            let state = self.state.borrow(cs)?;
            Ok(TopicStats {
                name: self.name,
                element_size,
                initialized,
                subscribers: state.registry.len(),
                publish_counts: state.publish_counts,
            })
        })
    }

    /// Run `f` over the channel buffer and clear `signal`, both under the
    /// critical section. `None` before `init`.
    pub(super) fn with_channel<R>(
        &self,
        channel: usize,
        signal: &SubscriberSignal,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Option<R> {
        if !self.is_initialized() {
            return None;
        }

        critical_section(|cs| {
            let result = {
                // A shared borrow only fails while the topic itself is
                // mutating, and no mutation calls back into user code.
                let state = self.state.borrow(cs).ok()?;
                let buffer = state.channels.get(channel)?;
                signal.clear();
                f(buffer)
            };
            // `f` may have dropped subscribers of this topic.
            self.reclaim_detached(cs);
            Some(result)
        })
    }

    /// Release a subscriber slot. Stale or foreign slots are ignored.
    ///
    /// While `state` is borrowed (a `peek` closure dropping a subscriber),
    /// the slot is queued and released by the next read, `register` or
    /// `stats` on this topic.
    pub(super) fn detach(&self, slot: SlotRef, channel: usize) {
        let outcome = critical_section(|cs| -> Result<Detach> {
            if let Ok(mut state) = self.state.borrow_mut(cs) {
                return Ok(if state.registry.release(slot).is_some() {
                    Detach::Released
                } else {
                    Detach::Unknown
                });
            }
            let mut detached = self.detached.borrow_mut(cs)?;
            detached.push(slot);
            Ok(Detach::Deferred)
        });

        match outcome {
            Ok(Detach::Released) => log::debug!(
                "[topic] '{}' subscriber detached: channel={} slot={}",
                self.name,
                channel,
                slot.index
            ),
            Ok(Detach::Deferred) => log::debug!(
                "[topic] '{}' subscriber detach deferred: channel={} slot={}",
                self.name,
                channel,
                slot.index
            ),
            Ok(Detach::Unknown) => log::warn!(
                "[topic] '{}' detach of unknown slot {} (id {})",
                self.name,
                slot.index,
                slot.id
            ),
            Err(e) => log::warn!(
                "[topic] '{}' slot {} leaked on detach: {}",
                self.name,
                slot.index,
                e
            ),
        }
    }

    /// Release slots queued by a deferred detach. Does nothing while `state`
    /// is still borrowed.
    fn reclaim_detached(&self, cs: &CriticalSection) {
        let Ok(mut detached) = self.detached.borrow_mut(cs) else {
            return;
        };
        if detached.is_empty() {
            return;
        }
        if let Ok(mut state) = self.state.borrow_mut(cs) {
            for slot in detached.drain(..) {
                state.registry.release(slot);
            }
        }
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .field("element_size", &self.element_size.load(Ordering::Relaxed))
            .field("max_subscribers", &self.max_subscribers)
            .finish_non_exhaustive()
    }
}

#[inline]
fn check_channel(channel: usize) -> Result<()> {
    if channel >= MAX_CHANNELS {
        return Err(Error::InvalidChannel(channel));
    }
    Ok(())
}

fn zeroed_buffer(len: usize) -> Result<Box<[u8]>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory)?;
    buffer.resize(len, 0u8);
    Ok(buffer.into_boxed_slice())
}
