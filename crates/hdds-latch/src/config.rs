// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time configuration for latch topics.
//!
//! All sizing constants live here. **Never hardcode them elsewhere!**
//!
//! Per-topic overrides are limited to the subscriber capacity, set through
//! [`Topic::declare_with_capacity`](crate::Topic::declare_with_capacity).

/// Number of channels every topic carries.
///
/// Shared by all topic instances. Storage for every channel is allocated at
/// `init` whether or not the channel is used.
pub const MAX_CHANNELS: usize = 4;

/// Default number of subscriber slots per topic.
///
/// Slot storage is reserved when the topic is initialized so that publish
/// fan-out never allocates.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 32;

/// Longest accepted topic name, in bytes.
///
/// Only enforced where names cross an FFI boundary; Rust callers pass
/// `&'static str` and are not truncated.
pub const MAX_TOPIC_NAME_LEN: usize = 64;

