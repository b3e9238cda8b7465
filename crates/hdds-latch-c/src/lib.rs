// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-latch C FFI Bindings
//!
//! C-compatible `pubsub_*` API over [`hdds_latch`].
//!
//! Topics created here live for the rest of the process (they are leaked on
//! purpose so subscribers can hold `'static` references to them).
//! Subscribers are heap handles released with `pubsub_subscriber_destroy`.
//!
//! # Safety
//!
//! All public functions are `unsafe` and require the caller to uphold the
//! invariants documented in each function's safety comment.

mod logging;

pub use logging::*;

use hdds_latch::config::MAX_TOPIC_NAME_LEN;
use hdds_latch::{Error, Subscriber, Topic, WaitStatus};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::time::Duration;

/// Opaque handle to a Topic
#[repr(C)]
pub struct PubsubTopic {
    _private: [u8; 0],
}

/// Opaque handle to a Subscriber
#[repr(C)]
pub struct PubsubSubscriber {
    _private: [u8; 0],
}

/// Error codes (C-compatible enum)
///
/// # Error Code Categories
///
/// - **0-9**: Success and generic errors
/// - **10-19**: Configuration errors
/// - **20-29**: I/O and resource errors
/// - **30-39**: Data errors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum PubsubError {
    /// Operation completed successfully
    PubsubOk = 0,
    /// Invalid argument provided (null pointer, bad name)
    PubsubInvalidArgument = 1,
    /// Generic operation failure
    PubsubOperationFailed = 3,
    /// Memory allocation failed
    PubsubOutOfMemory = 4,

    // === Configuration errors (10-19) ===
    /// Channel index out of range
    PubsubInvalidChannel = 10,
    /// Element size of zero
    PubsubInvalidElementSize = 11,
    /// Topic already initialized
    PubsubAlreadyInitialized = 12,
    /// Topic not initialized yet
    PubsubNotInitialized = 13,
    /// Primitive reported an impossible state
    PubsubInvalidState = 14,

    // === I/O and resource errors (20-29) ===
    /// OS event creation failed
    PubsubIoError = 20,
    /// Blocking wait failed
    PubsubWaitFailed = 21,
    /// Subscriber registry full
    PubsubResourceLimitExceeded = 22,

    // === Data errors (30-39) ===
    /// Payload length differs from the element size
    PubsubSizeMismatch = 30,
    /// Destination buffer shorter than the element size
    PubsubBufferTooSmall = 32,
}

impl From<&Error> for PubsubError {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidChannel(_) => PubsubError::PubsubInvalidChannel,
            Error::InvalidElementSize => PubsubError::PubsubInvalidElementSize,
            Error::AlreadyInitialized => PubsubError::PubsubAlreadyInitialized,
            Error::NotInitialized => PubsubError::PubsubNotInitialized,
            Error::SizeMismatch { .. } => PubsubError::PubsubSizeMismatch,
            Error::BufferTooSmall { .. } => PubsubError::PubsubBufferTooSmall,
            Error::OutOfMemory => PubsubError::PubsubOutOfMemory,
            Error::ResourceLimitExceeded(_) => PubsubError::PubsubResourceLimitExceeded,
            Error::IoError(_) => PubsubError::PubsubIoError,
            Error::WaitFailed(_) => PubsubError::PubsubWaitFailed,
            Error::InvalidState(_) => PubsubError::PubsubInvalidState,
        }
    }
}

fn status(result: hdds_latch::Result<()>) -> PubsubError {
    match result {
        Ok(()) => PubsubError::PubsubOk,
        Err(e) => (&e).into(),
    }
}

/// Copy a C topic name into a process-lifetime string.
unsafe fn leak_name(name: *const c_char) -> Option<&'static str> {
    if name.is_null() {
        return None;
    }
    let name = CStr::from_ptr(name).to_str().ok()?;
    if name.is_empty() || name.len() > MAX_TOPIC_NAME_LEN {
        log::warn!(
            "[ffi] rejected topic name of {} bytes (max {})",
            name.len(),
            MAX_TOPIC_NAME_LEN
        );
        return None;
    }
    Some(Box::leak(name.to_owned().into_boxed_str()))
}

unsafe fn topic_ref<'a>(topic: *const PubsubTopic) -> Option<&'a Topic> {
    topic.cast::<Topic>().as_ref()
}

unsafe fn subscriber_ref<'a>(sub: *const PubsubSubscriber) -> Option<&'a Subscriber<'static>> {
    sub.cast::<Subscriber<'static>>().as_ref()
}

// =============================================================================
// Topic
// =============================================================================

/// Declare an uninitialized topic (call `pubsub_topic_init` before publishing)
///
/// # Safety
/// - `name` must be a valid null-terminated UTF-8 string of at most
///   `MAX_TOPIC_NAME_LEN` bytes.
///
/// # Returns
/// Topic handle valid for the rest of the process, or NULL on invalid name
#[no_mangle]
pub unsafe extern "C" fn pubsub_topic_declare(name: *const c_char) -> *mut PubsubTopic {
    let Some(name) = leak_name(name) else {
        return ptr::null_mut();
    };
    let topic: &'static Topic = Box::leak(Box::new(Topic::declare(name)));
    ptr::from_ref(topic).cast_mut().cast::<PubsubTopic>()
}

/// Allocate the channel buffers of a declared topic
///
/// # Safety
/// - `topic` must be a handle from `pubsub_topic_declare` or NULL.
#[no_mangle]
pub unsafe extern "C" fn pubsub_topic_init(topic: *mut PubsubTopic, size: usize) -> PubsubError {
    let Some(topic) = topic_ref(topic) else {
        return PubsubError::PubsubInvalidArgument;
    };
    status(topic.init(size))
}

/// Declare and initialize a topic in one call
///
/// # Safety
/// - `name` must be a valid null-terminated UTF-8 string of at most
///   `MAX_TOPIC_NAME_LEN` bytes.
///
/// # Returns
/// Topic handle valid for the rest of the process, or NULL on error
#[no_mangle]
pub unsafe extern "C" fn pubsub_topic_create(name: *const c_char, size: usize) -> *mut PubsubTopic {
    let topic = pubsub_topic_declare(name);
    if topic.is_null() {
        return ptr::null_mut();
    }

    let rc = pubsub_topic_init(topic, size);
    if rc != PubsubError::PubsubOk {
        // The declared topic stays leaked but unusable for publishing.
        log::error!("[ffi] topic init failed: {:?}", rc);
        return ptr::null_mut();
    }
    topic
}

/// Publish one value (`element_size` bytes read from `data`)
///
/// # Safety
/// - `topic` must be a valid topic handle or NULL.
/// - `data` must point to at least `element_size` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn pubsub_publish(
    topic: *mut PubsubTopic,
    channel: usize,
    data: *const c_void,
) -> PubsubError {
    let Some(topic) = topic_ref(topic) else {
        return PubsubError::PubsubInvalidArgument;
    };
    if data.is_null() {
        return PubsubError::PubsubInvalidArgument;
    }
    let Some(size) = topic.element_size() else {
        return PubsubError::PubsubNotInitialized;
    };

    let bytes = std::slice::from_raw_parts(data.cast::<u8>(), size);
    status(topic.publish(channel, bytes))
}

// =============================================================================
// Subscriber
// =============================================================================

/// Register a subscriber on `channel`
///
/// # Safety
/// - `topic` must be a valid topic handle or NULL.
///
/// # Returns
/// Subscriber handle, or NULL on error
#[no_mangle]
pub unsafe extern "C" fn pubsub_subscriber_register(
    topic: *mut PubsubTopic,
    channel: usize,
) -> *mut PubsubSubscriber {
    // Topics handed out by this crate are leaked, so 'static holds.
    let topic: Option<&'static Topic> = topic_ref(topic);
    let Some(topic) = topic else {
        return ptr::null_mut();
    };

    match topic.register(channel) {
        Ok(sub) => Box::into_raw(Box::new(sub)).cast::<PubsubSubscriber>(),
        Err(e) => {
            log::error!("[ffi] failed to register subscriber: {}", e);
            ptr::null_mut()
        }
    }
}

/// Detach and free a subscriber
///
/// # Safety
/// - `sub` must be a handle from `pubsub_subscriber_register` or NULL, and
///   must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn pubsub_subscriber_destroy(sub: *mut PubsubSubscriber) {
    if !sub.is_null() {
        let _ = Box::from_raw(sub.cast::<Subscriber<'static>>());
    }
}

/// Raise the subscriber's notification without publishing
///
/// # Safety
/// - `sub` must be a valid subscriber handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn pubsub_subscriber_notify(sub: *mut PubsubSubscriber) {
    if let Some(sub) = subscriber_ref(sub) {
        sub.notify();
    }
}

/// Whether new data arrived since the last read
///
/// # Safety
/// - `sub` must be a valid subscriber handle or NULL.
#[no_mangle]
pub unsafe extern "C" fn pubsub_subscriber_updated(sub: *mut PubsubSubscriber) -> bool {
    subscriber_ref(sub).is_some_and(Subscriber::has_update)
}

/// Pointer to the live channel buffer (no copy)
///
/// Clears the update flag. The buffer may be overwritten by a concurrent
/// publish while the caller reads it.
///
/// # Safety
/// - `sub` must be a valid subscriber handle or NULL.
///
/// # Returns
/// Buffer pointer, or NULL when the topic is not initialized
#[no_mangle]
pub unsafe extern "C" fn pubsub_get(sub: *mut PubsubSubscriber) -> *const c_void {
    subscriber_ref(sub)
        .and_then(Subscriber::peek_ptr)
        .map_or(ptr::null(), |buffer| buffer.as_ptr().cast::<c_void>().cast_const())
}

/// Copy the latest value into `msg`
///
/// # Safety
/// - `sub` must be a valid subscriber handle or NULL.
/// - `msg` must point to `len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn pubsub_copy(
    sub: *mut PubsubSubscriber,
    msg: *mut c_void,
    len: usize,
) -> PubsubError {
    let Some(sub) = subscriber_ref(sub) else {
        return PubsubError::PubsubInvalidArgument;
    };
    if msg.is_null() {
        return PubsubError::PubsubInvalidArgument;
    }

    let dest = std::slice::from_raw_parts_mut(msg.cast::<u8>(), len);
    match sub.copy(dest) {
        Ok(true) => PubsubError::PubsubOk,
        Ok(false) => PubsubError::PubsubNotInitialized,
        Err(e) => (&e).into(),
    }
}

/// Wait for the next publish
///
/// `timeout_ms` of 0 checks without blocking; a negative value waits forever.
///
/// # Safety
/// - `sub` must be a valid subscriber handle or NULL.
///
/// # Returns
/// `1` when new data is available, `0` on timeout, `-EINVAL` on an invalid
/// wait state, `-EIO` if the wait failed, `-EFAULT` for a NULL handle
#[no_mangle]
pub unsafe extern "C" fn pubsub_poll(sub: *mut PubsubSubscriber, timeout_ms: i64) -> c_int {
    let Some(sub) = subscriber_ref(sub) else {
        return -libc::EFAULT;
    };

    let timeout = u64::try_from(timeout_ms).ok().map(Duration::from_millis);
    match sub.wait(timeout) {
        Ok(WaitStatus::Ready) => 1,
        Ok(WaitStatus::TimedOut) => 0,
        Err(Error::InvalidState(msg)) => {
            log::error!("[ffi] poll: {}", msg);
            -libc::EINVAL
        }
        Err(e) => {
            log::error!("[ffi] poll failed: {}", e);
            -libc::EIO
        }
    }
}
