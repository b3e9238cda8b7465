// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for latch topics.
//!
//! Consume paths (`peek`, `copy`) never return [`Error`] for an uninitialized
//! topic: they report an absent value instead, since that case occurs
//! naturally during startup races. Everything else propagates explicitly.

use std::fmt;
use std::io;

/// Errors returned by topic and subscriber operations.
///
/// # Example
///
/// ```rust
/// use hdds_latch::{Error, Topic};
///
/// let topic = Topic::new("example", 4).expect("topic");
/// match topic.register(9) {
///     Err(Error::InvalidChannel(ch)) => println!("bad channel {}", ch),
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => println!("registered"),
/// };
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Channel index out of range (must be below `MAX_CHANNELS`).
    InvalidChannel(usize),
    /// Element size of zero requested at init.
    InvalidElementSize,
    /// `init` called on a topic that is already initialized, or a critical
    /// section backend installed twice.
    AlreadyInitialized,
    /// Publish attempted before the topic finished `init`.
    NotInitialized,

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Published payload length differs from the topic element size.
    SizeMismatch {
        /// Topic element size.
        expected: usize,
        /// Length supplied by the caller.
        actual: usize,
    },
    /// Destination buffer shorter than the topic element size.
    BufferTooSmall {
        /// Topic element size.
        required: usize,
        /// Length supplied by the caller.
        actual: usize,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Channel buffer allocation failed during `init`.
    OutOfMemory,
    /// Subscriber registry is full.
    ResourceLimitExceeded(String),
    /// Wait handle could not be created.
    IoError(io::Error),

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// The underlying blocking wait failed (distinct from a timeout).
    WaitFailed(io::Error),
    /// A primitive reported a state that cannot happen in correct operation.
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration
            Error::InvalidChannel(ch) => write!(
                f,
                "Invalid channel: {} (must be < {})",
                ch,
                crate::config::MAX_CHANNELS
            ),
            Error::InvalidElementSize => write!(f, "Invalid element size: must be > 0"),
            Error::AlreadyInitialized => write!(f, "Already initialized"),
            Error::NotInitialized => write!(f, "Topic not initialized"),
            // Data
            Error::SizeMismatch { expected, actual } => write!(
                f,
                "Size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            Error::BufferTooSmall { required, actual } => write!(
                f,
                "Buffer too small: need {} bytes, got {}",
                required, actual
            ),
            // Resource
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            // Wait
            Error::WaitFailed(e) => write!(f, "Wait failed: {}", e),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) | Error::WaitFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

/// Convenient alias for results using the crate [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
