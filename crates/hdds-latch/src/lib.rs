// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-latch - Interrupt-safe latest-value topics
//!
//! A small publish/subscribe primitive for real-time and interrupt-driven
//! systems. Producers publish fixed-size values onto named topics; every topic
//! has [`MAX_CHANNELS`] independent channels, each holding only the most
//! recent value. Consumers register a [`Subscriber`] on one channel and either
//! poll for freshness or block until the next publish.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_latch::{Topic, WaitStatus};
//! use std::time::Duration;
//!
//! static IMU: Topic = Topic::declare("imu");
//!
//! fn main() -> hdds_latch::Result<()> {
//!     IMU.init(4)?;
//!
//!     let sub = IMU.register(0)?;
//!     IMU.publish(0, &[1, 2, 3, 4])?;
//!
//!     assert!(sub.has_update());
//!     let mut value = [0u8; 4];
//!     assert!(sub.copy(&mut value)?);
//!     assert_eq!(value, [1, 2, 3, 4]);
//!
//!     // Nothing new since the copy
//!     assert_eq!(sub.wait(Some(Duration::ZERO))?, WaitStatus::TimedOut);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  Producers (threads, ISRs)        Consumers (threads)       |
//! |     publish(ch, bytes)            has_update/peek/copy/wait |
//! +-------------------------------------------------------------+
//! |  Topic: [ch0][ch1][ch2][ch3]  +  slot registry              |
//! |         (guarded by IrqCell, one critical section per op)   |
//! +-------------------------------------------------------------+
//! |  rt::critical  (interrupt masking / host reentrant lock)    |
//! |  rt::wait      (eventfd / kernel Event wait handle)         |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Semantics
//!
//! - **Latest value only**: a consumer that misses two publishes sees the
//!   second one. There is no queue.
//! - **Coalesced notification**: any number of publishes between two reads
//!   leave exactly one pending notification.
//! - **Publish never blocks** on consumers. It runs inside a short critical
//!   section and performs no allocation or logging.

pub mod config;
mod error;
pub mod pubsub;
pub mod rt;

pub use config::{DEFAULT_MAX_SUBSCRIBERS, MAX_CHANNELS};
pub use error::{Error, Result};
pub use pubsub::{Subscriber, Topic, TopicStats, WaitStatus};
pub use rt::critical::{
    critical_section, in_critical_section, install_irq_control, CriticalSection, IrqControl,
    IrqKey,
};
