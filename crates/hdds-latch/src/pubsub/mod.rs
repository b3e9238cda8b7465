// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Topics and subscribers
//!
//! ```text
//! Topic ("imu", element_size = 12)
//! +-- channel 0 [12 bytes] <--- publish(0, ..)   --> Subscriber A (ch 0)
//! +-- channel 1 [12 bytes] <--- publish(1, ..)   --> Subscriber B (ch 1)
//! +-- channel 2 [12 bytes]                           Subscriber C (ch 1)
//! +-- channel 3 [12 bytes]
//! ```
//!
//! - [`Topic`] owns the channel buffers and a fixed-capacity registry of
//!   subscriber slots. It never owns subscribers.
//! - [`Subscriber`] borrows its topic for its whole life and detaches itself
//!   on drop.
//!
//! ## Read paths
//!
//! | Operation | Blocks | Clears pending | Copies |
//! |-----------|--------|----------------|--------|
//! | [`Subscriber::has_update`] | no | no | no |
//! | [`Subscriber::peek`] | no | yes | no (borrowed view) |
//! | [`Subscriber::copy`] | no | yes | yes |
//! | [`Subscriber::wait`] | up to timeout | on `Ready` | no |

mod registry;
mod signal;
mod subscriber;
mod topic;

pub use subscriber::{Subscriber, WaitStatus};
pub use topic::{Topic, TopicStats};
