// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait handles for blocking subscribers.
//!
//! A [`WaitHandle`] pairs an OS event (eventfd on Unix, kernel Event on
//! Windows) with a poll state. Raising it never blocks, so it can be driven
//! from a critical section; waiting parks the calling thread in the kernel.

mod event;
mod handle;

pub use handle::{PollState, WaitError, WaitHandle};

#[cfg(test)]
mod tests;
