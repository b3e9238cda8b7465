// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime primitives: interrupt-safe critical sections and wait handles.

pub mod critical;
pub mod wait;

pub use critical::{
    critical_section, in_critical_section, CriticalSection, IrqCell, IrqControl, IrqKey,
};
pub use wait::{PollState, WaitError, WaitHandle};
