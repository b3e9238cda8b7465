// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interrupt-safe critical sections.
//!
//! Every mutation reachable from `publish` runs inside a [`CriticalSection`].
//! On a target port the section masks interrupts (`irq_lock`/`irq_unlock`
//! style); on a hosted OS the default backend emulates global masking with a
//! process-wide reentrant lock, so "interrupts" are simply other threads.
//!
//! The section is a scoped guard: the prior mask state is restored on every
//! exit path, early returns and `?` included. Shared state lives in
//! [`IrqCell`], which can only be opened with a `&CriticalSection` token.
//!
//! ```rust
//! use hdds_latch::rt::{critical_section, IrqCell};
//!
//! static COUNTER: IrqCell<u32> = IrqCell::new(0);
//!
//! critical_section(|cs| {
//!     if let Ok(mut count) = COUNTER.borrow_mut(cs) {
//!         *count += 1;
//!     }
//! });
//! ```

use crate::error::{Error, Result};
use parking_lot::ReentrantMutex;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::marker::PhantomData;
use std::sync::OnceLock;

/// Saved interrupt state returned by [`IrqControl::lock`].
///
/// Opaque to callers; handed back unchanged to [`IrqControl::unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqKey(u32);

impl IrqKey {
    /// Wrap a platform-specific key (e.g. the value returned by `irq_lock()`).
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        IrqKey(raw)
    }

    /// Raw platform value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Backend that masks and restores interrupts.
///
/// # Safety
///
/// [`IrqCell`] hands out unsynchronized access to its contents to whoever
/// holds a [`CriticalSection`]. An implementation must therefore guarantee
/// that between `lock` and the matching `unlock`, no other execution context
/// (thread, interrupt handler, other core) can be inside a critical section.
/// Nested `lock` calls on the same context must succeed, and `is_locked`
/// must report `true` only for the context holding the mask.
///
/// A backend that does not exclude is rejected at compile time unless it is
/// declared `unsafe impl`:
///
/// ```rust,compile_fail
/// use hdds_latch::{IrqControl, IrqKey};
///
/// struct NoMask;
///
/// impl IrqControl for NoMask {
///     fn lock(&self) -> IrqKey {
///         IrqKey::new(0)
///     }
///     unsafe fn unlock(&self, _key: IrqKey) {}
///     fn is_locked(&self) -> bool {
///         false
///     }
/// }
/// ```
pub unsafe trait IrqControl: Send + Sync {
    /// Mask interrupts and return the state needed to restore them.
    fn lock(&self) -> IrqKey;

    /// Restore the state captured by `lock`.
    ///
    /// # Safety
    ///
    /// `key` must come from the most recent unmatched `lock` call made on the
    /// current execution context (strict LIFO pairing).
    unsafe fn unlock(&self, key: IrqKey);

    /// Whether the current execution context holds the mask.
    fn is_locked(&self) -> bool;
}

thread_local! {
    static MASK_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Hosted backend: a process-wide reentrant lock stands in for the global
/// interrupt mask. The key records the nesting depth before entry.
struct HostIrqControl {
    lock: ReentrantMutex<()>,
}

// SAFETY: the process-wide mutex is held from `lock` to the matching
// `unlock`, so at most one thread is ever inside a critical section.
unsafe impl IrqControl for HostIrqControl {
    fn lock(&self) -> IrqKey {
        // Ownership is tracked by MASK_DEPTH; the guard is released by `unlock`.
        std::mem::forget(self.lock.lock());
        let prev = MASK_DEPTH.with(|depth| {
            let prev = depth.get();
            depth.set(prev.saturating_add(1));
            prev
        });
        IrqKey(prev)
    }

    unsafe fn unlock(&self, key: IrqKey) {
        MASK_DEPTH.with(|depth| depth.set(key.0));
        // SAFETY: the caller pairs this with a `lock` on this thread, whose
        // guard was forgotten above, so the current thread owns the mutex.
        unsafe { self.lock.force_unlock() };
    }

    fn is_locked(&self) -> bool {
        MASK_DEPTH.with(|depth| depth.get() > 0)
    }
}

static HOST_IRQ: HostIrqControl = HostIrqControl {
    lock: parking_lot::const_reentrant_mutex(()),
};

static IRQ_CONTROL: OnceLock<&'static dyn IrqControl> = OnceLock::new();

/// Install the interrupt backend for this process.
///
/// Must run before the first critical section; once any section has been
/// entered the hosted backend is locked in. `control` must uphold the
/// exclusion contract documented on [`IrqControl`].
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if a backend is already active.
pub fn install_irq_control(control: &'static dyn IrqControl) -> Result<()> {
    IRQ_CONTROL
        .set(control)
        .map_err(|_| Error::AlreadyInitialized)?;
    log::debug!("[critical] custom interrupt backend installed");
    Ok(())
}

fn irq_control() -> &'static dyn IrqControl {
    *IRQ_CONTROL.get_or_init(|| &HOST_IRQ)
}

/// Whether the calling context is currently inside a critical section.
pub fn in_critical_section() -> bool {
    irq_control().is_locked()
}

/// Scoped interrupt mask.
///
/// Interrupts stay masked while the guard lives; dropping it restores the
/// state that was active before [`CriticalSection::enter`]. Guards must be
/// dropped in reverse order of creation, which lexical scoping gives for free.
/// Not `Send`: the mask belongs to the context that took it.
pub struct CriticalSection {
    control: &'static dyn IrqControl,
    key: IrqKey,
    _not_send: PhantomData<*const ()>,
}

impl CriticalSection {
    /// Mask interrupts until the returned guard is dropped.
    #[must_use = "interrupts are restored as soon as the guard is dropped"]
    pub fn enter() -> Self {
        let control = irq_control();
        let key = control.lock();
        Self {
            control,
            key,
            _not_send: PhantomData,
        }
    }

    /// Key captured on entry.
    pub fn key(&self) -> IrqKey {
        self.key
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        // SAFETY: `key` was produced by `lock` in `enter` on this context and
        // the guard is !Send, so it is released where it was taken.
        unsafe { self.control.unlock(self.key) };
    }
}

/// Run `f` with interrupts masked.
pub fn critical_section<R>(f: impl FnOnce(&CriticalSection) -> R) -> R {
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Shared state reachable only from inside a critical section.
///
/// Re-entrant access (e.g. a publish issued from a peek callback) is detected
/// and reported as [`Error::InvalidState`] instead of aliasing.
pub struct IrqCell<T> {
    inner: RefCell<T>,
}

// SAFETY: the contents are only reachable through a `&CriticalSection`, and
// every `IrqControl` backend (an unsafe trait) guarantees that a live critical
// section excludes every other execution context.
unsafe impl<T: Send> Sync for IrqCell<T> {}

impl<T> IrqCell<T> {
    /// Wrap `value`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// Shared access for the lifetime of the critical section.
    pub fn borrow<'cs>(&'cs self, _cs: &'cs CriticalSection) -> Result<Ref<'cs, T>> {
        self.inner
            .try_borrow()
            .map_err(|_| Error::InvalidState("irq cell re-entered while mutably borrowed".into()))
    }

    /// Exclusive access for the lifetime of the critical section.
    pub fn borrow_mut<'cs>(&'cs self, _cs: &'cs CriticalSection) -> Result<RefMut<'cs, T>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| Error::InvalidState("irq cell re-entered while borrowed".into()))
    }
}
