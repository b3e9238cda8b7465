// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Platform event objects backing [`WaitHandle`](super::WaitHandle).
//!
//! - On Linux/Unix: eventfd + poll.
//! - On Windows: manual-reset kernel Event + WaitForSingleObject.

use super::handle::WaitError;
use std::time::Duration;

pub(super) use platform::{close_event, create_event, drain_event, signal_event, wait_event};
pub(super) use platform::EventHandle;
#[cfg(all(test, unix))]
pub(super) use platform::break_event;

/// Result of a single platform wait.
pub(super) type WaitResult = Result<(), WaitError>;

/// Milliseconds to hand to the OS wait, `None` meaning forever.
///
/// A non-zero timeout shorter than a millisecond rounds up to one so the
/// caller still yields; anything past `u64::MAX` ms saturates.
pub(super) fn timeout_millis(timeout: Option<Duration>) -> Option<u64> {
    timeout.map(|d| {
        let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        if ms == 0 && !d.is_zero() {
            1
        } else {
            ms
        }
    })
}

// =============================================================================
// Unix implementation (eventfd + poll)
// =============================================================================
#[cfg(unix)]
mod platform {
    use std::io;
    use std::os::fd::RawFd;
    use std::time::Duration;

    use super::{timeout_millis, WaitError, WaitResult};

    const EVENTFD_FLAGS: libc::c_int = libc::EFD_NONBLOCK | libc::EFD_CLOEXEC;

    pub type EventHandle = RawFd;

    pub fn create_event() -> io::Result<EventHandle> {
        // SAFETY: eventfd is invoked with valid flags and no shared state.
        let fd = unsafe { libc::eventfd(0, EVENTFD_FLAGS) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(fd)
    }

    /// `poll(2)` timeout: `-1` blocks, longer waits clamp to `c_int::MAX`.
    fn poll_timeout(timeout: Option<Duration>) -> libc::c_int {
        timeout_millis(timeout).map_or(-1, |ms| {
            libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
        })
    }

    pub fn wait_event(handle: &EventHandle, timeout: Option<Duration>) -> WaitResult {
        let timeout_ms = poll_timeout(timeout);

        let mut pollfd = libc::pollfd {
            fd: *handle,
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: poll_target points to our stack-allocated pollfd structure.
            let poll_target = std::ptr::addr_of_mut!(pollfd);
            let res = unsafe { libc::poll(poll_target, 1, timeout_ms) };
            if res == 0 {
                return Err(WaitError::Timeout);
            }
            if res < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(WaitError::Io(err));
            }
            break;
        }

        if pollfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
            return Err(WaitError::Io(io::Error::other(
                "event descriptor reported an error condition",
            )));
        }
        Ok(())
    }

    pub fn signal_event(handle: &EventHandle) {
        let payload = 1u64.to_ne_bytes();
        loop {
            // SAFETY: payload references a stack buffer with the 8-byte eventfd payload.
            let ret = unsafe { libc::write(*handle, payload.as_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            // Runs inside critical sections: no logging. WouldBlock means the
            // counter saturated and a wakeup is already pending.
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            break;
        }
    }

    pub fn drain_event(handle: &EventHandle) {
        let mut payload = [0u8; 8];
        loop {
            // SAFETY: payload is a stack buffer sized to the eventfd read requirements (8 bytes).
            let ret = unsafe { libc::read(*handle, payload.as_mut_ptr().cast(), payload.len()) };
            if ret >= 0 {
                break;
            }

            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => break,
                _ => {
                    log::debug!("[wait] eventfd read failed: {}", err);
                    break;
                }
            }
        }
    }

    pub fn close_event(handle: &EventHandle) {
        // SAFETY: eventfd was obtained via libc::eventfd and is closed once here.
        unsafe {
            libc::close(*handle);
        }
    }

    /// Swap the eventfd for the write end of a pipe with no reader, so every
    /// later `poll` reports `POLLERR`. The descriptor number stays owned by
    /// the handle and is closed once on drop.
    #[cfg(test)]
    pub fn break_event(handle: &EventHandle) -> io::Result<()> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: fds is a two-element array as pipe(2) requires.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: both pipe ends were just created and are closed once here;
        // dup2 atomically replaces the eventfd behind `handle`.
        unsafe {
            libc::close(fds[0]);
            let ret = libc::dup2(fds[1], *handle);
            libc::close(fds[1]);
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Windows implementation (kernel Event object)
// =============================================================================
#[cfg(windows)]
mod platform {
    use std::ffi::c_void;
    use std::io;
    use std::time::Duration;

    use super::{timeout_millis, WaitError, WaitResult};

    type Handle = *mut c_void;

    const INFINITE: u32 = u32::MAX;
    const WAIT_OBJECT_0: u32 = 0;
    const WAIT_TIMEOUT: u32 = 258;

    extern "system" {
        fn CreateEventW(
            attributes: *const c_void,
            manual_reset: i32,
            initial_state: i32,
            name: *const u16,
        ) -> Handle;
        fn SetEvent(event: Handle) -> i32;
        fn ResetEvent(event: Handle) -> i32;
        fn WaitForSingleObject(event: Handle, millis: u32) -> u32;
        fn CloseHandle(event: Handle) -> i32;
    }

    /// Manual-reset, unnamed kernel event.
    pub struct EventHandle(Handle);

    // SAFETY: kernel event handles may be signaled and waited on from any thread.
    unsafe impl Send for EventHandle {}
    unsafe impl Sync for EventHandle {}

    pub fn create_event() -> io::Result<EventHandle> {
        // SAFETY: null attributes and name create an unnamed, non-signaled event.
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(EventHandle(handle))
    }

    /// `WaitForSingleObject` timeout: `INFINITE` blocks, finite waits stop
    /// one short of it.
    fn wait_timeout(timeout: Option<Duration>) -> u32 {
        timeout_millis(timeout).map_or(INFINITE, |ms| {
            u32::try_from(ms).map_or(INFINITE - 1, |ms| ms.min(INFINITE - 1))
        })
    }

    pub fn wait_event(handle: &EventHandle, timeout: Option<Duration>) -> WaitResult {
        // SAFETY: the handle came from CreateEventW and is open until drop.
        match unsafe { WaitForSingleObject(handle.0, wait_timeout(timeout)) } {
            WAIT_OBJECT_0 => Ok(()),
            WAIT_TIMEOUT => Err(WaitError::Timeout),
            _ => Err(WaitError::Io(io::Error::last_os_error())),
        }
    }

    pub fn signal_event(handle: &EventHandle) {
        // SAFETY: the handle came from CreateEventW and is open until drop.
        unsafe {
            SetEvent(handle.0);
        }
    }

    pub fn drain_event(handle: &EventHandle) {
        // SAFETY: the handle came from CreateEventW and is open until drop.
        if unsafe { ResetEvent(handle.0) } == 0 {
            log::debug!("[wait] ResetEvent failed: {}", io::Error::last_os_error());
        }
    }

    pub fn close_event(handle: &EventHandle) {
        // SAFETY: called once from WaitHandle::drop.
        unsafe {
            CloseHandle(handle.0);
        }
    }
}
