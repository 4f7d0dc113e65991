/*
** Copyright (C) 2026 Sylvain Fargier
**
** This software is provided 'as-is', without any express or implied
** warranty.  In no event will the authors be held liable for any damages
** arising from the use of this software.
**
** Permission is granted to anyone to use this software for any purpose,
** including commercial applications, and to alter it and redistribute it
** freely, subject to the following restrictions:
**
** 1. The origin of this software must not be misrepresented; you must not
**    claim that you wrote the original software. If you use this software
**    in a product, an acknowledgment in the product documentation would be
**    appreciated but is not required.
** 2. Altered source versions must be plainly marked as such, and must not be
**    misrepresented as being the original software.
** 3. This notice may not be removed or altered from any source distribution.
**
** Created on: 2026-01-09T16:02:25
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use libc::c_int;
use std::io;

/// assert for libc functions
pub fn check(res: c_int) -> io::Result<()> {
    if res != 0 {
        let err = io::Error::last_os_error();
        tracing::trace!(?err, "libc_check");
        Err(err)
    } else {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use timerfd::Timerfd;

#[cfg(target_os = "linux")]
mod timerfd {
    use libc::{itimerspec, timerfd_create, timerfd_settime};
    use std::{
        io,
        os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
        ptr::null_mut,
        time::Duration,
    };

    use super::check;

    /// One-shot `CLOCK_MONOTONIC` timer file-descriptor
    ///
    /// The descriptor becomes readable on expiry, it is non-blocking.
    #[derive(Debug)]
    pub struct Timerfd(OwnedFd);

    impl Timerfd {
        pub fn new() -> io::Result<Self> {
            let fd = unsafe {
                timerfd_create(libc::CLOCK_MONOTONIC, libc::TFD_CLOEXEC | libc::TFD_NONBLOCK)
            };
            if fd < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(Self(unsafe { OwnedFd::from_raw_fd(fd) }))
            }
        }

        /// Start a one-shot countdown, `None` disarms the timer
        ///
        /// A zero duration would disarm the timer, it is bumped to 1ns.
        pub fn set(&self, duration: Option<Duration>) -> io::Result<()> {
            /* it_interval stays zeroed: one-shot */
            let mut value = unsafe { std::mem::zeroed::<itimerspec>() };
            if let Some(duration) = duration {
                let duration = duration.max(Duration::from_nanos(1));
                value.it_value.tv_sec = duration.as_secs() as libc::time_t;
                value.it_value.tv_nsec = duration.subsec_nanos() as libc::c_long;
            }
            check(unsafe { timerfd_settime(self.as_raw_fd(), 0, &value, null_mut()) })
        }

        /// Consume the expiration counter
        ///
        /// Returns `0` when the timer did not expire (or was re-programmed
        /// since it became readable).
        pub fn expirations(&self) -> io::Result<u64> {
            let mut count = [0u8; 8];
            let ret = unsafe {
                libc::read(
                    self.as_raw_fd(),
                    count.as_mut_ptr() as *mut libc::c_void,
                    count.len(),
                )
            };
            if ret == count.len() as isize {
                Ok(u64::from_ne_bytes(count))
            } else {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock => Ok(0),
                    _ => Err(err),
                }
            }
        }
    }

    impl AsRawFd for Timerfd {
        fn as_raw_fd(&self) -> RawFd {
            self.0.as_raw_fd()
        }
    }

}
