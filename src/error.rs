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
** Created on: 2026-10-12T09:41:03
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use thiserror::Error;

use crate::timer::Status;

/// Errors returned by [Timer](crate::Timer) operations and alarm backends
#[derive(Debug, Error)]
pub enum TimerError {
    /// the timer has already been released
    #[error("invalid timer handle (timer released)")]
    InvalidHandle,

    /// operation is not permitted in the current lifecycle state
    #[error("operation not permitted while timer is {0:?}")]
    InvalidState(Status),

    /// the alarm backend failed to acquire its resources (fd, pipe, thread)
    #[error("failed to allocate alarm resources")]
    AllocationFailed(#[source] std::io::Error),

    /// the alarm could not be (re)programmed
    #[error("failed to program alarm")]
    ArmFailed(#[source] std::io::Error),
}

pub type Result<T, E = TimerError> = std::result::Result<T, E>;
