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
** Created on: 2026-10-12T10:20:15
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

//! One-shot alarms delivering their expiry on a dedicated thread
//!
//! An [AlarmService] arms a countdown and returns an [Alarm] registration,
//! the registration is released by dropping it.

use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

use crate::error::Result;

pub mod manual;
pub mod thread;
#[cfg(target_os = "linux")]
pub mod timerfd;

/// Expiry notification, invoked on the alarm's notifier thread
pub type FireFn = Arc<dyn Fn() + Send + Sync + 'static>;

pub trait AlarmService: Send + Sync {
    /// Register a new alarm and start a one-shot countdown of `duration`
    fn arm(&self, duration: Duration, on_fire: FireFn) -> Result<Box<dyn Alarm>>;
}

/// Alarm registration
///
/// Dropping it releases the underlying resources, `on_fire` won't be invoked
/// for any countdown that did not already expire.
pub trait Alarm: Send {
    /// Restart the one-shot countdown, cancelling any pending one
    fn rearm(&self, duration: Duration) -> Result<()>;

    /// Cancel the pending countdown (if any)
    fn disarm(&self) -> Result<()>;
}

/// Available alarm implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Linux `timerfd` polled by a notifier thread
    #[cfg_attr(target_os = "linux", default)]
    Timerfd,
    /// portable condvar based notifier thread
    #[cfg_attr(not(target_os = "linux"), default)]
    Thread,
}

impl Backend {
    pub fn service(&self, thread_name: &str) -> Arc<dyn AlarmService> {
        match self {
            #[cfg(target_os = "linux")]
            Backend::Timerfd => Arc::new(timerfd::TimerfdService::new(thread_name)),
            #[cfg(not(target_os = "linux"))]
            Backend::Timerfd => {
                tracing::warn!("timerfd backend not available, using thread backend");
                Arc::new(thread::ThreadService::new(thread_name))
            }
            Backend::Thread => Arc::new(thread::ThreadService::new(thread_name)),
        }
    }
}
