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
** Created on: 2026-10-12T14:08:52
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{sync::Arc, time::Duration};

use super::{Alarm, AlarmService, FireFn};
use crate::{
    error::{Result, TimerError},
    utils::{
        libc::Timerfd,
        poller::{Poller, PollerFds, PollerFlags, PollerWord, PollerWriter},
    },
};

/// `timerfd` based alarms
///
/// Each alarm owns a `CLOCK_MONOTONIC` timerfd and a notifier thread polling
/// it, `on_fire` is called from that thread.
#[derive(Debug)]
pub struct TimerfdService {
    thread_name: String,
}

impl TimerfdService {
    pub fn new(thread_name: &str) -> Self {
        Self {
            thread_name: thread_name.to_string(),
        }
    }
}

impl AlarmService for TimerfdService {
    #[tracing::instrument(level = "TRACE", skip(self, on_fire))]
    fn arm(&self, duration: Duration, on_fire: FireFn) -> Result<Box<dyn Alarm>> {
        let fd = Arc::new(Timerfd::new().map_err(TimerError::AllocationFailed)?);
        let (poller, writer) = Poller::new().map_err(TimerError::AllocationFailed)?;
        let alarm = TimerfdAlarm {
            fd: Arc::clone(&fd),
            writer,
        };

        /* readiness is level-triggered, an early expiry is still caught */
        alarm.rearm(duration)?;

        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || notifier(poller, fd, on_fire))
            .map_err(TimerError::AllocationFailed)?;
        Ok(Box::new(alarm))
    }
}

pub struct TimerfdAlarm {
    fd: Arc<Timerfd>,
    writer: PollerWriter,
}

impl Alarm for TimerfdAlarm {
    fn rearm(&self, duration: Duration) -> Result<()> {
        self.fd.set(Some(duration)).map_err(TimerError::ArmFailed)
    }

    fn disarm(&self) -> Result<()> {
        self.fd.set(None).map_err(TimerError::ArmFailed)
    }
}

impl Drop for TimerfdAlarm {
    fn drop(&mut self) {
        if let Err(err) = self.fd.set(None) {
            tracing::warn!(?err, "failed to disarm timerfd");
        }
        /* not joined: we may be running on the notifier thread itself */
        self.writer.exit();
    }
}

fn notifier(mut poller: Poller, fd: Arc<Timerfd>, on_fire: FireFn) {
    tracing::trace!(?fd, "alarm notifier started");
    let mut pfds = PollerFds::with_capacity(1);
    loop {
        pfds.clear();
        pfds.push(&*fd, PollerFlags::IN);

        match poller.poll(&mut pfds) {
            Ok(Some(PollerWord::Exit)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::error!(?err, "alarm poll failed, notifier stopped");
                break;
            }
        }

        if pfds.iter().next().is_none() {
            continue;
        }
        match fd.expirations() {
            Ok(0) => tracing::trace!("alarm re-programmed before notification"),
            Ok(_) => on_fire(),
            Err(err) => {
                tracing::error!(?err, "failed to read timerfd, notifier stopped");
                break;
            }
        }
    }
    tracing::trace!(?fd, "alarm notifier exited");
}
