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
** Created on: 2026-10-13T08:31:10
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use super::{Alarm, AlarmService, FireFn};
use crate::error::{Result, TimerError};

/// Portable alarms: one notifier thread sleeping on a condvar per alarm
#[derive(Debug)]
pub struct ThreadService {
    thread_name: String,
}

impl ThreadService {
    pub fn new(thread_name: &str) -> Self {
        Self {
            thread_name: thread_name.to_string(),
        }
    }
}

impl AlarmService for ThreadService {
    #[tracing::instrument(level = "TRACE", skip(self, on_fire))]
    fn arm(&self, duration: Duration, on_fire: FireFn) -> Result<Box<dyn Alarm>> {
        let core = Arc::new(AlarmCore {
            cond: Condvar::new(),
            state: Mutex::new(AlarmState {
                deadline: Some(deadline(duration)?),
                released: false,
            }),
        });

        {
            let core = Arc::clone(&core);
            std::thread::Builder::new()
                .name(self.thread_name.clone())
                .spawn(move || core.notifier(on_fire))
                .map_err(TimerError::AllocationFailed)?;
        }
        Ok(Box::new(ThreadAlarm(core)))
    }
}

fn deadline(duration: Duration) -> Result<Instant> {
    Instant::now()
        .checked_add(duration)
        .ok_or_else(|| TimerError::ArmFailed(std::io::ErrorKind::InvalidInput.into()))
}

struct AlarmCore {
    cond: Condvar,
    state: Mutex<AlarmState>,
}

struct AlarmState {
    deadline: Option<Instant>,
    released: bool,
}

impl AlarmCore {
    #[inline]
    fn state(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap()
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        let mut state = self.state();
        state.deadline = deadline;
        self.cond.notify_one();
    }

    fn notifier(&self, on_fire: FireFn) {
        tracing::trace!("alarm notifier started");
        let mut state = self.state();
        while !state.released {
            match state.deadline {
                None => state = self.cond.wait(state).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        state.deadline = None;
                        drop(state);
                        on_fire();
                        state = self.state();
                    } else {
                        state = self.cond.wait_timeout(state, deadline - now).unwrap().0;
                    }
                }
            }
        }
        tracing::trace!("alarm notifier exited");
    }
}

struct ThreadAlarm(Arc<AlarmCore>);

impl Alarm for ThreadAlarm {
    fn rearm(&self, duration: Duration) -> Result<()> {
        self.0.set_deadline(Some(deadline(duration)?));
        Ok(())
    }

    fn disarm(&self) -> Result<()> {
        self.0.set_deadline(None);
        Ok(())
    }
}

impl Drop for ThreadAlarm {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.deadline = None;
        state.released = true;
        self.0.cond.notify_one();
    }
}
