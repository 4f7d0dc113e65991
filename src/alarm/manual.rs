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
** Created on: 2026-10-13T11:17:38
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use super::{Alarm, AlarmService, FireFn};
use crate::error::{Result, TimerError};

/// Hand-driven alarms
///
/// No time ever elapses: a countdown only expires when [ManualService::fire]
/// is called, on the calling thread. Meant for deterministic tests of code
/// built on top of alarms.
#[derive(Default)]
pub struct ManualService {
    alarms: Mutex<Vec<Arc<Slot>>>,
    fail_next: Arc<AtomicBool>,
}

struct Slot {
    on_fire: FireFn,
    pending: Mutex<Option<Duration>>,
    released: AtomicBool,
}

impl Slot {
    fn pending(&self) -> MutexGuard<'_, Option<Duration>> {
        self.pending.lock().unwrap()
    }
}

impl ManualService {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    /// Make the next `arm`/`rearm` call fail with [TimerError::ArmFailed]
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn take_failure(flag: &AtomicBool) -> Result<()> {
        if flag.swap(false, Ordering::SeqCst) {
            Err(TimerError::ArmFailed(std::io::Error::other("injected failure")))
        } else {
            Ok(())
        }
    }

    fn latest(&self) -> Option<Arc<Slot>> {
        self.alarms.lock().unwrap().last().cloned()
    }

    /// Expire the most recently armed alarm
    ///
    /// Returns `false` if it was released or had no pending countdown.
    pub fn fire(&self) -> bool {
        let Some(slot) = self.latest() else {
            return false;
        };
        if slot.released.load(Ordering::SeqCst) || slot.pending().take().is_none() {
            return false;
        }
        (slot.on_fire)();
        true
    }

    /// Invoke `on_fire` regardless of the countdown state
    ///
    /// Emulates a notification already in flight when the alarm got disarmed.
    pub fn fire_stale(&self, index: usize) {
        let slot = self.alarms.lock().unwrap().get(index).cloned();
        if let Some(slot) = slot {
            (slot.on_fire)();
        }
    }

    /// Countdown pending on the most recently armed alarm
    pub fn pending(&self) -> Option<Duration> {
        self.latest()
            .filter(|slot| !slot.released.load(Ordering::SeqCst))
            .and_then(|slot| *slot.pending())
    }

    /// Number of alarms armed so far
    pub fn armed(&self) -> usize {
        self.alarms.lock().unwrap().len()
    }

    /// Number of alarms not released yet
    pub fn live(&self) -> usize {
        self.alarms
            .lock()
            .unwrap()
            .iter()
            .filter(|slot| !slot.released.load(Ordering::SeqCst))
            .count()
    }
}

impl AlarmService for ManualService {
    fn arm(&self, duration: Duration, on_fire: FireFn) -> Result<Box<dyn Alarm>> {
        ManualService::take_failure(&self.fail_next)?;
        let slot = Arc::new(Slot {
            on_fire,
            pending: Mutex::new(Some(duration)),
            released: AtomicBool::new(false),
        });
        self.alarms.lock().unwrap().push(Arc::clone(&slot));
        Ok(Box::new(ManualAlarm {
            slot,
            fail_next: Arc::clone(&self.fail_next),
        }))
    }
}

struct ManualAlarm {
    slot: Arc<Slot>,
    /* shared with the service */
    fail_next: Arc<AtomicBool>,
}

impl Alarm for ManualAlarm {
    fn rearm(&self, duration: Duration) -> Result<()> {
        ManualService::take_failure(&self.fail_next)?;
        *self.slot.pending() = Some(duration);
        Ok(())
    }

    fn disarm(&self) -> Result<()> {
        ManualService::take_failure(&self.fail_next)?;
        *self.slot.pending() = None;
        Ok(())
    }
}

impl Drop for ManualAlarm {
    fn drop(&mut self) {
        *self.slot.pending() = None;
        self.slot.released.store(true, Ordering::SeqCst);
    }
}
