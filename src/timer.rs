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
** Created on: 2026-10-12T10:58:14
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    alarm::{Alarm, AlarmService, FireFn},
    config::TimerConfig,
    error::{Result, TimerError},
};

mod status;
pub use status::Status;

/// Fire once, then release the timer
pub const REPEAT_ONCE: u32 = 1;
/// Fire until destroyed
pub const REPEAT_FOREVER: u32 = u32::MAX;

/// Invoked on the alarm notifier thread on each firing
pub type Callback = Arc<dyn Fn(&Timer) + Send + Sync + 'static>;
/// Opaque data attached to a timer
pub type UserData = Arc<dyn Any + Send + Sync>;

static S_ID: AtomicUsize = AtomicUsize::new(0);

/// Wrap a closure as a timer [Callback]
pub fn callback<F>(fun: F) -> Option<Callback>
where
    F: Fn(&Timer) + Send + Sync + 'static,
{
    Some(Arc::new(fun))
}

/// Callback driven timer
///
/// A `Timer` is a handle, clones refer to the same timer. Every operation can
/// be called from any thread, including from the timer's own callback: the
/// callback is invoked with the internal lock released.
///
/// Each firing re-programs a one-shot alarm, this is what allows the repeat
/// count to be evaluated (and the timer released) between two firings.
///
/// # Lifetime
/// - a `Running` timer stays alive on its own until its repeat count is
///   exhausted or [Timer::destroy] is called, even if every handle is dropped
/// - a `Created` or `Paused` timer is released when its last handle is dropped
/// - once released, every operation returns [TimerError::InvalidHandle]
#[derive(Clone)]
pub struct Timer {
    core: Arc<TimerCore>,
}

struct TimerCore {
    id: usize,
    service: Arc<dyn AlarmService>,
    ready_delay: Duration,
    expedite_destroy: bool,
    state: Mutex<TimerState>,
}

struct TimerState {
    lifecycle: Lifecycle,
    callback: Option<Callback>,
    repeat_count: u32,
    timeout: Duration,
    user_data: Option<UserData>,
    /// bumped on each `initialize`, notifications from older alarms are stale
    epoch: u64,
}

/// Only live states own an alarm registration
enum Lifecycle {
    Created,
    Live(Live, Armed),
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Live {
    Running,
    Paused,
    PendingDestroy,
}

struct Armed {
    alarm: Box<dyn Alarm>,
    /// self reference held while a notification is expected
    anchor: Option<Arc<TimerCore>>,
}

/// Leftovers of a released timer, dropped once the lock is released
type Remains = (Lifecycle, Option<Callback>, Option<UserData>);

impl Lifecycle {
    fn status(&self) -> Status {
        match self {
            Lifecycle::Created => Status::Created,
            Lifecycle::Live(Live::Running, _) => Status::Running,
            Lifecycle::Live(Live::Paused, _) => Status::Paused,
            Lifecycle::Live(Live::PendingDestroy, _) => Status::PendingDestroy,
            Lifecycle::Released => Status::Released,
        }
    }
}

impl TimerState {
    fn status(&self) -> Status {
        self.lifecycle.status()
    }

    /// Error to report for an operation rejected in the current state
    fn rejection(&self) -> TimerError {
        match self.status() {
            Status::Released => TimerError::InvalidHandle,
            status => TimerError::InvalidState(status),
        }
    }

    /// Switch between live states
    ///
    /// Running and pending-destroy timers expect a notification and anchor
    /// themselves, paused ones don't.
    fn enter(&mut self, to: Live, core: &Arc<TimerCore>) {
        if let Lifecycle::Live(live, armed) = &mut self.lifecycle {
            *live = to;
            armed.anchor = match to {
                Live::Running | Live::PendingDestroy => Some(Arc::clone(core)),
                Live::Paused => None,
            };
        }
    }

    fn release(&mut self) -> Remains {
        (
            std::mem::replace(&mut self.lifecycle, Lifecycle::Released),
            self.callback.take(),
            self.user_data.take(),
        )
    }
}

impl TimerCore {
    #[inline]
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap()
    }

    /// Run `fun` with the state lock released
    ///
    /// The guard is consumed and acquired again once `fun` returns, code
    /// called from `fun` may use the timer API.
    fn unlocked<'a, R>(
        &'a self,
        guard: MutexGuard<'a, TimerState>,
        fun: impl FnOnce() -> R,
    ) -> (MutexGuard<'a, TimerState>, R) {
        drop(guard);
        let ret = fun();
        (self.lock(), ret)
    }

    fn notification(self: &Arc<Self>, epoch: u64) -> FireFn {
        let core = Arc::downgrade(self);
        Arc::new(move || TimerCore::on_fire(&core, epoch))
    }

    /// Firing handler, runs on the alarm notifier thread
    fn on_fire(core: &Weak<TimerCore>, epoch: u64) {
        let Some(core) = core.upgrade() else {
            tracing::trace!("timer gone, notification ignored");
            return;
        };
        let _span = tracing::trace_span!("on_fire", id = core.id).entered();
        let mut state = core.lock();
        if state.epoch != epoch {
            tracing::trace!("notification from a previous alarm ignored");
            return;
        }
        match state.status() {
            Status::Running => {}
            Status::PendingDestroy => {
                tracing::debug!("timer released");
                let remains = state.release();
                drop(state);
                drop(remains);
                return;
            }
            status => {
                tracing::trace!(?status, "stale notification ignored");
                return;
            }
        }

        /* decrement first: the callback must see the last firing as such */
        if state.repeat_count > 0 && state.repeat_count != REPEAT_FOREVER {
            state.repeat_count -= 1;
            if state.repeat_count == 0 {
                state.enter(Live::PendingDestroy, &core);
            }
        }
        tracing::trace!(repeat_count = state.repeat_count, "timer fired");

        let callback = state.callback.clone();
        let timer = Timer {
            core: Arc::clone(&core),
        };
        let (mut state, ()) = core.unlocked(state, move || {
            if let Some(callback) = callback
                && let Err(error) = std::panic::catch_unwind(AssertUnwindSafe(|| callback(&timer)))
            {
                tracing::warn!(?error, "timer callback panicked");
            }
        });

        if state.epoch != epoch || state.status() == Status::Released {
            return;
        }
        if state.status() == Status::PendingDestroy || state.repeat_count == 0 {
            tracing::debug!("timer released");
            let remains = state.release();
            drop(state);
            drop(remains);
            return;
        }
        if let Lifecycle::Live(Live::Running, armed) = &state.lifecycle
            && let Err(err) = armed.alarm.rearm(state.timeout)
        {
            tracing::error!(?err, "failed to re-arm timer, timer stopped");
        }
    }
}

impl Drop for TimerCore {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut()
            && state.status() != Status::Released
        {
            tracing::trace!(id = self.id, status = ?state.status(), "last handle dropped, releasing timer");
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut binding = f.debug_struct("Timer");
        binding.field("id", &self.core.id);
        match self.core.state.try_lock() {
            Ok(state) => binding
                .field("status", &state.status())
                .field("repeat_count", &state.repeat_count)
                .field("timeout", &state.timeout),
            Err(_) => binding.field("status", &"<locked>"),
        };
        binding.finish()
    }
}

impl Timer {
    /// Create a timer using the default configuration
    pub fn new() -> Self {
        Self::with_config(&TimerConfig::default())
    }

    pub fn with_config(config: &TimerConfig) -> Self {
        Self::with_service(config.service(), config)
    }

    /// Create a timer on top of a custom alarm service
    pub fn with_service(service: Arc<dyn AlarmService>, config: &TimerConfig) -> Self {
        Self {
            core: Arc::new(TimerCore {
                id: S_ID.fetch_add(1, Ordering::Relaxed),
                service,
                ready_delay: config.ready_delay,
                expedite_destroy: config.expedite_destroy,
                state: Mutex::new(TimerState {
                    lifecycle: Lifecycle::Created,
                    callback: None,
                    repeat_count: REPEAT_FOREVER,
                    timeout: Duration::ZERO,
                    user_data: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Unique timer id (for logging purposes)
    pub fn id(&self) -> usize {
        self.core.id
    }

    /// Arm the timer and start it
    ///
    /// May be called again to restart the timer with new parameters, the
    /// previous alarm is then released. On failure the timer is left
    /// untouched.
    ///
    /// Must not be called concurrently with other operations on the same timer.
    #[tracing::instrument(level = "DEBUG", fields(id = self.core.id), skip(self, callback, user_data))]
    pub fn initialize(
        &self,
        callback: Option<Callback>,
        repeat_count: u32,
        timeout: Duration,
        user_data: Option<UserData>,
    ) -> Result<()> {
        let mut state = self.core.lock();
        if matches!(state.status(), Status::PendingDestroy | Status::Released) {
            return Err(state.rejection());
        }

        let epoch = state.epoch.wrapping_add(1);
        let alarm = self
            .core
            .service
            .arm(timeout, self.core.notification(epoch))?;

        let previous = std::mem::replace(
            &mut state.lifecycle,
            Lifecycle::Live(
                Live::Running,
                Armed {
                    alarm,
                    anchor: Some(Arc::clone(&self.core)),
                },
            ),
        );
        state.epoch = epoch;
        let previous_callback = std::mem::replace(&mut state.callback, callback);
        let previous_data = std::mem::replace(&mut state.user_data, user_data);
        state.repeat_count = repeat_count;
        state.timeout = timeout;
        drop(state);

        tracing::debug!("timer started");
        drop((previous, previous_callback, previous_data));
        Ok(())
    }

    /// Destroy the timer
    ///
    /// Created and paused timers are released right away. A running timer is
    /// marked for destruction and released from its notifier thread, its
    /// callback won't be invoked again unless a firing is already in progress.
    #[tracing::instrument(level = "DEBUG", fields(id = self.core.id), skip(self))]
    pub fn destroy(&self) -> Result<()> {
        let mut state = self.core.lock();
        match state.status() {
            Status::Created | Status::Paused => {
                let remains = state.release();
                drop(state);
                drop(remains);
                tracing::debug!("timer released");
                Ok(())
            }
            Status::Running => {
                state.enter(Live::PendingDestroy, &self.core);
                if self.core.expedite_destroy
                    && let Lifecycle::Live(_, armed) = &state.lifecycle
                    && let Err(err) = armed.alarm.rearm(self.core.ready_delay)
                {
                    tracing::warn!(?err, "failed to expedite destroy, waiting for next firing");
                }
                tracing::debug!("timer destroy requested");
                Ok(())
            }
            Status::PendingDestroy => Ok(()),
            Status::Released => Err(TimerError::InvalidHandle),
        }
    }

    /// Lock the state if parameters may be changed
    fn configurable(&self) -> Result<MutexGuard<'_, TimerState>> {
        let state = self.core.lock();
        if state.status().is_configurable() {
            Ok(state)
        } else {
            Err(state.rejection())
        }
    }

    /// Lock the state unless the timer was released
    fn alive(&self) -> Result<MutexGuard<'_, TimerState>> {
        let state = self.core.lock();
        if state.status() == Status::Released {
            Err(TimerError::InvalidHandle)
        } else {
            Ok(state)
        }
    }

    /// Replace the callback, effective from the next firing
    pub fn set_callback(&self, callback: Option<Callback>) -> Result<()> {
        let previous = {
            let mut state = self.configurable()?;
            std::mem::replace(&mut state.callback, callback)
        };
        drop(previous);
        Ok(())
    }

    /// Set the remaining number of firings
    pub fn set_repeat_count(&self, repeat_count: u32) -> Result<()> {
        self.configurable()?.repeat_count = repeat_count;
        Ok(())
    }

    /// Set the timer period
    ///
    /// A running timer is re-programmed immediately, otherwise the value is
    /// used on next start.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let mut state = self.configurable()?;
        if let Lifecycle::Live(Live::Running, armed) = &state.lifecycle {
            armed.alarm.rearm(timeout)?;
        }
        state.timeout = timeout;
        Ok(())
    }

    pub fn set_user_data(&self, user_data: Option<UserData>) -> Result<()> {
        let previous = {
            let mut state = self.configurable()?;
            std::mem::replace(&mut state.user_data, user_data)
        };
        drop(previous);
        Ok(())
    }

    /// Remaining number of firings ([REPEAT_FOREVER] for endless timers)
    pub fn repeat_count(&self) -> Result<u32> {
        Ok(self.alive()?.repeat_count)
    }

    pub fn timeout(&self) -> Result<Duration> {
        Ok(self.alive()?.timeout)
    }

    pub fn user_data(&self) -> Result<Option<UserData>> {
        Ok(self.alive()?.user_data.clone())
    }

    /// User data downcasted to `T`, `None` if unset or of another type
    pub fn user_data_as<T>(&self) -> Result<Option<Arc<T>>>
    where
        T: Any + Send + Sync,
    {
        Ok(self.user_data()?.and_then(|data| data.downcast::<T>().ok()))
    }

    pub fn status(&self) -> Status {
        self.core.lock().status()
    }

    /// Fire as soon as possible, then resume normal operation
    #[tracing::instrument(level = "DEBUG", fields(id = self.core.id), skip(self))]
    pub fn ready(&self) -> Result<()> {
        let mut state = self.core.lock();
        let Lifecycle::Live(Live::Running | Live::Paused, armed) = &state.lifecycle else {
            return Err(state.rejection());
        };
        armed.alarm.rearm(self.core.ready_delay)?;
        state.enter(Live::Running, &self.core);
        Ok(())
    }

    /// Stop the timer without releasing it, see [Timer::resume]
    #[tracing::instrument(level = "DEBUG", fields(id = self.core.id), skip(self))]
    pub fn pause(&self) -> Result<()> {
        let mut state = self.core.lock();
        let Lifecycle::Live(Live::Running | Live::Paused, armed) = &state.lifecycle else {
            return Err(state.rejection());
        };
        armed.alarm.disarm()?;
        state.enter(Live::Paused, &self.core);
        Ok(())
    }

    /// Restart a paused timer for a full period
    #[tracing::instrument(level = "DEBUG", fields(id = self.core.id), skip(self))]
    pub fn resume(&self) -> Result<()> {
        let mut state = self.core.lock();
        let Lifecycle::Live(Live::Paused, armed) = &state.lifecycle else {
            return Err(state.rejection());
        };
        armed.alarm.rearm(state.timeout)?;
        state.enter(Live::Running, &self.core);
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.status() == Status::Paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::manual::ManualService;
    use anyhow::Result;

    const PERIOD: Duration = Duration::from_millis(10);

    fn manual(expedite_destroy: bool) -> (Arc<ManualService>, Timer) {
        let service = ManualService::new();
        let config = TimerConfig {
            expedite_destroy,
            ..Default::default()
        };
        let timer = Timer::with_service(service.clone(), &config);
        (service, timer)
    }

    /// Callback counting its invocations
    fn counting() -> (Arc<AtomicUsize>, Option<Callback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let cb = {
            let count = Arc::clone(&count);
            callback(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, cb)
    }

    #[test]
    fn created() -> Result<()> {
        let (service, timer) = manual(true);
        assert_eq!(Status::Created, timer.status());
        assert_eq!(REPEAT_FOREVER, timer.repeat_count()?);
        assert_eq!(Duration::ZERO, timer.timeout()?);
        assert!(timer.user_data()?.is_none());
        assert!(!timer.is_paused());
        assert_eq!(0, service.armed());

        assert!(matches!(
            timer.ready(),
            Err(TimerError::InvalidState(Status::Created))
        ));
        assert!(matches!(
            timer.pause(),
            Err(TimerError::InvalidState(Status::Created))
        ));
        assert!(matches!(
            timer.resume(),
            Err(TimerError::InvalidState(Status::Created))
        ));
        Ok(())
    }

    #[test]
    fn repeat_count() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, 3, PERIOD, None)?;
        assert_eq!(Status::Running, timer.status());
        assert_eq!(Some(PERIOD), service.pending());

        for _ in 0..3 {
            assert!(service.fire());
        }
        assert_eq!(3, count.load(Ordering::SeqCst));
        assert_eq!(Status::Released, timer.status());
        assert_eq!(0, service.live());
        assert!(!service.fire());
        assert!(matches!(timer.destroy(), Err(TimerError::InvalidHandle)));
        assert!(matches!(timer.timeout(), Err(TimerError::InvalidHandle)));
        Ok(())
    }

    #[test]
    fn last_firing() -> Result<()> {
        let (service, timer) = manual(true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cb = {
            let seen = Arc::clone(&seen);
            callback(move |timer| {
                seen.lock()
                    .unwrap()
                    .push((timer.repeat_count().unwrap(), timer.status()));
            })
        };
        timer.initialize(cb, 2, PERIOD, None)?;
        while service.fire() {}

        assert_eq!(
            vec![(1, Status::Running), (0, Status::PendingDestroy)],
            *seen.lock().unwrap()
        );
        assert_eq!(Status::Released, timer.status());
        Ok(())
    }

    #[test]
    fn repeat_zero() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, 0, PERIOD, None)?;
        assert!(service.fire());
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert_eq!(Status::Released, timer.status());
        Ok(())
    }

    #[test]
    fn forever() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        for _ in 0..100 {
            assert!(service.fire());
        }
        assert_eq!(100, count.load(Ordering::SeqCst));
        assert_eq!(REPEAT_FOREVER, timer.repeat_count()?);
        assert_eq!(Status::Running, timer.status());
        assert_eq!(Some(PERIOD), service.pending());
        Ok(())
    }

    #[test]
    fn destroy_created() -> Result<()> {
        let (service, timer) = manual(true);
        timer.set_user_data(Some(Arc::new(42u32)))?;
        timer.destroy()?;
        assert_eq!(Status::Released, timer.status());
        assert!(matches!(timer.destroy(), Err(TimerError::InvalidHandle)));
        assert!(matches!(
            timer.set_timeout(PERIOD),
            Err(TimerError::InvalidHandle)
        ));
        assert!(matches!(timer.user_data(), Err(TimerError::InvalidHandle)));
        assert!(!timer.is_paused());
        assert_eq!(0, service.armed());
        Ok(())
    }

    #[test]
    fn destroy_paused() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        timer.pause()?;
        timer.destroy()?;
        assert_eq!(Status::Released, timer.status());
        assert_eq!(0, service.live());

        /* a notification racing with the destroy */
        service.fire_stale(0);
        assert_eq!(0, count.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn destroy_running_deferred() -> Result<()> {
        let (service, timer) = manual(false);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;

        timer.destroy()?;
        assert_eq!(Status::PendingDestroy, timer.status());
        assert_eq!(Some(PERIOD), service.pending(), "countdown should be left as is");
        assert_eq!(1, service.live());
        timer.destroy()?;

        assert!(service.fire());
        assert_eq!(0, count.load(Ordering::SeqCst));
        assert_eq!(Status::Released, timer.status());
        assert_eq!(0, service.live());
        Ok(())
    }

    #[test]
    fn destroy_running_expedited() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, Duration::from_secs(3600), None)?;

        timer.destroy()?;
        assert_eq!(Status::PendingDestroy, timer.status());
        assert_eq!(Some(TimerConfig::default().ready_delay), service.pending());

        assert!(service.fire());
        assert_eq!(0, count.load(Ordering::SeqCst));
        assert_eq!(Status::Released, timer.status());
        Ok(())
    }

    #[test]
    fn pending_destroy() -> Result<()> {
        let (_service, timer) = manual(false);
        timer.initialize(None, 5, PERIOD, Some(Arc::new("data")))?;
        timer.destroy()?;

        let expect_rejected = |ret: crate::error::Result<()>| {
            assert!(
                matches!(ret, Err(TimerError::InvalidState(Status::PendingDestroy))),
                "{ret:?}"
            )
        };
        expect_rejected(timer.set_callback(None));
        expect_rejected(timer.set_repeat_count(1));
        expect_rejected(timer.set_timeout(Duration::from_secs(1)));
        expect_rejected(timer.set_user_data(None));
        expect_rejected(timer.pause());
        expect_rejected(timer.resume());
        expect_rejected(timer.ready());
        expect_rejected(timer.initialize(None, 1, PERIOD, None));

        assert_eq!(5, timer.repeat_count()?);
        assert_eq!(PERIOD, timer.timeout()?);
        assert_eq!(Some(Arc::new("data")), timer.user_data_as::<&str>()?);
        assert_eq!(Status::PendingDestroy, timer.status());
        Ok(())
    }

    #[test]
    fn parameters() -> Result<()> {
        let (service, timer) = manual(true);
        timer.set_timeout(Duration::from_millis(500))?;
        timer.set_repeat_count(3)?;
        timer.set_user_data(Some(Arc::new(String::from("x"))))?;

        assert_eq!(Duration::from_millis(500), timer.timeout()?);
        assert_eq!(3, timer.repeat_count()?);
        assert_eq!(
            Some("x"),
            timer.user_data_as::<String>()?.as_deref().map(String::as_str)
        );
        assert_eq!(None, timer.user_data_as::<u32>()?);
        assert_eq!(0, service.armed(), "no alarm before initialize");
        Ok(())
    }

    #[test]
    fn set_timeout() -> Result<()> {
        let (service, timer) = manual(true);
        timer.initialize(None, REPEAT_FOREVER, PERIOD, None)?;
        timer.set_timeout(Duration::from_millis(20))?;
        assert_eq!(Some(Duration::from_millis(20)), service.pending());

        timer.pause()?;
        timer.set_timeout(Duration::from_millis(30))?;
        assert_eq!(None, service.pending(), "paused timer re-armed");
        timer.resume()?;
        assert_eq!(Some(Duration::from_millis(30)), service.pending());

        service.fail_next();
        assert!(matches!(
            timer.set_timeout(Duration::from_millis(40)),
            Err(TimerError::ArmFailed(_))
        ));
        assert_eq!(Duration::from_millis(30), timer.timeout()?);
        Ok(())
    }

    #[test]
    fn pause_resume() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        assert!(service.fire());

        timer.pause()?;
        timer.pause()?;
        assert!(timer.is_paused());
        assert_eq!(None, service.pending());
        assert!(!service.fire());
        assert!(matches!(
            timer.resume().and_then(|_| timer.resume()),
            Err(TimerError::InvalidState(Status::Running))
        ));
        assert_eq!(Some(PERIOD), service.pending());
        assert!(service.fire());
        assert_eq!(2, count.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn ready() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, Duration::from_secs(60), None)?;
        timer.pause()?;
        timer.ready()?;
        assert_eq!(Status::Running, timer.status());
        assert_eq!(Some(TimerConfig::default().ready_delay), service.pending());

        assert!(service.fire());
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert_eq!(Some(Duration::from_secs(60)), service.pending());
        assert_eq!(REPEAT_FOREVER, timer.repeat_count()?);
        Ok(())
    }

    #[test]
    fn initialize_failure() -> Result<()> {
        let (service, timer) = manual(true);
        service.fail_next();
        assert!(matches!(
            timer.initialize(None, 1, PERIOD, None),
            Err(TimerError::ArmFailed(_))
        ));
        assert_eq!(Status::Created, timer.status());
        assert_eq!(REPEAT_FOREVER, timer.repeat_count()?);
        assert_eq!(Duration::ZERO, timer.timeout()?);

        timer.initialize(None, 2, PERIOD, None)?;
        service.fail_next();
        assert!(timer.initialize(None, 7, Duration::from_secs(1), None).is_err());
        assert_eq!(2, timer.repeat_count()?);
        assert_eq!(Some(PERIOD), service.pending());
        assert_eq!(1, service.live());
        Ok(())
    }

    #[test]
    fn reinitialize() -> Result<()> {
        let (service, timer) = manual(true);
        let (first, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        let (second, cb) = counting();
        timer.initialize(cb, 1, PERIOD, None)?;
        assert_eq!(2, service.armed());
        assert_eq!(1, service.live());

        /* in-flight notification of the first alarm */
        service.fire_stale(0);
        assert_eq!(0, first.load(Ordering::SeqCst) + second.load(Ordering::SeqCst));
        assert_eq!(Status::Running, timer.status());

        assert!(service.fire());
        assert_eq!(1, second.load(Ordering::SeqCst));
        assert_eq!(Status::Released, timer.status());
        Ok(())
    }

    #[test]
    fn reentrant() -> Result<()> {
        let (service, timer) = manual(true);
        timer.initialize(
            callback(|timer| timer.pause().unwrap()),
            REPEAT_FOREVER,
            PERIOD,
            None,
        )?;
        assert!(service.fire());
        assert!(timer.is_paused());
        assert_eq!(None, service.pending());

        timer.set_callback(callback(|timer| {
            timer.set_timeout(Duration::from_millis(5)).unwrap()
        }))?;
        timer.resume()?;
        assert!(service.fire());
        assert_eq!(Some(Duration::from_millis(5)), service.pending());

        timer.set_callback(callback(|timer| timer.destroy().unwrap()))?;
        assert!(service.fire());
        assert_eq!(Status::Released, timer.status());
        assert_eq!(0, service.live());
        Ok(())
    }

    #[test]
    fn callback_panic() -> Result<()> {
        let (service, timer) = manual(true);
        timer.initialize(
            callback(|_| panic!("on purpose")),
            REPEAT_FOREVER,
            PERIOD,
            None,
        )?;
        assert!(service.fire());
        assert_eq!(Status::Running, timer.status());
        assert_eq!(Some(PERIOD), service.pending());
        Ok(())
    }

    #[test]
    fn rearm_failure() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        service.fail_next();
        assert!(service.fire());
        assert_eq!(1, count.load(Ordering::SeqCst));
        assert_eq!(None, service.pending(), "chain should be stopped");
        assert_eq!(Status::Running, timer.status());
        Ok(())
    }

    #[test]
    fn fire_and_forget() -> Result<()> {
        let service = ManualService::new();
        let (count, cb) = counting();
        Timer::with_service(service.clone(), &TimerConfig::default()).initialize(
            cb,
            2,
            PERIOD,
            None,
        )?;

        assert!(service.fire());
        assert!(service.fire());
        assert_eq!(2, count.load(Ordering::SeqCst));
        assert_eq!(0, service.live());
        Ok(())
    }

    #[test]
    fn drop_paused() -> Result<()> {
        let (service, timer) = manual(true);
        let (count, cb) = counting();
        timer.initialize(cb, REPEAT_FOREVER, PERIOD, None)?;
        timer.pause()?;
        drop(timer);
        assert_eq!(0, service.live());
        service.fire_stale(0);
        assert_eq!(0, count.load(Ordering::SeqCst));
        Ok(())
    }
}
