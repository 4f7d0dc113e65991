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
** Created on: 2026-10-13T15:52:20
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc, time::Duration};

use crate::alarm::{AlarmService, Backend};

/// Environment variable pointing to a YAML configuration file
pub const CONFIG_ENV: &str = "HS_TIMER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Alarm implementation
    pub backend: Backend,
    /// Delay used by `ready()` and expedited destroys
    #[serde(with = "humantime_serde")]
    pub ready_delay: Duration,
    /// Bound destroy latency on running timers by firing the teardown immediately
    pub expedite_destroy: bool,
    /// Name given to alarm notifier threads
    pub thread_name: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            ready_delay: Duration::from_nanos(1),
            expedite_destroy: true,
            thread_name: String::from("hs-timer"),
        }
    }
}

impl TimerConfig {
    /// Load a YAML configuration file, missing fields use their default value
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_reader(file)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        tracing::debug!(?config, path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load the configuration from [CONFIG_ENV], defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn service(&self) -> Arc<dyn AlarmService> {
        self.backend.service(&self.thread_name)
    }
}
