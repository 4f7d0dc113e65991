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
** Created on: 2026-10-12T09:30:47
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

//! Thread-safe, callback driven timers
//!
//! ```no_run
//! use hs_timer::{REPEAT_FOREVER, Timer, callback};
//! use std::time::Duration;
//!
//! let timer = Timer::new();
//! timer.initialize(
//!     callback(|timer| println!("tick, timer {}", timer.id())),
//!     REPEAT_FOREVER,
//!     Duration::from_millis(100),
//!     None,
//! )?;
//! std::thread::sleep(Duration::from_secs(1));
//! timer.destroy()?;
//! # Ok::<(), hs_timer::TimerError>(())
//! ```

pub mod alarm;
pub mod config;
pub mod error;
pub mod timer;
pub mod utils;

pub use config::TimerConfig;
pub use error::{Result, TimerError};
pub use timer::{Callback, REPEAT_FOREVER, REPEAT_ONCE, Status, Timer, UserData, callback};
