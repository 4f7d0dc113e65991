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
** Created on: 2026-10-12T10:02:47
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// initial status, no alarm registered
    Created,
    /// alarm armed, firing periodically
    Running,
    /// alarm registered but disarmed
    Paused,
    /// teardown requested, waiting for the firing handler
    PendingDestroy,
    /// resources released, handle no longer usable
    Released,
}

impl Status {
    /// Parameters may only be changed in these states
    pub fn is_configurable(&self) -> bool {
        matches!(self, Self::Created | Self::Running | Self::Paused)
    }
}
