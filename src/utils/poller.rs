/*
** Copyright (C) 2025 Sylvain Fargier
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
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use libc::{POLLERR, POLLHUP, POLLIN, c_short, nfds_t, poll, pollfd};
use std::{
    io::{self, PipeReader, PipeWriter, Read, Write, pipe},
    os::fd::{AsRawFd, RawFd},
};

/// Blocking poll loop helper with an out-of-band wake/exit pipe
pub struct Poller {
    rx: PipeReader,
}

bitflags::bitflags! {
    /// Events to monitor
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PollerFlags: c_short {
        const IN = POLLIN;
        const ERR = POLLERR;
        const HUP = POLLHUP;
    }
}

/// Set of file-descriptors to watch
pub struct PollerFds {
    pfds: Vec<pollfd>,
}

impl PollerFds {
    /// Always add extra-room for the event pipe
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pfds: Vec::with_capacity(capacity + 1),
        }
    }

    pub fn clear(&mut self) {
        self.pfds.clear();
    }

    pub fn push<T>(&mut self, fd: &T, flags: PollerFlags)
    where
        T: AsRawFd,
    {
        self.pfds.push(pollfd {
            fd: fd.as_raw_fd(),
            events: flags.bits(),
            revents: 0,
        })
    }

    /// Descriptors with pending events
    pub fn iter(&self) -> impl Iterator<Item = (RawFd, PollerFlags)> {
        self.pfds
            .iter()
            .filter(|e| e.revents != 0)
            .map(|e| (e.fd, PollerFlags::from_bits_truncate(e.revents)))
    }
}

impl Poller {
    pub fn new() -> io::Result<(Self, PollerWriter)> {
        let (rx, tx) = pipe()?;
        Ok((Self { rx }, PollerWriter(tx)))
    }

    /// Wait for an event on `pfds` or on the event pipe
    ///
    /// Interrupted calls (`EINTR`) are restarted.
    pub fn poll(&mut self, pfds: &mut PollerFds) -> io::Result<Option<PollerWord>> {
        pfds.push(&self.rx, PollerFlags::IN);
        let ret = loop {
            let ret = unsafe { poll(pfds.pfds.as_mut_ptr(), pfds.pfds.len() as nfds_t, -1) };
            if ret >= 0 {
                break ret;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                pfds.pfds.pop();
                return Err(err);
            }
        };
        tracing::trace!(events = ret, "poll returned");
        if pfds.pfds.pop().is_some_and(|x| x.revents != 0) {
            Ok(self.get_word())
        } else {
            Ok(None)
        }
    }

    fn get_word(&mut self) -> Option<PollerWord> {
        let mut wake_word = [0u8; 1];
        match self.rx.read(&mut wake_word) {
            Ok(1) => PollerWord::try_from(wake_word[0]).ok(),
            /* writer is gone, nobody will ever wake us again */
            Ok(_) => Some(PollerWord::Exit),
            Err(err) => {
                tracing::error!(?err, "failed to read wake-word");
                Some(PollerWord::Exit)
            }
        }
    }
}

pub struct PollerWriter(PipeWriter);

impl PollerWriter {
    pub fn exit(&self) {
        self.send(PollerWord::Exit)
    }

    pub fn send(&self, word: PollerWord) {
        if let Err(err) = (&self.0).write_all(&[word as u8]) {
            tracing::error!(?err, ?word, "failed to send wake-word");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PollerWord {
    Wake = b'x',
    Exit = b'q',
}

impl TryFrom<u8> for PollerWord {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'x' => Ok(Self::Wake),
            b'q' => Ok(Self::Exit),
            n => Err(n),
        }
    }
}
