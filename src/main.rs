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
** Created on: 2026-10-14T18:02:33
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use hs_timer::{
    REPEAT_FOREVER, Status, Timer, TimerConfig, alarm::Backend, callback,
    utils::tracing_utils::tracing_init,
};
use std::{
    io::IsTerminal,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    time::{Duration, Instant},
};

/// Drive a timer and print its firings
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Firing period
    #[arg(short, long, default_value = "1s", value_parser = humantime::parse_duration)]
    period: Duration,
    /// Number of firings (`forever` for an endless timer)
    #[arg(short, long, default_value = "5", value_parser = parse_repeat)]
    repeat: u32,
    /// Destroy the timer after this long
    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,
    /// Pause the timer from its callback after this many firings
    #[arg(long)]
    pause_after: Option<u32>,
    /// How long the timer stays paused
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pause_for: Duration,
    /// Force an immediate first firing
    #[arg(long)]
    ready: bool,
    /// Alarm backend (overrides the configuration)
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,
    /// YAML configuration file (default: $HS_TIMER_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_repeat(value: &str) -> Result<u32, String> {
    match value {
        "forever" | "inf" => Ok(REPEAT_FOREVER),
        value => value
            .parse::<u32>()
            .map_err(|err| format!("expecting a count or `forever`: {err}")),
    }
}

/// Notifications from the callback to the main thread
enum Event {
    Fired,
    Paused,
}

fn status_str(status: Status) -> String {
    let str = format!("{status:?}");
    match status {
        Status::Created => str.bright_black().to_string(),
        Status::Running => str.green().to_string(),
        Status::Paused => str.bright_yellow().to_string(),
        Status::PendingDestroy => str.yellow().to_string(),
        Status::Released => str.bright_black().to_string(),
    }
}

fn main() -> Result<()> {
    tracing_init(std::io::stderr, Some("info"))?;
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => TimerConfig::load(path)?,
        None => TimerConfig::from_env()?,
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    tracing::debug!(?args, ?config, "starting");

    let start = Instant::now();
    let (tx, rx) = mpsc::channel::<Event>();
    let fired = Arc::new(AtomicU32::new(0));
    let on_fire = {
        let fired = Arc::clone(&fired);
        let pause_after = args.pause_after;
        callback(move |timer| {
            let count = fired.fetch_add(1, Ordering::SeqCst) + 1;
            let remaining = match timer.repeat_count() {
                Ok(REPEAT_FOREVER) => String::from("\u{221e}"),
                Ok(count) => count.to_string(),
                Err(err) => err.to_string(),
            };
            println!(
                "{:>12} timer {} fired #{count} (remaining: {remaining}, {})",
                humantime::format_duration(Duration::from_millis(
                    start.elapsed().as_millis() as u64
                ))
                .to_string()
                .bright_black(),
                timer.id(),
                status_str(timer.status()),
            );
            let _ = tx.send(Event::Fired);
            if pause_after == Some(count) {
                match timer.pause() {
                    Ok(()) => {
                        let _ = tx.send(Event::Paused);
                    }
                    Err(err) => tracing::warn!(?err, "failed to pause timer"),
                }
            }
        })
    };

    let timer = Timer::with_config(&config);
    timer
        .initialize(on_fire, args.repeat, args.period, None)
        .context("failed to start timer")?;
    if args.ready {
        timer.ready()?;
    }

    /* the channel disconnects once the timer drops its callback (released) */
    let poll = args.period.clamp(Duration::from_millis(10), Duration::from_millis(500));
    let mut deadline = args.duration.map(|duration| start + duration);
    loop {
        let wait = deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).min(poll))
            .unwrap_or(poll);
        match rx.recv_timeout(wait) {
            Ok(Event::Paused) => {
                println!(
                    "{} for {}",
                    status_str(Status::Paused),
                    humantime::format_duration(args.pause_for)
                );
                std::thread::sleep(args.pause_for);
                match timer.resume() {
                    Ok(()) => println!("{}", status_str(Status::Running)),
                    Err(err) => tracing::warn!(?err, "failed to resume timer"),
                }
            }
            Ok(Event::Fired) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            deadline = None;
            match timer.destroy() {
                Ok(()) => println!("destroy requested: {}", status_str(timer.status())),
                /* retired on its own meanwhile */
                Err(err) => tracing::debug!(?err, "failed to destroy timer"),
            }
        }
    }

    println!(
        "{} after {} firings",
        status_str(timer.status()),
        fired.load(Ordering::SeqCst)
    );
    Ok(())
}
