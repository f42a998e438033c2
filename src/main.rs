use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod backlight;
mod cli;
mod display;
mod facts;
mod frame;
mod link;
mod menu;
mod pages;
mod poll;
mod port;
mod proto;
mod session;
#[cfg(test)]
mod testutil;

use facts::{FactSource, HostFacts, SystemInfo};
use session::Session;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cli::Cli::parse();
    info!("lcd-menu starting: {:?}", args);

    let facts = HostFacts::new();
    let (link, receiver) = link::open(&args.ser);
    let session = Session::new(link, backlight::BACKLIGHT_WINDOW)
        .start()
        .context("starting backlight timer")?;

    let hostname = facts
        .system()
        .map(|s| s.hostname)
        .unwrap_or_else(|_| SystemInfo::fallback().hostname);
    session
        .lock()
        .map_err(|_| anyhow::anyhow!("session lock poisoned"))?
        .startup(&hostname);

    let stop = Arc::new(AtomicBool::new(false));
    let rx_thread = match receiver {
        Some(receiver) => {
            let shared = session.clone();
            let handle = receiver
                .spawn(stop.clone(), move |event| match shared.lock() {
                    Ok(mut s) => s.handle_event(event),
                    Err(_) => error!("session lock poisoned; dropping {:?}", event),
                })
                .context("spawning receive thread")?;
            Some(handle)
        }
        None => None,
    };

    let result = poll::run(&session, &facts, poll::POLL_PERIOD);

    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = rx_thread {
        let _ = handle.join();
    }
    result
}
