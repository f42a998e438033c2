use anyhow::{Result, anyhow};
use log::debug;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::facts::{FactSource, Snapshot};
use crate::session::Session;

/// How often inventory is refreshed and the current page redrawn.
pub const POLL_PERIOD: Duration = Duration::from_secs(30);

/// Gather outside the lock, then apply under it, so slow collaborators never
/// hold up button handling.
pub fn poll_once(session: &Mutex<Session>, facts: &dyn FactSource) -> Result<()> {
    let started = Instant::now();
    let snapshot = Snapshot::gather(facts);
    debug!(
        "gathered {} interface(s), {} pool(s) in {:?}",
        snapshot.interfaces.len(),
        snapshot.pools.len(),
        started.elapsed()
    );
    session
        .lock()
        .map_err(|_| anyhow!("session lock poisoned"))?
        .refresh(snapshot);
    Ok(())
}

pub fn run(session: &Mutex<Session>, facts: &dyn FactSource, period: Duration) -> Result<()> {
    loop {
        poll_once(session, facts)?;
        thread::sleep(period);
    }
}
