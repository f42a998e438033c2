use log::debug;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::link::{Link, LinkError};

/// Inactivity window before the backlight goes off.
pub const BACKLIGHT_WINDOW: Duration = Duration::from_secs(30);

/// Restartable one-shot "backlight off" countdown.
///
/// Every arm gets a new generation number; the timer thread reports the
/// generation that expired, and only the latest one turns the light off. That
/// keeps an expiry racing a button press from darkening the panel.
pub struct BacklightTimer {
    window: Duration,
    tx: mpsc::Sender<u64>,
    rx: Option<mpsc::Receiver<u64>>,
    generation: u64,
}

impl BacklightTimer {
    pub fn new(window: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            window,
            tx,
            rx: Some(rx),
            generation: 0,
        }
    }

    /// Start the countdown thread. `on_expire` runs on that thread with the
    /// generation that ran out. The thread exits once the timer is dropped.
    pub fn start<F>(&mut self, on_expire: F) -> io::Result<JoinHandle<()>>
    where
        F: Fn(u64) + Send + 'static,
    {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| io::Error::other("backlight timer already started"))?;
        let window = self.window;
        thread::Builder::new()
            .name("lcd-backlight".into())
            .spawn(move || countdown(rx, window, on_expire))
    }

    /// Light the panel now and restart the countdown.
    pub fn touch(&mut self, link: &mut Link) -> Result<(), LinkError> {
        self.generation += 1;
        // A closed channel means the thread is gone; the light just stays on.
        let _ = self.tx.send(self.generation);
        link.set_backlight(true)
    }

    /// Called under the session lock when generation `generation` ran out.
    pub fn expire(&mut self, generation: u64, link: &mut Link) -> Result<(), LinkError> {
        if generation != self.generation || !link.backlight() {
            debug!("ignoring backlight expiry {} (now {})", generation, self.generation);
            return Ok(());
        }
        debug!("backlight off after {:?} idle", self.window);
        link.set_backlight(false)
    }
}

fn countdown<F: Fn(u64)>(rx: mpsc::Receiver<u64>, window: Duration, on_expire: F) {
    let mut pending: Option<(Instant, u64)> = None;
    loop {
        let msg = match pending {
            Some((deadline, _)) => {
                rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match msg {
            Ok(generation) => pending = Some((Instant::now() + window, generation)),
            Err(RecvTimeoutError::Timeout) => {
                if let Some((_, generation)) = pending.take() {
                    on_expire(generation);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
