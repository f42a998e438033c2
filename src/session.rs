//! The panel session: menu, link and backlight behind one lock.
//!
//! The receive thread, the poll loop and the backlight timer all go through
//! `Arc<Mutex<Session>>`, so a button press and a rebuild never interleave.

use log::{debug, error, info, trace, warn};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backlight::BacklightTimer;
use crate::display::{self, Message};
use crate::facts::Snapshot;
use crate::link::Link;
use crate::menu::{Category, Direction, Menu};
use crate::pages;
use crate::proto::command::{Button, Command, Event};

pub type SharedSession = Arc<Mutex<Session>>;

pub const SPLASH_STATUS: &str = "System Ready...";

pub struct Session {
    link: Link,
    menu: Menu,
    snapshot: Snapshot,
    backlight: BacklightTimer,
}

impl Session {
    pub fn new(link: Link, backlight_window: Duration) -> Self {
        Self {
            link,
            menu: Menu::new(),
            snapshot: Snapshot::default(),
            backlight: BacklightTimer::new(backlight_window),
        }
    }

    /// Share the session and start its backlight countdown. The countdown
    /// only holds a weak reference, so it stops when the last handle drops.
    pub fn start(self) -> io::Result<SharedSession> {
        let shared = Arc::new(Mutex::new(self));
        let weak = Arc::downgrade(&shared);
        let mut guard = shared
            .lock()
            .map_err(|_| io::Error::other("session lock poisoned"))?;
        guard.backlight.start(move |generation| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            match session.lock() {
                Ok(mut s) => s.backlight_expired(generation),
                Err(_) => error!("session lock poisoned; backlight left on"),
            };
        })?;
        drop(guard);
        Ok(shared)
    }

    #[cfg(test)]
    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    #[cfg(test)]
    pub fn link(&self) -> &Link {
        &self.link
    }

    /// Light the panel, reset it and show a splash until the first poll.
    pub fn startup(&mut self, hostname: &str) {
        if !self.link.is_connected() {
            info!("no panel attached; pages are only logged at debug level");
        }
        self.wake();
        self.send_logged(&[Command::Reset]);
        self.show(&Message::new(hostname, SPLASH_STATUS));
        self.send_logged(&[
            Command::RequestIdentity,
            Command::RequestProtocol,
            Command::RequestButtons,
        ]);
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ButtonStatus(mask) => self.press(mask),
            Event::IdentityReport(id) => info!("panel identity 0x{:04X}", id),
            Event::ProtocolVersion(version) => info!("panel protocol version 0x{:04X}", version),
            Event::ResetAck => debug!("panel reset acknowledged"),
            Event::Ack => trace!("panel ack"),
            Event::Nack(cmd) => warn!("panel rejected command 0x{:02X}", cmd),
        }
    }

    /// Any button status counts as activity; only up/down move the cursor.
    pub fn press(&mut self, mask: u16) {
        self.wake();
        let dir = match Button::from_status(mask) {
            Some(Button::Up) => Direction::Prev,
            Some(Button::Down) => Direction::Next,
            None => {
                debug!("ignoring button status 0x{:04X}", mask);
                return;
            }
        };
        self.menu.navigate(dir);
        debug!(
            "page {}/{}: {:?}",
            self.menu.index() + 1,
            self.menu.len(),
            self.menu.current()
        );
        self.render_current();
    }

    /// Take a fresh poll: rebuild dynamic pages and redraw.
    pub fn refresh(&mut self, snapshot: Snapshot) {
        let interfaces: Vec<String> = snapshot
            .interfaces
            .iter()
            .filter(|i| pages::shows_interface(i))
            .map(|i| i.name.clone())
            .collect();
        let pools: Vec<String> = snapshot.pools.iter().map(|p| p.name.clone()).collect();
        self.snapshot = snapshot;
        self.menu.rebuild(Category::Interface, interfaces);
        self.menu.rebuild(Category::Pool, pools);
        self.render_current();
    }

    pub fn render_current(&mut self) {
        let msg = pages::render(self.menu.current(), &self.snapshot);
        self.show(&msg);
    }

    pub fn backlight_expired(&mut self, generation: u64) {
        if let Err(e) = self.backlight.expire(generation, &mut self.link) {
            warn!("backlight off: {}", e);
        }
    }

    fn wake(&mut self) {
        if let Err(e) = self.backlight.touch(&mut self.link) {
            warn!("backlight on: {}", e);
        }
    }

    fn show(&mut self, msg: &Message) {
        debug!("show {:?}", msg.lines());
        self.send_logged(&display::commands(msg));
    }

    fn send_logged(&mut self, cmds: &[Command]) {
        if let Err(e) = self.link.send_all(cmds) {
            warn!("panel write: {}", e);
        }
    }
}
