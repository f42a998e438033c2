//! Page renderers. Each turns already-gathered facts into two rows.

use crate::display::Message;
use crate::facts::{InterfaceInfo, LinkKind, PoolRecord, Snapshot, SystemInfo, UptimeInfo};
use crate::menu::Page;

pub const NO_ADDRESS: &str = "0.0.0.0";

pub fn system_page(info: &SystemInfo) -> Message {
    Message::new(
        info.hostname.clone(),
        format!("{} ({})", info.os_name, info.machine),
    )
}

/// `TrueNAS-SCALE-24.04.2` shows as `TrueNAS-SCALE` / `24.04.2`.
pub fn appliance_page(version: &str) -> Message {
    match version.rsplit_once('-') {
        Some((name, release)) => Message::new(name, release),
        None => Message::new("", version),
    }
}

pub fn uptime_page(info: &UptimeInfo) -> Message {
    let [one, five, fifteen] = info.load;
    Message::new(
        format!("Up  : {}", info.text),
        format!("Load: {:?} {:?}, {:?}", one, five, fifteen),
    )
}

/// Loopback and virtual devices other than tunnels and bonds are hidden.
pub fn shows_interface(info: &InterfaceInfo) -> bool {
    !info.loopback
        && matches!(
            info.kind,
            LinkKind::Unset | LinkKind::Tunnel | LinkKind::Bond | LinkKind::BondSlave
        )
}

pub fn interface_page(info: &InterfaceInfo) -> Message {
    let detail = match info.kind {
        LinkKind::BondSlave => info.oper_state.clone(),
        _ => info.ipv4.clone().unwrap_or_else(|| NO_ADDRESS.to_string()),
    };
    Message::new(info.name.clone(), detail)
}

pub fn pool_page(pool: &PoolRecord) -> Message {
    Message::new(
        format!("{} ({})", pool.name, pool.health),
        format!("{} of {}", pool.allocated, pool.size),
    )
}

/// Render `page` from `snap`. A dynamic page whose item vanished still
/// renders, with placeholder details.
pub fn render(page: &Page, snap: &Snapshot) -> Message {
    match page {
        Page::Appliance => appliance_page(&snap.version),
        Page::System => system_page(&snap.system),
        Page::Uptime => uptime_page(&snap.uptime),
        Page::Interface(name) => match snap.interfaces.iter().find(|i| &i.name == name) {
            Some(info) => interface_page(info),
            None => Message::new(name.clone(), NO_ADDRESS),
        },
        Page::Pool(name) => match snap.pools.iter().find(|p| &p.name == name) {
            Some(pool) => pool_page(pool),
            None => Message::new(name.clone(), "-"),
        },
    }
}
