//! In-memory stand-ins for the serial port and the host.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::facts::{FactError, FactSource, InterfaceInfo, PoolRecord, SystemInfo, UptimeInfo};

/// Records every `write` call separately so frame boundaries stay visible.
#[derive(Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl WriteLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap().clone()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// Text of every display-text frame, in send order. An empty text has no
    /// body write.
    pub fn texts(&self) -> Vec<String> {
        let writes = self.writes();
        let mut texts = Vec::new();
        let mut it = writes.iter();
        while let Some(w) = it.next() {
            if w.len() != 4 || w[..2] != [0x4d, 0x0c] {
                continue;
            }
            let text = match w[3] {
                0 => String::new(),
                _ => it
                    .next()
                    .map(|body| String::from_utf8_lossy(body).into_owned())
                    .unwrap_or_default(),
            };
            texts.push(text);
        }
        texts
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl Write for WriteLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Host facts served from memory; `fail` makes every query error.
#[derive(Clone, Default)]
pub struct FakeFacts {
    pub system: SystemInfo,
    pub version: String,
    pub uptime: UptimeInfo,
    pub interfaces: Vec<InterfaceInfo>,
    pub pools: Vec<PoolRecord>,
    pub fail: bool,
}

impl FakeFacts {
    fn check(&self) -> Result<(), FactError> {
        if self.fail {
            return Err(FactError::Parse {
                what: "fake facts",
                text: String::new(),
            });
        }
        Ok(())
    }
}

impl FactSource for FakeFacts {
    fn system(&self) -> Result<SystemInfo, FactError> {
        self.check()?;
        Ok(self.system.clone())
    }

    fn appliance_version(&self) -> Result<String, FactError> {
        self.check()?;
        Ok(self.version.clone())
    }

    fn uptime(&self) -> Result<UptimeInfo, FactError> {
        self.check()?;
        Ok(self.uptime.clone())
    }

    fn interfaces(&self) -> Result<Vec<InterfaceInfo>, FactError> {
        self.check()?;
        Ok(self.interfaces.clone())
    }

    fn pools(&self) -> Result<Vec<PoolRecord>, FactError> {
        self.check()?;
        Ok(self.pools.clone())
    }
}

pub fn iface(name: &str, addr: &str) -> InterfaceInfo {
    InterfaceInfo {
        name: name.into(),
        ipv4: Some(addr.into()),
        ..InterfaceInfo::default()
    }
}

pub fn pool(name: &str) -> PoolRecord {
    PoolRecord {
        name: name.into(),
        size: "10T".into(),
        allocated: "2T".into(),
        health: "ONLINE".into(),
    }
}
