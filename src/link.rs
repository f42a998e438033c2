use anyhow::Context;
use log::{debug, error, info, trace, warn};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use thiserror::Error;

use crate::cli::SerialOpts;
use crate::frame::{FrameDecoder, encode};
use crate::port::open_port;
use crate::proto::command::{Command, Event};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial write failed: {0}")]
    Write(#[from] io::Error),
}

/// Outbound half of the panel connection.
///
/// A disconnected link accepts every command and sends nothing, so the rest of
/// the program runs the same with or without a panel attached.
pub struct Link {
    writer: Option<Box<dyn Write + Send>>,
    backlight: bool,
}

/// Inbound half, moved onto the receive thread.
pub struct Receiver {
    reader: Box<dyn Read + Send>,
}

/// Open the panel port. On failure the link degrades instead of erroring.
pub fn open(opts: &SerialOpts) -> (Link, Option<Receiver>) {
    let opened = open_port(opts).and_then(|port| {
        let reader = port.try_clone().context("clone serial port for reading")?;
        Ok((port, reader))
    });
    match opened {
        Ok((port, reader)) => {
            info!("panel link open on {} @ {} baud", opts.dev, opts.baud);
            (
                Link::connected(Box::new(port)),
                Some(Receiver::new(Box::new(reader))),
            )
        }
        Err(e) => {
            warn!("{:#}; continuing without a panel", e);
            (Link::disconnected(), None)
        }
    }
}

impl Link {
    pub fn connected(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Some(writer),
            backlight: false,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            writer: None,
            backlight: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    pub fn send(&mut self, cmd: &Command) -> Result<(), LinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        debug!("-> {:?}", cmd);
        for bytes in encode(cmd) {
            writer.write_all(&bytes)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn send_all(&mut self, cmds: &[Command]) -> Result<(), LinkError> {
        for cmd in cmds {
            self.send(cmd)?;
        }
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), LinkError> {
        self.backlight = on;
        self.send(&Command::Backlight(on))
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }
}

impl Receiver {
    pub fn new(reader: Box<dyn Read + Send>) -> Self {
        Self { reader }
    }

    pub fn spawn<F>(self, stop: Arc<AtomicBool>, on_event: F) -> io::Result<JoinHandle<()>>
    where
        F: FnMut(Event) + Send + 'static,
    {
        thread::Builder::new()
            .name("lcd-rx".into())
            .spawn(move || self.run(&stop, on_event))
    }

    /// Read one byte at a time until stopped, the stream ends, or the port fails.
    pub fn run<F>(mut self, stop: &AtomicBool, mut on_event: F)
    where
        F: FnMut(Event),
    {
        let mut decoder = FrameDecoder::new();
        let mut byte = [0u8; 1];
        while !stop.load(Ordering::Relaxed) {
            match self.reader.read(&mut byte) {
                Ok(0) => {
                    debug!("serial stream closed");
                    break;
                }
                Ok(_) => {
                    trace!("<- 0x{:02X}", byte[0]);
                    if let Some(event) = decoder.feed(byte[0]) {
                        on_event(event);
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    error!("serial read failed, receive loop exiting: {}", e);
                    break;
                }
            }
        }
    }
}
