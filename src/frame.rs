//! Binary framing for the panel's serial protocol.
//!
//! Outbound frames start with `0x4D`, inbound frames with `0x53` (or the
//! undocumented `0x83`, treated the same). Inbound payloads are fixed length
//! per command byte; 16-bit values are big-endian.

use crate::proto::command::{Command, Event, Line};

pub const OUT_PREAMBLE: u8 = 0x4d;
pub const IN_PREAMBLES: [u8; 2] = [0x53, 0x83];

/// Characters per row.
pub const COLUMNS: usize = 16;

// Host -> panel
pub const CMD_GET_IDENTITY: u8 = 0x00;
pub const CMD_GET_BUTTONS: u8 = 0x06;
pub const CMD_GET_PROTOCOL: u8 = 0x07;
pub const CMD_DISPLAY_TEXT: u8 = 0x0c;
pub const CMD_CLEAR: u8 = 0x0d;
pub const CMD_BACKLIGHT: u8 = 0x5e;
pub const CMD_RESET: u8 = 0xff;

// Panel -> host
pub const EVT_IDENTITY: u8 = 0x01;
pub const EVT_BUTTONS: u8 = 0x05;
pub const EVT_PROTOCOL: u8 = 0x08;
pub const EVT_RESET_ACK: u8 = 0xaa;
pub const EVT_ACK: u8 = 0xfa;
pub const EVT_NACK: u8 = 0xfb;

pub fn encode_control(cmd: u8, args: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + args.len());
    out.push(OUT_PREAMBLE);
    out.push(cmd);
    out.extend_from_slice(args);
    out
}

/// Row selector byte. Row 1 is `0x01`, row 2 is `0x00`.
pub fn line_selector(line: Line) -> u8 {
    match line {
        Line::First => 0x01,
        Line::Second => 0x00,
    }
}

/// Cut `text` to at most `COLUMNS` bytes without splitting a character.
pub fn truncate_to_columns(text: &str) -> &str {
    if text.len() <= COLUMNS {
        return text;
    }
    let mut end = COLUMNS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Header and body of a text frame. The panel expects them as two writes.
pub fn encode_text(line: Line, text: &str) -> [Vec<u8>; 2] {
    let body = truncate_to_columns(text).as_bytes();
    let header = encode_control(CMD_DISPLAY_TEXT, &[line_selector(line), body.len() as u8]);
    [header, body.to_vec()]
}

/// Every write needed to send `cmd`, in order.
pub fn encode(cmd: &Command) -> Vec<Vec<u8>> {
    match cmd {
        Command::RequestIdentity => vec![encode_control(CMD_GET_IDENTITY, &[])],
        Command::RequestButtons => vec![encode_control(CMD_GET_BUTTONS, &[])],
        Command::RequestProtocol => vec![encode_control(CMD_GET_PROTOCOL, &[])],
        Command::DisplayText { line, text } => Vec::from(encode_text(*line, text)),
        Command::Clear => vec![encode_control(CMD_CLEAR, &[])],
        Command::Backlight(on) => vec![encode_control(CMD_BACKLIGHT, &[u8::from(*on)])],
        Command::Reset => vec![encode_control(CMD_RESET, &[])],
    }
}

fn payload_len(cmd: u8) -> Option<usize> {
    match cmd {
        EVT_RESET_ACK | EVT_ACK => Some(0),
        EVT_NACK => Some(1),
        EVT_IDENTITY | EVT_BUTTONS | EVT_PROTOCOL => Some(2),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for a preamble byte
    WaitingForPreamble,
    /// Got a preamble, waiting for the command byte
    WaitingForCommand,
    /// Collecting a fixed-length payload
    ReadingPayload { cmd: u8, len: usize },
}

/// Byte-at-a-time decoder for panel -> host frames.
///
/// `feed` returns `None` while more bytes are needed. Bytes outside a frame
/// and frames with unknown command bytes are dropped.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecodeState,
    payload: [u8; 2],
    filled: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::WaitingForPreamble,
            payload: [0; 2],
            filled: 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = DecodeState::WaitingForPreamble;
        self.filled = 0;
    }

    pub fn feed(&mut self, byte: u8) -> Option<Event> {
        match self.state {
            DecodeState::WaitingForPreamble => {
                if IN_PREAMBLES.contains(&byte) {
                    self.state = DecodeState::WaitingForCommand;
                }
                None
            }
            DecodeState::WaitingForCommand => match payload_len(byte) {
                Some(0) => {
                    self.reset();
                    finish(byte, &[])
                }
                Some(len) => {
                    self.filled = 0;
                    self.state = DecodeState::ReadingPayload { cmd: byte, len };
                    None
                }
                None => {
                    // A second preamble restarts the frame instead of being eaten as a command.
                    if !IN_PREAMBLES.contains(&byte) {
                        log::trace!("dropping unknown command byte 0x{:02X}", byte);
                        self.reset();
                    }
                    None
                }
            },
            DecodeState::ReadingPayload { cmd, len } => {
                self.payload[self.filled] = byte;
                self.filled += 1;
                if self.filled < len {
                    return None;
                }
                let payload = self.payload;
                self.reset();
                finish(cmd, &payload[..len])
            }
        }
    }

    /// Feed a buffer, collecting every complete event.
    #[cfg(test)]
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<Event> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }
}

fn be16(payload: &[u8]) -> u16 {
    u16::from(payload[0]) * 256 + u16::from(payload[1])
}

fn finish(cmd: u8, payload: &[u8]) -> Option<Event> {
    match cmd {
        EVT_IDENTITY => Some(Event::IdentityReport(be16(payload))),
        EVT_BUTTONS => Some(Event::ButtonStatus(be16(payload))),
        EVT_PROTOCOL => Some(Event::ProtocolVersion(be16(payload))),
        EVT_RESET_ACK => Some(Event::ResetAck),
        EVT_ACK => Some(Event::Ack),
        EVT_NACK => Some(Event::Nack(payload[0])),
        _ => None,
    }
}
