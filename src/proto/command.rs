/// Commands sent host -> panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ---- Queries ----
    RequestIdentity,
    RequestButtons,
    RequestProtocol,

    // ---- Display ----
    DisplayText { line: Line, text: String },
    Clear,
    Backlight(bool),

    // ---- Device ----
    Reset,
}

/// Events decoded from panel -> host frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    IdentityReport(u16),
    ButtonStatus(u16),
    ProtocolVersion(u16),
    ResetAck,
    Ack,
    /// Echoes the command byte the panel rejected.
    Nack(u8),
}

/// One of the two character rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    First,
    Second,
}

/// Button bits reported in `Event::ButtonStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
}

pub const BUTTON_UP: u16 = 0x01;
pub const BUTTON_DOWN: u16 = 0x02;

impl Button {
    /// Only the two single-bit values map to a button; anything else is ignored.
    pub fn from_status(mask: u16) -> Option<Self> {
        match mask {
            BUTTON_UP => Some(Button::Up),
            BUTTON_DOWN => Some(Button::Down),
            _ => None,
        }
    }
}
