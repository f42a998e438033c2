use crate::frame::truncate_to_columns;
use crate::proto::command::{Command, Line};

/// Two rows of text as the user should see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub first: String,
    pub second: Option<String>,
}

impl Message {
    /// An empty second row is left blank rather than written.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        let second = second.into();
        Self {
            first: first.into(),
            second: (!second.is_empty()).then_some(second),
        }
    }

    pub fn lines(&self) -> (&str, &str) {
        (&self.first, self.second.as_deref().unwrap_or(""))
    }
}

/// Clear the panel, then one text frame per row present.
pub fn commands(msg: &Message) -> Vec<Command> {
    let mut cmds = vec![
        Command::Clear,
        Command::DisplayText {
            line: Line::First,
            text: truncate_to_columns(&msg.first).to_string(),
        },
    ];
    if let Some(second) = &msg.second {
        cmds.push(Command::DisplayText {
            line: Line::Second,
            text: truncate_to_columns(second).to_string(),
        });
    }
    cmds
}
