use std::fmt;

/// Outgoing command to a UCI engine, rendered as one protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    SetOption { name: String, value: String },
    IsReady,
    Position { fen: String },
    GoDepth(u32),
    Stop,
    Quit,
}

impl UciCommand {
    pub fn set_option(name: impl Into<String>, value: impl ToString) -> Self {
        Self::SetOption {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UciCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uci => write!(f, "uci"),
            Self::SetOption { name, value } => write!(f, "setoption name {} value {}", name, value),
            Self::IsReady => write!(f, "isready"),
            Self::Position { fen } => write!(f, "position fen {}", fen),
            Self::GoDepth(depth) => write!(f, "go depth {}", depth),
            Self::Stop => write!(f, "stop"),
            Self::Quit => write!(f, "quit"),
        }
    }
}
