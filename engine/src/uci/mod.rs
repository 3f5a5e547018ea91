pub mod command;
pub mod parser;

pub use command::UciCommand;
pub use parser::{parse_uci_message, UciMessage};
