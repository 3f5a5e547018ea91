//! Chess rules over FEN strings, backed by cozy-chess.

mod error;
pub mod fen;
pub mod rules;
pub mod san;
pub mod types;
pub mod uci;

pub use error::{RulesError, RulesResult};
pub use fen::{format_fen, parse_fen, STARTING_FEN};
pub use rules::{
    is_checkmate, is_draw, is_legal_move, legal_destinations, line_to_san, make_move,
    material_balance, material_counts, move_to_san, side_to_move, uci_to_san,
};
pub use types::{MaterialCounts, Side};
