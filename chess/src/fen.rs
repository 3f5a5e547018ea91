use cozy_chess::Board;

use crate::{RulesError, RulesResult};

/// The standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> RulesResult<Board> {
    let fen = fen.trim();
    if fen.is_empty() {
        return Err(RulesError::InvalidFen(String::new()));
    }
    Board::from_fen(fen, false).map_err(|_| RulesError::InvalidFen(fen.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_fen_is_default_board() {
        let board = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(format_fen(&board), STARTING_FEN);
        assert_eq!(format_fen(&Board::default()), STARTING_FEN);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(parse_fen(""), Err(RulesError::InvalidFen(_))));
        assert!(matches!(
            parse_fen("not a position"),
            Err(RulesError::InvalidFen(_))
        ));
    }
}
