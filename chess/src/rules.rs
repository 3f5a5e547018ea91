//! Position queries over FEN strings.

use cozy_chess::{Board, Color, GameStatus, Piece};

use crate::fen::{format_fen, parse_fen};
use crate::san::{format_san, legal_moves};
use crate::types::{piece_value, MaterialCounts, Side};
use crate::uci::{destination, parse_square, parse_uci_move, resolve_move};
use crate::{RulesError, RulesResult};

/// Whether moving the piece on `from` to `to` is legal in `fen`.
pub fn is_legal_move(fen: &str, from: &str, to: &str) -> bool {
    make_move(fen, from, to).is_ok()
}

/// Play `from`→`to` and return the resulting FEN. Promotions become queens.
pub fn make_move(fen: &str, from: &str, to: &str) -> RulesResult<String> {
    let mut board = parse_fen(fen)?;
    let from_sq = parse_square(from)?;
    let to_sq = parse_square(to)?;
    let mv = resolve_move(&board, from_sq, to_sq, None)
        .ok_or_else(|| RulesError::IllegalMove(format!("{}{}", from, to)))?;
    board.play_unchecked(mv);
    Ok(format_fen(&board))
}

/// Target square of every legal move, one entry per move.
pub fn legal_destinations(fen: &str) -> RulesResult<Vec<String>> {
    let board = parse_fen(fen)?;
    Ok(legal_moves(&board)
        .into_iter()
        .map(|mv| destination(&board, mv).to_string())
        .collect())
}

/// SAN for `from`→`to`, or `None` if the move is not legal.
pub fn move_to_san(fen: &str, from: &str, to: &str) -> Option<String> {
    let board = parse_fen(fen).ok()?;
    let mv = resolve_move(&board, parse_square(from).ok()?, parse_square(to).ok()?, None)?;
    Some(format_san(&board, mv))
}

/// SAN for a UCI move string such as `e7e8n`.
pub fn uci_to_san(fen: &str, uci: &str) -> Option<String> {
    let board = parse_fen(fen).ok()?;
    let mv = parse_uci_move(&board, uci).ok()?;
    Some(format_san(&board, mv))
}

/// Render an engine line as SAN, stopping at the first move that does not
/// apply to the position reached so far.
pub fn line_to_san(fen: &str, moves: &[String]) -> Vec<String> {
    let Ok(mut board) = parse_fen(fen) else {
        return Vec::new();
    };

    let mut line = Vec::with_capacity(moves.len());
    for uci in moves {
        let Ok(mv) = parse_uci_move(&board, uci) else {
            break;
        };
        line.push(format_san(&board, mv));
        board.play_unchecked(mv);
    }
    line
}

pub fn is_checkmate(fen: &str) -> bool {
    parse_fen(fen).is_ok_and(|board| matches!(board.status(), GameStatus::Won))
}

/// Stalemate, fifty-move rule or insufficient material. Repetition needs a
/// game history and is not detected.
pub fn is_draw(fen: &str) -> bool {
    let Ok(board) = parse_fen(fen) else {
        return false;
    };
    match board.status() {
        GameStatus::Drawn => true,
        GameStatus::Won => false,
        GameStatus::Ongoing => board.halfmove_clock() >= 100 || insufficient_material(&board),
    }
}

pub fn side_to_move(fen: &str) -> RulesResult<Side> {
    Ok(parse_fen(fen)?.side_to_move().into())
}

/// White material minus black material, in pawns.
pub fn material_balance(fen: &str) -> RulesResult<i32> {
    Ok(material_counts(fen)?.balance())
}

pub fn material_counts(fen: &str) -> RulesResult<MaterialCounts> {
    let board = parse_fen(fen)?;
    let total = |color: Color| -> i32 {
        Piece::ALL
            .iter()
            .map(|&piece| {
                let count = (board.pieces(piece) & board.colors(color)).len() as i32;
                count * piece_value(piece)
            })
            .sum()
    };
    Ok(MaterialCounts {
        white: total(Color::White),
        black: total(Color::Black),
    })
}

/// Neither side can mate: bare kings, a single minor piece, or bishops all
/// on one square colour.
fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }

    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }

    let mut shades = bishops.into_iter().map(|sq| (sq.file() as u8 + sq.rank() as u8) % 2);
    let first = shades.next();
    shades.all(|shade| Some(shade) == first)
}
