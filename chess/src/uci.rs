//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};

use crate::{RulesError, RulesResult};

/// Parse a square name such as `e4`.
pub fn parse_square(name: &str) -> RulesResult<Square> {
    name.trim()
        .parse()
        .map_err(|_| RulesError::InvalidSquare(name.to_string()))
}

/// Resolve a from/to pair into a legal move on `board`.
///
/// Promotions default to a queen. UCI castling (`e1g1`) is mapped to the
/// library's king-takes-rook form.
pub(crate) fn resolve_move(
    board: &Board,
    from: Square,
    to: Square,
    promotion: Option<Piece>,
) -> Option<Move> {
    let piece = board.piece_on(from)?;
    if board.color_on(from) != Some(board.side_to_move()) {
        return None;
    }

    let promotion = if piece == Piece::Pawn && to.rank() == last_rank(board.side_to_move()) {
        Some(promotion.unwrap_or(Piece::Queen))
    } else if promotion.is_some() {
        return None;
    } else {
        None
    };

    let mut mv = Move {
        from,
        to,
        promotion,
    };
    if piece == Piece::King {
        mv = convert_uci_castling(board, mv);
    }

    board.is_legal(mv).then_some(mv)
}

/// Parse a UCI move string (`e2e4`, `e7e8q`, `e1g1`) against `board`.
pub fn parse_uci_move(board: &Board, uci: &str) -> RulesResult<Move> {
    let uci = uci.trim();
    if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
        return Err(RulesError::InvalidMove(uci.to_string()));
    }

    let from = parse_square(&uci[0..2])?;
    let to = parse_square(&uci[2..4])?;
    let promotion = match uci[4..].chars().next() {
        None => None,
        Some(c) => Some(promotion_piece(c).ok_or_else(|| RulesError::InvalidMove(uci.to_string()))?),
    };

    resolve_move(board, from, to, promotion).ok_or_else(|| RulesError::IllegalMove(uci.to_string()))
}

/// Square the king lands on, for castling; the move's own target otherwise.
pub(crate) fn destination(board: &Board, mv: Move) -> Square {
    if is_castling(board, mv) {
        let file = if mv.to.file() as u8 > mv.from.file() as u8 {
            File::G
        } else {
            File::C
        };
        Square::new(file, mv.from.rank())
    } else {
        mv.to
    }
}

/// Format a move in standard UCI notation (e.g., "e2e4", "e7e8q", "e1g1")
pub fn format_uci_move(board: &Board, mv: Move) -> String {
    let mut s = format!("{}{}", mv.from, destination(board, mv));
    if let Some(promo) = mv.promotion {
        s.push(piece_char(promo));
    }
    s
}

/// King moving onto its own rook.
pub(crate) fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King) && board.color_on(mv.to) == board.color_on(mv.from)
}

fn convert_uci_castling(board: &Board, mv: Move) -> Move {
    let back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    if !back_rank || mv.from.file() != File::E || mv.to.rank() != mv.from.rank() {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

fn last_rank(side: Color) -> Rank {
    match side {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    }
}

fn promotion_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}
