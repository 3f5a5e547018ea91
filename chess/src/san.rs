//! Standard Algebraic Notation rendering

use cozy_chess::{Board, File, Move, Piece, Square};

use crate::types::san_letter;
use crate::uci::{destination, is_castling};

/// All legal moves in `board`.
pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Format a legal move as SAN, including check and mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = if is_castling(board, mv) {
        if mv.to.file() as u8 > mv.from.file() as u8 {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        piece_move(board, mv)
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if legal_moves(&after).is_empty() { '#' } else { '+' });
    }
    san
}

fn piece_move(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return format!("{}{}", mv.from, mv.to);
    };
    let to = destination(board, mv);
    let capture = board.piece_on(mv.to).is_some() || is_en_passant(board, mv, piece);

    let mut san = String::new();
    match san_letter(piece) {
        Some(letter) => {
            san.push(letter);
            san.push_str(&disambiguation(board, mv, piece));
        }
        None if capture => san.push(file_char(mv.from.file())),
        None => {}
    }
    if capture {
        san.push('x');
    }
    san.push_str(&to.to_string());

    if let Some(promo) = mv.promotion.and_then(san_letter) {
        san.push('=');
        san.push(promo);
    }
    san
}

/// File, rank or full square of the origin when another piece of the same
/// kind could reach the same target.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|m| m.to == mv.to && m.from != mv.from && board.piece_on(m.from) == Some(piece))
        .map(|m| m.from)
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        file_char(mv.from.file()).to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        mv.from.to_string()[1..].to_string()
    } else {
        mv.from.to_string()
    }
}

fn is_en_passant(board: &Board, mv: Move, piece: Piece) -> bool {
    piece == Piece::Pawn && mv.from.file() != mv.to.file() && board.piece_on(mv.to).is_none()
}

fn file_char(file: File) -> char {
    char::from(b'a' + file as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;
    use crate::uci::parse_uci_move;

    fn san(fen: &str, uci: &str) -> String {
        let board = parse_fen(fen).unwrap();
        let mv = parse_uci_move(&board, uci).unwrap();
        format_san(&board, mv)
    }

    #[test]
    fn test_pawn_and_piece_moves() {
        let board = Board::default();
        assert_eq!(format_san(&board, parse_uci_move(&board, "e2e4").unwrap()), "e4");
        assert_eq!(format_san(&board, parse_uci_move(&board, "g1f3").unwrap()), "Nf3");
    }

    #[test]
    fn test_captures() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        assert_eq!(san(fen, "e4d5"), "exd5");

        let ep = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        assert_eq!(san(ep, "e5f6"), "exf6");
    }

    #[test]
    fn test_castling() {
        let fen = "r3k2r/pppq1ppp/2npbn2/4p3/4P3/2NPBN2/PPPQ1PPP/R3K2R w KQkq - 0 1";
        assert_eq!(san(fen, "e1g1"), "O-O");
        assert_eq!(san(fen, "e1c1"), "O-O-O");
    }

    #[test]
    fn test_disambiguation() {
        // Knights on b1 and f3 both reach d2.
        let fen = "4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1";
        assert_eq!(san(fen, "b1d2"), "Nbd2");

        // Rooks on a1 and a5 share a file.
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san(fen, "a1a3"), "R1a3");
    }

    #[test]
    fn test_check_mate_and_promotion() {
        let fool = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";
        assert_eq!(san(fool, "d8h4"), "Qh4#");

        let promo = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        assert_eq!(san(promo, "e7e8"), "e8=Q");
        assert_eq!(san(promo, "e7e8n"), "e8=N");

        let check = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san(check, "a1a8"), "Ra8+");
    }
}
