use std::collections::BTreeMap;
use std::fmt;

use crate::Variation;

/// Identifies one `analyze` request on a session.
///
/// Ids increase monotonically per session handle. Info and bestmove
/// callbacks carry the id of the search that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchId(u64);

impl SearchId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the side to move in `fen` is black.
///
/// Only the second whitespace-delimited field is inspected; the rest of the
/// position is opaque at this layer.
pub fn side_to_move_is_black(fen: &str) -> bool {
    fen.split_whitespace().nth(1) == Some("b")
}

/// Bookkeeping for one analysis of one position.
///
/// Holds the variations reported so far keyed by MultiPV rank. Once the
/// search is deactivated, further output is no longer attributed to it.
#[derive(Debug, Clone)]
pub struct Search {
    id: SearchId,
    fen: String,
    target_depth: u32,
    black_to_move: bool,
    variations: BTreeMap<u32, Variation>,
    depth: u32,
    active: bool,
}

impl Search {
    pub fn new(id: SearchId, fen: String, target_depth: u32) -> Self {
        let black_to_move = side_to_move_is_black(&fen);
        Self {
            id,
            fen,
            target_depth,
            black_to_move,
            variations: BTreeMap::new(),
            depth: 0,
            active: true,
        }
    }

    pub fn id(&self) -> SearchId {
        self.id
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn target_depth(&self) -> u32 {
        self.target_depth
    }

    pub fn black_to_move(&self) -> bool {
        self.black_to_move
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Latest depth reported by any line of this search.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Record a variation as reported by the engine (side-to-move relative),
    /// replacing any earlier line with the same rank. Returns `false` when
    /// the search is no longer active and the line was dropped.
    pub fn record(&mut self, mut variation: Variation) -> bool {
        if !self.active {
            return false;
        }
        if self.black_to_move {
            variation.score = variation.score.negate();
        }
        self.depth = variation.depth;
        self.variations.insert(variation.rank, variation);
        true
    }

    /// All known variations, ascending by rank.
    pub fn variations(&self) -> Vec<Variation> {
        self.variations.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Score;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    fn line(rank: u32, depth: u32, score: Score, moves: &[&str]) -> Variation {
        Variation {
            rank,
            depth,
            score,
            moves: moves.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_side_to_move() {
        assert!(!side_to_move_is_black(START));
        assert!(side_to_move_is_black(AFTER_E4));
        assert!(!side_to_move_is_black("garbage"));
    }

    #[test]
    fn test_new_search_takes_perspective_from_fen() {
        let white = Search::new(SearchId::new(1), START.to_string(), 12);
        assert!(!white.black_to_move());
        assert_eq!(white.target_depth(), 12);
        assert_eq!(white.id(), SearchId::new(1));
        assert!(white.is_active());

        let black = Search::new(SearchId::new(2), AFTER_E4.to_string(), 8);
        assert!(black.black_to_move());
        assert_eq!(black.fen(), AFTER_E4);
        assert!(black.id() > white.id());
    }

    #[test]
    fn test_replace_by_rank_and_sorted() {
        let mut search = Search::new(SearchId::new(1), START.to_string(), 10);
        search.record(line(2, 8, Score::Centipawns(20), &["d2d4"]));
        search.record(line(1, 8, Score::Centipawns(30), &["e2e4"]));
        search.record(line(1, 9, Score::Centipawns(25), &["e2e4", "e7e5"]));

        let variations = search.variations();
        assert_eq!(variations.len(), 2);
        assert_eq!(variations[0].rank, 1);
        assert_eq!(variations[0].score, Score::Centipawns(25));
        assert_eq!(variations[1].rank, 2);
        assert_eq!(search.depth(), 9);
    }

    #[test]
    fn test_black_to_move_scores_are_flipped() {
        let mut search = Search::new(SearchId::new(2), AFTER_E4.to_string(), 10);
        search.record(line(1, 10, Score::Centipawns(30), &["e7e5"]));
        search.record(line(2, 10, Score::Mate(-4), &["a7a6"]));

        let variations = search.variations();
        assert_eq!(variations[0].score, Score::Centipawns(-30));
        assert_eq!(variations[1].score, Score::Mate(4));
    }

    #[test]
    fn test_inactive_search_drops_lines() {
        let mut search = Search::new(SearchId::new(1), START.to_string(), 10);
        search.deactivate();
        assert!(!search.record(line(1, 5, Score::Centipawns(10), &["e2e4"])));
        assert!(search.variations().is_empty());
        assert_eq!(search.depth(), 0);
    }
}
