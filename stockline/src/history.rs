use chess::STARTING_FEN;

/// Linear list of visited positions with a cursor.
///
/// Playing a move while stepped back discards the positions ahead of the
/// cursor.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    positions: Vec<String>,
    index: usize,
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new(STARTING_FEN)
    }
}

impl PositionHistory {
    pub fn new(fen: impl Into<String>) -> Self {
        Self {
            positions: vec![fen.into()],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.positions[self.index]
    }

    pub fn push(&mut self, fen: impl Into<String>) {
        self.positions.truncate(self.index + 1);
        self.positions.push(fen.into());
        self.index = self.positions.len() - 1;
    }

    /// Step back one position. Returns false at the start.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward one position. Returns false at the end.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.positions.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Start over from `fen`.
    pub fn reset(&mut self, fen: impl Into<String>) {
        *self = Self::new(fen);
    }
}
