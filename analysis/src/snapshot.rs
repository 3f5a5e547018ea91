use engine::{Score, Variation};
use serde::Serialize;

/// Complete, immutable view of the scheduler's analysis state.
/// Republished after every engine event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSnapshot {
    /// Known variations, ascending by rank.
    pub variations: Vec<Variation>,
    pub best_move: Option<String>,
    pub current_depth: u32,
    pub is_analyzing: bool,
    pub is_ready: bool,
    pub error: Option<String>,
}

impl AnalysisSnapshot {
    /// The top-ranked variation, if any.
    pub fn principal(&self) -> Option<&Variation> {
        self.variations.first()
    }

    /// White-relative evaluation of the principal variation.
    pub fn evaluation(&self) -> Option<Score> {
        self.principal().map(|v| v.score)
    }
}
