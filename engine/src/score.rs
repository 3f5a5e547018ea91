//! Engine evaluation score and the evaluation-bar mapping.

use serde::{Deserialize, Serialize};

/// Engine evaluation score.
///
/// Inside the session every score is white-relative: positive favours white.
/// Mate: positive N = white mates in N, negative N = black mates in N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Score {
    #[serde(rename = "cp")]
    Centipawns(i32),
    #[serde(rename = "mate")]
    Mate(i32),
}

/// Mate distances at or beyond this magnitude mean the game is already over.
const MATED_THRESHOLD: u32 = 100;

impl Score {
    /// Negate the score (flip perspective).
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(cp.saturating_neg()),
            Self::Mate(m) => Self::Mate(m.saturating_neg()),
        }
    }

    pub fn value(self) -> i32 {
        match self {
            Self::Centipawns(v) | Self::Mate(v) => v,
        }
    }

    pub fn favours_white(self) -> bool {
        self.value() >= 0
    }

    /// Share of the evaluation bar filled for white, in `0.0..=100.0`.
    ///
    /// Five percent per pawn around the midpoint; a pending mate pins the
    /// bar at 95/5 and a delivered mate at 100/0.
    pub fn white_percentage(self) -> f64 {
        match self {
            Self::Mate(m) => {
                let over = m.unsigned_abs() >= MATED_THRESHOLD;
                match (m > 0, over) {
                    (true, true) => 100.0,
                    (true, false) => 95.0,
                    (false, true) => 0.0,
                    (false, false) => 5.0,
                }
            }
            Self::Centipawns(cp) => (50.0 + (cp as f64 / 100.0) * 5.0).clamp(0.0, 100.0),
        }
    }

    /// Short label drawn on the evaluation bar. Sign is conveyed by which
    /// end of the bar the label sits on, so magnitudes only.
    pub fn bar_label(self) -> String {
        match self {
            Self::Mate(m) if m.unsigned_abs() >= MATED_THRESHOLD => "✓".to_string(),
            Self::Mate(0) => "0.00".to_string(),
            Self::Mate(m) => format!("M{}", m.unsigned_abs()),
            Self::Centipawns(0) => "=".to_string(),
            Self::Centipawns(cp) => format!("{:.1}", (cp as f64 / 100.0).abs()),
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) if *m > 0 => write!(f, "+M{}", m),
            Self::Mate(m) => write!(f, "-M{}", m.unsigned_abs()),
        }
    }
}
