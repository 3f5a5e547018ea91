//! UCI engine session.
//!
//! Drives a third-party UCI engine over a line-oriented worker channel:
//! performs the startup handshake, supersedes in-flight searches with a
//! stop/readiness round-trip, aggregates MultiPV output per rank and
//! normalises every score to white's perspective.

mod error;
pub mod process;
pub mod score;
pub mod search;
pub mod session;
pub mod uci;
pub mod worker;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::EngineError;
pub use process::{find_engine_path, ProcessSpawner};
pub use score::Score;
pub use search::{side_to_move_is_black, Search, SearchId};
pub use session::{EngineSession, Lifecycle};
pub use uci::{UciCommand, UciMessage};
pub use worker::{EngineSpawner, WorkerEvent, WorkerHandle};

use serde::{Deserialize, Serialize};

/// One ranked candidate line of play. Scores are always white-relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    /// 1-based MultiPV rank.
    pub rank: u32,
    pub depth: u32,
    pub score: Score,
    /// Move tokens exactly as the engine reported them.
    pub moves: Vec<String>,
}

/// Engine tuning sent during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 16,
        }
    }
}

/// Qualifier on a score that is only an estimate from an aspiration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    Lower,
    Upper,
}

/// Engine analysis information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub hashfull: Option<u16>,
    pub score: Option<Score>,
    pub bound: Option<ScoreBound>,
    pub pv: Vec<String>, // Principal variation
}

impl EngineInfo {
    /// The variation this line reports, in the engine's own perspective.
    ///
    /// Returns `None` for progress lines without a score, for bound estimates
    /// and for lines whose depth is missing or zero.
    pub fn variation(&self) -> Option<Variation> {
        if self.bound.is_some() {
            return None;
        }
        let score = self.score?;
        let depth = self.depth.filter(|d| *d > 0)?;
        Some(Variation {
            rank: self.multipv.unwrap_or(1),
            depth,
            score,
            moves: self.pv.clone(),
        })
    }
}
