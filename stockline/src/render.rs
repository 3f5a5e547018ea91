//! Text and JSON views of an analysis snapshot.

use std::fmt::Write;

use analysis::AnalysisSnapshot;
use engine::Score;
use serde_json::json;

const BAR_WIDTH: usize = 24;

/// Mate scores substituted when the position itself is decided.
const DECIDED_MATE: i32 = 1000;

/// Evaluation to show for `fen`: decided positions override the engine.
pub fn display_score(fen: &str, snapshot: &AnalysisSnapshot) -> Option<Score> {
    if chess::is_checkmate(fen) {
        let white_mated = matches!(chess::side_to_move(fen), Ok(chess::Side::White));
        return Some(Score::Mate(if white_mated { -DECIDED_MATE } else { DECIDED_MATE }));
    }
    if chess::is_draw(fen) {
        return Some(Score::Centipawns(0));
    }
    snapshot.evaluation()
}

pub fn material_display(balance: i32) -> String {
    match balance {
        0 => "Equal".to_string(),
        n if n > 0 => format!("White +{}", n),
        n => format!("Black +{}", n.unsigned_abs()),
    }
}

/// Horizontal evaluation bar, white filling from the left.
pub fn eval_bar(score: Option<Score>) -> String {
    let pct = score.map_or(50.0, Score::white_percentage);
    let filled = ((pct / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_text(fen: &str, snapshot: &AnalysisSnapshot) -> String {
    let mut out = String::new();
    let score = display_score(fen, snapshot);

    let status = if let Some(error) = &snapshot.error {
        format!("error: {}", error)
    } else if !snapshot.is_ready {
        "starting engine".to_string()
    } else if snapshot.is_analyzing {
        "analyzing".to_string()
    } else {
        "done".to_string()
    };
    let material = chess::material_balance(fen)
        .map(material_display)
        .unwrap_or_else(|_| "?".to_string());

    let _ = writeln!(
        out,
        "{} {} depth {} | {} | {}",
        eval_bar(score),
        score.map_or_else(|| "-".to_string(), |s| s.bar_label()),
        snapshot.current_depth,
        material,
        status
    );

    for variation in &snapshot.variations {
        let san = chess::line_to_san(fen, &variation.moves);
        let line = if san.is_empty() {
            variation.moves.join(" ")
        } else {
            san.join(" ")
        };
        let _ = writeln!(out, "  {}. {:>7}  {}", variation.rank, variation.score.to_string(), line);
    }

    if let Some(mv) = &snapshot.best_move {
        let san = chess::uci_to_san(fen, mv).unwrap_or_else(|| mv.clone());
        let _ = writeln!(out, "  best move: {}", san);
    }

    out
}

pub fn render_json(fen: &str, snapshot: &AnalysisSnapshot) -> serde_json::Value {
    json!({
        "fen": fen,
        "score": display_score(fen, snapshot),
        "material": chess::material_balance(fen).ok(),
        "analysis": snapshot,
    })
}
