//! Error types for the rules boundary

use thiserror::Error;

pub type RulesResult<T> = Result<T, RulesError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),
}
