//! Error types for the engine crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine executable not found")]
    NotFound,

    #[error("Engine process could not be started: {0}")]
    SpawnFailed(String),

    #[error("Engine has no stdin")]
    NoStdin,

    #[error("Engine has no stdout")]
    NoStdout,

    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),

    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
}
