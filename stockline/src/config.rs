//! Runtime defaults for stockline.
//!
//! Every value has a compile-time default and can be overridden through a
//! dedicated environment variable. Command-line flags take precedence over
//! both.

use std::path::PathBuf;

/// Default search depth per position.
const DEFAULT_DEPTH: u32 = 15;

/// Default number of variations searched in parallel.
const DEFAULT_MULTIPV: u32 = 3;

/// Default quiet period before a new position is analyzed (in milliseconds).
const DEFAULT_DEBOUNCE_MS: u64 = 300;

const DEFAULT_THREADS: u32 = 1;

const DEFAULT_HASH_MB: u32 = 16;

/// Get the engine executable.
///
/// Priority:
/// 1. `STOCKLINE_ENGINE_PATH` env variable if set
/// 2. A Stockfish binary in a common install location or on `PATH`
pub fn get_engine_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("STOCKLINE_ENGINE_PATH") {
        return Some(PathBuf::from(path));
    }

    engine::find_engine_path()
}

/// Get the search depth (`STOCKLINE_DEPTH`, default 15).
pub fn get_depth() -> u32 {
    env_or("STOCKLINE_DEPTH", DEFAULT_DEPTH)
}

/// Get the number of variations (`STOCKLINE_MULTIPV`, default 3).
pub fn get_multipv() -> u32 {
    env_or("STOCKLINE_MULTIPV", DEFAULT_MULTIPV)
}

/// Get the debounce window in milliseconds (`STOCKLINE_DEBOUNCE_MS`, default 300).
pub fn get_debounce_ms() -> u64 {
    env_or("STOCKLINE_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)
}

pub fn get_threads() -> u32 {
    env_or("STOCKLINE_THREADS", DEFAULT_THREADS)
}

pub fn get_hash_mb() -> u32 {
    env_or("STOCKLINE_HASH_MB", DEFAULT_HASH_MB)
}

/// Get the directory for daily log files.
///
/// When `STOCKLINE_LOG_DIR` is unset, logs go to stderr.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("STOCKLINE_LOG_DIR").ok().map(PathBuf::from)
}

/// Parse `key` from the environment, falling back to `default` when unset
/// or unparsable.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    if let Ok(value) = std::env::var(key) {
        return value.trim().parse().unwrap_or(default);
    }

    default
}
