//! stockline - live UCI engine analysis in the terminal.
//!
//! Reads positions and moves from stdin, feeds them to a debounced
//! [`AnalysisScheduler`] and prints every analysis update. See [`config`] for
//! the environment variables that set defaults.

mod command;
mod config;
mod history;
mod render;

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

use analysis::{AnalysisRequest, AnalysisScheduler, AnalysisSnapshot, EngineHost, SchedulerConfig};
use anyhow::Context;
use clap::Parser;
use command::{parse_command, Command};
use engine::{EngineOptions, ProcessSpawner};
use history::PositionHistory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockline", about = "Live UCI engine analysis from the terminal")]
struct Cli {
    /// UCI engine executable. Defaults to a discovered Stockfish.
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Search depth per position.
    #[arg(long)]
    depth: Option<u32>,

    /// Number of variations to search.
    #[arg(long)]
    multipv: Option<u32>,

    /// Engine search threads.
    #[arg(long)]
    threads: Option<u32>,

    /// Engine hash table size in MB.
    #[arg(long)]
    hash: Option<u32>,

    /// Quiet period before a new position is analyzed.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Starting position. Defaults to the standard initial position.
    #[arg(long)]
    fen: Option<String>,

    /// Print snapshots as JSON lines.
    #[arg(long)]
    json: bool,
}

/// Interactive state between commands.
struct Repl {
    history: PositionHistory,
    json: bool,
    /// Last printed snapshot, to skip redundant updates.
    last_printed: Option<AnalysisSnapshot>,
}

impl Repl {
    fn handle(&mut self, command: Command, scheduler: &AnalysisScheduler) -> ControlFlow<()> {
        match command {
            Command::Fen(fen) => match chess::parse_fen(&fen) {
                Ok(_) => {
                    self.history.reset(fen.trim());
                    self.position_changed(scheduler);
                }
                Err(e) => eprintln!("{}", e),
            },
            Command::Move { from, to } => match chess::make_move(self.history.current(), &from, &to) {
                Ok(fen) => {
                    if !self.json {
                        let san = chess::move_to_san(self.history.current(), &from, &to);
                        println!("played {}", san.unwrap_or_else(|| format!("{}{}", from, to)));
                    }
                    self.history.push(fen);
                    self.position_changed(scheduler);
                }
                Err(e) => eprintln!("{}", e),
            },
            Command::Depth(0) => eprintln!("depth must be at least 1"),
            Command::Depth(depth) => scheduler.set_depth(depth),
            Command::Back => {
                if self.history.back() {
                    self.position_changed(scheduler);
                } else {
                    eprintln!("already at the first position");
                }
            }
            Command::Forward => {
                if self.history.forward() {
                    self.position_changed(scheduler);
                } else {
                    eprintln!("already at the last position");
                }
            }
            Command::Reset => {
                self.history.reset(chess::STARTING_FEN);
                self.position_changed(scheduler);
            }
            Command::Show => self.print(&scheduler.snapshot(), true),
            Command::Help => println!("{}", command::HELP),
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn position_changed(&mut self, scheduler: &AnalysisScheduler) {
        let fen = self.history.current().to_string();
        tracing::debug!("Position changed: {}", fen);
        if !self.json {
            println!("position {}", fen);
        }
        self.last_printed = None;
        scheduler.set_position(fen);
    }

    /// Record `snapshot` as printed unless it matches the last one.
    fn should_print(&mut self, snapshot: &AnalysisSnapshot, force: bool) -> bool {
        if !force && self.last_printed.as_ref() == Some(snapshot) {
            return false;
        }
        self.last_printed = Some(snapshot.clone());
        true
    }

    fn print(&mut self, snapshot: &AnalysisSnapshot, force: bool) {
        if !self.should_print(snapshot, force) {
            return;
        }

        let fen = self.history.current();
        if self.json {
            println!("{}", render::render_json(fen, snapshot));
        } else {
            print!("{}", render::render_text(fen, snapshot));
        }
    }
}

fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config::get_log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir).ok();
            let file_appender = tracing_appender::rolling::daily(&dir, "stockline");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

// Engine callbacks and request changes interleave on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let start_fen = cli.fen.unwrap_or_else(|| chess::STARTING_FEN.to_string());
    chess::parse_fen(&start_fen).context("invalid --fen")?;

    let host = match cli.engine.or_else(config::get_engine_path) {
        Some(path) => {
            tracing::info!("Using engine at {}", path.display());
            EngineHost::available(ProcessSpawner::new(path))
        }
        None => {
            eprintln!("No UCI engine found. Set STOCKLINE_ENGINE_PATH or pass --engine; analysis is disabled.");
            EngineHost::Unavailable
        }
    };

    let scheduler_config = SchedulerConfig {
        search_width: cli.multipv.unwrap_or_else(config::get_multipv).max(1),
        debounce: Duration::from_millis(cli.debounce_ms.unwrap_or_else(config::get_debounce_ms)),
        engine: EngineOptions {
            threads: cli.threads.unwrap_or_else(config::get_threads),
            hash_mb: cli.hash.unwrap_or_else(config::get_hash_mb),
        },
    };
    let depth = cli.depth.unwrap_or_else(config::get_depth).max(1);

    let mut repl = Repl {
        history: PositionHistory::new(start_fen),
        json: cli.json,
        last_printed: None,
    };
    let scheduler = AnalysisScheduler::mount(
        scheduler_config,
        host,
        AnalysisRequest::new(repl.history.current(), depth),
    );
    let mut updates = scheduler.subscribe();
    let mut updates_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !cli.json {
        println!("position {}", repl.history.current());
        println!("type `help` for commands");
    }

    loop {
        tokio::select! {
            changed = updates.changed(), if updates_open => {
                if changed.is_err() {
                    updates_open = false;
                    continue;
                }
                let snapshot = updates.borrow_and_update().clone();
                repl.print(&snapshot, false);
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if repl.handle(command, &scheduler).is_break() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
    }

    tracing::info!("Shutting down");
    scheduler.unmount().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Score, Variation};

    fn repl() -> Repl {
        Repl {
            history: PositionHistory::new(chess::STARTING_FEN),
            json: false,
            last_printed: None,
        }
    }

    fn line(rank: u32, cp: i32) -> Variation {
        Variation {
            rank,
            depth: 12,
            score: Score::Centipawns(cp),
            moves: vec!["e2e4".to_string()],
        }
    }

    #[test]
    fn test_every_snapshot_change_is_printed() {
        let mut repl = repl();
        let mut snapshot = AnalysisSnapshot {
            variations: vec![line(1, 30), line(2, 20)],
            current_depth: 12,
            is_analyzing: true,
            is_ready: true,
            ..AnalysisSnapshot::default()
        };
        assert!(repl.should_print(&snapshot, false));
        assert!(!repl.should_print(&snapshot, false));

        // Lower-ranked line at the same depth and count.
        snapshot.variations[1] = line(2, 15);
        assert!(repl.should_print(&snapshot, false));

        // Score change within a depth.
        snapshot.variations[0] = line(1, 35);
        assert!(repl.should_print(&snapshot, false));

        snapshot.is_analyzing = false;
        assert!(repl.should_print(&snapshot, false));
        assert!(!repl.should_print(&snapshot, false));
    }

    #[test]
    fn test_forced_print_repeats() {
        let mut repl = repl();
        let snapshot = AnalysisSnapshot::default();
        assert!(repl.should_print(&snapshot, false));
        assert!(repl.should_print(&snapshot, true));
    }
}
