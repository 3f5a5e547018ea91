use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::worker::{EngineSpawner, WorkerEvent, WorkerHandle};
use crate::EngineError;

/// Grace period for the engine to exit after its command channel closes.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// Spawns a UCI engine executable with piped stdio.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    path: PathBuf,
}

impl ProcessSpawner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use the first engine found in a well-known location.
    pub fn discover() -> Result<Self, EngineError> {
        find_engine_path().map(Self::new).ok_or(EngineError::NotFound)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EngineSpawner for ProcessSpawner {
    #[tracing::instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    fn spawn(&self) -> Result<WorkerHandle, EngineError> {
        tracing::debug!("Spawning engine process");
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::SpawnFailed(e.to_string())
            })?;

        let mut stdin = child.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(EngineError::NoStdout)?;

        let (line_tx, line_rx) = mpsc::unbounded_channel::<WorkerEvent>();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();

        let error_tx = line_tx.clone();

        // Output reader: one WorkerEvent per stdout line.
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Engine stdout EOF - engine closed");
                        let _ = line_tx.send(WorkerEvent::Error("Engine process exited".to_string()));
                        break;
                    }
                    Ok(_) => {
                        if line_tx.send(WorkerEvent::Line(line.trim().to_string())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from engine stdout: {}", e);
                        let _ = line_tx.send(WorkerEvent::Error(format!(
                            "Failed to read from engine: {}",
                            e
                        )));
                        break;
                    }
                }
            }
            tracing::debug!("Output reader task exiting");
        });

        // Stdin writer. Owns the child so the process lives exactly as long
        // as somebody holds the command sender.
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let mut bytes = cmd.into_bytes();
                bytes.push(b'\n');
                let written = match stdin.write_all(&bytes).await {
                    Ok(()) => stdin.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    let _ = error_tx.send(WorkerEvent::Error(format!(
                        "Failed to write to engine: {}",
                        e
                    )));
                    break;
                }
            }
            drop(stdin);
            if tokio::time::timeout(EXIT_GRACE, child.wait()).await.is_err() {
                tracing::warn!("Engine did not exit in time, killing it");
                let _ = child.kill().await;
            }
            tracing::debug!("Stdin writer task exiting");
        });

        Ok(WorkerHandle {
            tx: cmd_tx,
            rx: line_rx,
        })
    }
}

/// Find a UCI engine executable in common locations
pub fn find_engine_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = paths.iter().map(|p| Path::new(p)).find(|p| p.exists()) {
        return Some(found.to_path_buf());
    }

    // Fall back to PATH lookup.
    std::env::var_os("PATH").and_then(|path| {
        std::env::split_paths(&path)
            .map(|dir| dir.join("stockfish"))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_executable_fails_to_spawn() {
        let spawner = ProcessSpawner::new("/nonexistent/engine-binary");
        let result = spawner.spawn();
        assert!(matches!(result, Err(EngineError::SpawnFailed(_))));
    }
}
