//! Scripted in-process engine for tests - only compiled in test mode or with
//! the `mock` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::worker::{EngineSpawner, WorkerEvent, WorkerHandle};
use crate::EngineError;

/// What the mock engine replies to `go` and `stop`.
///
/// Each `go` consumes the next round of replies; the last round repeats.
#[derive(Debug, Clone)]
pub struct MockScript {
    go: Vec<Vec<WorkerEvent>>,
    stop: Vec<WorkerEvent>,
}

impl Default for MockScript {
    /// Two MultiPV lines at depth 10 followed by `bestmove e2e4`.
    fn default() -> Self {
        Self {
            go: vec![lines([
                "info depth 10 multipv 1 score cp 30 pv e2e4 e7e5",
                "info depth 10 multipv 2 score cp 20 pv d2d4 d7d5",
                "bestmove e2e4",
            ])],
            stop: Vec::new(),
        }
    }
}

impl MockScript {
    /// Replace every `go` round with a single one.
    pub fn on_go<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.go = vec![lines(replies)];
        self
    }

    /// Add a round answering the next `go`.
    pub fn then_on_go<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.go.push(lines(replies));
        self
    }

    pub fn on_stop<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = lines(replies);
        self
    }

    /// Append a channel-level error to the latest `go` round.
    pub fn then_error(mut self, message: impl Into<String>) -> Self {
        if let Some(round) = self.go.last_mut() {
            round.push(WorkerEvent::Error(message.into()));
        }
        self
    }

    fn go_round(&self, n: usize) -> &[WorkerEvent] {
        self.go
            .get(n)
            .or_else(|| self.go.last())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn lines<I, S>(replies: I) -> Vec<WorkerEvent>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    replies
        .into_iter()
        .map(|line| WorkerEvent::Line(line.into()))
        .collect()
}

/// Spawner whose workers answer the handshake and replay a [`MockScript`].
///
/// Clones share the command log and worker counters.
#[derive(Clone)]
pub struct MockSpawner {
    script: MockScript,
    failure: Option<String>,
    log: Arc<Mutex<Vec<String>>>,
    spawned: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::with_script(MockScript::default())
    }

    pub fn with_script(script: MockScript) -> Self {
        Self {
            script,
            failure: None,
            log: Arc::new(Mutex::new(Vec::new())),
            spawned: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A spawner that can never create a worker.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Every command received by any worker, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Number of spawn attempts, failed ones included.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Workers whose command channel is still open.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl EngineSpawner for MockSpawner {
    fn spawn(&self) -> Result<WorkerHandle, EngineError> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(EngineError::SpawnFailed(reason.clone()));
        }

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkerEvent>();
        let script = self.script.clone();
        let log = self.log.clone();
        let live = self.live.clone();

        live.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let reply = |events: &[WorkerEvent]| {
                for event in events {
                    let _ = event_tx.send(event.clone());
                }
            };

            let mut searches = 0;
            while let Some(cmd) = cmd_rx.recv().await {
                log.lock().unwrap().push(cmd.clone());
                match cmd.split_whitespace().next() {
                    Some("uci") => reply(&lines(["id name MockFish", "uciok"])),
                    Some("isready") => reply(&lines(["readyok"])),
                    Some("go") => {
                        reply(script.go_round(searches));
                        searches += 1;
                    }
                    Some("stop") => reply(&script.stop),
                    Some("quit") => break,
                    _ => {}
                }
            }
            live.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(WorkerHandle {
            tx: cmd_tx,
            rx: event_rx,
        })
    }
}
