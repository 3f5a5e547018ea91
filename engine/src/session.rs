//! The engine session actor.
//!
//! [`EngineSession`] is a cheap handle; all protocol state lives in a single
//! task that processes handle commands and engine output one at a time.
//! Commands are polled first, so a `destroy` queued before a late engine
//! line always wins.
//!
//! Callbacks are single-slot: registering a second callback of the same
//! kind replaces the first. There is exactly one observer per event kind.
//!
//! Every [`EngineSession::analyze`] call returns a [`SearchId`]. Info and
//! bestmove callbacks carry the id of the search they belong to, so an
//! observer on another task can discard output it no longer wants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::Instrument;

use crate::search::{Search, SearchId};
use crate::uci::{parse_uci_message, UciCommand, UciMessage};
use crate::worker::{EngineSpawner, WorkerEvent};
use crate::{EngineOptions, Variation};

pub type ReadyCallback = Box<dyn FnMut() + Send>;
pub type InfoCallback = Box<dyn FnMut(SearchId, &[Variation], u32) + Send>;
pub type BestMoveCallback = Box<dyn FnMut(SearchId, &str) + Send>;
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    /// Handshake sent, waiting for the first `readyok`.
    Initializing,
    Ready,
    Searching,
    /// The worker channel could not be created. Only `destroy` leaves this state.
    Errored,
    /// The handle was dropped and the actor has exited.
    Terminated,
}

impl Lifecycle {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready | Self::Searching)
    }
}

enum SessionCommand {
    Init { multipv: u32 },
    OnReady(ReadyCallback),
    OnInfo(InfoCallback),
    OnBestMove(BestMoveCallback),
    OnError(ErrorCallback),
    Analyze { id: SearchId, fen: String, depth: u32 },
    Stop,
    Destroy,
}

/// Handle to an engine session. Every method returns immediately.
pub struct EngineSession {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    lifecycle: Arc<watch::Sender<Lifecycle>>,
    next_search: AtomicU64,
}

impl EngineSession {
    /// Start a session actor. No engine is contacted until [`init`](Self::init).
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(spawner: Arc<dyn EngineSpawner>, options: EngineOptions) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, _) = watch::channel(Lifecycle::Uninitialized);
        let lifecycle = Arc::new(lifecycle_tx);

        let state = SessionState::new(spawner, options, lifecycle.clone());
        tokio::spawn(run_session_actor(state, cmd_rx));

        Self {
            cmd_tx,
            lifecycle,
            next_search: AtomicU64::new(1),
        }
    }

    /// Create the worker channel and send the handshake. A no-op unless the
    /// session is uninitialized. Failure is reported through `on_error`.
    pub fn init(&self, multipv: u32) {
        self.send(SessionCommand::Init { multipv });
    }

    pub fn on_ready(&self, cb: impl FnMut() + Send + 'static) {
        self.send(SessionCommand::OnReady(Box::new(cb)));
    }

    /// Called with the search id, every known variation (ascending rank) and
    /// the latest depth.
    pub fn on_info(&self, cb: impl FnMut(SearchId, &[Variation], u32) + Send + 'static) {
        self.send(SessionCommand::OnInfo(Box::new(cb)));
    }

    pub fn on_best_move(&self, cb: impl FnMut(SearchId, &str) + Send + 'static) {
        self.send(SessionCommand::OnBestMove(Box::new(cb)));
    }

    pub fn on_error(&self, cb: impl FnMut(&str) + Send + 'static) {
        self.send(SessionCommand::OnError(Box::new(cb)));
    }

    /// Analyze `fen` to `depth`, superseding any running search.
    ///
    /// Dropped silently if the session is not ready yet. The returned id
    /// tags this search's info and bestmove callbacks.
    pub fn analyze(&self, fen: impl Into<String>, depth: u32) -> SearchId {
        let id = SearchId::new(self.next_search.fetch_add(1, Ordering::Relaxed));
        self.send(SessionCommand::Analyze {
            id,
            fen: fen.into(),
            depth,
        });
        id
    }

    pub fn stop(&self) {
        self.send(SessionCommand::Stop);
    }

    /// Quit the engine, release the channel and forget all search state.
    /// Safe to call repeatedly and in any state.
    pub fn destroy(&self) {
        self.lifecycle.send_replace(Lifecycle::Uninitialized);
        self.send(SessionCommand::Destroy);
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle().is_ready()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    pub fn subscribe_lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    fn send(&self, cmd: SessionCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::debug!("Session actor closed, dropping command");
        }
    }
}

#[derive(Default)]
struct Callbacks {
    ready: Option<ReadyCallback>,
    info: Option<InfoCallback>,
    best_move: Option<BestMoveCallback>,
    error: Option<ErrorCallback>,
}

struct PendingSearch {
    id: SearchId,
    fen: String,
    depth: u32,
}

/// State owned by the actor task.
struct SessionState {
    spawner: Arc<dyn EngineSpawner>,
    options: EngineOptions,
    lifecycle: Arc<watch::Sender<Lifecycle>>,
    multipv: u32,
    worker_tx: Option<mpsc::UnboundedSender<String>>,
    worker_rx: Option<mpsc::UnboundedReceiver<WorkerEvent>>,
    search: Option<Search>,
    pending: Option<PendingSearch>,
    /// A stop/isready round-trip is in flight; no search may start before its `readyok`.
    sync_outstanding: bool,
    callbacks: Callbacks,
}

async fn run_session_actor(mut state: SessionState, mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>) {
    async move {
        tracing::debug!("Session actor started");

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => state.handle_command(cmd),
                    None => break,
                },

                event = state.next_worker_event() => state.handle_worker_event(event),
            }
        }

        state.destroy();
        state.set_lifecycle(Lifecycle::Terminated);
        tracing::debug!("Session actor exited");
    }
    .instrument(tracing::info_span!("engine_session"))
    .await
}

impl SessionState {
    fn new(
        spawner: Arc<dyn EngineSpawner>,
        options: EngineOptions,
        lifecycle: Arc<watch::Sender<Lifecycle>>,
    ) -> Self {
        Self {
            spawner,
            options,
            lifecycle,
            multipv: 1,
            worker_tx: None,
            worker_rx: None,
            search: None,
            pending: None,
            sync_outstanding: false,
            callbacks: Callbacks::default(),
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        let prev = self.lifecycle.send_replace(next);
        if prev != next {
            tracing::debug!(?prev, ?next, "Lifecycle transition");
        }
    }

    /// Next message from the worker; pends forever while no channel is open.
    async fn next_worker_event(&mut self) -> WorkerEvent {
        let Some(rx) = self.worker_rx.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Some(event) => event,
            None => {
                self.worker_rx = None;
                WorkerEvent::Error("Engine channel closed".to_string())
            }
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Init { multipv } => self.init(multipv),
            SessionCommand::OnReady(cb) => self.callbacks.ready = Some(cb),
            SessionCommand::OnInfo(cb) => self.callbacks.info = Some(cb),
            SessionCommand::OnBestMove(cb) => self.callbacks.best_move = Some(cb),
            SessionCommand::OnError(cb) => self.callbacks.error = Some(cb),
            SessionCommand::Analyze { id, fen, depth } => self.analyze(PendingSearch { id, fen, depth }),
            SessionCommand::Stop => self.stop(),
            SessionCommand::Destroy => self.destroy(),
        }
    }

    fn init(&mut self, multipv: u32) {
        if self.lifecycle() != Lifecycle::Uninitialized || self.worker_tx.is_some() {
            tracing::debug!(lifecycle = ?self.lifecycle(), "Ignoring repeated init");
            return;
        }

        self.multipv = multipv.max(1);
        match self.spawner.spawn() {
            Ok(handle) => {
                tracing::info!(multipv = self.multipv, "Engine worker created, starting handshake");
                self.worker_tx = Some(handle.tx);
                self.worker_rx = Some(handle.rx);
                self.set_lifecycle(Lifecycle::Initializing);
                self.send(UciCommand::Uci);
            }
            Err(e) => {
                tracing::error!("Failed to create engine worker: {}", e);
                self.set_lifecycle(Lifecycle::Errored);
                self.emit_error(&format!("Failed to create engine worker: {}", e));
            }
        }
    }

    fn analyze(&mut self, request: PendingSearch) {
        if self.worker_tx.is_none() || !self.lifecycle().is_ready() {
            tracing::debug!(search = %request.id, "Engine not ready, dropping analyze request");
            return;
        }

        if let Some(search) = self.search.as_mut().filter(|s| s.is_active()) {
            // Stop the running search and wait for the engine to drain its
            // output before the next one starts.
            tracing::debug!(fen = search.fen(), search = %search.id(), "Superseding active search");
            search.deactivate();
            self.pending = Some(request);
            self.sync_outstanding = true;
            self.send(UciCommand::Stop);
            self.send(UciCommand::IsReady);
        } else if self.sync_outstanding {
            // Already waiting on readyok; the newest request wins.
            self.pending = Some(request);
        } else {
            self.start_search(request);
        }
    }

    fn start_search(&mut self, request: PendingSearch) {
        tracing::info!(fen = %request.fen, depth = request.depth, search = %request.id, "Starting search");
        let fen = request.fen.clone();
        self.search = Some(Search::new(request.id, request.fen, request.depth));
        self.set_lifecycle(Lifecycle::Searching);
        self.send(UciCommand::Position { fen });
        self.send(UciCommand::GoDepth(request.depth));
    }

    fn stop(&mut self) {
        if self.worker_tx.is_none() {
            return;
        }
        // The active search stays attributed until its bestmove arrives.
        self.pending = None;
        if self.sync_outstanding {
            // The engine is already stopping; the trailing readyok settles the lifecycle.
            return;
        }
        self.send(UciCommand::Stop);
    }

    fn destroy(&mut self) {
        if let Some(tx) = self.worker_tx.take() {
            tracing::info!("Destroying engine session");
            tracing::trace!("UCI >> {}", UciCommand::Quit);
            let _ = tx.send(UciCommand::Quit.to_string());
        }
        self.worker_rx = None;
        self.search = None;
        self.pending = None;
        self.sync_outstanding = false;
        self.multipv = 1;
        self.set_lifecycle(Lifecycle::Uninitialized);
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Line(line) => self.handle_line(&line),
            WorkerEvent::Error(message) => {
                tracing::error!("Engine channel error: {}", message);
                self.emit_error(&message);
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        tracing::trace!("UCI << {}", line);

        let msg = match parse_uci_message(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::trace!("Ignoring engine output: {}", e);
                return;
            }
        };

        match msg {
            UciMessage::Id { name, value } => {
                tracing::debug!("Engine {}: {}", name, value);
            }
            UciMessage::UciOk => {
                if self.lifecycle() != Lifecycle::Initializing {
                    return;
                }
                tracing::debug!("Received uciok, configuring engine");
                let threads = self.options.threads.clamp(1, 16);
                let hash_mb = self.options.hash_mb.clamp(1, 2048);
                self.send(UciCommand::set_option("MultiPV", self.multipv));
                self.send(UciCommand::set_option("Threads", threads));
                self.send(UciCommand::set_option("Hash", hash_mb));
                self.send(UciCommand::IsReady);
            }
            UciMessage::ReadyOk => {
                if self.lifecycle() == Lifecycle::Initializing {
                    tracing::info!("Engine ready");
                    self.set_lifecycle(Lifecycle::Ready);
                    if let Some(cb) = self.callbacks.ready.as_mut() {
                        cb();
                    }
                    return;
                }
                if !std::mem::take(&mut self.sync_outstanding) {
                    return;
                }
                match self.pending.take() {
                    Some(request) => self.start_search(request),
                    // The successor was cancelled by `stop`.
                    None => self.set_lifecycle(Lifecycle::Ready),
                }
            }
            UciMessage::Info(info) => {
                let Some(search) = self.search.as_mut().filter(|s| s.is_active()) else {
                    return;
                };
                let Some(variation) = info.variation() else {
                    return;
                };
                search.record(variation);
                let id = search.id();
                let variations = search.variations();
                let depth = search.depth();
                if let Some(cb) = self.callbacks.info.as_mut() {
                    cb(id, &variations, depth);
                }
            }
            UciMessage::BestMove { mv, .. } => {
                let Some(search) = self.search.as_mut().filter(|s| s.is_active()) else {
                    tracing::debug!("Discarding bestmove from superseded search: {}", mv);
                    return;
                };
                search.deactivate();
                let id = search.id();
                tracing::info!(
                    depth = search.depth(),
                    target_depth = search.target_depth(),
                    search = %id,
                    "Search finished, bestmove {}",
                    mv
                );
                self.set_lifecycle(Lifecycle::Ready);
                if let Some(cb) = self.callbacks.best_move.as_mut() {
                    cb(id, &mv);
                }
            }
        }
    }

    fn send(&mut self, cmd: UciCommand) {
        let Some(tx) = self.worker_tx.as_ref() else {
            return;
        };
        tracing::trace!("UCI >> {}", cmd);
        if tx.send(cmd.to_string()).is_err() {
            tracing::error!("Failed to send command to engine: {}", cmd);
            self.emit_error("Engine channel closed");
        }
    }

    fn emit_error(&mut self, message: &str) {
        if let Some(cb) = self.callbacks.error.as_mut() {
            cb(message);
        }
    }
}
