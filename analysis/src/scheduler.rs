use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use engine::{EngineOptions, EngineSession, EngineSpawner, SearchId, Variation};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::Instrument;

use crate::snapshot::AnalysisSnapshot;

/// Quiet period a position must survive before it is analyzed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of variations searched in parallel. Fixed for the scheduler's lifetime.
    pub search_width: u32,
    pub debounce: Duration,
    pub engine: EngineOptions,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            search_width: 3,
            debounce: DEFAULT_DEBOUNCE,
            engine: EngineOptions::default(),
        }
    }
}

/// Whether this host can run an engine at all.
#[derive(Clone)]
pub enum EngineHost {
    Available(Arc<dyn EngineSpawner>),
    /// Analysis is disabled: no session is created and the snapshot stays empty.
    Unavailable,
}

impl EngineHost {
    pub fn available(spawner: impl EngineSpawner + 'static) -> Self {
        Self::Available(Arc::new(spawner))
    }
}

/// Position and target depth the caller currently wants analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub fen: String,
    pub depth: u32,
}

impl AnalysisRequest {
    pub fn new(fen: impl Into<String>, depth: u32) -> Self {
        Self {
            fen: fen.into(),
            depth,
        }
    }
}

enum SchedulerCommand {
    SetRequest(AnalysisRequest),
    SetPosition(String),
    SetDepth(u32),
    Unmount,
}

/// Session callbacks, forwarded into the scheduler task.
enum EngineSignal {
    Ready,
    Info(SearchId, Vec<Variation>, u32),
    BestMove(SearchId, String),
    Error(String),
}

/// Binds one engine session to a changing analysis request.
///
/// Request changes made before the engine is ready are not queued; the
/// first search uses whatever request is current when readiness arrives.
/// Afterwards every change restarts a debounce timer and only the request
/// current when the timer fires is searched.
pub struct AnalysisScheduler {
    cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
    snapshot: watch::Receiver<AnalysisSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl AnalysisScheduler {
    /// Create the engine session and start its handshake.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(config: SchedulerConfig, host: EngineHost, request: AnalysisRequest) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(AnalysisSnapshot::default());

        let task = match host {
            EngineHost::Available(spawner) => {
                let state = SchedulerState::activate(config, spawner, request, snapshot_tx);
                Some(tokio::spawn(run_scheduler(state, cmd_rx)))
            }
            EngineHost::Unavailable => {
                tracing::info!("No engine available, analysis disabled");
                None
            }
        };

        Self {
            cmd_tx,
            snapshot,
            task,
        }
    }

    pub fn set_request(&self, request: AnalysisRequest) {
        self.send(SchedulerCommand::SetRequest(request));
    }

    pub fn set_position(&self, fen: impl Into<String>) {
        self.send(SchedulerCommand::SetPosition(fen.into()));
    }

    pub fn set_depth(&self, depth: u32) {
        self.send(SchedulerCommand::SetDepth(depth));
    }

    /// Current state of the analysis.
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.snapshot.clone()
    }

    /// Cancel any pending debounce, destroy the session and wait for the
    /// scheduler task to finish.
    pub async fn unmount(mut self) {
        self.send(SchedulerCommand::Unmount);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, cmd: SchedulerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::debug!("Scheduler inactive, dropping command");
        }
    }
}

impl Drop for AnalysisScheduler {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SchedulerCommand::Unmount);
    }
}

struct SchedulerState {
    config: SchedulerConfig,
    session: EngineSession,
    signal_rx: mpsc::UnboundedReceiver<EngineSignal>,
    /// Latest request from the caller, read at fire time.
    request: AnalysisRequest,
    ready: bool,
    /// Search whose output the snapshot currently shows.
    current: Option<SearchId>,
    debounce: Option<Pin<Box<Sleep>>>,
    snapshot_tx: watch::Sender<AnalysisSnapshot>,
}

async fn run_scheduler(mut state: SchedulerState, mut cmd_rx: mpsc::UnboundedReceiver<SchedulerCommand>) {
    async move {
        tracing::debug!("Scheduler started");

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => match cmd {
                    Some(SchedulerCommand::Unmount) | None => break,
                    Some(SchedulerCommand::SetRequest(request)) => state.request_changed(request),
                    Some(SchedulerCommand::SetPosition(fen)) => {
                        let request = AnalysisRequest { fen, ..state.request.clone() };
                        state.request_changed(request);
                    }
                    Some(SchedulerCommand::SetDepth(depth)) => {
                        let request = AnalysisRequest { depth, ..state.request.clone() };
                        state.request_changed(request);
                    }
                },

                Some(signal) = state.signal_rx.recv() => state.handle_signal(signal),

                () = debounce_elapsed(&mut state.debounce) => state.fire(),
            }
        }

        state.deactivate();
        tracing::debug!("Scheduler exited");
    }
    .instrument(tracing::info_span!("analysis_scheduler"))
    .await
}

/// Resolves when the pending debounce timer fires; pends forever if none.
fn debounce_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) -> impl Future<Output = ()> + '_ {
    async move {
        match timer.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
    }
}

impl SchedulerState {
    fn activate(
        config: SchedulerConfig,
        spawner: Arc<dyn EngineSpawner>,
        request: AnalysisRequest,
        snapshot_tx: watch::Sender<AnalysisSnapshot>,
    ) -> Self {
        let session = EngineSession::new(spawner, config.engine);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let tx = signal_tx.clone();
        session.on_ready(move || {
            let _ = tx.send(EngineSignal::Ready);
        });
        let tx = signal_tx.clone();
        session.on_info(move |id, variations, depth| {
            let _ = tx.send(EngineSignal::Info(id, variations.to_vec(), depth));
        });
        let tx = signal_tx.clone();
        session.on_best_move(move |id, mv| {
            let _ = tx.send(EngineSignal::BestMove(id, mv.to_string()));
        });
        session.on_error(move |message| {
            let _ = signal_tx.send(EngineSignal::Error(message.to_string()));
        });

        tracing::info!(search_width = config.search_width, "Initializing engine session");
        session.init(config.search_width);

        Self {
            config,
            session,
            signal_rx,
            request,
            ready: false,
            current: None,
            debounce: None,
            snapshot_tx,
        }
    }

    fn request_changed(&mut self, request: AnalysisRequest) {
        if request == self.request {
            return;
        }
        self.request = request;

        if !self.ready {
            tracing::debug!("Engine not ready, deferring to readiness");
            return;
        }

        tracing::trace!(fen = %self.request.fen, depth = self.request.depth, "Restarting debounce");
        self.debounce = Some(Box::pin(tokio::time::sleep(self.config.debounce)));
    }

    fn fire(&mut self) {
        self.debounce = None;
        self.snapshot_tx.send_modify(|s| {
            s.variations.clear();
            s.best_move = None;
            s.current_depth = 0;
            s.is_analyzing = true;
        });
        tracing::debug!(fen = %self.request.fen, depth = self.request.depth, "Debounce elapsed, analyzing");
        self.analyze();
    }

    fn analyze(&mut self) {
        let id = self.session.analyze(self.request.fen.clone(), self.request.depth);
        self.current = Some(id);
    }

    /// Whether a signal from search `id` still belongs to the current request.
    fn is_current(&self, id: SearchId) -> bool {
        if self.current == Some(id) {
            return true;
        }
        tracing::trace!(search = %id, "Dropping output from a superseded search");
        false
    }

    fn handle_signal(&mut self, signal: EngineSignal) {
        match signal {
            EngineSignal::Ready => {
                self.ready = true;
                self.analyze();
                self.snapshot_tx.send_modify(|s| {
                    s.is_ready = true;
                    s.is_analyzing = true;
                });
            }
            EngineSignal::Info(id, variations, depth) => {
                if !self.is_current(id) {
                    return;
                }
                self.snapshot_tx.send_modify(|s| {
                    s.variations = variations;
                    s.current_depth = depth;
                });
            }
            EngineSignal::BestMove(id, mv) => {
                if !self.is_current(id) {
                    return;
                }
                self.snapshot_tx.send_modify(|s| {
                    s.best_move = Some(mv);
                    s.is_analyzing = false;
                });
            }
            EngineSignal::Error(message) => {
                tracing::warn!("Engine error: {}", message);
                self.snapshot_tx.send_modify(|s| {
                    s.error = Some(message);
                    s.is_analyzing = false;
                });
            }
        }
    }

    fn deactivate(&mut self) {
        self.debounce = None;
        self.current = None;
        self.session.destroy();
    }
}
