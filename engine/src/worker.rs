use tokio::sync::mpsc;

use crate::EngineError;

/// Message delivered from the engine side of a worker channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// One protocol line, trailing newline stripped.
    Line(String),
    /// Runtime failure of the channel itself.
    Error(String),
}

/// Both ends of a line-oriented channel to one engine instance.
///
/// Commands go out on `tx` one line per message; engine output comes back on
/// `rx` in the order it was produced. Dropping the handle releases the
/// engine.
pub struct WorkerHandle {
    pub tx: mpsc::UnboundedSender<String>,
    pub rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

/// Creates worker channels. This is the only way a session reaches an engine.
pub trait EngineSpawner: Send + Sync {
    fn spawn(&self) -> Result<WorkerHandle, EngineError>;
}
