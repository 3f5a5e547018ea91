//! Debounced analysis scheduling on top of an engine session.
//!
//! An [`AnalysisScheduler`] turns a fast-changing stream of positions into a
//! well-formed sequence of engine searches and publishes the latest result
//! as an [`AnalysisSnapshot`].

pub mod scheduler;
pub mod snapshot;

pub use scheduler::{
    AnalysisRequest, AnalysisScheduler, EngineHost, SchedulerConfig, DEFAULT_DEBOUNCE,
};
pub use snapshot::AnalysisSnapshot;
