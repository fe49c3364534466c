//! Pipeline lifecycle events.
//!
//! The runner reports progress to an [`EventSink`] owned by the caller. Event
//! payloads are JSON objects carrying at least `run_id` and `pipeline`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Emitted once before the first stage runs.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted when a stage is about to execute.
pub const STAGE_STARTED: &str = "stage.started";
/// Emitted when a stage finished without reporting failure.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Emitted when a stage reported failure.
pub const STAGE_FAILED: &str = "stage.failed";
/// Emitted when a stage returned an error or panicked.
pub const STAGE_FAULTED: &str = "stage.faulted";
/// Emitted when a failed stage stopped the run early.
pub const PIPELINE_HALTED: &str = "pipeline.halted";
/// Emitted once after the run, whether it succeeded or not.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
