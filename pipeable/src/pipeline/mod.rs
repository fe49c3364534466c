//! Pipeline definition and execution.
//!
//! A [`PipelineDefinition`] lists stage invocations by name. The
//! [`PipelineRunner`] resolves them against a
//! [`StageRegistry`](crate::registry::StageRegistry), runs them in order over
//! one shared context and returns a [`RunReport`].

mod definition;
mod report;
mod runner;

pub use definition::{PipelineDefinition, PipelineEntry};
pub use report::{RunOutcome, RunReport, StageRecord};
pub use runner::PipelineRunner;
