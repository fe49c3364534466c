//! Helpers for testing stages and pipelines.
//!
//! - [`ScriptedStage`]: a stage replaying scripted steps
//! - `assert_*` helpers over [`RunReport`](crate::pipeline::RunReport)

mod assertions;
mod mocks;

pub use assertions::{
    assert_executed, assert_halted_at, assert_run_failed, assert_run_succeeded,
    assert_stage_failed, assert_stage_message,
};
pub use mocks::{scripted_registry, ScriptStep, ScriptedStage};
