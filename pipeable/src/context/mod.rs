//! Context management for pipeline execution.
//!
//! A single [`ExecutionContext`] is created per run and mutated in place by
//! each stage in turn.

mod execution;

pub use execution::ExecutionContext;
