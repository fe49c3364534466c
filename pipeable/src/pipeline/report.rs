//! Run results.

use crate::context::ExecutionContext;
use crate::core::StageCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Index of the entry in the definition.
    pub position: usize,
    /// Stage name.
    pub name: String,
    /// Host the stage was loaded from.
    pub host: String,
    /// Human readable label.
    pub label: String,
    /// Discovery category.
    pub category: StageCategory,
    /// The stage reported failure, or faulted.
    pub failed: bool,
    /// The stage returned an error or panicked.
    pub faulted: bool,
    /// Messages in the order the stage produced them.
    pub messages: Vec<String>,
    /// Wall-clock execution time.
    pub duration_ms: f64,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// When the first stage started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// One record per executed stage, in execution order.
    pub stages: Vec<StageRecord>,
    /// True only if no executed stage failed.
    pub succeeded: bool,
    /// Position of the stage that stopped the run, if any.
    pub halted_at: Option<usize>,
}

impl RunReport {
    /// Returns the record for the first executed stage named `name`.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.name == name)
    }

    /// Iterates over failed stages.
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(|record| record.failed)
    }

    /// Returns true if a failed stage halted the run.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// Returns every message prefixed with its stage name.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.stages
            .iter()
            .flat_map(|record| {
                record
                    .messages
                    .iter()
                    .map(move |message| format!("[{}] {message}", record.name))
            })
            .collect()
    }

    /// Returns the run duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// The report plus the context handed back to the caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run summary.
    pub report: RunReport,
    /// The shared context in its final state.
    pub context: ExecutionContext,
}

impl RunOutcome {
    /// Shorthand for `report.succeeded`.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.report.succeeded
    }
}
