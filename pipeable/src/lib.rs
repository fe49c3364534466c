//! # Pipeable
//!
//! A host-agnostic stage pipeline engine.
//!
//! Independently authored stages register under a host and a name, declare
//! their parameters, and are composed into ordered pipelines that collect
//! items, check them, gather user input and export artifacts:
//!
//! - **Registry**: explicit `(host, name)` table with discovery by category
//! - **Stage lifecycle**: configure, then execute once, with faults caught at
//!   the stage boundary
//! - **Runner**: sequential execution over one shared context with
//!   stop-on-failure
//! - **Settings**: site, project and user JSON tiers with string templates
//! - **Process monitor**: watches an external process from a background thread
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeable::prelude::*;
//!
//! let registry = Arc::new(StageRegistry::with_system_stages());
//! let definition = PipelineDefinition::new("publish")?
//!     .stage(PipelineEntry::new("collect_files").with_parameter("folder", json!("/shots")))
//!     .then("check_unique_names");
//!
//! let outcome = PipelineRunner::new(registry)
//!     .run(&definition, ExecutionContext::new())
//!     .await?;
//! assert!(outcome.report.succeeded);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod monitor;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{SettingValue, SettingsLoader, SettingsNode};
    pub use crate::context::ExecutionContext;
    pub use crate::core::{
        Item, ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST,
    };
    pub use crate::errors::{ConfigError, ParameterError, PipeableError, StageFault};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::monitor::{MonitorHandle, MonitorOutcome, ProcessMonitor};
    pub use crate::observability::{init_logging, LoggingConfig};
    pub use crate::pipeline::{
        PipelineDefinition, PipelineEntry, PipelineRunner, RunOutcome, RunReport, StageRecord,
    };
    pub use crate::registry::{LoadedStage, StageRegistry};
    pub use crate::stages::{
        DescribedStage, Stage, StageInstance, StageOutcome, StageParameters, StageState,
    };
}
