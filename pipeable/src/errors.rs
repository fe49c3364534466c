//! Error types for the pipeable engine.
//!
//! Engine protocol violations and configuration mistakes are modelled here.
//! A stage that reports a domain failure does *not* produce one of these
//! errors; it sets `failed` on its [`StageOutcome`](crate::stages::StageOutcome).

use crate::stages::StageState;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeable operations.
#[derive(Debug, Error)]
pub enum PipeableError {
    /// Settings resolution failed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// No stage is registered for the requested host and name.
    #[error("{0}")]
    StageNotFound(#[from] StageNotFoundError),

    /// A stage was registered twice under the same host and name.
    #[error("{0}")]
    DuplicateStage(#[from] DuplicateStageError),

    /// Parameters did not match the stage's schema.
    #[error("{0}")]
    Parameter(#[from] ParameterError),

    /// A lifecycle method was called in the wrong state.
    #[error("{0}")]
    StageState(#[from] StageStateError),

    /// A stage raised an unrecoverable error while executing.
    #[error("{0}")]
    Fault(#[from] StageFault),

    /// A pipeline definition was malformed.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipeableError {
    /// Returns a short machine-readable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::StageNotFound(_) => "StageNotFoundError",
            Self::DuplicateStage(_) => "DuplicateStageError",
            Self::Parameter(_) => "ParameterError",
            Self::StageState(_) => "StageStateError",
            Self::Fault(_) => "StageFault",
            Self::Definition(_) => "DefinitionError",
            Self::Io(_) => "IoError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised while merging or loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A template referenced a sibling that is absent or not yet resolved.
    #[error("Setting '{key}': template '{template}' references unknown key '{field}'")]
    MissingTemplateKey {
        /// The setting holding the template.
        key: String,
        /// The raw template text.
        template: String,
        /// The referenced field.
        field: String,
    },

    /// A template could not be parsed or referenced a non-scalar value.
    #[error("Setting '{key}': invalid template '{template}': {reason}")]
    InvalidTemplate {
        /// The setting holding the template.
        key: String,
        /// The raw template text.
        template: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A settings file could not be read.
    #[error("Cannot read settings file {}: {source}", path.display())]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A settings file was not valid JSON.
    #[error("Cannot parse settings file {}: {source}", path.display())]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A settings document's root was not an object.
    #[error("Settings file {} must contain a JSON object at its root", path.display())]
    NotAMapping {
        /// The file path.
        path: PathBuf,
    },
}

impl ConfigError {
    /// Creates a missing template key error.
    #[must_use]
    pub fn missing_key(
        key: impl Into<String>,
        template: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::MissingTemplateKey {
            key: key.into(),
            template: template.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid template error.
    #[must_use]
    pub fn invalid_template(
        key: impl Into<String>,
        template: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTemplate {
            key: key.into(),
            template: template.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when no stage is registered under a (host, name) pair.
#[derive(Debug, Clone, Error)]
#[error("No stage '{name}' registered for host '{host}'")]
pub struct StageNotFoundError {
    /// The requested host.
    pub host: String,
    /// The requested stage name.
    pub name: String,
}

impl StageNotFoundError {
    /// Creates a new stage not found error.
    #[must_use]
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
        }
    }
}

/// Error raised when registering a (host, name) pair that already exists.
#[derive(Debug, Clone, Error)]
#[error("Stage '{name}' is already registered for host '{host}'")]
pub struct DuplicateStageError {
    /// The host.
    pub host: String,
    /// The stage name.
    pub name: String,
}

impl DuplicateStageError {
    /// Creates a new duplicate stage error.
    #[must_use]
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
        }
    }
}

/// Errors raised when binding parameters to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// A supplied key is not part of the schema.
    #[error("Stage '{stage}' has no parameter '{parameter}'")]
    Unknown {
        /// The stage name.
        stage: String,
        /// The offending parameter.
        parameter: String,
    },

    /// A required parameter was not supplied and has no default.
    #[error("Stage '{stage}' requires parameter '{parameter}'")]
    Missing {
        /// The stage name.
        stage: String,
        /// The missing parameter.
        parameter: String,
    },

    /// A supplied value has the wrong type.
    #[error("Stage '{stage}' parameter '{parameter}' expects {expected}, got {found}")]
    TypeMismatch {
        /// The stage name.
        stage: String,
        /// The offending parameter.
        parameter: String,
        /// The expected kind.
        expected: String,
        /// The kind actually supplied.
        found: String,
    },
}

impl ParameterError {
    /// Returns the parameter name involved.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::Unknown { parameter, .. }
            | Self::Missing { parameter, .. }
            | Self::TypeMismatch { parameter, .. } => parameter,
        }
    }
}

/// Error raised when a stage lifecycle method is called out of order.
#[derive(Debug, Clone, Error)]
#[error("Cannot {operation} stage '{stage}' while it is {state}")]
pub struct StageStateError {
    /// The stage name.
    pub stage: String,
    /// The state the stage was in.
    pub state: StageState,
    /// The attempted operation.
    pub operation: &'static str,
}

impl StageStateError {
    /// Creates a new stage state error.
    #[must_use]
    pub fn new(stage: impl Into<String>, state: StageState, operation: &'static str) -> Self {
        Self {
            stage: stage.into(),
            state,
            operation,
        }
    }
}

/// An unrecoverable error raised by a stage during `execute`.
#[derive(Debug, Clone, Error)]
#[error("Stage '{stage}' raised an unrecoverable error: {message}")]
pub struct StageFault {
    /// The faulting stage.
    pub stage: String,
    /// The underlying error, rendered with its cause chain.
    pub message: String,
    /// Whether the stage panicked rather than returning an error.
    pub panicked: bool,
}

impl StageFault {
    /// Creates a fault from an error returned by the stage.
    #[must_use]
    pub fn from_error(stage: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            stage: stage.into(),
            message: format!("{error:#}"),
            panicked: false,
        }
    }

    /// Creates a fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(stage: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "stage panicked".to_string());
        Self {
            stage: stage.into(),
            message: format!("panic: {message}"),
            panicked: true,
        }
    }
}

/// Error raised when a pipeline definition is malformed.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The pipeline name is empty.
    #[error("Pipeline name cannot be empty or whitespace-only")]
    EmptyName,

    /// An entry has an empty stage name.
    #[error("Pipeline '{pipeline}' entry {position} has an empty stage name")]
    EmptyStageName {
        /// The pipeline name.
        pipeline: String,
        /// One-based entry position.
        position: usize,
    },

    /// The definition could not be parsed.
    #[error("Cannot parse pipeline definition: {0}")]
    Parse(#[from] serde_json::Error),
}
