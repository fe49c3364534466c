//! Declarative pipeline definitions.

use crate::core::SYSTEM_HOST;
use crate::errors::{DefinitionError, PipeableError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

fn default_host() -> String {
    SYSTEM_HOST.to_string()
}

const fn default_stop_on_failed() -> bool {
    true
}

/// One stage invocation within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEntry {
    /// Registered stage name.
    pub stage: String,
    /// Host override; the pipeline's host is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Parameter overrides, applied on top of defaults and settings.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Halt the run if this stage reports failure.
    #[serde(default = "default_stop_on_failed")]
    pub stop_on_failed: bool,
}

impl PipelineEntry {
    /// Creates an entry with no overrides that stops the run on failure.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            host: None,
            parameters: Map::new(),
            stop_on_failed: true,
        }
    }

    /// Targets a specific host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Overrides one parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Keeps running later stages even if this one fails.
    #[must_use]
    pub fn continue_on_failure(mut self) -> Self {
        self.stop_on_failed = false;
        self
    }

    /// Returns the effective host given the pipeline default.
    #[must_use]
    pub fn resolved_host<'a>(&'a self, default: &'a str) -> &'a str {
        self.host.as_deref().unwrap_or(default)
    }
}

/// An ordered list of stage invocations.
///
/// ```json
/// {
///   "name": "publish",
///   "host": "system",
///   "stages": [
///     {"stage": "collect_files", "parameters": {"folder": "/shots", "pattern": "*.exr"}},
///     {"stage": "check_unique_names", "stop_on_failed": false}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline name, used in reports and logs.
    pub name: String,
    /// Default host for entries without an override.
    #[serde(default = "default_host")]
    pub host: String,
    /// Entries in execution order.
    #[serde(default)]
    pub stages: Vec<PipelineEntry>,
}

impl PipelineDefinition {
    /// Creates an empty definition targeting the `"system"` host.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or whitespace-only.
    pub fn new(name: impl Into<String>) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        Ok(Self {
            name,
            host: default_host(),
            stages: Vec::new(),
        })
    }

    /// Sets the default host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Appends an entry.
    #[must_use]
    pub fn stage(mut self, entry: PipelineEntry) -> Self {
        self.stages.push(entry);
        self
    }

    /// Appends a stage by name with default settings.
    #[must_use]
    pub fn then(self, stage: impl Into<String>) -> Self {
        self.stage(PipelineEntry::new(stage))
    }

    /// Parses and validates a JSON definition.
    pub fn from_json_str(text: &str) -> Result<Self, DefinitionError> {
        let definition: Self = serde_json::from_str(text)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Reads and validates a JSON definition file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PipeableError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Checks names. Stage existence is checked by the runner's preflight.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if let Some(position) = self.stages.iter().position(|e| e.stage.trim().is_empty()) {
            return Err(DefinitionError::EmptyStageName {
                pipeline: self.name.clone(),
                position,
            });
        }
        Ok(())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let definition = PipelineDefinition::new("publish")
            .unwrap()
            .stage(PipelineEntry::new("collect_files").with_parameter("folder", json!("/shots")))
            .stage(PipelineEntry::new("export_fbx").with_host("maya").continue_on_failure())
            .then("log_context");

        assert_eq!(definition.len(), 3);
        assert_eq!(definition.stages[0].resolved_host(&definition.host), "system");
        assert_eq!(definition.stages[1].resolved_host(&definition.host), "maya");
        assert!(!definition.stages[1].stop_on_failed);
        assert!(definition.stages[2].stop_on_failed);
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            PipelineDefinition::new("  "),
            Err(DefinitionError::EmptyName)
        ));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let definition = PipelineDefinition::from_json_str(
            r#"{
                "name": "publish",
                "stages": [
                    {"stage": "collect_files", "parameters": {"folder": "/shots"}},
                    {"stage": "check_unique_names", "stop_on_failed": false}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(definition.host, SYSTEM_HOST);
        assert_eq!(definition.stages[0].parameters["folder"], json!("/shots"));
        assert!(definition.stages[0].stop_on_failed);
        assert!(definition.stages[0].host.is_none());
        assert!(!definition.stages[1].stop_on_failed);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            PipelineDefinition::from_json_str("{\"stages\": []}"),
            Err(DefinitionError::Parse(_))
        ));
        assert!(matches!(
            PipelineDefinition::from_json_str(r#"{"name": "p", "stages": [{"stage": ""}]}"#),
            Err(DefinitionError::EmptyStageName { position: 0, .. })
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let definition = PipelineDefinition::new("saved").unwrap().then("log_context");
        std::fs::write(&path, serde_json::to_string(&definition).unwrap()).unwrap();

        assert_eq!(PipelineDefinition::from_path(&path).unwrap(), definition);
        assert!(matches!(
            PipelineDefinition::from_path(dir.path().join("missing.json")),
            Err(PipeableError::Io(_))
        ));
    }
}
