//! Static stage metadata and parameter schemas.

use super::StageCategory;
use crate::errors::ParameterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The expected JSON shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// A string.
    String,
    /// A whole number.
    Integer,
    /// Any number; integers are accepted.
    Float,
    /// A boolean.
    Boolean,
    /// A JSON array.
    List,
    /// A JSON object.
    Mapping,
    /// Any value, including null.
    Any,
}

impl ParameterKind {
    /// Returns true if `value` has this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Mapping => value.is_object(),
            Self::Any => true,
        }
    }

    /// Returns the name of the JSON kind of `value`.
    #[must_use]
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "mapping",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::List => write!(f, "list"),
            Self::Mapping => write!(f, "mapping"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Schema entry for one stage parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Name of the parameter.
    pub name: String,
    /// Expected kind.
    pub kind: ParameterKind,
    /// Default value; `None` makes the parameter required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Help text shown to users.
    #[serde(default)]
    pub help: String,
}

impl ParameterSpec {
    /// Creates an optional parameter with a default value.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterKind, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default),
            help: String::new(),
        }
    }

    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            help: String::new(),
        }
    }

    /// Sets the help text.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Returns true if the parameter has no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Immutable metadata describing a stage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Unique name within the host.
    pub name: String,
    /// Human readable label.
    pub label: String,
    /// The stage category.
    pub category: StageCategory,
    /// The host this stage targets.
    pub host: String,
    /// Help text describing what the stage does.
    #[serde(default)]
    pub help: String,
    /// Parameter schema, in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl StageDescriptor {
    /// Creates a new descriptor with an empty parameter schema.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        category: StageCategory,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            category,
            host: host.into(),
            help: String::new(),
            parameters: Vec::new(),
        }
    }

    /// Sets the help text.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Adds a parameter to the schema.
    ///
    /// A later spec with the same name replaces the earlier one.
    #[must_use]
    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        if let Some(existing) = self.parameters.iter_mut().find(|p| p.name == spec.name) {
            *existing = spec;
        } else {
            self.parameters.push(spec);
        }
        self
    }

    /// Looks up a parameter spec by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Returns the help text for a parameter.
    #[must_use]
    pub fn parameter_help(&self, name: &str) -> Option<&str> {
        self.parameter(name).map(|p| p.help.as_str())
    }

    /// Returns the default values of all optional parameters.
    #[must_use]
    pub fn default_parameters(&self) -> Map<String, Value> {
        self.parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect()
    }

    /// Validates supplied values against the schema.
    ///
    /// Unknown keys are rejected, missing keys are filled from defaults and
    /// values must match the declared kind. The result follows schema order.
    pub fn bind(&self, supplied: &Map<String, Value>) -> Result<Map<String, Value>, ParameterError> {
        if let Some(unknown) = supplied.keys().find(|k| self.parameter(k).is_none()) {
            return Err(ParameterError::Unknown {
                stage: self.name.clone(),
                parameter: unknown.clone(),
            });
        }

        let mut bound = Map::new();
        for spec in &self.parameters {
            let value = match (supplied.get(&spec.name), &spec.default) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(ParameterError::Missing {
                        stage: self.name.clone(),
                        parameter: spec.name.clone(),
                    });
                }
            };

            if !spec.kind.accepts(&value) {
                return Err(ParameterError::TypeMismatch {
                    stage: self.name.clone(),
                    parameter: spec.name.clone(),
                    expected: spec.kind.to_string(),
                    found: ParameterKind::describe(&value).to_string(),
                });
            }
            bound.insert(spec.name.clone(), value);
        }
        Ok(bound)
    }
}
