//! Parameter values bound to a configured stage.

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Validated parameter values, in schema order.
///
/// Values have already been checked against the descriptor, so the typed
/// getters only fail when a stage asks for a name or type its own schema does
/// not declare; that is a stage bug and surfaces as a fault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageParameters {
    values: Map<String, Value>,
}

impl StageParameters {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Gets a string parameter.
    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| anyhow!("parameter '{name}' is not a string"))
    }

    /// Gets a boolean parameter.
    pub fn bool(&self, name: &str) -> anyhow::Result<bool> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| anyhow!("parameter '{name}' is not a boolean"))
    }

    /// Gets an integer parameter.
    pub fn i64(&self, name: &str) -> anyhow::Result<i64> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| anyhow!("parameter '{name}' is not an integer"))
    }

    /// Gets a numeric parameter.
    pub fn f64(&self, name: &str) -> anyhow::Result<f64> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| anyhow!("parameter '{name}' is not a number"))
    }

    /// Gets a mapping parameter.
    pub fn mapping(&self, name: &str) -> anyhow::Result<&Map<String, Value>> {
        self.require(name)?
            .as_object()
            .ok_or_else(|| anyhow!("parameter '{name}' is not a mapping"))
    }

    /// Deserializes a parameter into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.require(name)?.clone();
        serde_json::from_value(value).with_context(|| format!("parameter '{name}'"))
    }

    /// Returns the bound values.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns the number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| anyhow!("parameter '{name}' is not declared"))
    }
}
