//! Cascading settings resolution.

use super::template;
use crate::errors::ConfigError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A resolved setting: either a nested node or a plain JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// A nested mapping with its own template scope.
    Node(SettingsNode),
    /// A scalar or array; strings are already rendered.
    Value(Value),
}

impl SettingValue {
    /// Returns the plain value, if this is not a node.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// Returns the child node, if this is one.
    #[must_use]
    pub fn as_node(&self) -> Option<&SettingsNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Value(_) => None,
        }
    }

    /// Converts to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Node(node) => node.to_value(),
            Self::Value(value) => value.clone(),
        }
    }
}

/// The merged settings tree.
///
/// Keys keep the order of the site tier. Each node is its own template scope:
/// a string can only reference siblings resolved before it on the same node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsNode {
    keys: Vec<String>,
    values: HashMap<String, SettingValue>,
}

impl SettingsNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the three tiers (site < project < user).
    ///
    /// Output keys are exactly the keys of `site`, in its order. A key
    /// present in a higher tier replaces the whole value; nested mappings are
    /// not deep-merged. Keys that only exist in `project` or `user` are
    /// ignored.
    pub fn resolve(
        site: &Map<String, Value>,
        project: &Map<String, Value>,
        user: &Map<String, Value>,
    ) -> Result<Self, ConfigError> {
        Self::build(site, project, user, "")
    }

    /// Resolves a single tree (templates included).
    pub fn from_map(tree: &Map<String, Value>) -> Result<Self, ConfigError> {
        let empty = Map::new();
        Self::build(tree, &empty, &empty, "")
    }

    /// Resolves a single JSON value; anything but an object yields an empty node.
    pub fn from_value(tree: &Value) -> Result<Self, ConfigError> {
        match tree {
            Value::Object(map) => Self::from_map(map),
            _ => Ok(Self::new()),
        }
    }

    fn build(
        site: &Map<String, Value>,
        project: &Map<String, Value>,
        user: &Map<String, Value>,
        prefix: &str,
    ) -> Result<Self, ConfigError> {
        let empty = Map::new();
        let mut node = Self::new();

        for (key, site_value) in site {
            let value = user
                .get(key)
                .or_else(|| project.get(key))
                .unwrap_or(site_value);
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            let resolved = match value {
                Value::Object(map) => {
                    SettingValue::Node(Self::build(map, &empty, &empty, &path)?)
                }
                Value::String(text) => {
                    SettingValue::Value(Value::String(template::render(text, &node, &path)?))
                }
                other => SettingValue::Value(other.clone()),
            };
            node.insert(key.clone(), resolved);
        }
        Ok(node)
    }

    fn insert(&mut self, key: String, value: SettingValue) {
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.insert(key, value);
    }

    /// Gets a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Gets a setting by dotted path (`"logging.level"`).
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&SettingValue> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.as_node()?.get(segment)?;
        }
        Some(current)
    }

    /// Gets a plain value.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(SettingValue::as_value)
    }

    /// Gets a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_value(key).and_then(Value::as_str)
    }

    /// Gets a boolean value.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_value(key).and_then(Value::as_bool)
    }

    /// Gets an integer value.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_value(key).and_then(Value::as_i64)
    }

    /// Gets a child node.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&SettingsNode> {
        self.get(key).and_then(SettingValue::as_node)
    }

    /// Returns the keys in resolution order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Iterates over settings in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.keys
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v)))
    }

    /// Returns the number of settings on this node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the node holds no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Converts to an ordered JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_parameters())
    }

    /// Converts to an ordered JSON mapping, e.g. for use as stage parameters.
    #[must_use]
    pub fn to_parameters(&self) -> Map<String, Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_value()))
            .collect()
    }
}
