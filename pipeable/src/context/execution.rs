//! The mutable context shared by every stage of one pipeline run.

use crate::core::Item;
use serde_json::{Map, Value};
use uuid::Uuid;

/// The shared mutable state threaded through a pipeline run.
///
/// The runner hands each stage an exclusive `&mut` borrow for the duration of
/// its `execute` call. Exports are append-only.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    items: Vec<Item>,
    exports: Vec<String>,
    user_input: Map<String, Value>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the context with items.
    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    /// Seeds a user input value.
    #[must_use]
    pub fn with_user_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.user_input.insert(key.into(), value);
        self
    }

    /// Returns the collected items in order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the items for in-place editing (filtering, reordering).
    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    /// Appends an item.
    pub fn push_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Appends several items, keeping their order.
    pub fn extend_items(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    /// Finds an item by identity.
    #[must_use]
    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Returns the item names in order.
    #[must_use]
    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(Item::name).collect()
    }

    /// Returns the exported artifact identifiers in order.
    #[must_use]
    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    /// Records an exported artifact.
    pub fn add_export(&mut self, export: impl Into<String>) {
        self.exports.push(export.into());
    }

    /// Returns the user input mapping.
    #[must_use]
    pub fn user_input(&self) -> &Map<String, Value> {
        &self.user_input
    }

    /// Gets a single user input value.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.user_input.get(key)
    }

    /// Gets a string user input value.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.user_input.get(key).and_then(Value::as_str)
    }

    /// Sets a user input value, returning the previous one.
    pub fn set_input(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.user_input.insert(key.into(), value)
    }

    /// Returns true if nothing has been collected, exported or entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.exports.is_empty() && self.user_input.is_empty()
    }

    /// Summarizes the context as JSON (item names, exports, user input).
    #[must_use]
    pub fn to_summary(&self) -> Value {
        serde_json::json!({
            "items": self.item_names(),
            "exports": self.exports,
            "user_input": self.user_input,
        })
    }
}
