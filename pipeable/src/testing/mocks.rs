//! Scripted stages for exercising the runner.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::core::{Item, StageCategory, StageDescriptor};
use crate::errors::DuplicateStageError;
use crate::registry::{StageFactory, StageRegistry};
use crate::stages::{Stage, StageOutcome, StageParameters};

/// One action a [`ScriptedStage`] performs when executed.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Append an informational message.
    Message(String),
    /// Report failure with a message.
    Fail(String),
    /// Return an error (a fault).
    Error(String),
    /// Panic (a fault).
    Panic(String),
    /// Append an item with this name.
    PushItem(String),
    /// Set a user input value.
    SetInput(String, Value),
    /// Append one `name=value` message per bound parameter.
    EchoParameters,
}

/// A stage that replays a fixed list of steps.
///
/// Clones share their call log, so a scripted stage registered in a
/// registry can still be inspected after the runner created fresh instances.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStage {
    steps: Vec<ScriptStep>,
    calls: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl ScriptedStage {
    /// Creates a stage that does nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step.
    #[must_use]
    pub fn step(mut self, step: ScriptStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Adds a message step.
    #[must_use]
    pub fn message(self, message: impl Into<String>) -> Self {
        self.step(ScriptStep::Message(message.into()))
    }

    /// Adds a reported failure step.
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.step(ScriptStep::Fail(message.into()))
    }

    /// Adds an error step.
    #[must_use]
    pub fn error(self, message: impl Into<String>) -> Self {
        self.step(ScriptStep::Error(message.into()))
    }

    /// Adds a panic step.
    #[must_use]
    pub fn panic(self, message: impl Into<String>) -> Self {
        self.step(ScriptStep::Panic(message.into()))
    }

    /// Adds a step appending an item.
    #[must_use]
    pub fn push_item(self, name: impl Into<String>) -> Self {
        self.step(ScriptStep::PushItem(name.into()))
    }

    /// Adds a step setting a user input value.
    #[must_use]
    pub fn set_input(self, key: impl Into<String>, value: Value) -> Self {
        self.step(ScriptStep::SetInput(key.into(), value))
    }

    /// Number of times any instance of this stage executed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Parameters bound for each execution, in order.
    #[must_use]
    pub fn recorded_parameters(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().clone()
    }

    /// Builds a parameterless descriptor.
    #[must_use]
    pub fn descriptor(host: &str, name: &str, category: StageCategory) -> StageDescriptor {
        StageDescriptor::new(host, name, name, category)
    }

    /// Returns a factory producing clones of this stage.
    #[must_use]
    pub fn factory(&self) -> StageFactory {
        let stage = self.clone();
        Arc::new(move || Box::new(stage.clone()) as Box<dyn Stage>)
    }

    /// Registers this stage under `descriptor`.
    pub fn register(
        &self,
        registry: &StageRegistry,
        descriptor: StageDescriptor,
    ) -> Result<(), DuplicateStageError> {
        registry.register_factory(descriptor, self.factory())
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        self.calls.lock().push(params.as_map().clone());

        for step in &self.steps {
            match step {
                ScriptStep::Message(message) => outcome.message(message.clone()),
                ScriptStep::Fail(message) => outcome.fail(message.clone()),
                ScriptStep::Error(message) => anyhow::bail!("{message}"),
                ScriptStep::Panic(message) => panic!("{message}"),
                ScriptStep::PushItem(name) => ctx.push_item(Item::named(name.clone())),
                ScriptStep::SetInput(key, value) => {
                    ctx.set_input(key.clone(), value.clone());
                }
                ScriptStep::EchoParameters => {
                    for (name, value) in params.as_map() {
                        outcome.message(format!("{name}={value}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Builds a registry holding the given scripted stages under `host`.
///
/// Every stage gets a parameterless DEBUG descriptor named after it.
pub fn scripted_registry<'a>(
    host: &str,
    stages: impl IntoIterator<Item = (&'a str, &'a ScriptedStage)>,
) -> Result<StageRegistry, DuplicateStageError> {
    let registry = StageRegistry::new();
    for (name, stage) in stages {
        stage.register(
            &registry,
            ScriptedStage::descriptor(host, name, StageCategory::Debug),
        )?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SYSTEM_HOST;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_steps_run_in_order() {
        let stage = ScriptedStage::new()
            .message("start")
            .push_item("a")
            .set_input("k", json!(1))
            .fail("bad")
            .message("after");
        let params = StageParameters::new(Map::new());
        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();

        stage.execute(&params, &mut ctx, &mut outcome).await.unwrap();

        assert!(outcome.failed());
        assert_eq!(outcome.messages(), ["start", "bad", "after"]);
        assert_eq!(ctx.item_names(), vec!["a"]);
        assert_eq!(ctx.input("k"), Some(&json!(1)));
        assert_eq!(stage.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_step_stops_script() {
        let stage = ScriptedStage::new().error("disk gone").message("unreachable");
        let mut outcome = StageOutcome::new();
        let err = stage
            .execute(&StageParameters::new(Map::new()), &mut ExecutionContext::new(), &mut outcome)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "disk gone");
        assert!(outcome.messages().is_empty());
    }

    #[test]
    fn test_scripted_registry_shares_call_log() {
        let stage = ScriptedStage::new();
        let registry = scripted_registry(SYSTEM_HOST, [("probe", &stage)]).unwrap();

        assert!(registry.contains(SYSTEM_HOST, "probe"));
        assert!(scripted_registry(SYSTEM_HOST, [("probe", &stage), ("probe", &stage)]).is_err());
    }
}
