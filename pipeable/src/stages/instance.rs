//! The configured, runnable wrapper around a stage implementation.

use super::{Stage, StageOutcome, StageParameters};
use crate::context::ExecutionContext;
use crate::core::StageDescriptor;
use crate::errors::{PipeableError, StageFault, StageStateError};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of a [`StageInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Created, no parameters bound yet.
    #[default]
    Unconfigured,
    /// Parameters bound, ready to execute.
    Configured,
    /// Executed; terminal regardless of outcome.
    Executed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Configured => write!(f, "configured"),
            Self::Executed => write!(f, "executed"),
        }
    }
}

/// One invocation of a stage: descriptor, implementation, bound parameters
/// and the outcome it reports.
///
/// Instances are single use. `execute` is only valid once, after `configure`.
pub struct StageInstance {
    descriptor: Arc<StageDescriptor>,
    stage: Box<dyn Stage>,
    state: StageState,
    parameters: StageParameters,
    outcome: StageOutcome,
}

impl StageInstance {
    /// Creates an unconfigured instance.
    #[must_use]
    pub fn new(descriptor: Arc<StageDescriptor>, stage: Box<dyn Stage>) -> Self {
        Self {
            descriptor,
            stage,
            state: StageState::Unconfigured,
            parameters: StageParameters::default(),
            outcome: StageOutcome::new(),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<StageDescriptor> {
        &self.descriptor
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    /// Returns the bound parameters.
    #[must_use]
    pub fn parameters(&self) -> &StageParameters {
        &self.parameters
    }

    /// Binds parameters, filling gaps from the schema defaults.
    ///
    /// Reconfiguring a configured instance replaces its parameters.
    pub fn configure(&mut self, parameters: &Map<String, Value>) -> Result<(), PipeableError> {
        if self.state == StageState::Executed {
            return Err(StageStateError::new(self.name(), self.state, "configure").into());
        }

        let bound = self.descriptor.bind(parameters)?;
        debug!(stage = %self.descriptor.name, parameters = ?bound, "Stage configured");
        self.parameters = StageParameters::new(bound);
        self.state = StageState::Configured;
        Ok(())
    }

    /// Runs the stage against the shared context.
    ///
    /// The instance moves to [`StageState::Executed`] whether the stage
    /// succeeds, reports a failure or faults. A fault (returned error or
    /// panic) comes back as [`PipeableError::Fault`].
    pub async fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<(), PipeableError> {
        if self.state != StageState::Configured {
            return Err(StageStateError::new(self.name(), self.state, "execute").into());
        }
        self.state = StageState::Executed;

        let result = AssertUnwindSafe(self.stage.execute(&self.parameters, ctx, &mut self.outcome))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(StageFault::from_error(self.name(), &error).into()),
            Err(payload) => Err(StageFault::from_panic(self.name(), payload.as_ref()).into()),
        }
    }

    /// Converts a fault into a reported failure with a diagnostic message.
    ///
    /// Messages the stage appended before faulting are kept.
    pub fn record_fault(&mut self, fault: &StageFault) {
        self.outcome.fail(fault.to_string());
    }

    /// Returns true if the stage reported a failure.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.outcome.failed()
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        self.outcome.messages()
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> &StageOutcome {
        &self.outcome
    }

    /// Consumes the instance, returning its outcome.
    #[must_use]
    pub fn into_outcome(self) -> StageOutcome {
        self.outcome
    }
}

impl fmt::Debug for StageInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageInstance")
            .field("name", &self.descriptor.name)
            .field("host", &self.descriptor.host)
            .field("state", &self.state)
            .field("stage", &self.stage)
            .field("failed", &self.outcome.failed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Item, ParameterKind, ParameterSpec, StageCategory};
    use crate::stages::FnStage;
    use serde_json::json;

    fn descriptor() -> Arc<StageDescriptor> {
        Arc::new(
            StageDescriptor::new("system", "tag", "Tag", StageCategory::Collect)
                .with_parameter(ParameterSpec::new("name", ParameterKind::String, json!("node"))),
        )
    }

    fn tagging_instance() -> StageInstance {
        let stage = FnStage::new("tag", |params, ctx, outcome| {
            let name = params.str("name")?;
            ctx.push_item(Item::named(name));
            outcome.message(format!("tagged {name}"));
            Ok(())
        });
        StageInstance::new(descriptor(), Box::new(stage))
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let mut instance = tagging_instance();
        assert_eq!(instance.state(), StageState::Unconfigured);

        instance.configure(&Map::new()).unwrap();
        assert_eq!(instance.state(), StageState::Configured);
        assert_eq!(instance.parameters().get("name"), Some(&json!("node")));

        let mut ctx = ExecutionContext::new();
        instance.execute(&mut ctx).await.unwrap();
        assert_eq!(instance.state(), StageState::Executed);
        assert_eq!(ctx.item_names(), vec!["node"]);
        assert_eq!(instance.messages(), ["tagged node"]);
        assert!(!instance.failed());
    }

    #[tokio::test]
    async fn test_execute_before_configure() {
        let mut instance = tagging_instance();
        let mut ctx = ExecutionContext::new();

        let err = instance.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, PipeableError::StageState(ref e) if e.state == StageState::Unconfigured));
        assert!(ctx.is_empty());
        assert_eq!(instance.state(), StageState::Unconfigured);
    }

    #[tokio::test]
    async fn test_execute_twice() {
        let mut instance = tagging_instance();
        let mut ctx = ExecutionContext::new();
        instance.configure(&Map::new()).unwrap();
        instance.execute(&mut ctx).await.unwrap();

        let err = instance.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, PipeableError::StageState(ref e) if e.state == StageState::Executed));
        assert_eq!(ctx.items().len(), 1);
    }

    #[tokio::test]
    async fn test_configure_after_execute_rejected() {
        let mut instance = tagging_instance();
        instance.configure(&Map::new()).unwrap();
        instance.execute(&mut ExecutionContext::new()).await.unwrap();

        let err = instance.configure(&Map::new()).unwrap_err();
        assert!(matches!(err, PipeableError::StageState(_)));
    }

    #[test]
    fn test_reconfigure_replaces_parameters() {
        let mut instance = tagging_instance();
        instance.configure(&Map::new()).unwrap();

        let overrides = json!({"name": "mesh"}).as_object().cloned().unwrap();
        instance.configure(&overrides).unwrap();
        assert_eq!(instance.parameters().get("name"), Some(&json!("mesh")));
    }

    #[test]
    fn test_configure_rejects_bad_parameters() {
        let mut instance = tagging_instance();
        let overrides = json!({"name": 5}).as_object().cloned().unwrap();

        let err = instance.configure(&overrides).unwrap_err();
        assert!(matches!(err, PipeableError::Parameter(_)));
        assert_eq!(instance.state(), StageState::Unconfigured);
    }

    #[tokio::test]
    async fn test_error_becomes_fault() {
        let stage = FnStage::new("broken", |_params, _ctx, outcome| {
            outcome.message("starting");
            anyhow::bail!("device not ready")
        });
        let mut instance = StageInstance::new(descriptor(), Box::new(stage));
        instance.configure(&Map::new()).unwrap();

        let err = instance.execute(&mut ExecutionContext::new()).await.unwrap_err();
        let PipeableError::Fault(fault) = err else {
            panic!("expected a fault");
        };
        assert_eq!(fault.stage, "tag");
        assert_eq!(fault.message, "device not ready");
        assert_eq!(instance.state(), StageState::Executed);

        instance.record_fault(&fault);
        assert!(instance.failed());
        assert_eq!(instance.messages().len(), 2);
        assert_eq!(instance.messages()[0], "starting");
        assert!(instance.messages()[1].contains("unrecoverable error"));
    }

    #[tokio::test]
    async fn test_panic_becomes_fault() {
        let stage = FnStage::new("panicky", |_params, _ctx, _outcome| -> anyhow::Result<()> {
            panic!("index out of range")
        });
        let mut instance = StageInstance::new(descriptor(), Box::new(stage));
        instance.configure(&Map::new()).unwrap();

        let err = instance.execute(&mut ExecutionContext::new()).await.unwrap_err();
        let PipeableError::Fault(fault) = err else {
            panic!("expected a fault");
        };
        assert!(fault.panicked);
        assert!(fault.message.contains("index out of range"));
        assert_eq!(instance.state(), StageState::Executed);
    }
}
