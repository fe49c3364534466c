//! Stage trait and implementations.
//!
//! Stages are the fundamental units of work in a pipeable pipeline. A stage
//! type implements [`Stage`]; the engine wraps each invocation in a
//! [`StageInstance`] that enforces the configure → execute lifecycle.

mod instance;
mod outcome;
mod parameters;
pub mod system;

pub use instance::{StageInstance, StageState};
pub use outcome::StageOutcome;
pub use parameters::StageParameters;

use crate::context::ExecutionContext;
use crate::core::{StageCategory, StageDescriptor};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for pipeline stages.
///
/// `execute` runs the stage's domain logic against the shared context.
/// Domain problems are reported through `outcome` (`fail`, `message`);
/// returning `Err` or panicking is a fault, which the runner converts into a
/// failure with a synthesized message.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Executes the stage.
    ///
    /// # Arguments
    ///
    /// * `params` - Parameters bound and validated against the descriptor
    /// * `ctx` - The shared execution context, exclusively borrowed
    /// * `outcome` - Collects messages and the failure flag
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()>;
}

/// A stage type with static metadata, registrable by type.
pub trait DescribedStage: Stage + Default + 'static {
    /// Returns the stage's descriptor.
    fn descriptor() -> StageDescriptor;
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&StageParameters, &mut ExecutionContext, &mut StageOutcome) -> anyhow::Result<()>
        + Send
        + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageParameters, &mut ExecutionContext, &mut StageOutcome) -> anyhow::Result<()>
        + Send
        + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageParameters, &mut ExecutionContext, &mut StageOutcome) -> anyhow::Result<()>
        + Send
        + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageParameters, &mut ExecutionContext, &mut StageOutcome) -> anyhow::Result<()>
        + Send
        + Sync,
{
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        (self.func)(params, ctx, outcome)
    }
}

/// A placeholder for a capability a host does not implement.
///
/// The registry never substitutes this on its own; callers that want a
/// no-op stand-in for a missing stage build one explicitly.
#[derive(Debug, Clone, Default)]
pub struct DisabledStage {
    reason: String,
}

impl DisabledStage {
    /// Creates a disabled stage that records `reason` when executed.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Builds a descriptor for a disabled stand-in of `host`/`name`.
    #[must_use]
    pub fn descriptor(host: &str, name: &str) -> StageDescriptor {
        StageDescriptor::new(host, name, format!("{name} (disabled)"), StageCategory::Debug)
            .with_help("Placeholder for a stage that is not available on this host.")
    }
}

#[async_trait]
impl Stage for DisabledStage {
    async fn execute(
        &self,
        _params: &StageParameters,
        _ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        if !self.reason.is_empty() {
            outcome.message(format!("Skipped: {}", self.reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Item;

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("push", |_params, ctx, outcome| {
            ctx.push_item(Item::named("node"));
            outcome.message("pushed");
            Ok(())
        });

        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();
        stage
            .execute(&StageParameters::default(), &mut ctx, &mut outcome)
            .await
            .unwrap();

        assert_eq!(ctx.item_names(), vec!["node"]);
        assert_eq!(outcome.messages(), ["pushed"]);
        assert!(!outcome.failed());
    }

    #[tokio::test]
    async fn test_disabled_stage() {
        let stage = DisabledStage::new("no exporter for host 'blender'");
        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();
        stage
            .execute(&StageParameters::default(), &mut ctx, &mut outcome)
            .await
            .unwrap();

        assert!(!outcome.failed());
        assert!(outcome.messages()[0].contains("blender"));
        assert!(ctx.is_empty());

        let descriptor = DisabledStage::descriptor("blender", "export_fbx");
        assert_eq!(descriptor.host, "blender");
        assert_eq!(descriptor.label, "export_fbx (disabled)");
    }
}
