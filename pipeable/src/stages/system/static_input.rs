//! Injects fixed values into the user input mapping.

use crate::context::ExecutionContext;
use crate::core::{ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST};
use crate::stages::{DescribedStage, Stage, StageOutcome, StageParameters};
use async_trait::async_trait;
use serde_json::json;

/// Non-interactive INPUT stage: copies its `values` into `user_input`.
///
/// Hosts with a UI register their own INPUT stages that prompt instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticInput;

impl DescribedStage for StaticInput {
    fn descriptor() -> StageDescriptor {
        StageDescriptor::new(SYSTEM_HOST, "static_input", "Static Input", StageCategory::Input)
            .with_help("Provides fixed user input values to later stages.")
            .with_parameter(
                ParameterSpec::new("values", ParameterKind::Mapping, json!({}))
                    .with_help("Key/value pairs to add to the user input."),
            )
            .with_parameter(
                ParameterSpec::new("overwrite", ParameterKind::Boolean, json!(true))
                    .with_help("Replace values an earlier stage already entered."),
            )
    }
}

#[async_trait]
impl Stage for StaticInput {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        let overwrite = params.bool("overwrite")?;

        for (key, value) in params.mapping("values")? {
            if !overwrite && ctx.input(key).is_some() {
                outcome.message(format!("Kept existing value for '{key}'"));
                continue;
            }
            ctx.set_input(key.clone(), value.clone());
        }
        Ok(())
    }
}
