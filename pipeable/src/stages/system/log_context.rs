//! Logs the state of the execution context.

use crate::context::ExecutionContext;
use crate::core::{ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST};
use crate::stages::{DescribedStage, Stage, StageOutcome, StageParameters};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// DEBUG stage that logs the context and leaves it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogContext;

impl DescribedStage for LogContext {
    fn descriptor() -> StageDescriptor {
        StageDescriptor::new(SYSTEM_HOST, "log_context", "Log Context", StageCategory::Debug)
            .with_help("Logs the collected items, exports and user input.")
            .with_parameter(
                ParameterSpec::new("verbose", ParameterKind::Boolean, json!(false))
                    .with_help("Log every item instead of a summary."),
            )
    }
}

#[async_trait]
impl Stage for LogContext {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        if params.bool("verbose")? {
            for (position, item) in ctx.items().iter().enumerate() {
                info!(position, id = %item.id(), name = item.name(), "Context item");
            }
            for export in ctx.exports() {
                info!(export = %export, "Context export");
            }
        }
        info!(summary = %ctx.to_summary(), "Execution context");

        outcome.message(format!(
            "{} item(s), {} export(s), {} input value(s)",
            ctx.items().len(),
            ctx.exports().len(),
            ctx.user_input().len()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Item;

    #[tokio::test]
    async fn test_summary_message() {
        let supplied = json!({"verbose": true}).as_object().cloned().unwrap_or_default();
        let params = StageParameters::new(LogContext::descriptor().bind(&supplied).unwrap());

        let mut ctx = ExecutionContext::new()
            .with_items([Item::named("a"), Item::named("b")])
            .with_user_input("comment", json!("wip"));
        ctx.add_export("/out/a.json");
        let mut outcome = StageOutcome::new();

        LogContext.execute(&params, &mut ctx, &mut outcome).await.unwrap();

        assert_eq!(outcome.messages(), ["2 item(s), 1 export(s), 1 input value(s)"]);
        assert_eq!(ctx.items().len(), 2);
    }
}
