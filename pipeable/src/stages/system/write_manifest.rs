//! Writes a JSON manifest of the run and records it as an export.

use crate::context::ExecutionContext;
use crate::core::{ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST};
use crate::stages::{DescribedStage, Stage, StageOutcome, StageParameters};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// EXPORT stage writing item names, exports and user input to a file.
///
/// I/O errors are faults, not reported failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteManifest;

impl DescribedStage for WriteManifest {
    fn descriptor() -> StageDescriptor {
        StageDescriptor::new(SYSTEM_HOST, "write_manifest", "Write Manifest", StageCategory::Export)
            .with_help("Writes a JSON manifest of the collected items.")
            .with_parameter(
                ParameterSpec::required("path", ParameterKind::String)
                    .with_help("Destination file."),
            )
            .with_parameter(
                ParameterSpec::new("pretty", ParameterKind::Boolean, json!(true))
                    .with_help("Indent the JSON output."),
            )
    }
}

#[async_trait]
impl Stage for WriteManifest {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        let path = PathBuf::from(params.str("path")?);
        let summary = ctx.to_summary();
        let text = if params.bool("pretty")? {
            serde_json::to_string_pretty(&summary)?
        } else {
            serde_json::to_string(&summary)?
        };

        std::fs::write(&path, text)
            .with_context(|| format!("writing manifest {}", path.display()))?;
        info!(path = %path.display(), items = ctx.items().len(), "Manifest written");

        ctx.add_export(path.display().to_string());
        outcome.message(format!(
            "Wrote {} item(s) to '{}'",
            ctx.items().len(),
            path.display()
        ));
        Ok(())
    }
}
