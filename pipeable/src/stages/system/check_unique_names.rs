//! Fails when two collected items share a name.

use crate::context::ExecutionContext;
use crate::core::{ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST};
use crate::stages::{DescribedStage, Stage, StageOutcome, StageParameters};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

/// Reports one failure message per duplicated item name.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckUniqueNames;

impl DescribedStage for CheckUniqueNames {
    fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            SYSTEM_HOST,
            "check_unique_names",
            "Check Unique Names",
            StageCategory::Check,
        )
        .with_help("Fails if two collected items have the same name.")
        .with_parameter(
            ParameterSpec::new("case_sensitive", ParameterKind::Boolean, json!(true))
                .with_help("Treat 'A.txt' and 'a.txt' as different names."),
        )
    }
}

#[async_trait]
impl Stage for CheckUniqueNames {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        let case_sensitive = params.bool("case_sensitive")?;

        // (display name, count) in first-seen order
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for item in ctx.items() {
            let key = if case_sensitive {
                item.name().to_string()
            } else {
                item.name().to_lowercase()
            };
            match index.get(&key) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    index.insert(key, counts.len());
                    counts.push((item.name().to_string(), 1));
                }
            }
        }

        let mut duplicates = 0usize;
        for (name, count) in counts.iter().filter(|(_, count)| *count > 1) {
            outcome.fail(format!("Name '{name}' is used by {count} items"));
            duplicates += 1;
        }

        if duplicates == 0 {
            outcome.message(format!("All {} item name(s) are unique", ctx.items().len()));
        }
        Ok(())
    }
}
