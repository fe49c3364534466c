//! Collects files from a folder into the context.

use crate::context::ExecutionContext;
use crate::core::{Item, ParameterKind, ParameterSpec, StageCategory, StageDescriptor, SYSTEM_HOST};
use crate::stages::{DescribedStage, Stage, StageOutcome, StageParameters};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// Appends one item per matching file; the payload is the file's `PathBuf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectFiles;

impl DescribedStage for CollectFiles {
    fn descriptor() -> StageDescriptor {
        StageDescriptor::new(SYSTEM_HOST, "collect_files", "Collect Files", StageCategory::Collect)
            .with_help("Collects files whose name matches a glob pattern.")
            .with_parameter(
                ParameterSpec::required("folder", ParameterKind::String)
                    .with_help("Folder to search."),
            )
            .with_parameter(
                ParameterSpec::new("pattern", ParameterKind::String, json!("*"))
                    .with_help("File name pattern; '*' matches any run, '?' one character."),
            )
            .with_parameter(
                ParameterSpec::new("recursive", ParameterKind::Boolean, json!(false))
                    .with_help("Descend into sub-folders."),
            )
    }
}

#[async_trait]
impl Stage for CollectFiles {
    async fn execute(
        &self,
        params: &StageParameters,
        ctx: &mut ExecutionContext,
        outcome: &mut StageOutcome,
    ) -> anyhow::Result<()> {
        let folder = PathBuf::from(params.str("folder")?);
        let pattern = params.str("pattern")?;
        let recursive = params.bool("recursive")?;

        if !folder.is_dir() {
            outcome.fail(format!("Folder '{}' does not exist", folder.display()));
            return Ok(());
        }

        let matcher = glob_to_regex(pattern)?;
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut collected = 0usize;

        for entry in WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("walking {}", folder.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if matcher.is_match(&name) {
                debug!(file = %entry.path().display(), "Collected file");
                ctx.push_item(Item::new(name, entry.into_path()));
                collected += 1;
            }
        }

        outcome.message(format!(
            "Collected {collected} file(s) matching '{pattern}' in '{}'",
            folder.display()
        ));
        Ok(())
    }
}

/// Translates a file name glob into an anchored regex.
fn glob_to_regex(pattern: &str) -> anyhow::Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).with_context(|| format!("invalid pattern '{pattern}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::fs;

    fn params(value: serde_json::Value) -> StageParameters {
        let supplied = value.as_object().cloned().unwrap_or_else(Map::new);
        StageParameters::new(CollectFiles::descriptor().bind(&supplied).unwrap())
    }

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("*.txt").unwrap();
        assert!(re.is_match("a.txt"));
        assert!(!re.is_match("a.txt.bak"));
        assert!(!re.is_match("atxt"));

        let re = glob_to_regex("shot_??.ma").unwrap();
        assert!(re.is_match("shot_01.ma"));
        assert!(!re.is_match("shot_1.ma"));
    }

    #[tokio::test]
    async fn test_collects_matching_files_flat() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("c.md"), "c").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("d.txt"), "d").unwrap();

        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();
        CollectFiles
            .execute(
                &params(json!({"folder": dir.path().to_str().unwrap(), "pattern": "*.txt"})),
                &mut ctx,
                &mut outcome,
            )
            .await
            .unwrap();

        assert!(!outcome.failed());
        assert_eq!(ctx.item_names(), vec!["a.txt", "b.txt"]);
        assert_eq!(
            ctx.items()[0].downcast_ref::<PathBuf>(),
            Some(&dir.path().join("a.txt"))
        );
    }

    #[tokio::test]
    async fn test_collects_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub").join("d.txt"), "d").unwrap();

        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();
        CollectFiles
            .execute(
                &params(json!({"folder": dir.path().to_str().unwrap(), "recursive": true})),
                &mut ctx,
                &mut outcome,
            )
            .await
            .unwrap();

        assert_eq!(ctx.item_names(), vec!["a.txt", "d.txt"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_reported_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let mut ctx = ExecutionContext::new();
        let mut outcome = StageOutcome::new();
        CollectFiles
            .execute(
                &params(json!({"folder": missing.to_str().unwrap()})),
                &mut ctx,
                &mut outcome,
            )
            .await
            .unwrap();

        assert!(outcome.failed());
        assert!(outcome.messages()[0].contains("does not exist"));
        assert!(ctx.items().is_empty());
    }
}
