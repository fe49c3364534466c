//! Assertions over run reports.

use crate::pipeline::{RunReport, StageRecord};

fn record<'a>(report: &'a RunReport, stage: &str) -> &'a StageRecord {
    report.stage(stage).unwrap_or_else(|| {
        panic!(
            "Expected stage '{stage}' to have executed. Executed: {:?}",
            executed_names(report)
        )
    })
}

fn executed_names(report: &RunReport) -> Vec<&str> {
    report.stages.iter().map(|r| r.name.as_str()).collect()
}

/// Asserts that the run succeeded.
pub fn assert_run_succeeded(report: &RunReport) {
    assert!(
        report.succeeded,
        "Expected run to succeed, but it failed: {:?}",
        report.messages()
    );
}

/// Asserts that the run failed.
pub fn assert_run_failed(report: &RunReport) {
    assert!(!report.succeeded, "Expected run to fail, but it succeeded");
}

/// Asserts exactly which stages executed, in order.
pub fn assert_executed(report: &RunReport, expected: &[&str]) {
    assert_eq!(
        executed_names(report),
        expected,
        "Unexpected executed stages"
    );
}

/// Asserts that a failed stage halted the run at `position`.
pub fn assert_halted_at(report: &RunReport, position: usize) {
    assert_eq!(
        report.halted_at,
        Some(position),
        "Expected run to halt at position {position}"
    );
}

/// Asserts that `stage` executed and reported failure.
pub fn assert_stage_failed(report: &RunReport, stage: &str) {
    assert!(
        record(report, stage).failed,
        "Expected stage '{stage}' to fail"
    );
}

/// Asserts that `stage` executed and produced `message`.
pub fn assert_stage_message(report: &RunReport, stage: &str, message: &str) {
    let messages = &record(report, stage).messages;
    assert!(
        messages.iter().any(|m| m == message),
        "Expected stage '{stage}' to report '{message}'. Messages: {messages:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageCategory;
    use chrono::Utc;
    use uuid::Uuid;

    fn report(failed: bool) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            pipeline: "checks".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            stages: vec![StageRecord {
                position: 0,
                name: "check_unique_names".to_string(),
                host: "system".to_string(),
                label: "Check Unique Names".to_string(),
                category: StageCategory::Check,
                failed,
                faulted: false,
                messages: vec!["Name 'a.txt' is used by 2 items".to_string()],
                duration_ms: 0.5,
            }],
            succeeded: !failed,
            halted_at: failed.then_some(0),
        }
    }

    #[test]
    fn test_failed_report_assertions() {
        let report = report(true);
        assert_run_failed(&report);
        assert_halted_at(&report, 0);
        assert_executed(&report, &["check_unique_names"]);
        assert_stage_failed(&report, "check_unique_names");
        assert_stage_message(&report, "check_unique_names", "Name 'a.txt' is used by 2 items");
    }

    #[test]
    #[should_panic(expected = "Expected run to succeed")]
    fn test_assert_run_succeeded_fails() {
        assert_run_succeeded(&report(true));
    }

    #[test]
    #[should_panic(expected = "to have executed")]
    fn test_assert_on_missing_stage() {
        assert_stage_failed(&report(false), "collect_files");
    }
}
