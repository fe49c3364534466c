//! The reported outcome of a stage execution.

use serde::{Deserialize, Serialize};

/// Messages and the failure flag accumulated while a stage executes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    failed: bool,
    messages: Vec<String>,
}

impl StageOutcome {
    /// Creates an empty, successful outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Marks the stage as failed and appends a message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failed = true;
        self.messages.push(message.into());
    }

    /// Marks the stage as failed without a message.
    pub fn set_failed(&mut self) {
        self.failed = true;
    }

    /// Returns true if the stage reported a failure.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Consumes the outcome, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.failed, self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_default_succeeds() {
        let outcome = StageOutcome::new();
        assert!(!outcome.failed());
        assert!(outcome.messages().is_empty());
    }

    #[test]
    fn test_fail_keeps_message_order() {
        let mut outcome = StageOutcome::new();
        outcome.message("checked 3 items");
        outcome.fail("'a.txt' is used by 2 items");

        assert!(outcome.failed());
        let (failed, messages) = outcome.into_parts();
        assert!(failed);
        assert_eq!(messages, vec!["checked 3 items", "'a.txt' is used by 2 items"]);
    }

    #[test]
    fn test_set_failed_without_message() {
        let mut outcome = StageOutcome::new();
        outcome.set_failed();
        assert!(outcome.failed());
        assert!(outcome.messages().is_empty());
    }
}
