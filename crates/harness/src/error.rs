//! Error types for the harness

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`HarnessError`]
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Harness error taxonomy
///
/// Everything here propagates to the test body uncaught; the only soft-fail
/// paths are the failure-screenshot capture and the `is_authenticated`
/// heuristic, which swallow errors themselves.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed for role '{role}': {reason}")]
    Authentication { role: String, reason: String },

    #[error("timed out after {budget_ms}ms waiting for: {what}")]
    Timeout { what: String, budget_ms: u64 },

    #[error("test data file not found: {}", path.display())]
    DataNotFound { path: PathBuf },

    #[error("assertion failed on '{subject}': expected {expected}, got {actual}")]
    Assertion {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("driver error: {0}")]
    Driver(String),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Build a timeout error from a budget and a description of what was
    /// being waited for.
    pub fn timeout(what: impl Into<String>, budget: std::time::Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            budget_ms: budget.as_millis() as u64,
        }
    }

    /// Build an assertion error with expected/actual context.
    pub fn assertion(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
