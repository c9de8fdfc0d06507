//! Test lifecycle and suite reporting
//!
//! `run_test` drives one test end to end: construct the fixture scope,
//! execute the body under the overall budget, capture a diagnostic
//! screenshot when the outcome is not the expected one, then tear the
//! scope down. Teardown runs no matter how the body ended.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{HarnessError, Result};
use crate::fixtures::{FixtureRegistry, FixtureScope, Fixtures, PageFixture};

/// Expected outcome of a test body. Negative tests declare `Fail` so a
/// surprising pass is flagged (and screenshotted) just like a surprising
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Runner knobs shared by every test in a suite.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Overall budget for one test body; exceeding it cancels pending
    /// operations and forces teardown.
    pub test_timeout: Duration,

    /// Where failure screenshots are written.
    pub screenshot_dir: PathBuf,

    /// Fixture names to try, in order, when looking for a page to
    /// screenshot.
    pub page_fixtures: Vec<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            test_timeout: Duration::from_secs(120),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            page_fixtures: vec!["page".to_string(), "authenticated_page".to_string()],
        }
    }
}

/// Record of one executed test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub name: String,
    pub passed: bool,
    pub expected: Outcome,
    pub outcome_matched: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Aggregated results for a suite run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub reports: Vec<TestReport>,
}

impl SuiteReport {
    pub fn record(&mut self, report: TestReport) {
        self.total += 1;
        if report.outcome_matched {
            self.passed += 1;
            info!("✓ {} ({} ms)", report.name, report.duration_ms);
        } else {
            self.failed += 1;
            error!(
                "✗ {} - {}",
                report.name,
                report.error.as_deref().unwrap_or("unexpected outcome")
            );
        }
        self.duration_ms += report.duration_ms;
        self.reports.push(report);
    }

    pub fn all_matched(&self) -> bool {
        self.failed == 0
    }

    /// Write the aggregated report as JSON, returning its path.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("suite-report.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("suite report written to {}", path.display());
        Ok(path)
    }

    pub fn log_summary(&self) {
        info!(
            "suite finished: {} passed, {} failed, {} total ({} ms)",
            self.passed, self.failed, self.total, self.duration_ms
        );
    }
}

/// Execute one test: fixtures, body, diagnostics, teardown.
///
/// Fixture construction happens strictly before the body, teardown strictly
/// after, even when the body errors, panics, or exceeds the overall budget.
pub async fn run_test<F>(
    registry: &FixtureRegistry,
    options: &RunnerOptions,
    name: &str,
    wanted: &[&str],
    expected: Outcome,
    body: F,
) -> TestReport
where
    F: FnOnce(Fixtures) -> BoxFuture<'static, Result<()>>,
{
    let start = Instant::now();
    info!(test = %name, "running");

    let mut scope = match registry.build_scope(wanted).await {
        Ok(scope) => scope,
        Err(e) => {
            // Setup failures are never the expected way for a test to fail.
            return TestReport {
                name: name.to_string(),
                passed: false,
                expected,
                outcome_matched: false,
                duration_ms: start.elapsed().as_millis() as u64,
                error: Some(format!("fixture setup failed: {e}")),
                screenshot: None,
            };
        }
    };

    let result = {
        let bounded = tokio::time::timeout(
            options.test_timeout,
            std::panic::AssertUnwindSafe(body(scope.fixtures())).catch_unwind(),
        );
        match bounded.await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(HarnessError::Fixture(format!(
                "test body panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(HarnessError::timeout("test body", options.test_timeout)),
        }
    };

    let passed = result.is_ok();
    let outcome_matched = matches!(
        (expected, passed),
        (Outcome::Pass, true) | (Outcome::Fail, false)
    );

    let screenshot = if outcome_matched {
        None
    } else {
        capture_screenshot(&scope, options, name).await
    };

    scope.teardown().await;

    TestReport {
        name: name.to_string(),
        passed,
        expected,
        outcome_matched,
        duration_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|e| e.to_string()),
        screenshot,
    }
}

/// Best-effort full-page screenshot for an unexpected outcome. Failures are
/// logged and swallowed; diagnostics must not fail the test further.
async fn capture_screenshot(
    scope: &FixtureScope,
    options: &RunnerOptions,
    test_name: &str,
) -> Option<PathBuf> {
    let page = options
        .page_fixtures
        .iter()
        .find_map(|name| scope.get::<PageFixture>(name).ok())?;

    let bytes = match page.0.screenshot().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(test = %test_name, "screenshot capture failed: {e}");
            return None;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&options.screenshot_dir) {
        warn!("cannot create screenshot dir: {e}");
        return None;
    }
    let file_name: String = test_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let path = options.screenshot_dir.join(format!("{file_name}.png"));
    match std::fs::write(&path, bytes) {
        Ok(()) => {
            info!(test = %test_name, "failure screenshot: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!(test = %test_name, "cannot write screenshot: {e}");
            None
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::fixtures::Built;

    fn simple_registry() -> FixtureRegistry {
        let mut registry = FixtureRegistry::new();
        registry.register("answer", &[], |_| Box::pin(async { Ok(Built::new(42u32)) }));
        registry
    }

    fn options() -> RunnerOptions {
        RunnerOptions {
            test_timeout: Duration::from_millis(500),
            screenshot_dir: std::env::temp_dir().join("shopcheck-runner-tests"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn passing_body_matches_expected_pass() {
        let registry = simple_registry();
        let report = run_test(
            &registry,
            &options(),
            "answer is forty-two",
            &["answer"],
            Outcome::Pass,
            |fx| {
                Box::pin(async move {
                    assert_eq!(*fx.get::<u32>("answer")?, 42);
                    Ok(())
                })
            },
        )
        .await;

        assert!(report.passed);
        assert!(report.outcome_matched);
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn failing_body_matches_expected_fail() {
        let registry = simple_registry();
        let report = run_test(
            &registry,
            &options(),
            "expected failure",
            &["answer"],
            Outcome::Fail,
            |_| {
                Box::pin(async {
                    Err(HarnessError::assertion("thing", "a", "b"))
                })
            },
        )
        .await;

        assert!(!report.passed);
        assert!(report.outcome_matched);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn panicking_body_is_reported_not_propagated() {
        let registry = simple_registry();
        let report = run_test(
            &registry,
            &options(),
            "panicky",
            &["answer"],
            Outcome::Pass,
            |_| Box::pin(async { panic!("kaboom") }),
        )
        .await;

        assert!(!report.passed);
        assert!(!report.outcome_matched);
        assert!(report.error.unwrap().contains("kaboom"));
    }

    fn logging_registry(log: &Arc<Mutex<Vec<&'static str>>>) -> FixtureRegistry {
        let mut registry = FixtureRegistry::new();
        for (name, deps) in [("base", &[][..]), ("derived", &["base"][..])] {
            let log = log.clone();
            registry.register(name, deps, move |_| {
                let log = log.clone();
                Box::pin(async move {
                    Ok(Built::with_release((), move || {
                        Box::pin(async move { log.lock().push(name) })
                    }))
                })
            });
        }
        registry
    }

    #[tokio::test]
    async fn panicking_body_still_tears_down_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = logging_registry(&log);
        let report = run_test(
            &registry,
            &options(),
            "panicky with releases",
            &["derived"],
            Outcome::Pass,
            |_| Box::pin(async { panic!("kaboom") }),
        )
        .await;

        assert!(!report.passed);
        assert_eq!(*log.lock(), vec!["derived", "base"]);
    }

    #[tokio::test]
    async fn erroring_body_still_tears_down_every_fixture() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = logging_registry(&log);
        run_test(
            &registry,
            &options(),
            "erroring with releases",
            &["derived"],
            Outcome::Fail,
            |_| Box::pin(async { Err(HarnessError::Fixture("went wrong".to_string())) }),
        )
        .await;

        assert_eq!(*log.lock(), vec!["derived", "base"]);
    }

    #[tokio::test]
    async fn body_exceeding_the_budget_times_out() {
        let registry = simple_registry();
        let report = run_test(
            &registry,
            &options(),
            "sleeper",
            &["answer"],
            Outcome::Pass,
            |_| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                })
            },
        )
        .await;

        assert!(!report.passed);
        assert!(report.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn suite_report_aggregates() {
        let mut suite = SuiteReport::default();
        suite.record(TestReport {
            name: "a".into(),
            passed: true,
            expected: Outcome::Pass,
            outcome_matched: true,
            duration_ms: 5,
            error: None,
            screenshot: None,
        });
        suite.record(TestReport {
            name: "b".into(),
            passed: true,
            expected: Outcome::Fail,
            outcome_matched: false,
            duration_ms: 7,
            error: None,
            screenshot: None,
        });

        assert_eq!(suite.total, 2);
        assert_eq!(suite.passed, 1);
        assert_eq!(suite.failed, 1);
        assert!(!suite.all_matched());
    }
}
