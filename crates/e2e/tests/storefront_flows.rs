//! End-to-end storefront flows on the simulated driver.
//!
//! Runs the real scenario table through the real runner, exactly as the
//! `e2e` binary does, plus a few lifecycle checks that need a controlled
//! failure.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use shopcheck_e2e::registry::standard_registry;
use shopcheck_e2e::scenarios::all_scenarios;
use shopcheck_harness::auth::SessionCache;
use shopcheck_harness::config::{Role, TestEnvConfig};
use shopcheck_harness::driver::sim::{SimBrowser, SimServer};
use shopcheck_harness::driver::Browser;
use shopcheck_harness::error::HarnessError;
use shopcheck_harness::fixtures::{FixtureRegistry, PageFixture};
use shopcheck_harness::pages::PageToolkit;
use shopcheck_harness::runner::{run_test, Outcome, RunnerOptions, SuiteReport};

const EMAIL: &str = "qa.shopper@example.com";
const PASSWORD: &str = "Fj7!kq2Rw9xZ#mA4";

static CREDS_ENV: Lazy<()> = Lazy::new(|| {
    std::env::set_var("USER_EMAIL", EMAIL);
    std::env::set_var("USER_PASSWORD", PASSWORD);
});

struct Setup {
    registry: FixtureRegistry,
    options: RunnerOptions,
    _dir: tempfile::TempDir,
}

fn setup() -> Setup {
    Lazy::force(&CREDS_ENV);
    let dir = tempfile::tempdir().unwrap();
    let config = TestEnvConfig {
        session_dir: dir.path().join("sessions"),
        timeout: Duration::from_millis(500),
        ..TestEnvConfig::default()
    };
    let server = SimServer::new();
    server.add_account(EMAIL, PASSWORD, "QA Shopper");
    let browser: Arc<dyn Browser> =
        Arc::new(SimBrowser::new(server, config.base_url.clone()));
    let options = RunnerOptions {
        test_timeout: Duration::from_secs(10),
        screenshot_dir: dir.path().join("screenshots"),
        ..Default::default()
    };
    Setup {
        registry: standard_registry(Arc::new(config), browser),
        options,
        _dir: dir,
    }
}

#[tokio::test]
async fn the_full_scenario_table_matches_expectations() {
    let s = setup();
    let mut suite = SuiteReport::default();
    for scenario in all_scenarios() {
        let report = run_test(
            &s.registry,
            &s.options,
            scenario.name,
            scenario.fixtures,
            scenario.expected,
            scenario.run,
        )
        .await;
        suite.record(report);
    }

    assert!(
        suite.all_matched(),
        "unexpected outcomes: {:?}",
        suite
            .reports
            .iter()
            .filter(|r| !r.outcome_matched)
            .map(|r| (&r.name, &r.error))
            .collect::<Vec<_>>()
    );
    assert_eq!(suite.total, all_scenarios().len());
}

#[tokio::test]
async fn an_unexpected_outcome_captures_a_screenshot() {
    let s = setup();
    let report = run_test(
        &s.registry,
        &s.options,
        "deliberate mismatch",
        &["page", "config"],
        Outcome::Pass,
        |fx| {
            Box::pin(async move {
                let page = fx.get::<PageFixture>("page")?;
                let config = fx.get::<TestEnvConfig>("config")?;
                page.0.goto(&config.url("/")).await?;
                Err(HarnessError::assertion("storefront", "broken", "working"))
            })
        },
    )
    .await;

    assert!(!report.outcome_matched);
    let path = report.screenshot.expect("screenshot captured");
    assert!(path.exists());
    let bytes = std::fs::read(path).unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn an_expected_failure_captures_nothing() {
    let s = setup();
    let report = run_test(
        &s.registry,
        &s.options,
        "expected failure",
        &["page", "config"],
        Outcome::Fail,
        |fx| {
            Box::pin(async move {
                let _ = fx.get::<PageFixture>("page")?;
                Err(HarnessError::assertion("storefront", "broken", "working"))
            })
        },
    )
    .await;

    assert!(report.outcome_matched);
    assert!(report.screenshot.is_none());
}

#[tokio::test]
async fn the_authenticated_fixture_passes_the_heuristic() {
    let s = setup();
    let mut scope = s
        .registry
        .build_scope(&["authenticated_page", "config"])
        .await
        .unwrap();

    let page = scope.get::<PageFixture>("authenticated_page").unwrap();
    let config = scope.get::<TestEnvConfig>("config").unwrap();
    let ui = PageToolkit::new(page.0.clone(), &config);
    ui.navigate("/").await.unwrap();
    assert!(SessionCache::is_authenticated(&ui).await);

    // A fresh context on the same browser is not signed in.
    let fresh = scope.get::<PageFixture>("page").ok();
    assert!(fresh.is_none(), "page fixture was not requested");
    scope.teardown().await;
}

#[tokio::test]
async fn a_fresh_context_fails_the_heuristic() {
    let s = setup();
    let scope = s.registry.build_scope(&["page", "config"]).await.unwrap();
    let page = scope.get::<PageFixture>("page").unwrap();
    let config = scope.get::<TestEnvConfig>("config").unwrap();
    let ui = PageToolkit::new(page.0.clone(), &config);
    ui.navigate("/").await.unwrap();
    assert!(!SessionCache::is_authenticated(&ui).await);
}

#[tokio::test]
async fn suite_report_round_trips_through_json() {
    let s = setup();
    let mut suite = SuiteReport::default();
    let scenarios = all_scenarios();
    let scenario = &scenarios[0];
    let report = run_test(
        &s.registry,
        &s.options,
        scenario.name,
        scenario.fixtures,
        scenario.expected,
        scenario.run,
    )
    .await;
    suite.record(report);

    let dir = tempfile::tempdir().unwrap();
    let path = suite.write_json(dir.path()).unwrap();
    let raw = std::fs::read_to_string(path).unwrap();
    let parsed: SuiteReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.total, suite.total);
    assert_eq!(parsed.reports[0].name, suite.reports[0].name);
}

#[tokio::test]
async fn role_credentials_resolve_from_the_environment() {
    Lazy::force(&CREDS_ENV);
    let config = TestEnvConfig::default();
    let creds = config.require_credentials(Role::User).unwrap();
    assert_eq!(creds.email, EMAIL);
    assert!(config.require_credentials(Role::Guest).is_err());
}
