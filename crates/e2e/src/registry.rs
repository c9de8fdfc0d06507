//! Standard fixture registry
//!
//! Every suite binary builds its scopes from this registry: configuration,
//! the browser capability, test data, the session cache, and page fixtures
//! (fresh and authenticated contexts). Dependencies are declared explicitly;
//! the registry resolves them and tears contexts down after each test.

use std::path::Path;
use std::sync::Arc;

use shopcheck_harness::auth::SessionCache;
use shopcheck_harness::config::{Role, TestEnvConfig};
use shopcheck_harness::data::{generate_random_user, load_fixed_users};
use shopcheck_harness::driver::Browser;
use shopcheck_harness::fixtures::{
    Built, BrowserFixture, FixtureRegistry, PageFixture,
};
use shopcheck_harness::pages::{LoginPage, PageToolkit};
use shopcheck_harness::PageDriver;

/// Fixed credential table shipped with the suite.
pub fn fixed_users_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/users.json"))
}

/// Build the registry shared by all storefront tests.
///
/// Fixture names and dependencies:
///
/// - `config`: the run configuration, read once
/// - `browser`: the browser capability ([`BrowserFixture`])
/// - `random_user`: a fresh synthetic registration payload
/// - `fixed_users`: the checked-in credential table
/// - `session_cache`: per-role snapshot cache rooted at the configured dir
/// - `page`: a fresh, unauthenticated context ([`PageFixture`]), closed at
///   teardown
/// - `login_page`: a [`LoginPage`] over the `page` fixture
/// - `authenticated_page`: a context signed in as [`Role::User`] via the
///   session cache, closed at teardown
pub fn standard_registry(
    config: Arc<TestEnvConfig>,
    browser: Arc<dyn Browser>,
) -> FixtureRegistry {
    let mut registry = FixtureRegistry::new();

    let cfg = config.clone();
    registry.register("config", &[], move |_| {
        let cfg = cfg.clone();
        Box::pin(async move { Ok(Built::new((*cfg).clone())) })
    });

    let b = browser.clone();
    registry.register("browser", &[], move |_| {
        let b = b.clone();
        Box::pin(async move { Ok(Built::new(BrowserFixture(b))) })
    });

    registry.register("random_user", &[], |_| {
        Box::pin(async { Ok(Built::new(generate_random_user())) })
    });

    registry.register("fixed_users", &[], |_| {
        Box::pin(async { Ok(Built::new(load_fixed_users(fixed_users_path())?)) })
    });

    registry.register("session_cache", &["config"], |fx| {
        Box::pin(async move {
            let config = fx.get::<TestEnvConfig>("config")?;
            Ok(Built::new(SessionCache::from_config(&config)))
        })
    });

    registry.register("page", &["browser"], |fx| {
        Box::pin(async move {
            let browser = fx.get::<BrowserFixture>("browser")?;
            let driver: Arc<dyn PageDriver> = Arc::from(browser.0.context(None).await?);
            let handle = driver.clone();
            Ok(Built::with_release(PageFixture(driver), move || {
                Box::pin(async move {
                    if let Err(e) = handle.close().await {
                        tracing::warn!("closing page context failed: {e}");
                    }
                })
            }))
        })
    });

    registry.register("login_page", &["page", "config"], |fx| {
        Box::pin(async move {
            let page = fx.get::<PageFixture>("page")?;
            let config = fx.get::<TestEnvConfig>("config")?;
            Ok(Built::new(LoginPage::new(PageToolkit::new(
                page.0.clone(),
                &config,
            ))))
        })
    });

    registry.register(
        "authenticated_page",
        &["browser", "config", "session_cache"],
        |fx| {
            Box::pin(async move {
                let browser = fx.get::<BrowserFixture>("browser")?;
                let config = fx.get::<TestEnvConfig>("config")?;
                let cache = fx.get::<SessionCache>("session_cache")?;
                let driver = cache
                    .acquire(Role::User, browser.0.as_ref(), &config)
                    .await?;
                let handle = driver.clone();
                Ok(Built::with_release(PageFixture(driver), move || {
                    Box::pin(async move {
                        if let Err(e) = handle.close().await {
                            tracing::warn!("closing authenticated context failed: {e}");
                        }
                    })
                }))
            })
        },
    );

    registry
}
