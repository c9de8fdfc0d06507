//! Shared page-interaction toolkit

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::config::TestEnvConfig;
use crate::driver::PageDriver;
use crate::error::{HarnessError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Navigation, waiting and verification primitives shared by all page
/// objects. Concrete pages hold a toolkit rather than inheriting from a
/// base class.
#[derive(Clone)]
pub struct PageToolkit {
    driver: Arc<dyn PageDriver>,
    base_url: String,
    timeout: Duration,
}

impl PageToolkit {
    pub fn new(driver: Arc<dyn PageDriver>, config: &TestEnvConfig) -> Self {
        Self {
            driver,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        }
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `path` against the base URL, navigate, and wait for the
    /// load-complete signal.
    pub async fn navigate(&self, path: &str) -> Result<()> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "navigate");
        self.bounded(format!("navigation to {url}"), self.driver.goto(&url))
            .await?;
        self.wait_for_load_complete().await
    }

    /// DOM-ready plus network-idle, racing the configured budget.
    pub async fn wait_for_load_complete(&self) -> Result<()> {
        self.driver.wait_for_load(self.timeout).await
    }

    /// Current URL path relative to the base URL.
    pub async fn current_path(&self) -> Result<String> {
        let url = self.driver.current_url().await?;
        Ok(match url.strip_prefix(&self.base_url) {
            Some("") => "/".to_string(),
            Some(path) => path.to_string(),
            None => url,
        })
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.bounded(format!("click {selector}"), async {
            self.driver.scroll_into_view(selector).await?;
            self.driver.click(selector).await
        })
        .await
    }

    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.bounded(format!("fill {selector}"), async {
            self.driver.scroll_into_view(selector).await?;
            self.driver.fill(selector, value).await
        })
        .await
    }

    pub async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.bounded(format!("select {selector}"), async {
            self.driver.scroll_into_view(selector).await?;
            self.driver.select_option(selector, value).await
        })
        .await
    }

    pub async fn set_checked(&self, selector: &str, checked: bool) -> Result<()> {
        self.bounded(format!("check {selector}"), async {
            self.driver.scroll_into_view(selector).await?;
            self.driver.set_checked(selector, checked).await
        })
        .await
    }

    /// Poll until the current path no longer starts with `away_from`, the
    /// post-navigation success signal for flows like login.
    pub async fn wait_for_path_change(&self, away_from: &str) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let path = self.current_path().await?;
            if !path.starts_with(away_from) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::timeout(
                    format!("URL to leave {away_from}"),
                    self.timeout,
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until the element is visible.
    pub async fn wait_for_visible(&self, selector: &str) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.driver.is_visible(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::timeout(
                    format!("{selector} to become visible"),
                    self.timeout,
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn verify_visible(&self, selector: &str) -> Result<()> {
        if self.driver.is_visible(selector).await? {
            Ok(())
        } else {
            Err(HarnessError::assertion(selector, "visible", "not visible"))
        }
    }

    pub async fn verify_enabled(&self, selector: &str) -> Result<()> {
        if self.driver.is_enabled(selector).await? {
            Ok(())
        } else {
            Err(HarnessError::assertion(selector, "enabled", "disabled"))
        }
    }

    pub async fn verify_text(&self, selector: &str, expected: &str) -> Result<()> {
        let actual = self.driver.inner_text(selector).await?;
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::assertion(
                selector,
                format!("text {expected:?}"),
                format!("{actual:?}"),
            ))
        }
    }

    pub async fn verify_value(&self, selector: &str, expected: &str) -> Result<()> {
        let actual = self.driver.input_value(selector).await?;
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::assertion(
                selector,
                format!("value {expected:?}"),
                format!("{actual:?}"),
            ))
        }
    }

    /// Race a driver interaction against the configured budget.
    async fn bounded<T>(
        &self,
        what: String,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::timeout(what, self.timeout)),
        }
    }
}
