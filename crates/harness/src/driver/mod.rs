//! Browser capability as a trait seam
//!
//! The harness consumes a browser, it does not implement one. [`Browser`]
//! produces browsing contexts (optionally seeded from a serialized session
//! snapshot) and [`PageDriver`] is one context's page surface. Two
//! implementations ship here: [`playwright`] drives a persistent Playwright
//! sidecar process, [`sim`] is an in-memory storefront used by the suite's
//! own tests.

pub mod playwright;
pub mod sim;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Serialized browser-context state (cookies + origin storage) for one role.
///
/// Opaque to the harness beyond existence and age: whatever the driver's
/// storage-state serialization produces is stored and replayed verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageState(serde_json::Value);

impl StorageState {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.0)?)
    }
}

/// Factory for browsing contexts.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new browsing context, optionally restoring a previously
    /// serialized session snapshot.
    async fn context(&self, storage: Option<&StorageState>) -> Result<Box<dyn PageDriver>>;
}

/// One browsing context's page surface.
///
/// Every method is a suspension point with a bounded wait; exceeding the
/// budget surfaces as [`crate::HarnessError::Timeout`] naming the element or
/// condition, never as a hang.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Resolve once both the DOM-ready and network-idle signals have fired,
    /// racing the budget so one stalled background request cannot hang a
    /// test.
    async fn wait_for_load(&self, budget: Duration) -> Result<()>;

    async fn scroll_into_view(&self, selector: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<()>;

    async fn press(&self, selector: &str, key: &str) -> Result<()>;

    async fn is_visible(&self, selector: &str) -> Result<bool>;

    async fn is_enabled(&self, selector: &str) -> Result<bool>;

    async fn is_checked(&self, selector: &str) -> Result<bool>;

    async fn inner_text(&self, selector: &str) -> Result<String>;

    async fn input_value(&self, selector: &str) -> Result<String>;

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Full-page screenshot as encoded image bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Serialize this context's cookies and origin storage.
    async fn storage_state(&self) -> Result<StorageState>;

    async fn close(&self) -> Result<()>;
}
