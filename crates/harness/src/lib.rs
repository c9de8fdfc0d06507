//! Shopcheck E2E harness
//!
//! Building blocks for browser end-to-end suites against the storefront:
//!
//! - [`config`]: environment-derived, immutable run configuration
//! - [`data`]: synthetic and fixed test data
//! - [`driver`]: the browser capability as a trait seam, with a
//!   Playwright sidecar implementation and an in-memory simulator
//! - [`pages`]: page objects built on a shared interaction toolkit
//! - [`auth`]: per-role session snapshot cache
//! - [`fixtures`]: named, dependency-resolved, test-scoped resources
//! - [`runner`]: test lifecycle, diagnostics and suite reporting
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       test body                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  fixtures::FixtureRegistry / FixtureScope                │
//! │    ├── config        (TestEnvConfig, read once)          │
//! │    ├── browser       (dyn Browser)                       │
//! │    ├── page          (fresh context)                     │
//! │    └── authenticated_page                                │
//! │          └── auth::SessionCache (snapshot per role)      │
//! ├──────────────────────────────────────────────────────────┤
//! │  pages::PageToolkit + LoginPage / HomePage / ...         │
//! ├──────────────────────────────────────────────────────────┤
//! │  driver::PageDriver  (playwright sidecar | sim)          │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod pages;
pub mod runner;

pub use auth::{SessionCache, SnapshotStatus};
pub use config::{Credentials, Role, TestEnvConfig};
pub use data::UserTestData;
pub use driver::{Browser, PageDriver, StorageState};
pub use error::{HarnessError, Result};
pub use fixtures::{Built, BrowserFixture, FixtureRegistry, FixtureScope, Fixtures, PageFixture};
pub use runner::{run_test, Outcome, RunnerOptions, SuiteReport, TestReport};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
