//! Run configuration read once from the environment
//!
//! The configuration is an immutable value built at process start and shared
//! by `Arc`. Components receive it explicitly instead of reaching for a
//! global. Re-initialization mid-run is deliberately unsupported.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::mask_sensitive;
use crate::error::{HarnessError, Result};

/// Identity class under test. Determines which credential pair and which
/// cached session snapshot apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Guest,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::Guest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }

    /// Prefix for the `<ROLE>_EMAIL` / `<ROLE>_PASSWORD` variables.
    fn env_prefix(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Guest => "GUEST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An email/password pair for one role.
///
/// Immutable once read. The `Debug` impl masks the password so credentials
/// never reach logs in cleartext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &mask_sensitive(&self.password, 0))
            .finish()
    }
}

/// Process-wide run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEnvConfig {
    /// Environment profile name (`TEST_ENV`)
    pub env_name: String,

    /// Application base URL (`BASE_URL`)
    pub base_url: String,

    /// API base URL (`API_URL`)
    pub api_url: String,

    /// Per-interaction wait budget (`TIMEOUT`, milliseconds)
    pub timeout: Duration,

    /// Runner-level retry count (`RETRIES`)
    pub retries: u32,

    /// Directory holding per-role session snapshots (`SESSION_DIR`)
    pub session_dir: PathBuf,

    /// Maximum snapshot age before re-authentication (`SESSION_MAX_AGE_SECS`)
    pub session_max_age: Duration,
}

impl Default for TestEnvConfig {
    fn default() -> Self {
        Self {
            env_name: "local".to_string(),
            base_url: "http://127.0.0.1:8080".to_string(),
            api_url: "http://127.0.0.1:8080/api".to_string(),
            timeout: Duration::from_millis(10_000),
            retries: 1,
            session_dir: PathBuf::from(".shopcheck-sessions"),
            session_max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl TestEnvConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset. Unparseable numeric values are an error
    /// rather than a silent default; a typo'd `TIMEOUT` should not quietly
    /// become ten seconds.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let base_url = env::var("BASE_URL").unwrap_or(defaults.base_url);
        let api_url = env::var("API_URL").unwrap_or_else(|_| format!("{}/api", base_url.trim_end_matches('/')));

        Ok(Self {
            env_name: env::var("TEST_ENV").unwrap_or(defaults.env_name),
            base_url,
            api_url,
            timeout: Duration::from_millis(parse_env("TIMEOUT", 10_000)?),
            retries: parse_env("RETRIES", defaults.retries)?,
            session_dir: env::var("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            session_max_age: Duration::from_secs(parse_env(
                "SESSION_MAX_AGE_SECS",
                defaults.session_max_age.as_secs(),
            )?),
        })
    }

    /// Resolve credentials for a role from `<ROLE>_EMAIL` / `<ROLE>_PASSWORD`.
    ///
    /// Missing variables yield empty strings; callers that need non-empty
    /// credentials use [`TestEnvConfig::require_credentials`].
    pub fn credentials(&self, role: Role) -> Credentials {
        let prefix = role.env_prefix();
        Credentials {
            email: env::var(format!("{prefix}_EMAIL")).unwrap_or_default(),
            password: env::var(format!("{prefix}_PASSWORD")).unwrap_or_default(),
        }
    }

    /// Strict variant of [`TestEnvConfig::credentials`]: both variables must
    /// be set and non-empty.
    pub fn require_credentials(&self, role: Role) -> Result<Credentials> {
        let creds = self.credentials(role);
        if !creds.is_complete() {
            return Err(HarnessError::Configuration(format!(
                "missing {}_EMAIL / {}_PASSWORD for role '{}'",
                role.env_prefix(),
                role.env_prefix(),
                role
            )));
        }
        Ok(creds)
    }

    /// Resolve a path against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            HarnessError::Configuration(format!("invalid {name}: {raw:?} is not a valid number"))
        }),
        Err(_) => Ok(default),
    }
}
