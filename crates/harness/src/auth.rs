//! Authentication session cache
//!
//! Reusing a serialized browser session amortizes the full login UI flow
//! (page loads, form fills, a server round trip) across every test that
//! needs to be authenticated. One snapshot file per role; a snapshot is
//! reused while younger than the configured max age and replaced atomically
//! after a fresh login otherwise.
//!
//! No lock is taken on the snapshot files: concurrent readers each load an
//! independent in-memory context, and a refresher racing readers is an
//! accepted bounded inconsistency for a test harness.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Role, TestEnvConfig};
use crate::driver::{Browser, PageDriver, StorageState};
use crate::error::{HarnessError, Result};
use crate::pages::{selectors as sel, LoginPage, PageToolkit};

/// Budget for the best-effort logged-in heuristic.
const HEURISTIC_BUDGET: Duration = Duration::from_secs(2);

/// Classification of the on-disk snapshot for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    Missing,
    Fresh,
    Stale,
}

/// Per-role session snapshot cache.
///
/// The cache owns the snapshot files: it is the only component that writes
/// or deletes them.
pub struct SessionCache {
    dir: PathBuf,
    max_age: Duration,
}

impl SessionCache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    pub fn from_config(config: &TestEnvConfig) -> Self {
        Self::new(&config.session_dir, config.session_max_age)
    }

    /// Snapshot file for a role: `<dir>/<role>.json`.
    pub fn snapshot_path(&self, role: Role) -> PathBuf {
        self.dir.join(format!("{role}.json"))
    }

    /// Age of the snapshot, if one exists.
    pub fn snapshot_age(&self, role: Role) -> Option<Duration> {
        let modified = std::fs::metadata(self.snapshot_path(role))
            .ok()?
            .modified()
            .ok()?;
        // A clock step can put mtime in the future; treat that as age zero.
        Some(modified.elapsed().unwrap_or(Duration::ZERO))
    }

    pub fn status(&self, role: Role) -> SnapshotStatus {
        match self.snapshot_age(role) {
            None => SnapshotStatus::Missing,
            Some(age) if age < self.max_age => SnapshotStatus::Fresh,
            Some(_) => SnapshotStatus::Stale,
        }
    }

    /// Produce an authenticated context for `role`.
    ///
    /// Fast path: a fresh snapshot seeds a new context directly, with no
    /// login navigation at all. Otherwise a fresh context is driven through
    /// the full login flow and the resulting storage state atomically
    /// replaces any prior snapshot. A snapshot that exists but cannot be
    /// read is discarded and replaced the same way. A failed login surfaces as
    /// [`HarnessError::Authentication`] and writes nothing.
    pub async fn acquire(
        &self,
        role: Role,
        browser: &dyn Browser,
        config: &TestEnvConfig,
    ) -> Result<Arc<dyn PageDriver>> {
        if self.status(role) == SnapshotStatus::Fresh {
            match self.load_snapshot(role) {
                Ok(state) => {
                    let driver: Arc<dyn PageDriver> =
                        Arc::from(browser.context(Some(&state)).await?);
                    info!(%role, "reusing cached session snapshot");
                    return Ok(driver);
                }
                // An unreadable snapshot is no better than a missing one:
                // drop it and fall through to the login flow.
                Err(e) => {
                    warn!(%role, "discarding unreadable session snapshot: {e}");
                    self.clear(role)?;
                }
            }
        }

        let creds = config.require_credentials(role)?;
        debug!(%role, "no fresh snapshot, performing login flow");

        let driver: Arc<dyn PageDriver> = Arc::from(browser.context(None).await?);
        let login = LoginPage::new(PageToolkit::new(driver.clone(), config));
        login.open().await?;
        login
            .login(&creds, false)
            .await
            .map_err(|e| HarnessError::Authentication {
                role: role.to_string(),
                reason: e.to_string(),
            })?;

        let state = driver.storage_state().await?;
        self.persist(role, &state)?;
        info!(%role, path = %self.snapshot_path(role).display(), "session snapshot saved");
        Ok(driver)
    }

    /// Delete the snapshot for a role. Idempotent: an absent file is fine.
    pub fn clear(&self, role: Role) -> Result<()> {
        match std::fs::remove_file(self.snapshot_path(role)) {
            Ok(()) => {
                debug!(%role, "session snapshot cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear then re-acquire, forcing a fresh login regardless of age.
    pub async fn force_refresh(
        &self,
        role: Role,
        browser: &dyn Browser,
        config: &TestEnvConfig,
    ) -> Result<Arc<dyn PageDriver>> {
        self.clear(role)?;
        self.acquire(role, browser, config).await
    }

    /// Best-effort logged-in check: is a logout control visible within a
    /// short budget? Ambiguity and driver errors both answer `false`; this
    /// is observability, not correctness.
    pub async fn is_authenticated(page: &PageToolkit) -> bool {
        let check = page.driver().is_visible(sel::LOGOUT_BUTTON);
        match tokio::time::timeout(HEURISTIC_BUDGET, check).await {
            Ok(Ok(visible)) => visible,
            Ok(Err(e)) => {
                warn!("is_authenticated heuristic errored: {e}");
                false
            }
            Err(_) => false,
        }
    }

    fn load_snapshot(&self, role: Role) -> Result<StorageState> {
        let bytes = std::fs::read(self.snapshot_path(role))?;
        StorageState::from_slice(&bytes)
    }

    /// Write the snapshot next to its final location and rename into place,
    /// so a snapshot is never observable partially written.
    fn persist(&self, role: Role, state: &StorageState) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), state.to_vec()?)?;
        tmp.persist(self.snapshot_path(role))
            .map_err(|e| HarnessError::Io(e.error))?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("dir", &self.dir)
            .field("max_age", &self.max_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use serde_json::json;

    fn cache(dir: &Path, max_age: Duration) -> SessionCache {
        SessionCache::new(dir, max_age)
    }

    #[test]
    fn status_reflects_the_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(60));

        assert_eq!(cache.status(Role::User), SnapshotStatus::Missing);

        cache
            .persist(Role::User, &StorageState::new(json!({"cookies": []})))
            .unwrap();
        assert_eq!(cache.status(Role::User), SnapshotStatus::Fresh);

        // Zero max-age classifies any existing snapshot as stale.
        let strict = SessionCache::new(dir.path(), Duration::ZERO);
        assert_eq!(strict.status(Role::User), SnapshotStatus::Stale);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(60));

        cache.clear(Role::Admin).unwrap();
        cache
            .persist(Role::Admin, &StorageState::new(json!({"cookies": []})))
            .unwrap();
        cache.clear(Role::Admin).unwrap();
        cache.clear(Role::Admin).unwrap();
        assert_eq!(cache.status(Role::Admin), SnapshotStatus::Missing);
    }

    #[test]
    fn snapshot_paths_are_per_role() {
        let cache = cache(Path::new("/tmp/x"), Duration::from_secs(1));
        let paths: Vec<_> = Role::ALL.iter().map(|r| cache.snapshot_path(*r)).collect();
        assert_eq!(paths[0], Path::new("/tmp/x/user.json"));
        assert_eq!(paths[1], Path::new("/tmp/x/admin.json"));
        assert_eq!(paths[2], Path::new("/tmp/x/guest.json"));
    }

    #[test]
    fn persist_replaces_rather_than_appends() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Duration::from_secs(60));

        cache
            .persist(Role::User, &StorageState::new(json!({"v": 1})))
            .unwrap();
        cache
            .persist(Role::User, &StorageState::new(json!({"v": 2})))
            .unwrap();

        let raw = std::fs::read_to_string(cache.snapshot_path(Role::User)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["v"], 2);
    }
}
