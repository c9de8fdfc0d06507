//! Fixture composition
//!
//! Named, lazily-constructed, test-scoped resources. A registry maps fixture
//! names to factories with explicitly declared dependencies (no reflection);
//! resolving a requested set computes the dependency closure, builds each
//! fixture at most once in dependency order, and tears everything down in
//! reverse construction order after the test body, unconditionally.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::driver::{Browser, PageDriver};
use crate::error::{HarnessError, Result};

/// Grace budget for a single release action. A stuck release must not hang
/// the whole suite.
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// A constructed fixture value, stored type-erased and memoized per scope.
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

/// Wrap a concrete value for storage in a scope.
pub fn value<T: Send + Sync + 'static>(inner: T) -> FixtureValue {
    Arc::new(inner)
}

/// Type-erased wrapper for the browser capability fixture. Trait objects
/// cannot be stored as `dyn Any` directly, so the registry stores this.
#[derive(Clone)]
pub struct BrowserFixture(pub Arc<dyn Browser>);

/// Type-erased wrapper for a page-driver fixture (fresh or authenticated
/// context).
#[derive(Clone)]
pub struct PageFixture(pub Arc<dyn PageDriver>);

type Release = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;
type Factory = Arc<dyn Fn(Fixtures) -> BoxFuture<'static, Result<Built>> + Send + Sync>;

/// What a factory hands back: the fixture value, plus a release action if
/// the fixture acquired a releasable resource (a context, a page).
pub struct Built {
    value: FixtureValue,
    release: Option<Release>,
}

impl Built {
    pub fn new<T: Send + Sync + 'static>(inner: T) -> Self {
        Self {
            value: value(inner),
            release: None,
        }
    }

    /// A fixture whose resource must be released at teardown. Releases run
    /// in reverse construction order, so a dependent resource goes before
    /// what it depends on.
    pub fn with_release<T, F>(inner: T, release: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        Self {
            value: value(inner),
            release: Some(Box::new(release)),
        }
    }
}

/// Read-only view of the fixtures constructed so far. Factories receive one
/// to fetch their declared dependencies; test bodies receive one for the
/// full scope.
#[derive(Clone, Default)]
pub struct Fixtures {
    values: Arc<HashMap<String, FixtureValue>>,
}

impl Fixtures {
    /// Fetch a constructed fixture by name, downcast to its concrete type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.values.get(name).ok_or_else(|| {
            HarnessError::Fixture(format!("fixture '{name}' was not constructed in this scope"))
        })?;
        value.clone().downcast::<T>().map_err(|_| {
            HarnessError::Fixture(format!("fixture '{name}' does not have the requested type"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

struct Registration {
    deps: Vec<String>,
    build: Factory,
}

/// Registry of named fixture factories with explicit dependency lists.
#[derive(Default)]
pub struct FixtureRegistry {
    factories: HashMap<String, Registration>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. `deps` name the fixtures that must be constructed
    /// first; the factory reads them from the view it is given.
    pub fn register<F>(&mut self, name: &str, deps: &[&str], build: F)
    where
        F: Fn(Fixtures) -> BoxFuture<'static, Result<Built>> + Send + Sync + 'static,
    {
        self.factories.insert(
            name.to_string(),
            Registration {
                deps: deps.iter().map(|d| d.to_string()).collect(),
                build: Arc::new(build),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Dependency-ordered construction plan for the requested fixtures: the
    /// dependency closure, each name once, dependencies before dependents.
    /// Unknown names and cycles are errors.
    pub fn resolve_order(&self, wanted: &[&str]) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut done: HashSet<String> = HashSet::new();
        let mut in_progress: HashSet<String> = HashSet::new();
        for name in wanted {
            self.visit(name, &mut order, &mut done, &mut in_progress)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        order: &mut Vec<String>,
        done: &mut HashSet<String>,
        in_progress: &mut HashSet<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !in_progress.insert(name.to_string()) {
            return Err(HarnessError::Fixture(format!(
                "dependency cycle through fixture '{name}'"
            )));
        }
        let registration = self
            .factories
            .get(name)
            .ok_or_else(|| HarnessError::Fixture(format!("unknown fixture '{name}'")))?;
        for dep in &registration.deps {
            self.visit(dep, order, done, in_progress)?;
        }
        in_progress.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// Construct a scope holding the requested fixtures and everything they
    /// depend on. On a construction failure, fixtures already built are torn
    /// down before the error is returned.
    pub async fn build_scope(&self, wanted: &[&str]) -> Result<FixtureScope> {
        let order = self.resolve_order(wanted)?;
        let mut scope = FixtureScope::new();
        for name in order {
            debug!(fixture = %name, "constructing fixture");
            let build = self.factories[&name].build.clone();
            match build(scope.fixtures()).await {
                Ok(built) => {
                    scope.values.insert(name.clone(), built.value);
                    if let Some(release) = built.release {
                        scope.releases.push((name, release));
                    }
                }
                Err(e) => {
                    warn!(fixture = %name, "fixture construction failed: {e}");
                    scope.teardown().await;
                    return Err(e);
                }
            }
        }
        Ok(scope)
    }
}

/// Per-test store of constructed fixtures and their release actions. No
/// fixture outlives its scope.
pub struct FixtureScope {
    values: HashMap<String, FixtureValue>,
    releases: Vec<(String, Release)>,
    torn_down: bool,
    grace: Duration,
}

impl FixtureScope {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            releases: Vec::new(),
            torn_down: false,
            grace: TEARDOWN_GRACE,
        }
    }

    /// Snapshot view of everything constructed so far.
    pub fn fixtures(&self) -> Fixtures {
        Fixtures {
            values: Arc::new(self.values.clone()),
        }
    }

    /// Fetch a constructed fixture by name, downcast to its concrete type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.values.get(name).ok_or_else(|| {
            HarnessError::Fixture(format!("fixture '{name}' was not constructed in this scope"))
        })?;
        value.clone().downcast::<T>().map_err(|_| {
            HarnessError::Fixture(format!("fixture '{name}' does not have the requested type"))
        })
    }

    /// Run all release actions in reverse construction order, each bounded
    /// by the grace budget. Runs at most once; later calls are no-ops.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for (name, release) in self.releases.drain(..).rev() {
            debug!(fixture = %name, "releasing fixture");
            if tokio::time::timeout(self.grace, release()).await.is_err() {
                warn!(fixture = %name, "release did not finish within {:?}", self.grace);
            }
        }
    }
}
