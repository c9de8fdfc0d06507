//! In-memory simulated storefront
//!
//! Implements the [`Browser`]/[`PageDriver`] seam against a small model of
//! the application under test (accounts, login, registration, catalog,
//! cart). The suite's own tests run against this driver: it keeps counters
//! for login-path navigations and server-side login attempts so session
//! reuse and login-flow properties can be asserted without a browser.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::driver::{Browser, PageDriver, StorageState};
use crate::error::{HarnessError, Result};
use crate::pages::selectors as sel;

/// Nominal budget reported in "element not found" timeouts.
const SIM_BUDGET_MS: u64 = 100;

const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
struct Account {
    password: String,
    display_name: String,
}

#[derive(Debug, Default)]
struct ServerState {
    accounts: HashMap<String, Account>,
    login_navigations: u64,
    login_attempts: u64,
}

/// The simulated application: shared account store plus instrumentation
/// counters. Cloning shares the same server.
#[derive(Clone, Default)]
pub struct SimServer {
    state: Arc<Mutex<ServerState>>,
}

impl SimServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) {
        self.state.lock().accounts.insert(
            email.into(),
            Account {
                password: password.into(),
                display_name: display_name.into(),
            },
        );
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.state.lock().accounts.contains_key(email)
    }

    /// Navigations that landed on the login path (full page loads and
    /// unauthenticated redirects both count).
    pub fn login_navigations(&self) -> u64 {
        self.state.lock().login_navigations
    }

    /// Server-side credential checks performed.
    pub fn login_attempts(&self) -> u64 {
        self.state.lock().login_attempts
    }

    // Credentials are compared byte-for-byte; any normalization is the
    // identity provider's business, not the harness's.
    fn check(&self, email: &str, password: &str) -> bool {
        self.state
            .lock()
            .accounts
            .get(email)
            .map(|a| a.password == password)
            .unwrap_or(false)
    }

    fn display_name(&self, email: &str) -> String {
        self.state
            .lock()
            .accounts
            .get(email)
            .map(|a| a.display_name.clone())
            .unwrap_or_else(|| email.to_string())
    }

    fn note_login_navigation(&self) {
        self.state.lock().login_navigations += 1;
    }

    fn note_login_attempt(&self) {
        self.state.lock().login_attempts += 1;
    }
}

/// Browser factory over a [`SimServer`].
#[derive(Clone)]
pub struct SimBrowser {
    server: SimServer,
    base_url: String,
}

impl SimBrowser {
    pub fn new(server: SimServer, base_url: impl Into<String>) -> Self {
        Self {
            server,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn server(&self) -> &SimServer {
        &self.server
    }
}

#[async_trait]
impl Browser for SimBrowser {
    async fn context(&self, storage: Option<&StorageState>) -> Result<Box<dyn PageDriver>> {
        let session = storage.and_then(session_from_storage);
        Ok(Box::new(SimPage {
            server: self.server.clone(),
            base_url: self.base_url.clone(),
            state: Mutex::new(PageState {
                session,
                ..PageState::default()
            }),
        }))
    }
}

fn session_from_storage(storage: &StorageState) -> Option<String> {
    storage
        .as_json()
        .get("cookies")?
        .as_array()?
        .iter()
        .find(|c| c.get("name").and_then(|n| n.as_str()) == Some(SESSION_COOKIE))?
        .get("value")?
        .as_str()
        .map(str::to_string)
}

#[derive(Debug, Default)]
struct PageState {
    path: String,
    fields: HashMap<String, String>,
    checks: HashMap<String, bool>,
    session: Option<String>,
    cart: Vec<String>,
    login_error: bool,
    closed: bool,
}

/// One simulated browsing context.
pub struct SimPage {
    server: SimServer,
    base_url: String,
    state: Mutex<PageState>,
}

impl SimPage {
    fn ensure_open(state: &PageState) -> Result<()> {
        if state.closed {
            return Err(HarnessError::Driver("context is closed".to_string()));
        }
        Ok(())
    }

    fn require_element(state: &PageState, op: &str, selector: &str) -> Result<()> {
        if element_present(state, selector) {
            Ok(())
        } else {
            Err(HarnessError::Timeout {
                what: format!("{op} {selector} on {}", state.path),
                budget_ms: SIM_BUDGET_MS,
            })
        }
    }

    fn navigate_to(&self, state: &mut PageState, path: &str) {
        if path.starts_with(sel::LOGIN_PATH) {
            self.server.note_login_navigation();
        }
        state.path = path.to_string();
        state.fields.clear();
        state.checks.clear();
        state.login_error = false;
    }

    fn submit_login(&self, state: &mut PageState) {
        let email = state.fields.get(sel::LOGIN_EMAIL).cloned().unwrap_or_default();
        let password = state
            .fields
            .get(sel::LOGIN_PASSWORD)
            .cloned()
            .unwrap_or_default();

        // Client-side validation blocks the round trip on empty fields.
        if email.is_empty() || password.is_empty() {
            return;
        }

        self.server.note_login_attempt();
        if self.server.check(&email, &password) {
            state.session = Some(email);
            self.navigate_to(state, "/");
        } else {
            state.login_error = true;
        }
    }

    fn submit_registration(&self, state: &mut PageState) {
        let field = |name: &str| state.fields.get(name).cloned().unwrap_or_default();
        let email = field(sel::REG_EMAIL);
        let password = field(sel::REG_PASSWORD);
        let confirm = field(sel::REG_CONFIRM_PASSWORD);

        if email.is_empty() || password.is_empty() || password != confirm {
            return;
        }

        let display_name = format!("{} {}", field(sel::REG_FIRST_NAME), field(sel::REG_LAST_NAME))
            .trim()
            .to_string();
        self.server.add_account(
            email.clone(),
            password,
            if display_name.is_empty() {
                email.clone()
            } else {
                display_name
            },
        );
        state.session = Some(email);
        self.navigate_to(state, "/");
    }
}

fn element_present(state: &PageState, selector: &str) -> bool {
    let path = state.path.as_str();
    let on_login = path.starts_with(sel::LOGIN_PATH);
    match selector {
        sel::LOGIN_EMAIL | sel::LOGIN_PASSWORD | sel::LOGIN_REMEMBER | sel::LOGIN_SUBMIT => {
            on_login
        }
        sel::LOGIN_ERROR => on_login && state.login_error,
        sel::LOGOUT_BUTTON | sel::PROFILE_NAME => !on_login && state.session.is_some(),
        sel::SEARCH_INPUT | sel::SEARCH_BUTTON => path == "/" || path.starts_with("/products"),
        sel::REG_FIRST_NAME
        | sel::REG_LAST_NAME
        | sel::REG_EMAIL
        | sel::REG_PASSWORD
        | sel::REG_CONFIRM_PASSWORD
        | sel::REG_DOB
        | sel::REG_MOBILE
        | sel::REG_GENDER
        | sel::REG_SUBMIT => path.starts_with(sel::REGISTER_PATH),
        sel::PRODUCT_TITLE | sel::PRODUCT_QUANTITY | sel::ADD_TO_CART => {
            path.starts_with("/product/")
        }
        sel::CART_COUNT | sel::CART_TOTAL | sel::CART_CHECKOUT => {
            path.starts_with(sel::CART_PATH)
        }
        _ => false,
    }
}

#[async_trait]
impl PageDriver for SimPage {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        let path = match url.strip_prefix(&self.base_url) {
            Some("") => "/",
            Some(path) => path,
            None => url,
        }
        .to_string();
        self.navigate_to(&mut state, &path);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(format!("{}{}", self.base_url, state.path))
    }

    async fn wait_for_load(&self, _budget: std::time::Duration) -> Result<()> {
        Self::ensure_open(&self.state.lock())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "scroll to", selector)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "click", selector)?;

        match selector {
            sel::LOGIN_SUBMIT => self.submit_login(&mut state),
            sel::REG_SUBMIT => self.submit_registration(&mut state),
            sel::LOGOUT_BUTTON => {
                state.session = None;
                self.navigate_to(&mut state, "/");
            }
            sel::SEARCH_BUTTON => {
                let q = state.fields.get(sel::SEARCH_INPUT).cloned().unwrap_or_default();
                self.navigate_to(&mut state, &format!("/products?q={q}"));
            }
            sel::ADD_TO_CART => {
                let id = state.path.trim_start_matches("/product/").to_string();
                let quantity: u32 = state
                    .fields
                    .get(sel::PRODUCT_QUANTITY)
                    .and_then(|q| q.trim().parse().ok())
                    .unwrap_or(1);
                for _ in 0..quantity {
                    state.cart.push(id.clone());
                }
            }
            sel::CART_CHECKOUT => {
                if state.session.is_some() {
                    self.navigate_to(&mut state, "/checkout");
                } else {
                    // Unauthenticated checkout redirects to login.
                    self.navigate_to(&mut state, sel::LOGIN_PATH);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "fill", selector)?;
        state.fields.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "select", selector)?;
        state.fields.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<()> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "check", selector)?;
        state.checks.insert(selector.to_string(), checked);
        Ok(())
    }

    async fn press(&self, selector: &str, _key: &str) -> Result<()> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "press in", selector)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(element_present(&state, selector))
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(element_present(&state, selector))
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(state.checks.get(selector).copied().unwrap_or(false))
    }

    async fn inner_text(&self, selector: &str) -> Result<String> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "read text of", selector)?;
        Ok(match selector {
            sel::PROFILE_NAME => state
                .session
                .as_deref()
                .map(|email| self.server.display_name(email))
                .unwrap_or_default(),
            sel::LOGIN_ERROR => "Invalid email or password.".to_string(),
            sel::CART_COUNT => state.cart.len().to_string(),
            sel::CART_TOTAL => format!("${}.00", state.cart.len() * 10),
            sel::PRODUCT_TITLE => {
                format!("Product {}", state.path.trim_start_matches("/product/"))
            }
            _ => String::new(),
        })
    }

    async fn input_value(&self, selector: &str) -> Result<String> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Self::require_element(&state, "read value of", selector)?;
        Ok(state.fields.get(selector).cloned().unwrap_or_default())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        if name == "value" {
            Ok(state.fields.get(selector).cloned())
        } else {
            Ok(None)
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(format!("sim-screenshot {}{}", self.base_url, state.path).into_bytes())
    }

    async fn storage_state(&self) -> Result<StorageState> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        let cookies = match &state.session {
            Some(email) => json!([{
                "name": SESSION_COOKIE,
                "value": email,
                "domain": self.base_url,
                "path": "/",
            }]),
            None => json!([]),
        };
        Ok(StorageState::new(json!({
            "cookies": cookies,
            "origins": [],
        })))
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, TestEnvConfig};
    use crate::pages::{LoginPage, PageToolkit};
    use std::time::Duration;

    const BASE: &str = "http://sim.test";

    fn config() -> TestEnvConfig {
        TestEnvConfig {
            base_url: BASE.to_string(),
            timeout: Duration::from_millis(300),
            ..Default::default()
        }
    }

    async fn page(browser: &SimBrowser) -> Arc<dyn PageDriver> {
        Arc::from(browser.context(None).await.unwrap())
    }

    #[tokio::test]
    async fn login_with_known_account_leaves_login_path() {
        let server = SimServer::new();
        server.add_account("qa@example.test", "Pw!234567890", "QA User");
        let browser = SimBrowser::new(server.clone(), BASE);

        let driver = page(&browser).await;
        let login = LoginPage::new(PageToolkit::new(driver, &config()));
        login.open().await.unwrap();
        login
            .login(&Credentials::new("qa@example.test", "Pw!234567890"), false)
            .await
            .unwrap();

        assert!(!login.is_open().await.unwrap());
        assert_eq!(server.login_attempts(), 1);
        assert_eq!(server.login_navigations(), 1);
    }

    #[tokio::test]
    async fn rejected_credentials_show_the_error_banner() {
        let server = SimServer::new();
        server.add_account("qa@example.test", "Pw!234567890", "QA User");
        let browser = SimBrowser::new(server.clone(), BASE);

        let driver = page(&browser).await;
        let login = LoginPage::new(PageToolkit::new(driver, &config()));
        login.open().await.unwrap();
        login
            .fill_credentials(&Credentials::new("qa@example.test", "wrong"))
            .await
            .unwrap();
        login.submit().await.unwrap();

        assert!(login.is_open().await.unwrap());
        assert!(login.error_visible().await.unwrap());
        assert_eq!(server.login_attempts(), 1);
    }

    #[tokio::test]
    async fn empty_submission_is_blocked_client_side() {
        let server = SimServer::new();
        let browser = SimBrowser::new(server.clone(), BASE);

        let driver = page(&browser).await;
        let login = LoginPage::new(PageToolkit::new(driver, &config()));
        login.open().await.unwrap();
        login.submit().await.unwrap();

        assert!(login.is_open().await.unwrap());
        assert!(!login.error_visible().await.unwrap());
        assert_eq!(server.login_attempts(), 0);
    }

    #[tokio::test]
    async fn storage_state_round_trips_the_session() {
        let server = SimServer::new();
        server.add_account("qa@example.test", "Pw!234567890", "QA User");
        let browser = SimBrowser::new(server.clone(), BASE);

        let driver = page(&browser).await;
        let login = LoginPage::new(PageToolkit::new(driver.clone(), &config()));
        login.open().await.unwrap();
        login
            .login(&Credentials::new("qa@example.test", "Pw!234567890"), false)
            .await
            .unwrap();

        let snapshot = driver.storage_state().await.unwrap();
        let restored = browser.context(Some(&snapshot)).await.unwrap();
        restored.goto(&format!("{BASE}/")).await.unwrap();
        assert!(restored.is_visible(sel::LOGOUT_BUTTON).await.unwrap());
    }

    #[tokio::test]
    async fn interacting_with_a_missing_element_times_out() {
        let browser = SimBrowser::new(SimServer::new(), BASE);
        let driver = page(&browser).await;
        driver.goto(&format!("{BASE}/")).await.unwrap();

        let err = driver.click(sel::LOGIN_SUBMIT).await.unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn closed_context_rejects_interaction() {
        let browser = SimBrowser::new(SimServer::new(), BASE);
        let driver = page(&browser).await;
        driver.close().await.unwrap();
        assert!(driver.goto(&format!("{BASE}/")).await.is_err());
    }
}
