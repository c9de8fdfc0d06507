//! Login page object

use tracing::info;

use crate::config::Credentials;
use crate::data::mask_sensitive;
use crate::error::Result;
use crate::pages::selectors as sel;
use crate::pages::PageToolkit;

pub struct LoginPage {
    ui: PageToolkit,
}

impl LoginPage {
    pub fn new(ui: PageToolkit) -> Self {
        Self { ui }
    }

    pub fn toolkit(&self) -> &PageToolkit {
        &self.ui
    }

    pub async fn open(&self) -> Result<()> {
        self.ui.navigate(sel::LOGIN_PATH).await
    }

    /// Whether the browser is currently on the login path.
    pub async fn is_open(&self) -> Result<bool> {
        Ok(self.ui.current_path().await?.starts_with(sel::LOGIN_PATH))
    }

    /// Full login flow: fill both fields, optionally tick "remember me",
    /// submit, then wait for the URL to leave the login path. A rejected
    /// credential pair or a stalled post-login navigation fails here and
    /// propagates.
    pub async fn login(&self, creds: &Credentials, remember: bool) -> Result<()> {
        info!(
            email = %creds.email,
            password = %mask_sensitive(&creds.password, 0),
            "logging in"
        );
        self.fill_credentials(creds).await?;
        if remember {
            self.ui.set_checked(sel::LOGIN_REMEMBER, true).await?;
        }
        self.submit().await?;
        self.ui.wait_for_path_change(sel::LOGIN_PATH).await
    }

    /// Fill the credential fields without submitting.
    pub async fn fill_credentials(&self, creds: &Credentials) -> Result<()> {
        self.ui.fill(sel::LOGIN_EMAIL, &creds.email).await?;
        self.ui.fill(sel::LOGIN_PASSWORD, &creds.password).await
    }

    /// Click the submit control without waiting for navigation. Used by
    /// negative tests that expect to stay on the login page.
    pub async fn submit(&self) -> Result<()> {
        self.ui.click(sel::LOGIN_SUBMIT).await
    }

    /// Text of the error banner, if shown.
    pub async fn error_text(&self) -> Result<String> {
        self.ui.driver().inner_text(sel::LOGIN_ERROR).await
    }

    pub async fn error_visible(&self) -> Result<bool> {
        self.ui.driver().is_visible(sel::LOGIN_ERROR).await
    }
}
