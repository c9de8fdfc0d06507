//! Home page object

use crate::error::Result;
use crate::pages::selectors as sel;
use crate::pages::PageToolkit;

pub struct HomePage {
    ui: PageToolkit,
}

impl HomePage {
    pub fn new(ui: PageToolkit) -> Self {
        Self { ui }
    }

    pub fn toolkit(&self) -> &PageToolkit {
        &self.ui
    }

    pub async fn open(&self) -> Result<()> {
        self.ui.navigate(sel::HOME_PATH).await
    }

    /// Submit a catalog search and wait for the results page.
    pub async fn search(&self, term: &str) -> Result<()> {
        self.ui.fill(sel::SEARCH_INPUT, term).await?;
        self.ui.click(sel::SEARCH_BUTTON).await?;
        self.ui.wait_for_load_complete().await
    }

    /// The logged-in indicator (profile name in the header).
    pub async fn profile_name(&self) -> Result<String> {
        self.ui.driver().inner_text(sel::PROFILE_NAME).await
    }

    pub async fn logged_in_indicator_visible(&self) -> Result<bool> {
        self.ui.driver().is_visible(sel::LOGOUT_BUTTON).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.ui.click(sel::LOGOUT_BUTTON).await
    }
}
