//! Registration page object

use tracing::info;

use crate::data::UserTestData;
use crate::error::Result;
use crate::pages::selectors as sel;
use crate::pages::PageToolkit;

pub struct RegisterPage {
    ui: PageToolkit,
}

impl RegisterPage {
    pub fn new(ui: PageToolkit) -> Self {
        Self { ui }
    }

    pub fn toolkit(&self) -> &PageToolkit {
        &self.ui
    }

    pub async fn open(&self) -> Result<()> {
        self.ui.navigate(sel::REGISTER_PATH).await
    }

    pub async fn is_open(&self) -> Result<bool> {
        Ok(self
            .ui
            .current_path()
            .await?
            .starts_with(sel::REGISTER_PATH))
    }

    /// Full registration flow: fill the form, submit, wait for the URL to
    /// leave the registration path.
    pub async fn register(&self, user: &UserTestData) -> Result<()> {
        info!(email = %user.email, "registering user");
        self.fill_form(user).await?;
        self.submit().await?;
        self.ui.wait_for_path_change(sel::REGISTER_PATH).await
    }

    pub async fn fill_form(&self, user: &UserTestData) -> Result<()> {
        self.ui.fill(sel::REG_FIRST_NAME, &user.first_name).await?;
        self.ui.fill(sel::REG_LAST_NAME, &user.last_name).await?;
        self.ui.fill(sel::REG_EMAIL, &user.email).await?;
        self.ui.fill(sel::REG_PASSWORD, &user.password).await?;
        self.ui
            .fill(sel::REG_CONFIRM_PASSWORD, &user.confirm_password)
            .await?;
        self.ui.fill(sel::REG_DOB, &user.dob).await?;
        self.ui.fill(sel::REG_MOBILE, &user.mobile).await?;
        self.ui
            .select_option(sel::REG_GENDER, user.gender.as_str())
            .await
    }

    pub async fn submit(&self) -> Result<()> {
        self.ui.click(sel::REG_SUBMIT).await
    }
}
