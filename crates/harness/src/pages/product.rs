//! Product page object

use crate::error::Result;
use crate::pages::selectors as sel;
use crate::pages::PageToolkit;

pub struct ProductPage {
    ui: PageToolkit,
}

impl ProductPage {
    pub fn new(ui: PageToolkit) -> Self {
        Self { ui }
    }

    pub fn toolkit(&self) -> &PageToolkit {
        &self.ui
    }

    pub fn path(product_id: &str) -> String {
        format!("/product/{product_id}")
    }

    pub async fn open(&self, product_id: &str) -> Result<()> {
        self.ui.navigate(&Self::path(product_id)).await
    }

    pub async fn title(&self) -> Result<String> {
        self.ui.driver().inner_text(sel::PRODUCT_TITLE).await
    }

    pub async fn set_quantity(&self, quantity: u32) -> Result<()> {
        self.ui
            .fill(sel::PRODUCT_QUANTITY, &quantity.to_string())
            .await
    }

    pub async fn add_to_cart(&self) -> Result<()> {
        self.ui.click(sel::ADD_TO_CART).await
    }
}
