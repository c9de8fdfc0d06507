//! Cart page object

use crate::error::{HarnessError, Result};
use crate::pages::selectors as sel;
use crate::pages::PageToolkit;

pub struct CartPage {
    ui: PageToolkit,
}

impl CartPage {
    pub fn new(ui: PageToolkit) -> Self {
        Self { ui }
    }

    pub fn toolkit(&self) -> &PageToolkit {
        &self.ui
    }

    pub async fn open(&self) -> Result<()> {
        self.ui.navigate(sel::CART_PATH).await
    }

    /// Number of line items, parsed from the cart badge.
    pub async fn item_count(&self) -> Result<u32> {
        let raw = self.ui.driver().inner_text(sel::CART_COUNT).await?;
        raw.trim().parse().map_err(|_| {
            HarnessError::assertion(sel::CART_COUNT, "a numeric count", format!("{raw:?}"))
        })
    }

    pub async fn verify_item_count(&self, expected: u32) -> Result<()> {
        let actual = self.item_count().await?;
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::assertion(
                sel::CART_COUNT,
                expected.to_string(),
                actual.to_string(),
            ))
        }
    }

    pub async fn total_text(&self) -> Result<String> {
        self.ui.driver().inner_text(sel::CART_TOTAL).await
    }

    pub async fn checkout(&self) -> Result<()> {
        self.ui.click(sel::CART_CHECKOUT).await?;
        self.ui.wait_for_load_complete().await
    }
}
