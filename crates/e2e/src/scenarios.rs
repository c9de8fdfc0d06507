//! Storefront scenarios
//!
//! Each scenario is a plain async function over the fixture view, with its
//! required fixtures and expected outcome declared alongside. Negative
//! scenarios either assert the failure themselves (expected `Pass`) or
//! declare `Fail` and let the runner flag a surprising success.

use futures::future::BoxFuture;
use shopcheck_harness::config::{Credentials, Role, TestEnvConfig};
use shopcheck_harness::data::UserTestData;
use shopcheck_harness::error::{HarnessError, Result};
use shopcheck_harness::fixtures::{Fixtures, PageFixture};
use shopcheck_harness::pages::{
    selectors, CartPage, HomePage, LoginPage, ProductPage, RegisterPage, PageToolkit,
};
use shopcheck_harness::runner::Outcome;

pub type ScenarioFn = fn(Fixtures) -> BoxFuture<'static, Result<()>>;

/// One entry in the suite table.
pub struct Scenario {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub fixtures: &'static [&'static str],
    pub expected: Outcome,
    pub run: ScenarioFn,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

/// The full suite, in execution order.
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "valid login reaches the home page",
            tags: &["auth"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(valid_login(fx)),
        },
        Scenario {
            name: "rejected credentials keep the login page open",
            tags: &["auth", "negative"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(rejected_credentials(fx)),
        },
        Scenario {
            name: "wrong password never reaches the home page",
            tags: &["auth", "negative"],
            fixtures: &["page", "config"],
            expected: Outcome::Fail,
            run: |fx| Box::pin(wrong_password_full_flow(fx)),
        },
        Scenario {
            name: "empty submission is blocked client side",
            tags: &["auth", "negative"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(empty_submission(fx)),
        },
        Scenario {
            name: "registration signs the new user in",
            tags: &["auth", "registration"],
            fixtures: &["page", "config", "random_user"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(registration(fx)),
        },
        Scenario {
            name: "cached session reaches the store signed in",
            tags: &["auth", "session"],
            fixtures: &["authenticated_page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(cached_session(fx)),
        },
        Scenario {
            name: "search narrows the product listing",
            tags: &["catalog"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(search(fx)),
        },
        Scenario {
            name: "product quantity lands in the cart",
            tags: &["cart"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(add_to_cart(fx)),
        },
        Scenario {
            name: "checkout without a session redirects to login",
            tags: &["cart", "negative"],
            fixtures: &["page", "config"],
            expected: Outcome::Pass,
            run: |fx| Box::pin(guest_checkout_redirect(fx)),
        },
    ]
}

fn toolkit(fx: &Fixtures) -> Result<PageToolkit> {
    let page = fx.get::<PageFixture>("page")?;
    let config = fx.get::<TestEnvConfig>("config")?;
    Ok(PageToolkit::new(page.0.clone(), &config))
}

fn user_credentials(fx: &Fixtures) -> Result<Credentials> {
    fx.get::<TestEnvConfig>("config")?.require_credentials(Role::User)
}

async fn valid_login(fx: Fixtures) -> Result<()> {
    let creds = user_credentials(&fx)?;
    let ui = toolkit(&fx)?;
    let login = LoginPage::new(ui.clone());
    login.open().await?;
    login.login(&creds, false).await?;
    ui.wait_for_visible(selectors::LOGOUT_BUTTON).await
}

async fn rejected_credentials(fx: Fixtures) -> Result<()> {
    let creds = user_credentials(&fx)?;
    let ui = toolkit(&fx)?;
    let login = LoginPage::new(ui);
    login.open().await?;
    login
        .fill_credentials(&Credentials::new(creds.email, "definitely-not-the-password"))
        .await?;
    login.submit().await?;
    login.toolkit().wait_for_visible(selectors::LOGIN_ERROR).await?;
    if login.is_open().await? {
        Ok(())
    } else {
        Err(HarnessError::assertion(
            "post-submit location",
            selectors::LOGIN_PATH,
            "elsewhere",
        ))
    }
}

// Declared `expected: Fail` in the table: the full login flow waits for the
// URL to leave the login path, which a rejected password never does.
async fn wrong_password_full_flow(fx: Fixtures) -> Result<()> {
    let creds = user_credentials(&fx)?;
    let ui = toolkit(&fx)?;
    let login = LoginPage::new(ui);
    login.open().await?;
    login
        .login(
            &Credentials::new(creds.email, "definitely-not-the-password"),
            false,
        )
        .await
}

async fn empty_submission(fx: Fixtures) -> Result<()> {
    let ui = toolkit(&fx)?;
    let login = LoginPage::new(ui);
    login.open().await?;
    login.submit().await?;
    if !login.is_open().await? {
        return Err(HarnessError::assertion(
            "post-submit location",
            selectors::LOGIN_PATH,
            "elsewhere",
        ));
    }
    if login.error_visible().await? {
        return Err(HarnessError::assertion(
            "server error banner",
            "absent (blocked client side)",
            "visible",
        ));
    }
    Ok(())
}

async fn registration(fx: Fixtures) -> Result<()> {
    let user = fx.get::<UserTestData>("random_user")?;
    let ui = toolkit(&fx)?;
    let register = RegisterPage::new(ui.clone());
    register.open().await?;
    register.register(&user).await?;
    ui.wait_for_visible(selectors::LOGOUT_BUTTON).await
}

async fn cached_session(fx: Fixtures) -> Result<()> {
    let page = fx.get::<PageFixture>("authenticated_page")?;
    let config = fx.get::<TestEnvConfig>("config")?;
    let ui = PageToolkit::new(page.0.clone(), &config);
    let home = HomePage::new(ui);
    home.open().await?;
    if home.logged_in_indicator_visible().await? {
        Ok(())
    } else {
        Err(HarnessError::assertion(
            "session indicator",
            "visible",
            "absent",
        ))
    }
}

async fn search(fx: Fixtures) -> Result<()> {
    let ui = toolkit(&fx)?;
    let home = HomePage::new(ui.clone());
    home.open().await?;
    home.search("mug").await?;
    let path = ui.current_path().await?;
    if path.starts_with("/products") {
        Ok(())
    } else {
        Err(HarnessError::assertion("post-search path", "/products…", path.as_str()))
    }
}

async fn add_to_cart(fx: Fixtures) -> Result<()> {
    let ui = toolkit(&fx)?;
    let product = ProductPage::new(ui.clone());
    product.open("sku-1042").await?;
    product.set_quantity(2).await?;
    product.add_to_cart().await?;

    let cart = CartPage::new(ui);
    cart.open().await?;
    cart.verify_item_count(2).await
}

async fn guest_checkout_redirect(fx: Fixtures) -> Result<()> {
    let ui = toolkit(&fx)?;
    let product = ProductPage::new(ui.clone());
    product.open("sku-1042").await?;
    product.add_to_cart().await?;

    let cart = CartPage::new(ui.clone());
    cart.open().await?;
    cart.checkout().await?;

    let path = ui.current_path().await?;
    if path.starts_with(selectors::LOGIN_PATH) {
        Ok(())
    } else {
        Err(HarnessError::assertion(
            "post-checkout path",
            selectors::LOGIN_PATH,
            path.as_str(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_names_are_unique() {
        let scenarios = all_scenarios();
        let mut names: Vec<_> = scenarios.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn every_scenario_declares_its_fixtures() {
        for scenario in all_scenarios() {
            assert!(
                !scenario.fixtures.is_empty(),
                "{} declares no fixtures",
                scenario.name
            );
        }
    }

    #[test]
    fn tags_select_subsets() {
        let scenarios = all_scenarios();
        assert!(scenarios.iter().all(|s| !s.tags.is_empty()));
        assert!(scenarios.iter().any(|s| s.has_tag("negative")));
        assert!(!scenarios.iter().any(|s| s.has_tag("nonexistent")));
    }
}
