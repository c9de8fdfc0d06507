//! Page objects for the storefront under test
//!
//! Every concrete page holds a [`PageToolkit`] by composition. The toolkit
//! centralizes navigation, waiting and verification; the page adds its
//! locators and flows. Interaction failures propagate; flows never catch
//! them.

mod cart;
mod home;
mod login;
mod product;
mod register;
mod toolkit;

pub use cart::CartPage;
pub use home::HomePage;
pub use login::LoginPage;
pub use product::ProductPage;
pub use register::RegisterPage;
pub use toolkit::PageToolkit;

/// Element locators, shared with the simulated driver so both sides of the
/// seam agree on the storefront's surface.
pub mod selectors {
    // Login page
    pub const LOGIN_PATH: &str = "/login";
    pub const LOGIN_EMAIL: &str = "#email";
    pub const LOGIN_PASSWORD: &str = "#password";
    pub const LOGIN_REMEMBER: &str = "#remember";
    pub const LOGIN_SUBMIT: &str = "[data-testid=login-submit]";
    pub const LOGIN_ERROR: &str = "[data-testid=login-error]";

    // Header (any page except login)
    pub const LOGOUT_BUTTON: &str = "[data-testid=logout]";
    pub const PROFILE_NAME: &str = "[data-testid=profile-name]";

    // Home page
    pub const HOME_PATH: &str = "/";
    pub const SEARCH_INPUT: &str = "[data-testid=search-input]";
    pub const SEARCH_BUTTON: &str = "[data-testid=search-button]";

    // Registration page
    pub const REGISTER_PATH: &str = "/register";
    pub const REG_FIRST_NAME: &str = "#first-name";
    pub const REG_LAST_NAME: &str = "#last-name";
    pub const REG_EMAIL: &str = "#reg-email";
    pub const REG_PASSWORD: &str = "#reg-password";
    pub const REG_CONFIRM_PASSWORD: &str = "#reg-confirm-password";
    pub const REG_DOB: &str = "#dob";
    pub const REG_MOBILE: &str = "#mobile";
    pub const REG_GENDER: &str = "#gender";
    pub const REG_SUBMIT: &str = "[data-testid=register-submit]";

    // Product page
    pub const PRODUCT_TITLE: &str = "[data-testid=product-title]";
    pub const PRODUCT_QUANTITY: &str = "#quantity";
    pub const ADD_TO_CART: &str = "[data-testid=add-to-cart]";

    // Cart page
    pub const CART_PATH: &str = "/cart";
    pub const CART_COUNT: &str = "[data-testid=cart-count]";
    pub const CART_TOTAL: &str = "[data-testid=cart-total]";
    pub const CART_CHECKOUT: &str = "[data-testid=checkout]";
}
