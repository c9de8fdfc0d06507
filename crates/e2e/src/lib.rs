//! Storefront end-to-end suite
//!
//! The library half of the suite: the standard fixture registry every test
//! binary shares, and the scenario table the `e2e` runner executes. The
//! heavy lifting (drivers, page objects, session cache, lifecycle) lives in
//! `shopcheck-harness`; this crate wires those pieces to the storefront.

pub mod registry;
pub mod scenarios;

pub use registry::standard_registry;
pub use scenarios::{all_scenarios, Scenario};
