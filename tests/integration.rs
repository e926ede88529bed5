//! Integration test entry point.
//!
//! Individual test modules are in tests/integration/.
//!
//! Run all integration tests:
//!   cargo test --test integration
//!
//! Run a specific module:
//!   cargo test --test integration scenario

#[path = "integration/scenario_tests.rs"]
mod scenario_tests;

#[path = "integration/property_tests.rs"]
mod property_tests;

#[path = "integration/concurrency_tests.rs"]
mod concurrency_tests;

#[path = "integration/service_tests.rs"]
mod service_tests;
