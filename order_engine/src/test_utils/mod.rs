//! Helpers for tests in this crate and in downstream crates. Enabled with the `test_utils` feature.
pub mod fixtures;
pub mod prepare_env;
mod stub_store;

pub use stub_store::StubStore;
