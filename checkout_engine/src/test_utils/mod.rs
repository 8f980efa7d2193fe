//! Helpers for tests in this crate and downstream crates. Enabled by the `test_utils` feature.
pub mod fixtures;
#[cfg(feature = "sqlite")]
pub mod prepare_env;
