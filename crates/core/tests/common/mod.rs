//! Shared helpers for the integration tests: generated shell-script
//! stand-ins for the Android toolchain, and a toolchain builder that
//! points at them.

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;
