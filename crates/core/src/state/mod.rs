//! Run state and lifecycle coordination.

pub mod manager;
pub mod run;

pub use manager::RunManager;
