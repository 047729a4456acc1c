//! # af-protocol
//!
//! Core protocol definitions and data models for apkforge.
//!
//! This crate defines all shared data structures used for:
//! - Tool invocations and per-stage results
//! - Runtime pipeline run state
//! - Parsed APK metadata records
//! - Configuration snapshots consumed by the engine
//! - Events emitted from the core to its caller
//!
//! ## Modules
//!
//! - [`tool_models`]: Tool invocations, stage kinds, and stage results
//! - [`run_models`]: Runtime pipeline run state and status
//! - [`metadata_models`]: Parsed APK metadata and marketplace links
//! - [`config_models`]: Per-run configuration snapshot
//! - [`ipc`]: Events for core-to-caller communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, uuid, and chrono
//! - Empty-over-absent: metadata fields default to empty values so
//!   consumers branch on emptiness, never on a missing field object
//! - Independent compilation: no dependencies on other apkforge crates

pub mod config_models;
pub mod ipc;
pub mod metadata_models;
pub mod run_models;
pub mod tool_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use metadata_models::*;
pub use run_models::*;
pub use tool_models::*;
