//! # af-core
//!
//! Core pipeline engine and tool process management for apkforge.
//!
//! This crate provides:
//! - A process wrapper streaming external tool output line-by-line, with
//!   process-tree cancellation and idempotent disposal
//! - Per-tool invocation builders for the wrapped Android toolchain
//! - The badging-dump metadata parser with aapt-to-aapt2 fallback
//! - The staged pipeline engine (merge, decode, build, align, sign,
//!   install) with commit-on-success staging
//! - Run lifecycle management: spawning, cancellation, shutdown
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `apkforge.toml`
//! - [`process`]: Tool process wrapper, kill-tree, shutdown registry
//! - [`tools`]: Toolchain paths and per-tool flag tables
//! - [`parser`]: Badging parser, SDK table, icon resolution
//! - [`pipeline`]: Stage planning, staging, and the sequential engine
//! - [`state`]: Run state transitions and the run manager

pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod process;
pub mod state;
pub mod tools;

pub use error::{CoreError, CoreResult};
pub use parser::MetadataReader;
pub use pipeline::{plan_stages, PipelineEngine};
pub use state::RunManager;
pub use tools::{Toolchain, ToolchainConfig};
