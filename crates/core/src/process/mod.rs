//! Tool process management.
//!
//! One [`wrapper::ToolProcess`] owns one spawned OS process. Cancellation
//! and disposal go through a cheap cloneable [`wrapper::ProcessHandle`] so
//! the coordinator can kill a process tree while the worker task is still
//! awaiting output, without sharing the child itself.

pub mod registry;
pub mod tree;
pub mod wrapper;

pub use registry::ProcessRegistry;
pub use tree::{kill_tree, ChildProcessLister, ProcfsLister};
pub use wrapper::{ProcessHandle, ProcessOutput, ToolProcess};
