//! Core-to-caller event protocol.
//!
//! The engine never renders anything itself: every observable moment of a
//! run is published as an [`Event`] over an async channel, and the caller
//! (CLI, GUI, test harness) decides how to display it. Events for one run
//! are delivered in the order they were produced on that run's worker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run_models::RunStatus;
use crate::tool_models::{StageKind, StageResult, StreamSource};

/// Events sent from the core to its caller.
///
/// Uses tagged enum serialization so the stream can also be consumed as
/// NDJSON by non-Rust frontends:
/// ```json
/// {
///   "type": "toolOutput",
///   "payload": {
///     "run_id": "uuid-here",
///     "source": "Stdout",
///     "line": "I: Baksmaling classes.dex..."
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A new run has been created and is about to execute.
    RunStarted {
        run_id: Uuid,
        operation: String,
    },

    /// A run's status changed.
    RunStatusUpdate {
        run_id: Uuid,
        status: RunStatus,
        stage_index: usize,
    },

    /// One stage is about to execute.
    StageStarted {
        run_id: Uuid,
        stage: StageKind,
    },

    /// One stage finished; carries the full immutable result.
    StageFinished {
        run_id: Uuid,
        result: StageResult,
    },

    /// A completed line of tool output, tagged with the pipe it came from.
    ToolOutput {
        run_id: Uuid,
        source: StreamSource,
        line: String,
    },

    /// A log line produced by the orchestrator itself (staging moves,
    /// skipped stages, cleanup notes).
    RunLog {
        run_id: Uuid,
        message: String,
    },

    /// The run reached a terminal status. Emitted exactly once per run;
    /// `message` carries the failing tool's captured text verbatim on
    /// failure, and is empty on success.
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        message: String,
    },
}
