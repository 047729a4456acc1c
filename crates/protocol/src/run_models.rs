//! Runtime pipeline run state models.
//!
//! This module defines the structures for tracking the state of an
//! in-flight pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::tool_models::StageKind;

/// Lifecycle status of a pipeline run.
///
/// Normal progression is `Pending -> Running -> Succeeded`. A run ends in
/// exactly one of the three terminal states; cancellation is a distinct
/// terminal status, not an error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run has been created but not started yet.
    Pending,

    /// Run is actively executing stages.
    Running,

    /// Every planned stage completed with exit code zero.
    Succeeded,

    /// A stage failed or staging IO broke the run.
    Failed,

    /// The run was cancelled by the user.
    Cancelled,
}

impl RunStatus {
    /// Whether this status ends the run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// The operation a run was started for.
///
/// Each operation expands to a fixed, deterministic sequence of stages
/// given the same configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Decode an APK into a project directory.
    Decode,

    /// Build a project directory back into an APK, with the optional
    /// post-build chain (unsigned copy, align, sign, install).
    Build,

    /// Merge a split bundle into a single APK.
    Merge,

    /// Merge a split bundle, then decode the merged APK.
    MergeAndDecode,

    /// Align an existing APK.
    Zipalign,

    /// Sign an existing APK.
    Sign,

    /// Install an existing APK to a device.
    Install,

    /// Clear the decoder's framework resource cache.
    ClearFramework,
}

/// Runtime state of a single pipeline run.
///
/// Mutated only by the worker task driving the run; a run never executes
/// two stages concurrently, and a stage never starts before the previous
/// stage's result is recorded.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PipelineRun {
    /// Unique identifier for this run.
    pub id: Uuid,

    /// The operation this run performs.
    pub operation: Operation,

    /// The artifact (or project directory) the run was started against.
    pub input: PathBuf,

    /// Private per-run staging directory. Removed on every terminal state.
    pub staging_dir: PathBuf,

    /// Ordered list of stages this run will execute.
    pub stages: Vec<StageKind>,

    /// Zero-based index of the stage currently executing, or the next one
    /// to execute.
    pub current_stage: usize,

    /// Current lifecycle status.
    pub status: RunStatus,

    /// Accumulated log lines, in production order.
    pub logs: Vec<String>,

    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

impl PipelineRun {
    /// Create a new pending run.
    pub fn new(
        operation: Operation,
        input: PathBuf,
        staging_dir: PathBuf,
        stages: Vec<StageKind>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), operation, input, staging_dir, stages)
    }

    /// Create a new pending run under a caller-chosen id. The id is fixed
    /// for the run's lifetime so it can be handed out before the worker
    /// task starts.
    pub fn with_id(
        id: Uuid,
        operation: Operation,
        input: PathBuf,
        staging_dir: PathBuf,
        stages: Vec<StageKind>,
    ) -> Self {
        Self {
            id,
            operation,
            input,
            staging_dir,
            stages,
            current_stage: 0,
            status: RunStatus::Pending,
            logs: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// The stage currently scheduled, if the plan is not exhausted.
    pub fn current_stage_kind(&self) -> Option<StageKind> {
        self.stages.get(self.current_stage).copied()
    }
}
