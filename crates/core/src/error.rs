//! Error taxonomy for the pipeline core.

use af_protocol::StageResult;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can end a pipeline run or a metadata extraction.
///
/// Tool text and exit codes are carried unmodified so the caller sees the
/// real diagnostic; the orchestrator never paraphrases.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The tool executable is missing or unrunnable. Fatal, aborts the
    /// run immediately.
    #[error("failed to launch {program}: {source}")]
    LaunchFailure {
        program: PathBuf,
        source: std::io::Error,
    },

    /// A tool exited non-zero. The captured output is surfaced verbatim.
    #[error("{stage} failed with exit code {code}", stage = .0.stage, code = .0.exit_code)]
    ToolExecutionFailure(Box<StageResult>),

    /// Copy/move/delete of a staged artifact failed. Aborts the run;
    /// cleanup after this error is best-effort and logged, never thrown.
    #[error("staging IO failed at {path}: {source}")]
    StagingIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Both the primary and the fallback metadata tool produced empty
    /// output for the artifact.
    #[error("no metadata produced for {0}")]
    NoMetadataProduced(PathBuf),

    /// The run was cancelled. A distinct terminal status, not a tool
    /// failure; carried as an error only to unwind the stage sequence.
    #[error("run cancelled")]
    Cancelled,

    /// A precondition the orchestrator checks before invoking any tool,
    /// e.g. a decode destination that already exists without force.
    #[error("{0}")]
    Precondition(String),
}

impl CoreError {
    /// Whether this error represents cooperative cancellation rather
    /// than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }
}

/// Type alias for Result with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
