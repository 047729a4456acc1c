//! Tool invocation and stage result models.
//!
//! A stage is one discrete transformation step in the pipeline. Each stage
//! is backed by exactly one external tool invocation; the invocation is
//! built immediately before the stage runs and discarded after its
//! [`StageResult`] is recorded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a tool's output streams are handled while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Every completed line is forwarded to the caller as an event and
    /// also accumulated into the captured text.
    Streamed,

    /// Lines are captured only. Used for metadata dumps whose output is
    /// parsed, not displayed.
    Silent,
}

/// Identifies which pipe of the child process produced a line of output.
///
/// Each stream is internally ordered; interleaving between the two streams
/// follows whatever order the OS delivers bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// A single external tool invocation.
///
/// Immutable per call: the orchestrator creates one before each stage,
/// the process wrapper consumes it, and it is discarded once the stage
/// completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Path to the executable to launch.
    pub program: PathBuf,

    /// Argument list. Flags for unset options are omitted entirely,
    /// never emitted with an empty value.
    pub args: Vec<String>,

    /// Working directory for the child process, if any.
    pub working_dir: Option<PathBuf>,

    /// Output handling mode.
    pub capture: CaptureMode,
}

impl ToolInvocation {
    /// Create a streamed invocation of `program` with the given arguments.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            capture: CaptureMode::Streamed,
        }
    }

    /// Switch the invocation to silent (capture-only) mode.
    pub fn silent(mut self) -> Self {
        self.capture = CaptureMode::Silent;
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Render the command line for logging.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Every stage the orchestrator can schedule, in no particular order.
///
/// A run's plan is an ordered subset of these, chosen from the
/// configuration flags before the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageKind {
    /// Clear the decode tool's framework resource cache.
    ClearFramework,

    /// Merge a split APK bundle into a single installable APK.
    MergeSplits,

    /// Decode an APK into an editable project directory.
    Decode,

    /// Post-decode fix-up pass (manifest scrubbing, yml fixes).
    FixErrors,

    /// Build a project directory back into an APK.
    Build,

    /// Create an unsigned convenience copy of the built APK.
    CreateUnsignedApk,

    /// Byte-align the APK archive.
    Zipalign,

    /// Sign the APK.
    Sign,

    /// Install the APK onto a connected device.
    Install,
}

impl StageKind {
    /// Human-readable stage name used in logs and failure messages.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::ClearFramework => "clear framework",
            StageKind::MergeSplits => "merge splits",
            StageKind::Decode => "decode",
            StageKind::FixErrors => "fix errors",
            StageKind::Build => "build",
            StageKind::CreateUnsignedApk => "create unsigned apk",
            StageKind::Zipalign => "zipalign",
            StageKind::Sign => "sign",
            StageKind::Install => "install",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The immutable record of one completed stage.
///
/// Produced exactly once per stage; feeds the decision of whether the run
/// proceeds or aborts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage this result belongs to.
    pub stage: StageKind,

    /// Exit code of the backing tool. `0` is success for every wrapped
    /// tool; the orchestrator does not interpret specific non-zero codes.
    pub exit_code: i32,

    /// Captured standard output, line-joined in delivery order.
    pub stdout: String,

    /// Captured standard error, line-joined in delivery order.
    pub stderr: String,
}

impl StageResult {
    /// Whether the stage succeeded (exit code zero).
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// The text surfaced as a run failure message: stderr if the tool
    /// produced any, otherwise stdout, verbatim either way.
    pub fn failure_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}
