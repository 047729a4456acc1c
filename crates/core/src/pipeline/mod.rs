//! Pipeline execution engine.
//!
//! One run executes one operation as an ordered list of stages. The plan
//! is fixed before the run starts, each stage is backed by at most one
//! external tool invocation, and stage outputs move through the run's
//! [`StagingArea`] so a failure never corrupts previously committed
//! artifacts. All observable progress is published as [`Event`]s.

pub mod backend;
pub mod fixups;
pub mod staging;

pub use backend::DecodeBackend;
pub use staging::StagingArea;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use af_protocol::ipc::Event;
use af_protocol::run_models::{Operation, PipelineRun};
use af_protocol::tool_models::{CaptureMode, StageKind, StageResult, ToolInvocation};
use af_protocol::RunConfig;
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::process::{ChildProcessLister, ProcessRegistry, ToolProcess};
use crate::state::run::{
    advance_stage, cancel_run, complete_run, create_run, fail_run, log_to_run, start_run,
};
use crate::tools::{adb, apkeditor, apksigner, apktool, zipalign, Toolchain};
use staging::{STAGED_APK, STAGED_OUTPUT_APK, STAGED_PROJECT, STAGED_SPLIT};

/// Compute the ordered stage list for an operation under a configuration
/// snapshot. Pure: the same inputs always produce the same plan.
pub fn plan_stages(operation: Operation, config: &RunConfig) -> Vec<StageKind> {
    match operation {
        Operation::Decode => {
            let mut stages = Vec::new();
            if config.decode.clear_framework_first && !config.use_apkeditor {
                stages.push(StageKind::ClearFramework);
            }
            stages.push(StageKind::Decode);
            if config.decode.fix_errors && !config.use_apkeditor {
                stages.push(StageKind::FixErrors);
            }
            stages
        }
        Operation::Build => {
            let mut stages = vec![StageKind::Build];
            if config.build.create_unsigned_apk {
                stages.push(StageKind::CreateUnsignedApk);
            }
            if config.build.zipalign_after_build {
                stages.push(StageKind::Zipalign);
            }
            if config.build.sign_after_build {
                stages.push(StageKind::Sign);
                if config.sign.install_after_sign {
                    stages.push(StageKind::Install);
                }
            }
            stages
        }
        Operation::Merge => vec![StageKind::MergeSplits],
        Operation::MergeAndDecode => {
            let mut stages = vec![StageKind::MergeSplits, StageKind::Decode];
            if config.decode.fix_errors && !config.use_apkeditor {
                stages.push(StageKind::FixErrors);
            }
            stages
        }
        Operation::Zipalign => vec![StageKind::Zipalign],
        Operation::Sign => {
            let mut stages = vec![StageKind::Sign];
            if config.sign.install_after_sign {
                stages.push(StageKind::Install);
            }
            stages
        }
        Operation::Install => vec![StageKind::Install],
        Operation::ClearFramework => vec![StageKind::ClearFramework],
    }
}

/// Drives pipeline runs against a resolved toolchain.
///
/// The engine holds no per-run state; every `run` call is independent and
/// receives its own configuration snapshot, event channel, and
/// cancellation token.
pub struct PipelineEngine {
    toolchain: Toolchain,
    registry: Arc<ProcessRegistry>,
    lister: Arc<dyn ChildProcessLister>,
}

impl PipelineEngine {
    pub fn new(
        toolchain: Toolchain,
        registry: Arc<ProcessRegistry>,
        lister: Arc<dyn ChildProcessLister>,
    ) -> Self {
        Self {
            toolchain,
            registry,
            lister,
        }
    }

    /// Execute `operation` against `input` to a terminal state.
    ///
    /// The returned run always carries a terminal status; tool failures
    /// and cancellation are folded into it rather than returned as
    /// errors. `Err` is reserved for setup failures before any stage
    /// could start. The staging directory is removed on every path out.
    pub async fn run(
        &self,
        run_id: Uuid,
        operation: Operation,
        input: PathBuf,
        config: &RunConfig,
        events_tx: Sender<Event>,
        cancel: CancellationToken,
    ) -> CoreResult<PipelineRun> {
        let temp_root = config.temp_root.clone().unwrap_or_else(std::env::temp_dir);
        let staging = StagingArea::create(&temp_root, run_id)?;

        let stages = plan_stages(operation, config);
        let mut run = create_run(
            run_id,
            operation,
            input.clone(),
            staging.root().to_path_buf(),
            stages,
            &events_tx,
        )
        .await;
        start_run(&mut run, &events_tx).await;

        let outcome = self
            .execute(&mut run, operation, &input, config, &staging, &events_tx, &cancel)
            .await;
        staging.cleanup();

        match outcome {
            Ok(()) => complete_run(&mut run, &events_tx).await,
            Err(err) if err.is_cancelled() => cancel_run(&mut run, &events_tx).await,
            Err(err) => {
                let message = match &err {
                    CoreError::ToolExecutionFailure(result) => result.failure_text().to_string(),
                    other => other.to_string(),
                };
                fail_run(&mut run, &events_tx, message).await;
            }
        }
        Ok(run)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        run: &mut PipelineRun,
        operation: Operation,
        input: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        match operation {
            Operation::Decode => self
                .decode_flow(run, input, config, staging, events_tx, cancel)
                .await
                .map(|_| ()),
            Operation::Build => {
                self.build_flow(run, input, config, staging, events_tx, cancel)
                    .await
            }
            Operation::Merge => self
                .merge_flow(run, input, config, staging, events_tx, cancel)
                .await
                .map(|_| ()),
            Operation::MergeAndDecode => {
                let merged = self
                    .merge_flow(run, input, config, staging, events_tx, cancel)
                    .await?;
                self.decode_flow(run, &merged, config, staging, events_tx, cancel)
                    .await
                    .map(|_| ())
            }
            Operation::Zipalign => {
                self.align_flow(run, input, config, staging, events_tx, cancel)
                    .await
            }
            Operation::Sign => {
                self.sign_flow(run, input, config, staging, events_tx, cancel)
                    .await
            }
            Operation::Install => self.install_stage(run, input, config, events_tx, cancel).await,
            Operation::ClearFramework => self
                .run_tool_stage(
                    run,
                    StageKind::ClearFramework,
                    apktool::clear_framework(&self.toolchain),
                    events_tx,
                    cancel,
                )
                .await
                .map(|_| ()),
        }
    }

    /// Decode `input` into a project directory. Returns the committed
    /// project path.
    async fn decode_flow(
        &self,
        run: &mut PipelineRun,
        input: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        let output_dir = match &config.decode.output_dir {
            Some(dir) => dir.clone(),
            None => default_decode_dir(input)?,
        };
        if output_dir.exists() && !config.decode.force_overwrite {
            return Err(CoreError::Precondition(format!(
                "{} already exists, enable force overwrite to replace it",
                output_dir.display()
            )));
        }

        if config.decode.clear_framework_first && !config.use_apkeditor {
            self.run_tool_stage(
                run,
                StageKind::ClearFramework,
                apktool::clear_framework(&self.toolchain),
                events_tx,
                cancel,
            )
            .await?;
        }

        let tool_input = if config.utf8_filename_workaround {
            staging.stage_file(input, STAGED_APK)?
        } else {
            input.to_path_buf()
        };
        let staged_project = staging.staged(STAGED_PROJECT);
        let invocation = if config.use_apkeditor {
            apkeditor::decode(&self.toolchain, &tool_input, &staged_project, true)
        } else {
            apktool::decode(&self.toolchain, &tool_input, &staged_project, true)
        };
        self.run_tool_stage(run, StageKind::Decode, invocation, events_tx, cancel)
            .await?;

        if config.decode.fix_errors && !config.use_apkeditor {
            let applied = fixups::fix_apktool_project(&staged_project);
            record_internal_stage(
                run,
                StageKind::FixErrors,
                0,
                format!("{applied} fixups applied"),
                events_tx,
            )
            .await;
        }

        staging.commit_dir(STAGED_PROJECT, &output_dir)?;
        log_to_run(run, events_tx, format!("decoded to {}", output_dir.display())).await;
        Ok(output_dir)
    }

    /// Build a project directory back into an APK, then run the optional
    /// post-build chain.
    async fn build_flow(
        &self,
        run: &mut PipelineRun,
        project: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let backend = DecodeBackend::detect(project).ok_or_else(|| {
            CoreError::Precondition(format!(
                "{} is not a decoded project directory",
                project.display()
            ))
        })?;

        let apk_name = format!("{}.apk", leaf_name(project));
        let output_apk = match &config.build.output_dir {
            Some(dir) => dir.join(&apk_name),
            // apktool's own convention: dist/ inside the project
            None => project.join("dist").join(&apk_name),
        };

        let tool_input = if config.utf8_filename_workaround {
            staging.stage_dir(project, STAGED_PROJECT)?
        } else {
            project.to_path_buf()
        };
        let staged_apk = staging.staged(STAGED_OUTPUT_APK);
        let invocation = match backend {
            DecodeBackend::Apktool => apktool::build(&self.toolchain, &tool_input, &staged_apk),
            DecodeBackend::ApkEditor => apkeditor::build(&self.toolchain, &tool_input, &staged_apk),
        };
        self.run_tool_stage(run, StageKind::Build, invocation, events_tx, cancel)
            .await?;

        if config.build.create_unsigned_apk {
            let unsigned = sibling_with_suffix(&output_apk, "_unsigned");
            let copied = output_apk
                .parent()
                .map(fs::create_dir_all)
                .transpose()
                .and_then(|_| fs::copy(&staged_apk, &unsigned));
            match copied {
                Ok(_) => {
                    record_internal_stage(
                        run,
                        StageKind::CreateUnsignedApk,
                        0,
                        format!("unsigned copy at {}", unsigned.display()),
                        events_tx,
                    )
                    .await;
                }
                // Warning only, the chain continues.
                Err(err) => {
                    record_internal_stage(
                        run,
                        StageKind::CreateUnsignedApk,
                        1,
                        format!("unsigned copy failed: {err}"),
                        events_tx,
                    )
                    .await;
                    log_to_run(
                        run,
                        events_tx,
                        format!("warning: unsigned copy failed: {err}"),
                    )
                    .await;
                }
            }
        }

        if config.build.zipalign_after_build {
            let mut options = config.zipalign.clone();
            options.check_only = false;
            let aligned = staging.staged("aligned.apk");
            let invocation = zipalign::align(&self.toolchain, &options, &staged_apk, Some(&aligned));
            self.run_tool_stage(run, StageKind::Zipalign, invocation, events_tx, cancel)
                .await?;
            replace_staged(&aligned, &staged_apk)?;
        }

        if config.build.sign_after_build {
            let signed = staging.staged("signed.apk");
            let invocation = apksigner::sign(&self.toolchain, &config.sign, &staged_apk, &signed);
            self.run_tool_stage(run, StageKind::Sign, invocation, events_tx, cancel)
                .await?;
            replace_staged(&signed, &staged_apk)?;
        }

        staging.commit_file(STAGED_OUTPUT_APK, &output_apk)?;
        if config.build.sign_after_build {
            // The signer left its companion under the staged name; a kept
            // idsig belongs next to the committed output.
            handle_idsig(
                &staging.staged("signed.apk"),
                Some(&output_apk),
                config.sign.delete_idsig,
            );
        }
        log_to_run(run, events_tx, format!("built {}", output_apk.display())).await;

        if config.build.sign_after_build && config.sign.install_after_sign {
            self.install_stage(run, &output_apk, config, events_tx, cancel)
                .await?;
        }
        Ok(())
    }

    /// Merge a split bundle into a single APK. Returns the committed
    /// merged path.
    async fn merge_flow(
        &self,
        run: &mut PipelineRun,
        input: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<PathBuf> {
        let merged = sibling_with_suffix(input, "_merged");

        let tool_input = if config.utf8_filename_workaround {
            staging.stage_file(input, &staged_split_name(input))?
        } else {
            input.to_path_buf()
        };
        let staged_out = staging.staged(STAGED_OUTPUT_APK);
        let invocation = apkeditor::merge(&self.toolchain, &tool_input, &staged_out);
        self.run_tool_stage(run, StageKind::MergeSplits, invocation, events_tx, cancel)
            .await?;

        staging.commit_file(STAGED_OUTPUT_APK, &merged)?;
        log_to_run(run, events_tx, format!("merged to {}", merged.display())).await;
        Ok(merged)
    }

    /// Align an existing APK, or verify alignment in check-only mode.
    async fn align_flow(
        &self,
        run: &mut PipelineRun,
        input: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let options = &config.zipalign;
        if options.check_only {
            let invocation = zipalign::align(&self.toolchain, options, input, None);
            self.run_tool_stage(run, StageKind::Zipalign, invocation, events_tx, cancel)
                .await?;
            return Ok(());
        }

        let tool_input = if config.utf8_filename_workaround {
            staging.stage_file(input, STAGED_APK)?
        } else {
            input.to_path_buf()
        };
        let staged_out = staging.staged(STAGED_OUTPUT_APK);
        let invocation = zipalign::align(&self.toolchain, options, &tool_input, Some(&staged_out));
        self.run_tool_stage(run, StageKind::Zipalign, invocation, events_tx, cancel)
            .await?;

        let dest = if options.overwrite_output {
            input.to_path_buf()
        } else {
            sibling_with_suffix(input, "_aligned")
        };
        staging.commit_file(STAGED_OUTPUT_APK, &dest)?;
        log_to_run(run, events_tx, format!("aligned {}", dest.display())).await;
        Ok(())
    }

    /// Sign an existing APK, then optionally install it.
    async fn sign_flow(
        &self,
        run: &mut PipelineRun,
        input: &Path,
        config: &RunConfig,
        staging: &StagingArea,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let tool_input = if config.utf8_filename_workaround {
            staging.stage_file(input, STAGED_APK)?
        } else {
            input.to_path_buf()
        };
        let staged_out = staging.staged(STAGED_OUTPUT_APK);
        let invocation = apksigner::sign(&self.toolchain, &config.sign, &tool_input, &staged_out);
        self.run_tool_stage(run, StageKind::Sign, invocation, events_tx, cancel)
            .await?;

        let dest = if config.sign.overwrite_input {
            input.to_path_buf()
        } else {
            sibling_with_suffix(input, "_signed")
        };
        handle_idsig(&staged_out, Some(&dest), config.sign.delete_idsig);
        staging.commit_file(STAGED_OUTPUT_APK, &dest)?;
        log_to_run(run, events_tx, format!("signed {}", dest.display())).await;

        if config.sign.install_after_sign {
            self.install_stage(run, &dest, config, events_tx, cancel).await?;
        }
        Ok(())
    }

    /// Install an APK to the configured device.
    async fn install_stage(
        &self,
        run: &mut PipelineRun,
        apk: &Path,
        config: &RunConfig,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let serial = config.adb.device_serial.as_deref().ok_or_else(|| {
            CoreError::Precondition("no target device selected".to_string())
        })?;
        let invocation = adb::install(&self.toolchain, &config.adb, serial, apk);
        self.run_tool_stage(run, StageKind::Install, invocation, events_tx, cancel)
            .await?;
        Ok(())
    }

    /// Run one external tool stage to completion.
    ///
    /// Checks cancellation before launching, registers the process handle
    /// for forced disposal, streams output as events, and turns a
    /// non-zero exit into `ToolExecutionFailure`. On cancellation during
    /// the stage the whole process tree is killed before returning.
    async fn run_tool_stage(
        &self,
        run: &mut PipelineRun,
        stage: StageKind,
        invocation: ToolInvocation,
        events_tx: &Sender<Event>,
        cancel: &CancellationToken,
    ) -> CoreResult<StageResult> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let _ = events_tx
            .send(Event::StageStarted {
                run_id: run.id,
                stage,
            })
            .await;
        log_to_run(run, events_tx, format!("$ {}", invocation.display_line())).await;

        let process = ToolProcess::spawn(&invocation)?;
        let handle = process.handle();
        self.registry.register(handle.clone());

        let (line_tx, forwarder) = match invocation.capture {
            CaptureMode::Streamed => {
                let (tx, mut rx) = mpsc::channel(256);
                let forward = events_tx.clone();
                let run_id = run.id;
                let task = tokio::spawn(async move {
                    while let Some((source, line)) = rx.recv().await {
                        let _ = forward
                            .send(Event::ToolOutput {
                                run_id,
                                source,
                                line,
                            })
                            .await;
                    }
                });
                (Some(tx), Some(task))
            }
            CaptureMode::Silent => (None, None),
        };

        let output = tokio::select! {
            output = process.stream_to_exit(line_tx) => output,
            () = cancel.cancelled() => {
                handle.cancel(self.lister.as_ref());
                self.registry.unregister(handle.id());
                if let Some(task) = forwarder {
                    let _ = task.await;
                }
                return Err(CoreError::Cancelled);
            }
        };
        self.registry.unregister(handle.id());
        // The forwarder ends once the per-stage sender drops; every
        // queued output line must reach the channel before any terminal
        // event for the stage.
        if let Some(task) = forwarder {
            let _ = task.await;
        }
        let output = output?;

        let result = StageResult {
            stage,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        let _ = events_tx
            .send(Event::StageFinished {
                run_id: run.id,
                result: result.clone(),
            })
            .await;
        if !result.succeeded() {
            return Err(CoreError::ToolExecutionFailure(Box::new(result)));
        }
        advance_stage(run);
        Ok(result)
    }
}

/// Record a stage the orchestrator performs itself (no external tool).
/// The stage cursor advances regardless of outcome; the caller decides
/// whether a non-zero code fails the run.
async fn record_internal_stage(
    run: &mut PipelineRun,
    stage: StageKind,
    exit_code: i32,
    note: String,
    events_tx: &Sender<Event>,
) {
    let _ = events_tx
        .send(Event::StageStarted {
            run_id: run.id,
            stage,
        })
        .await;
    let result = StageResult {
        stage,
        exit_code,
        stdout: note,
        stderr: String::new(),
    };
    let _ = events_tx
        .send(Event::StageFinished {
            run_id: run.id,
            result,
        })
        .await;
    advance_stage(run);
}

/// Default decode destination: a sibling directory named after the APK.
fn default_decode_dir(input: &Path) -> CoreResult<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CoreError::Precondition(format!("{} has no file name", input.display()))
        })?;
    Ok(input.parent().unwrap_or(Path::new(".")).join(stem))
}

/// `dir/name.apk` -> `dir/name<suffix>.apk`
fn sibling_with_suffix(apk: &Path, suffix: &str) -> PathBuf {
    let stem = apk
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    apk.parent()
        .unwrap_or(Path::new("."))
        .join(format!("{stem}{suffix}.apk"))
}

fn leaf_name(dir: &Path) -> String {
    dir.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

/// Fixed ASCII name for a staged split bundle, keeping the original
/// extension so the merger recognizes the container format.
fn staged_split_name(input: &Path) -> String {
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{STAGED_SPLIT}.{ext}"),
        None => STAGED_SPLIT.to_string(),
    }
}

/// Move a chain-internal staged artifact over the staged output.
fn replace_staged(from: &Path, to: &Path) -> CoreResult<()> {
    fs::rename(from, to).map_err(|source| CoreError::StagingIo {
        path: from.to_path_buf(),
        source,
    })
}

/// Delete the signer's `.idsig` companion, or move it next to the final
/// output when it is kept. Best effort either way.
fn handle_idsig(signed: &Path, dest: Option<&Path>, delete: bool) {
    let idsig = PathBuf::from(format!("{}.idsig", signed.display()));
    if !idsig.exists() {
        return;
    }
    if delete {
        if let Err(err) = fs::remove_file(&idsig) {
            tracing::warn!(path = %idsig.display(), %err, "idsig cleanup failed");
        }
    } else if let Some(dest) = dest {
        let kept = PathBuf::from(format!("{}.idsig", dest.display()));
        let moved = fs::rename(&idsig, &kept)
            .or_else(|_| fs::copy(&idsig, &kept).and_then(|_| fs::remove_file(&idsig)));
        if let Err(err) = moved {
            tracing::warn!(path = %idsig.display(), %err, "idsig move failed");
        }
    }
}
