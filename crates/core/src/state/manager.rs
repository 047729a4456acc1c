//! Run manager for coordinating concurrent pipeline runs.
//!
//! The RunManager owns the engine and spawns each run on its own tokio
//! task. It keeps a cancellation token per in-flight run and a registry
//! of live tool processes, so a run can be cancelled (or the whole
//! manager shut down) from outside the worker that is driving it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use af_protocol::ipc::Event;
use af_protocol::run_models::{Operation, PipelineRun};
use af_protocol::RunConfig;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::pipeline::PipelineEngine;
use crate::process::{ChildProcessLister, ProcessRegistry, ProcfsLister};
use crate::tools::Toolchain;

/// Coordinates all pipeline runs for one engine instance.
pub struct RunManager {
    engine: Arc<PipelineEngine>,

    /// Terminal state of every run this manager has driven.
    runs: Arc<Mutex<HashMap<Uuid, PipelineRun>>>,

    /// Cancellation tokens for runs that have not yet reached a terminal
    /// state. Removed by the worker on completion.
    tokens: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,

    registry: Arc<ProcessRegistry>,
    lister: Arc<dyn ChildProcessLister>,
    events_tx: mpsc::Sender<Event>,
}

impl RunManager {
    pub fn new(toolchain: Toolchain, events_tx: mpsc::Sender<Event>) -> Self {
        Self::with_lister(toolchain, events_tx, Arc::new(ProcfsLister))
    }

    /// Construct with an explicit child-process lister, for tests and
    /// non-procfs platforms.
    pub fn with_lister(
        toolchain: Toolchain,
        events_tx: mpsc::Sender<Event>,
        lister: Arc<dyn ChildProcessLister>,
    ) -> Self {
        let registry = Arc::new(ProcessRegistry::new());
        let engine = Arc::new(PipelineEngine::new(
            toolchain,
            Arc::clone(&registry),
            Arc::clone(&lister),
        ));
        Self {
            engine,
            runs: Arc::new(Mutex::new(HashMap::new())),
            tokens: Arc::new(Mutex::new(HashMap::new())),
            registry,
            lister,
            events_tx,
        }
    }

    /// Start a run in the background and return its id immediately.
    ///
    /// The id is allocated and its cancellation token registered before
    /// the worker task starts, so `cancel` works from the moment this
    /// returns. Progress arrives on the manager's event channel.
    pub async fn start_run(
        &self,
        operation: Operation,
        input: PathBuf,
        config: RunConfig,
    ) -> Uuid {
        let run_id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.tokens.lock().await.insert(run_id, token.clone());

        let engine = Arc::clone(&self.engine);
        let runs = Arc::clone(&self.runs);
        let tokens = Arc::clone(&self.tokens);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            match engine
                .run(run_id, operation, input, &config, events_tx, token)
                .await
            {
                Ok(finished) => {
                    runs.lock().await.insert(run_id, finished);
                }
                Err(err) => {
                    tracing::error!(%run_id, %err, "run setup failed");
                }
            }
            tokens.lock().await.remove(&run_id);
        });

        run_id
    }

    /// Request cancellation of a run.
    ///
    /// Sets the run's token; the worker kills the active process tree
    /// and stops before its next stage. Cancelling a run that already
    /// finished (or was never started) returns false.
    pub async fn cancel(&self, run_id: Uuid) -> bool {
        match self.tokens.lock().await.get(&run_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Snapshot of a finished run's terminal state.
    pub async fn get_run(&self, run_id: Uuid) -> Option<PipelineRun> {
        self.runs.lock().await.get(&run_id).cloned()
    }

    /// Number of runs still executing.
    pub async fn active_count(&self) -> usize {
        self.tokens.lock().await.len()
    }

    /// Cancel everything and dispose every live tool process exactly
    /// once. Safe to call more than once.
    pub async fn shutdown(&self) {
        for token in self.tokens.lock().await.values() {
            token.cancel();
        }
        self.registry.dispose_all(self.lister.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_protocol::run_models::RunStatus;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn toolchain_with_zipalign(zipalign: PathBuf) -> Toolchain {
        Toolchain {
            java: PathBuf::from("java"),
            apktool_jar: PathBuf::from("apktool.jar"),
            apkeditor_jar: PathBuf::from("APKEditor.jar"),
            apksigner_jar: PathBuf::from("apksigner.jar"),
            aapt: PathBuf::from("aapt"),
            aapt2: PathBuf::from("aapt2"),
            zipalign,
            adb: PathBuf::from("adb"),
        }
    }

    async fn wait_for_terminal(manager: &RunManager, run_id: Uuid) -> PipelineRun {
        for _ in 0..200 {
            if let Some(run) = manager.get_run(run_id).await {
                return run;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("run {run_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn check_only_align_run_succeeds_with_fake_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let zipalign = fake_tool(dir.path(), "zipalign", "echo 'Verification succesful'");
        let apk = dir.path().join("app.apk");
        fs::write(&apk, b"not really an apk").expect("apk");

        let (tx, mut rx) = mpsc::channel(256);
        let manager = RunManager::new(toolchain_with_zipalign(zipalign), tx);

        let mut config = RunConfig::default();
        config.zipalign.check_only = true;
        config.temp_root = Some(dir.path().to_path_buf());

        let run_id = manager.start_run(Operation::Zipalign, apk, config).await;
        let run = wait_for_terminal(&manager, run_id).await;
        assert_eq!(run.status, RunStatus::Succeeded);
        assert_eq!(manager.active_count().await, 0);

        // Drain: the terminal event must be RunFinished with Succeeded.
        let mut finished = None;
        while let Ok(event) = rx.try_recv() {
            if let Event::RunFinished { status, .. } = event {
                finished = Some(status);
            }
        }
        assert_eq!(finished, Some(RunStatus::Succeeded));
    }

    #[tokio::test]
    async fn failing_tool_fails_the_run_with_its_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let zipalign = fake_tool(dir.path(), "zipalign", "echo 'zip error' >&2; exit 2");
        let apk = dir.path().join("app.apk");
        fs::write(&apk, b"x").expect("apk");

        let (tx, mut rx) = mpsc::channel(256);
        let manager = RunManager::new(toolchain_with_zipalign(zipalign), tx);

        let mut config = RunConfig::default();
        config.zipalign.check_only = true;
        config.temp_root = Some(dir.path().to_path_buf());

        let run_id = manager.start_run(Operation::Zipalign, apk, config).await;
        let run = wait_for_terminal(&manager, run_id).await;
        assert_eq!(run.status, RunStatus::Failed);

        let mut message = None;
        while let Ok(event) = rx.try_recv() {
            if let Event::RunFinished { message: m, .. } = event {
                message = Some(m);
            }
        }
        assert!(message.expect("terminal message").contains("zip error"));
    }

    #[tokio::test]
    async fn cancel_kills_a_running_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let zipalign = fake_tool(dir.path(), "zipalign", "sleep 30");
        let apk = dir.path().join("app.apk");
        fs::write(&apk, b"x").expect("apk");

        let (tx, _rx) = mpsc::channel(256);
        let manager = RunManager::new(toolchain_with_zipalign(zipalign), tx);

        let mut config = RunConfig::default();
        config.zipalign.check_only = true;
        config.temp_root = Some(dir.path().to_path_buf());

        let run_id = manager.start_run(Operation::Zipalign, apk, config).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(manager.cancel(run_id).await);

        let run = wait_for_terminal(&manager, run_id).await;
        assert_eq!(run.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_unknown_run_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, _rx) = mpsc::channel(16);
        let manager = RunManager::new(
            toolchain_with_zipalign(dir.path().join("zipalign")),
            tx,
        );
        assert!(!manager.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, _rx) = mpsc::channel(16);
        let manager = RunManager::new(
            toolchain_with_zipalign(dir.path().join("zipalign")),
            tx,
        );
        manager.shutdown().await;
        manager.shutdown().await;
    }
}
