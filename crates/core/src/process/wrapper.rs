//! Wrapper around one spawned external tool process.
//!
//! The wrapper owns the child for the duration of one stage: it streams
//! both output pipes line-by-line, reports the exit code, and hands out a
//! [`ProcessHandle`] through which the lifecycle coordinator can cancel
//! the whole process tree or dispose the process without owning the
//! child itself.

use af_protocol::{StreamSource, ToolInvocation};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::process::tree::{kill_tree, ChildProcessLister};

/// Final output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was killed or the code is
    /// otherwise unavailable, which the orchestrator treats as failure.
    pub exit_code: i32,

    /// Captured stdout, line-joined in delivery order.
    pub stdout: String,

    /// Captured stderr, line-joined in delivery order.
    pub stderr: String,
}

#[derive(Debug, Default)]
struct HandleState {
    exited: AtomicBool,
    disposed: AtomicBool,
}

/// Cheap cloneable handle to a running tool process.
///
/// Cancellation and disposal act on the process id, never on the child
/// value, so they can run from the coordinator while the worker is still
/// awaiting the stream. Both are idempotent and no-ops once the process
/// has exited.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: Uuid,
    pid: u32,
    program: String,
    state: Arc<HandleState>,
}

impl ProcessHandle {
    /// Unique identity of this wrapper instance (not the OS pid, which
    /// can be reused).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The OS process id the handle controls.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process is known to have exited.
    pub fn has_exited(&self) -> bool {
        self.state.exited.load(Ordering::SeqCst)
    }

    /// Terminate the process and every descendant found at call time.
    ///
    /// Safe to call at any point; killing an exited process is a no-op.
    pub fn cancel(&self, lister: &dyn ChildProcessLister) {
        if self.has_exited() {
            return;
        }
        tracing::debug!(program = %self.program, pid = self.pid, "cancelling process tree");
        kill_tree(self.pid, lister);
    }

    /// Idempotent disposal: force-kills the tree if the process has not
    /// exited, exactly once. Safe to call multiple times and after
    /// [`ProcessHandle::cancel`].
    pub fn dispose(&self, lister: &dyn ChildProcessLister) {
        if self.state.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.has_exited() {
            tracing::debug!(program = %self.program, pid = self.pid, "disposing live process");
            kill_tree(self.pid, lister);
        }
    }

    fn mark_exited(&self) {
        self.state.exited.store(true, Ordering::SeqCst);
    }
}

/// One spawned external tool process.
///
/// Created in the running state; consumed by [`ToolProcess::stream_to_exit`],
/// which returns once the process terminates.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
    handle: ProcessHandle,
}

impl ToolProcess {
    /// Launch the invocation with stdout and stderr piped, never
    /// inherited. A missing or unrunnable executable surfaces
    /// [`CoreError::LaunchFailure`].
    pub fn spawn(invocation: &ToolInvocation) -> CoreResult<Self> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Last-resort safety net; normal paths dispose explicitly.
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| CoreError::LaunchFailure {
            program: invocation.program.clone(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);
        let handle = ProcessHandle {
            id: Uuid::new_v4(),
            pid,
            program: invocation.program.display().to_string(),
            state: Arc::new(HandleState::default()),
        };

        Ok(Self { child, handle })
    }

    /// Handle for cancellation and disposal from other tasks.
    pub fn handle(&self) -> ProcessHandle {
        self.handle.clone()
    }

    /// Stream both pipes to exit, forwarding each completed line through
    /// `line_tx` (when given) in delivery order, and return the exit code
    /// with the captured text.
    ///
    /// Suspends only the calling worker task. Each stream is internally
    /// ordered; interleaving between stdout and stderr follows OS
    /// delivery.
    pub async fn stream_to_exit(
        mut self,
        line_tx: Option<mpsc::Sender<(StreamSource, String)>>,
    ) -> CoreResult<ProcessOutput> {
        let (tx, mut rx) = mpsc::channel::<(StreamSource, String)>(256);

        if let Some(stdout) = self.child.stdout.take() {
            spawn_line_reader(BufReader::new(stdout), StreamSource::Stdout, tx.clone());
        }
        if let Some(stderr) = self.child.stderr.take() {
            spawn_line_reader(BufReader::new(stderr), StreamSource::Stderr, tx.clone());
        }
        drop(tx);

        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some((source, line)) = rx.recv().await {
            let sink = match source {
                StreamSource::Stdout => &mut stdout,
                StreamSource::Stderr => &mut stderr,
            };
            sink.push_str(&line);
            sink.push('\n');
            if let Some(forward) = &line_tx {
                // Receiver gone means the caller stopped listening;
                // keep draining so the child cannot block on a full pipe.
                let _ = forward.send((source, line)).await;
            }
        }

        let exit_code = match self.child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => {
                tracing::warn!(%err, "wait on child process failed");
                -1
            }
        };
        self.handle.mark_exited();

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

fn spawn_line_reader<R>(
    reader: R,
    source: StreamSource,
    tx: mpsc::Sender<(StreamSource, String)>,
) where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send((source, line)).await.is_err() {
                break;
            }
        }
    });
}
