//! Run lifecycle transitions.
//!
//! Free functions that mutate a [`PipelineRun`] and publish the matching
//! [`Event`]. Channel sends are fire-and-forget: a caller that stopped
//! listening never stalls or fails the run itself.

use af_protocol::ipc::Event;
use af_protocol::run_models::{Operation, PipelineRun, RunStatus};
use af_protocol::tool_models::StageKind;
use std::path::PathBuf;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

/// Create a pending run under a pre-allocated id and announce it.
pub async fn create_run(
    id: Uuid,
    operation: Operation,
    input: PathBuf,
    staging_dir: PathBuf,
    stages: Vec<StageKind>,
    events_tx: &Sender<Event>,
) -> PipelineRun {
    let run = PipelineRun::with_id(id, operation, input, staging_dir, stages);
    let _ = events_tx
        .send(Event::RunStarted {
            run_id: run.id,
            operation: format!("{operation:?}"),
        })
        .await;
    run
}

/// Transition to Running and emit the status update.
pub async fn start_run(run: &mut PipelineRun, events_tx: &Sender<Event>) {
    run.status = RunStatus::Running;
    send_status(run, events_tx).await;
}

/// Move to the next planned stage.
pub fn advance_stage(run: &mut PipelineRun) {
    run.current_stage += 1;
}

/// Append an orchestrator log line and emit it.
pub async fn log_to_run(run: &mut PipelineRun, events_tx: &Sender<Event>, message: String) {
    run.logs.push(message.clone());
    let _ = events_tx
        .send(Event::RunLog {
            run_id: run.id,
            message,
        })
        .await;
}

/// Mark the run Succeeded and emit its terminal event.
pub async fn complete_run(run: &mut PipelineRun, events_tx: &Sender<Event>) {
    finish(run, events_tx, RunStatus::Succeeded, String::new()).await;
}

/// Mark the run Failed and emit its terminal event with the failing
/// tool's captured text.
pub async fn fail_run(run: &mut PipelineRun, events_tx: &Sender<Event>, message: String) {
    finish(run, events_tx, RunStatus::Failed, message).await;
}

/// Mark the run Cancelled and emit its terminal event.
pub async fn cancel_run(run: &mut PipelineRun, events_tx: &Sender<Event>) {
    finish(run, events_tx, RunStatus::Cancelled, String::new()).await;
}

async fn finish(
    run: &mut PipelineRun,
    events_tx: &Sender<Event>,
    status: RunStatus,
    message: String,
) {
    run.status = status;
    send_status(run, events_tx).await;
    let _ = events_tx
        .send(Event::RunFinished {
            run_id: run.id,
            status,
            message,
        })
        .await;
}

async fn send_status(run: &PipelineRun, events_tx: &Sender<Event>) {
    let _ = events_tx
        .send(Event::RunStatusUpdate {
            run_id: run.id,
            status: run.status,
            stage_index: run.current_stage,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn pending_run(events_tx: &Sender<Event>) -> PipelineRun {
        create_run(
            Uuid::new_v4(),
            Operation::Decode,
            PathBuf::from("app.apk"),
            PathBuf::from("/tmp/run"),
            vec![StageKind::Decode],
            events_tx,
        )
        .await
    }

    #[tokio::test]
    async fn create_announces_the_run() {
        let (tx, mut rx) = mpsc::channel(10);
        let run = pending_run(&tx).await;
        assert_eq!(run.status, RunStatus::Pending);

        let event = rx.recv().await.expect("event");
        assert!(matches!(event, Event::RunStarted { run_id, .. } if run_id == run.id));
    }

    #[tokio::test]
    async fn start_moves_to_running() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut run = pending_run(&tx).await;
        let _ = rx.recv().await;

        start_run(&mut run, &tx).await;
        assert_eq!(run.status, RunStatus::Running);

        let event = rx.recv().await.expect("event");
        assert!(matches!(
            event,
            Event::RunStatusUpdate {
                status: RunStatus::Running,
                stage_index: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fail_emits_status_then_terminal_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut run = pending_run(&tx).await;
        let _ = rx.recv().await;

        fail_run(&mut run, &tx, "brut.common.BrutException".to_string()).await;
        assert_eq!(run.status, RunStatus::Failed);

        let first = rx.recv().await.expect("status");
        assert!(matches!(
            first,
            Event::RunStatusUpdate {
                status: RunStatus::Failed,
                ..
            }
        ));
        let second = rx.recv().await.expect("terminal");
        assert!(matches!(
            second,
            Event::RunFinished { status: RunStatus::Failed, message, .. }
                if message == "brut.common.BrutException"
        ));
    }

    #[tokio::test]
    async fn cancel_is_terminal_with_empty_message() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut run = pending_run(&tx).await;
        let _ = rx.recv().await;

        cancel_run(&mut run, &tx).await;
        let _ = rx.recv().await;
        let terminal = rx.recv().await.expect("terminal");
        assert!(matches!(
            terminal,
            Event::RunFinished { status: RunStatus::Cancelled, message, .. } if message.is_empty()
        ));
    }

    #[tokio::test]
    async fn dropped_receiver_never_fails_a_transition() {
        let (tx, rx) = mpsc::channel(10);
        drop(rx);
        let mut run = PipelineRun::new(
            Operation::Build,
            PathBuf::from("dir"),
            PathBuf::from("/tmp/run"),
            vec![StageKind::Build],
        );
        start_run(&mut run, &tx).await;
        complete_run(&mut run, &tx).await;
        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[test]
    fn advance_moves_the_stage_cursor() {
        let mut run = PipelineRun::new(
            Operation::Build,
            PathBuf::from("dir"),
            PathBuf::from("/tmp/run"),
            vec![StageKind::Build, StageKind::Zipalign],
        );
        advance_stage(&mut run);
        assert_eq!(run.current_stage, 1);
    }
}
