//! Cancellation sweeps the whole process tree of the active stage.

mod common;

use af_core::RunManager;
use af_protocol::run_models::{Operation, RunStatus};
use af_protocol::RunConfig;
use common::fixtures::{fake_toolchain, write_script};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

/// Dead means gone from /proc or left as a zombie awaiting reaping.
fn process_is_dead(pid: u32) -> bool {
    let stat = match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat,
        Err(_) => return true,
    };
    stat.rfind(')')
        .and_then(|end| stat[end + 1..].split_whitespace().next().map(str::to_string))
        .is_some_and(|state| state == "Z")
}

async fn wait_until_dead(pid: u32) -> bool {
    for _ in 0..200 {
        if process_is_dead(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancel_kills_grandchildren_of_the_tool() {
    let dir = tempfile::tempdir().expect("tempdir");
    let child_pid_file = dir.path().join("child.pid");

    // The fake tool forks a long-running child (like a decoder spawning
    // a JVM) and then blocks on it.
    write_script(
        dir.path(),
        "zipalign",
        &format!(
            "sleep 300 &\necho $! > {}\nwait",
            child_pid_file.display()
        ),
    );
    let apk = dir.path().join("app.apk");
    fs::write(&apk, b"x").expect("apk");

    let (tx, _rx) = mpsc::channel(256);
    let manager = RunManager::new(fake_toolchain(dir.path()), tx);

    let mut config = RunConfig::default();
    config.zipalign.check_only = true;
    config.temp_root = Some(dir.path().to_path_buf());

    let run_id = manager.start_run(Operation::Zipalign, apk, config).await;

    // Wait for the fake tool to record its child's pid.
    let mut child_pid = None;
    for _ in 0..200 {
        if let Ok(text) = fs::read_to_string(&child_pid_file) {
            if let Ok(pid) = text.trim().parse::<u32>() {
                child_pid = Some(pid);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let child_pid = child_pid.expect("fake tool never started");

    assert!(manager.cancel(run_id).await);

    assert!(
        wait_until_dead(child_pid).await,
        "grandchild {child_pid} survived cancellation"
    );

    let mut run = None;
    for _ in 0..200 {
        if let Some(finished) = manager.get_run(run_id).await {
            run = Some(finished);
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(run.expect("terminal run").status, RunStatus::Cancelled);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn stages_after_the_cancelled_one_never_launch() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The build stage blocks; the align stage would follow it.
    let java = write_script(dir.path(), "java", "sleep 300");
    let zipalign = write_script(dir.path(), "zipalign", "echo aligned");

    let project = dir.path().join("app");
    fs::create_dir_all(&project).expect("project");
    fs::write(project.join("apktool.yml"), b"version: 2.9.3").expect("marker");

    let (tx, _rx) = mpsc::channel(256);
    let manager = RunManager::new(fake_toolchain(dir.path()), tx);

    let mut config = RunConfig::default();
    config.build.zipalign_after_build = true;
    config.temp_root = Some(dir.path().to_path_buf());

    let run_id = manager.start_run(Operation::Build, project, config).await;

    // Wait until the build tool has actually started.
    let java_log = format!("{}.log", java.display());
    for _ in 0..200 {
        if Path::new(&java_log).exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(manager.cancel(run_id).await);

    let mut run = None;
    for _ in 0..200 {
        if let Some(finished) = manager.get_run(run_id).await {
            run = Some(finished);
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(run.expect("terminal run").status, RunStatus::Cancelled);
    assert!(!Path::new(&format!("{}.log", zipalign.display())).exists());
}
