//! Process-tree enumeration and kill sweep.
//!
//! The wrapped tools routinely fork helpers (the decoder spawns a JVM,
//! the JVM may spawn aapt), so cancelling the root alone leaves orphans.
//! The sweep re-enumerates children at kill time rather than using a
//! cached snapshot, since children may spawn after any snapshot is taken.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Capability to list the direct children of a process.
///
/// The kill sweep itself is platform-independent; only this enumeration
/// is platform-specific.
pub trait ChildProcessLister: Send + Sync {
    /// Pids whose parent is `pid`, at the moment of the call.
    fn list_children(&self, pid: u32) -> Vec<u32>;
}

/// Linux implementation backed by `/proc/<pid>/stat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsLister;

impl ChildProcessLister for ProcfsLister {
    fn list_children(&self, pid: u32) -> Vec<u32> {
        let Ok(entries) = fs::read_dir("/proc") else {
            return Vec::new();
        };
        let mut children = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(candidate) = name.to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            if parent_of(&entry.path()) == Some(pid) {
                children.push(candidate);
            }
        }
        children
    }
}

/// Parse the ppid (field 4) out of `/proc/<pid>/stat`. The comm field can
/// contain spaces and parentheses, so split after the last `)`.
fn parent_of(proc_dir: &Path) -> Option<u32> {
    let stat = fs::read_to_string(proc_dir.join("stat")).ok()?;
    let after_comm = &stat[stat.rfind(')')? + 1..];
    after_comm.split_whitespace().nth(1)?.parse().ok()
}

/// Kill `pid` and every process that is currently a descendant of it.
///
/// Descendants are enumerated at call time and killed leaves-first; a
/// failure to kill one descendant is logged and does not stop the sweep.
/// Killing an already-exited process is a no-op. The current process is
/// never targeted, even if pid reuse makes it appear in the tree.
pub fn kill_tree(pid: u32, lister: &dyn ChildProcessLister) {
    // pid 0 addresses the caller's whole process group on unix.
    if pid == 0 {
        return;
    }
    let mut visited = HashSet::new();
    kill_tree_inner(pid, lister, &mut visited);
}

fn kill_tree_inner(pid: u32, lister: &dyn ChildProcessLister, visited: &mut HashSet<u32>) {
    if pid == std::process::id() || !visited.insert(pid) {
        return;
    }
    for child in lister.list_children(pid) {
        kill_tree_inner(child, lister, visited);
    }
    kill_one(pid);
}

#[cfg(unix)]
fn kill_one(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(pid, "killed process"),
        // ESRCH: already exited between enumeration and kill
        Err(nix::errno::Errno::ESRCH) => {}
        Err(err) => tracing::warn!(pid, %err, "failed to kill process, continuing sweep"),
    }
}

#[cfg(not(unix))]
fn kill_one(pid: u32) {
    tracing::warn!(pid, "kill sweep not supported on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fixed-topology lister for exercising the sweep without real
    /// processes.
    struct FakeLister {
        children: HashMap<u32, Vec<u32>>,
    }

    impl ChildProcessLister for FakeLister {
        fn list_children(&self, pid: u32) -> Vec<u32> {
            self.children.get(&pid).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn sweep_visits_descendants_before_root() {
        let lister = FakeLister {
            children: HashMap::from([(100, vec![101, 102]), (101, vec![103])]),
        };
        let mut visited = HashSet::new();
        // Dead pids: every kill is an ESRCH no-op, we only check traversal.
        kill_tree_inner(100, &lister, &mut visited);
        assert_eq!(visited, HashSet::from([100, 101, 102, 103]));
    }

    #[test]
    fn sweep_survives_cycles_from_pid_reuse() {
        let lister = FakeLister {
            children: HashMap::from([(100, vec![101]), (101, vec![100])]),
        };
        let mut visited = HashSet::new();
        kill_tree_inner(100, &lister, &mut visited);
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn sweep_never_starts_from_pid_zero() {
        use std::sync::Mutex;

        struct RecordingLister {
            queried: Mutex<Vec<u32>>,
        }

        impl ChildProcessLister for RecordingLister {
            fn list_children(&self, pid: u32) -> Vec<u32> {
                self.queried.lock().expect("lock").push(pid);
                Vec::new()
            }
        }

        let lister = RecordingLister {
            queried: Mutex::new(Vec::new()),
        };
        kill_tree(0, &lister);
        assert!(lister.queried.lock().expect("lock").is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn procfs_lister_sees_own_children() {
        let mut child = std::process::Command::new("sleep")
            .arg("5")
            .spawn()
            .expect("spawn sleep");
        let children = ProcfsLister.list_children(std::process::id());
        assert!(children.contains(&child.id()));
        let _ = child.kill();
        let _ = child.wait();
    }
}
