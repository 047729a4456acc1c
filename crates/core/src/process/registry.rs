//! Registry of live tool processes for application shutdown.

use std::sync::Mutex;
use uuid::Uuid;

use crate::process::tree::ChildProcessLister;
use crate::process::wrapper::ProcessHandle;

/// Tracks every wrapper that is currently alive so shutdown can dispose
/// all of them exactly once.
///
/// Disposal of each wrapper is independently fault-isolated: a dispose is
/// infallible by contract (errors are logged inside the kill sweep), so
/// one wrapper can never prevent the others from being disposed.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    handles: Mutex<Vec<ProcessHandle>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly spawned wrapper.
    pub fn register(&self, handle: ProcessHandle) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(handle);
        }
    }

    /// Stop tracking a wrapper once its stage is over.
    pub fn unregister(&self, id: Uuid) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| h.id() != id);
        }
    }

    /// Number of currently tracked wrappers.
    pub fn len(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every tracked wrapper. Called on application shutdown;
    /// repeat calls are harmless since disposal is idempotent.
    pub fn dispose_all(&self, lister: &dyn ChildProcessLister) {
        let handles = match self.handles.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            handle.dispose(lister);
        }
    }
}
