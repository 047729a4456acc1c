//! Run-scoped staging directories.
//!
//! Every stage writes into a private directory under the configured
//! temp root and only replaces the caller-visible output once the tool
//! has succeeded. A failed or cancelled stage therefore leaves any
//! previous output byte-for-byte untouched. The staging directory also
//! hosts the ASCII-only working names used by the non-ASCII path
//! workaround, scoped per run so concurrent runs never collide.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// ASCII working name for a staged single-APK input.
pub const STAGED_APK: &str = "tempapk.apk";
/// ASCII working name for a staged split-APK input.
pub const STAGED_SPLIT: &str = "tempsplit";
/// ASCII working name for a staged decode output directory.
pub const STAGED_PROJECT: &str = "dec";
/// ASCII working name for a staged built/merged APK output.
pub const STAGED_OUTPUT_APK: &str = "dec.apk";

/// A private scratch directory for one pipeline run.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create `temp_root/run-<id>`, including missing parents.
    pub fn create(temp_root: &Path, run_id: Uuid) -> CoreResult<Self> {
        let root = temp_root.join(format!("run-{run_id}"));
        fs::create_dir_all(&root).map_err(|source| CoreError::StagingIo {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a staged entry; nothing is created.
    pub fn staged(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Copy an input file into the area under `name`.
    pub fn stage_file(&self, input: &Path, name: &str) -> CoreResult<PathBuf> {
        let dest = self.staged(name);
        fs::copy(input, &dest).map_err(|source| CoreError::StagingIo {
            path: input.to_path_buf(),
            source,
        })?;
        Ok(dest)
    }

    /// Copy an input directory tree into the area under `name`.
    pub fn stage_dir(&self, input: &Path, name: &str) -> CoreResult<PathBuf> {
        let dest = self.staged(name);
        copy_dir_recursive(input, &dest).map_err(|source| CoreError::StagingIo {
            path: input.to_path_buf(),
            source,
        })?;
        Ok(dest)
    }

    /// Replace `final_path` with the staged file at `name`.
    ///
    /// Rename is tried first; a cross-device rename falls back to
    /// copy-then-remove. The previous output is only removed once the
    /// staged replacement is in place.
    pub fn commit_file(&self, name: &str, final_path: &Path) -> CoreResult<()> {
        let staged = self.staged(name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).map_err(|source| CoreError::StagingIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if fs::rename(&staged, final_path).is_ok() {
            return Ok(());
        }
        fs::copy(&staged, final_path)
            .and_then(|_| fs::remove_file(&staged))
            .map_err(|source| CoreError::StagingIo {
                path: staged.clone(),
                source,
            })?;
        Ok(())
    }

    /// Replace the directory at `final_path` with the staged tree at `name`.
    ///
    /// An existing tree is first renamed aside to a sibling `.prev` name
    /// and only deleted once the staged replacement is in place; if the
    /// swap fails the old tree is renamed back.
    pub fn commit_dir(&self, name: &str, final_path: &Path) -> CoreResult<()> {
        let staged = self.staged(name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).map_err(|source| CoreError::StagingIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let displaced = displaced_name(final_path);
        if final_path.exists() {
            if displaced.exists() {
                fs::remove_dir_all(&displaced).map_err(|source| CoreError::StagingIo {
                    path: displaced.clone(),
                    source,
                })?;
            }
            fs::rename(final_path, &displaced).map_err(|source| CoreError::StagingIo {
                path: final_path.to_path_buf(),
                source,
            })?;
        }

        let moved = fs::rename(&staged, final_path).or_else(|_| {
            copy_dir_recursive(&staged, final_path).and_then(|()| fs::remove_dir_all(&staged))
        });
        match moved {
            Ok(()) => {
                if displaced.exists() {
                    if let Err(err) = fs::remove_dir_all(&displaced) {
                        tracing::warn!(path = %displaced.display(), %err, "stale tree removal failed");
                    }
                }
                Ok(())
            }
            Err(source) => {
                if displaced.exists() {
                    let _ = fs::remove_dir_all(final_path);
                    if let Err(err) = fs::rename(&displaced, final_path) {
                        tracing::warn!(path = %final_path.display(), %err, "failed to restore previous tree");
                    }
                }
                Err(CoreError::StagingIo {
                    path: staged,
                    source,
                })
            }
        }
    }

    /// Remove the whole area. Failures are logged, never propagated;
    /// a leftover scratch directory must not mask the run's outcome.
    pub fn cleanup(&self) {
        if let Err(err) = fs::remove_dir_all(&self.root) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.root.display(), %err, "staging cleanup failed");
            }
        }
    }
}

/// Sibling name the previous tree is parked under during a swap.
fn displaced_name(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".prev");
    path.with_file_name(name)
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
