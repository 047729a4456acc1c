//! Decode backend detection.
//!
//! A decoded project directory carries a marker file identifying which
//! tool produced it, and a rebuild must go back through the same tool.

use std::path::Path;

/// Which decompiler family a project directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeBackend {
    Apktool,
    ApkEditor,
}

impl DecodeBackend {
    /// Marker file this backend leaves at the project root.
    pub fn marker(self) -> &'static str {
        match self {
            DecodeBackend::Apktool => "apktool.yml",
            DecodeBackend::ApkEditor => "path-map.json",
        }
    }

    /// Identify the backend that produced `project_dir`.
    ///
    /// The APKEditor marker is checked first; a directory carrying both
    /// markers counts as APKEditor output.
    pub fn detect(project_dir: &Path) -> Option<Self> {
        if project_dir.join(DecodeBackend::ApkEditor.marker()).is_file() {
            Some(DecodeBackend::ApkEditor)
        } else if project_dir.join(DecodeBackend::Apktool.marker()).is_file() {
            Some(DecodeBackend::Apktool)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DecodeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeBackend::Apktool => write!(f, "apktool"),
            DecodeBackend::ApkEditor => write!(f, "apkeditor"),
        }
    }
}
