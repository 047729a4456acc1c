//! Wrapped tool surfaces.
//!
//! One module per external tool. Each module owns that tool's
//! option-to-flag table and builds [`af_protocol::ToolInvocation`]s from a
//! configuration snapshot; flags for unset options are omitted entirely,
//! never emitted with an empty value.

pub mod aapt;
pub mod adb;
pub mod apkeditor;
pub mod apksigner;
pub mod apktool;
pub mod zipalign;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resolved locations of every external tool the pipeline can invoke.
///
/// Built once from [`ToolchainConfig`]; the jar-based tools run through
/// the resolved `java`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub java: PathBuf,
    pub apktool_jar: PathBuf,
    pub apkeditor_jar: PathBuf,
    pub apksigner_jar: PathBuf,
    pub aapt: PathBuf,
    pub aapt2: PathBuf,
    pub zipalign: PathBuf,
    pub adb: PathBuf,
}

/// On-disk tool locations as configured. Unset entries fall back to
/// `$PATH` discovery for the native tools and to conventional jar names
/// next to the configured tools directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Directory holding the bundled jars and binaries.
    pub tools_dir: Option<PathBuf>,

    pub java: Option<PathBuf>,
    pub apktool_jar: Option<PathBuf>,
    pub apkeditor_jar: Option<PathBuf>,
    pub apksigner_jar: Option<PathBuf>,
    pub aapt: Option<PathBuf>,
    pub aapt2: Option<PathBuf>,
    pub zipalign: Option<PathBuf>,
    pub adb: Option<PathBuf>,
}

impl Toolchain {
    /// Resolve tool paths from configuration, falling back to `$PATH`
    /// for java and adb and to conventional names under `tools_dir` for
    /// everything else. Paths are resolved lazily in the sense that a
    /// missing tool only fails when its stage actually launches.
    pub fn resolve(config: &ToolchainConfig) -> Self {
        let dir = config.tools_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let in_dir = |name: &str| dir.join(name);

        Self {
            java: resolve_binary(config.java.as_deref(), "java"),
            apktool_jar: config
                .apktool_jar
                .clone()
                .unwrap_or_else(|| in_dir("apktool.jar")),
            apkeditor_jar: config
                .apkeditor_jar
                .clone()
                .unwrap_or_else(|| in_dir("APKEditor.jar")),
            apksigner_jar: config
                .apksigner_jar
                .clone()
                .unwrap_or_else(|| in_dir("apksigner.jar")),
            aapt: config.aapt.clone().unwrap_or_else(|| in_dir("aapt")),
            aapt2: config.aapt2.clone().unwrap_or_else(|| in_dir("aapt2")),
            zipalign: resolve_binary(config.zipalign.as_deref(), "zipalign"),
            adb: resolve_binary(config.adb.as_deref(), "adb"),
        }
    }
}

fn resolve_binary(configured: Option<&Path>, name: &str) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Build a `java -jar <jar> …` argument list, the shared shape of the
/// apktool, APKEditor, and apksigner surfaces.
pub(crate) fn java_jar(jar: &Path, args: Vec<String>) -> Vec<String> {
    let mut full = vec!["-jar".to_string(), jar.display().to_string()];
    full.extend(args);
    full
}
