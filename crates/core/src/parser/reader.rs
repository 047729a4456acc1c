//! Metadata extraction with a one-hop tool fallback.
//!
//! The primary dump tool occasionally produces nothing at all for APKs
//! it cannot read (non-ASCII resource names among other causes); the
//! same logical dump is then retried once against the secondary tool
//! binary before the extraction is declared failed.

use af_protocol::ApkMetadata;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::parser::badging::parse_badging;
use crate::process::ToolProcess;
use crate::tools::{aapt, Toolchain};

/// Runs badging dumps and parses the result.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    primary: PathBuf,
    secondary: PathBuf,
}

impl MetadataReader {
    /// Reader over the toolchain's aapt (primary) and aapt2 (fallback).
    pub fn new(toolchain: &Toolchain) -> Self {
        Self {
            primary: toolchain.aapt.clone(),
            secondary: toolchain.aapt2.clone(),
        }
    }

    /// Reader over explicit tool paths.
    pub fn from_paths(primary: impl Into<PathBuf>, secondary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Extract the metadata record for `apk`.
    ///
    /// Exactly one fallback hop is attempted: if the primary tool yields
    /// empty output (or fails to launch), the secondary tool is tried;
    /// if that is also empty the extraction fails with
    /// [`CoreError::NoMetadataProduced`].
    pub async fn read(&self, apk: &Path) -> CoreResult<ApkMetadata> {
        let mut text = self.dump(&self.primary, apk).await;
        if text.trim().is_empty() {
            tracing::debug!(apk = %apk.display(), "primary dump empty, retrying with secondary tool");
            text = self.dump(&self.secondary, apk).await;
        }
        if text.trim().is_empty() {
            return Err(CoreError::NoMetadataProduced(apk.to_path_buf()));
        }
        Ok(parse_badging(&text))
    }

    /// Run one dump invocation and return its stdout. Launch failures
    /// and non-zero exits both count as "no usable output" so the
    /// fallback hop still gets its chance.
    async fn dump(&self, program: &Path, apk: &Path) -> String {
        let invocation = aapt::dump_badging(program, apk);
        let process = match ToolProcess::spawn(&invocation) {
            Ok(process) => process,
            Err(err) => {
                tracing::warn!(%err, "badging dump failed to launch");
                return String::new();
            }
        };
        match process.stream_to_exit(None).await {
            Ok(output) => output.stdout,
            Err(err) => {
                tracing::warn!(%err, "badging dump did not complete");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable script that plays the role of a dump tool.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[tokio::test]
    async fn primary_output_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = fake_tool(dir.path(), "aapt", "echo \"package: name='com.a' versionCode='1' versionName='1.0'\"");
        let secondary = fake_tool(dir.path(), "aapt2", "echo \"package: name='com.b' versionCode='2' versionName='2.0'\"");

        let reader = MetadataReader::from_paths(primary, secondary);
        let meta = reader.read(Path::new("x.apk")).await.expect("metadata");
        assert_eq!(meta.package_name, "com.a");
    }

    #[tokio::test]
    async fn empty_primary_falls_back_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = fake_tool(dir.path(), "aapt", "true");
        let secondary = fake_tool(dir.path(), "aapt2", "echo \"package: name='com.b' versionCode='2' versionName='2.0'\"");

        let reader = MetadataReader::from_paths(primary, secondary);
        let meta = reader.read(Path::new("x.apk")).await.expect("metadata");
        assert_eq!(meta.package_name, "com.b");
    }

    #[tokio::test]
    async fn both_empty_is_no_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = fake_tool(dir.path(), "aapt", "true");
        let secondary = fake_tool(dir.path(), "aapt2", "true");

        let reader = MetadataReader::from_paths(primary, secondary);
        match reader.read(Path::new("x.apk")).await {
            Err(CoreError::NoMetadataProduced(path)) => {
                assert_eq!(path, PathBuf::from("x.apk"));
            }
            other => panic!("expected NoMetadataProduced, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_primary_binary_still_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let secondary = fake_tool(dir.path(), "aapt2", "echo \"sdkVersion:'30'\"");

        let reader = MetadataReader::from_paths(dir.path().join("missing-aapt"), secondary);
        let meta = reader.read(Path::new("x.apk")).await.expect("metadata");
        assert_eq!(meta.min_sdk_version, "30");
    }
}
