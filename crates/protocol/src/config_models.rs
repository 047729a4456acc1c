//! Per-run configuration snapshot.
//!
//! The engine never reads settings from a global object: the caller hands
//! it an immutable [`RunConfig`] at run start, which makes runs
//! reproducible and testable in isolation. All fields have serde defaults
//! so a partial TOML file deserializes into the original tool defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ABI override choices for device install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbiTarget {
    Arm64V8a,
    ArmeabiV7a,
    X86,
    X86_64,
}

impl AbiTarget {
    /// The value passed to the installer's `--abi` flag.
    pub fn as_flag_value(self) -> &'static str {
        match self {
            AbiTarget::Arm64V8a => "arm64-v8a",
            AbiTarget::ArmeabiV7a => "armeabi-v7a",
            AbiTarget::X86 => "x86",
            AbiTarget::X86_64 => "x86_64",
        }
    }
}

/// Options for the decode stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Overwrite an existing project directory instead of refusing.
    pub force_overwrite: bool,

    /// Run the post-decode fix-up pass (apktool backend only).
    pub fix_errors: bool,

    /// Clear the framework resource cache before decoding
    /// (apktool backend only).
    pub clear_framework_first: bool,

    /// Override for where the decoded project directory is created.
    /// Defaults to a sibling of the input APK.
    pub output_dir: Option<PathBuf>,
}

/// Options for the build stage and its optional post-build chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Sign the APK after a successful build.
    pub sign_after_build: bool,

    /// Align the APK after a successful build (before signing).
    pub zipalign_after_build: bool,

    /// Also produce an unsigned convenience copy. Failure here is a
    /// warning, not a run failure.
    pub create_unsigned_apk: bool,

    /// Override for where the compiled APK is written. Defaults to a
    /// sibling of the project directory.
    pub output_dir: Option<PathBuf>,
}

/// Options for the zipalign stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZipalignOptions {
    /// Check alignment only, do not rewrite the archive.
    pub check_only: bool,

    /// Verbose tool output.
    pub verbose: bool,

    /// Recompress entries while aligning.
    pub recompress: bool,

    /// Overwrite the input file in place instead of writing
    /// `<name> aligned.apk`.
    pub overwrite_output: bool,

    /// Alignment in bytes.
    pub alignment: u32,
}

impl Default for ZipalignOptions {
    fn default() -> Self {
        Self {
            check_only: false,
            verbose: false,
            recompress: false,
            overwrite_output: true,
            alignment: 4,
        }
    }
}

/// Options for the signing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    /// Path to the keystore used for signing.
    pub keystore: Option<PathBuf>,

    /// Keystore password.
    pub keystore_pass: Option<String>,

    /// Key alias inside the keystore.
    pub key_alias: Option<String>,

    /// Password for the key itself, when distinct from the keystore's.
    pub key_pass: Option<String>,

    /// APK signature scheme toggles.
    pub scheme_v1: bool,
    pub scheme_v2: bool,
    pub scheme_v3: bool,
    pub scheme_v4: bool,

    /// Remove the `.idsig` file the signer leaves next to the APK.
    pub delete_idsig: bool,

    /// Install to the selected device after signing.
    pub install_after_sign: bool,

    /// Overwrite the input file in place instead of writing
    /// `<name>_signed.apk`.
    pub overwrite_input: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            keystore: None,
            keystore_pass: None,
            key_alias: None,
            key_pass: None,
            scheme_v1: true,
            scheme_v2: true,
            scheme_v3: true,
            scheme_v4: false,
            delete_idsig: true,
            install_after_sign: false,
            overwrite_input: true,
        }
    }
}

/// Options for device install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbOptions {
    /// Serial of the target device. Required for install stages.
    pub device_serial: Option<String>,

    /// Install as if from the Play Store vendor, replacing an existing
    /// package (`-i com.android.vending -r`).
    pub vendor_install: bool,

    /// Override the platform's default ABI.
    pub override_abi: Option<AbiTarget>,
}

/// The complete read-only configuration snapshot for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub decode: DecodeOptions,
    pub build: BuildOptions,
    pub zipalign: ZipalignOptions,
    pub sign: SignOptions,
    pub adb: AdbOptions,

    /// Use the alternate decode/build backend (APKEditor) instead of
    /// apktool. Build still follows whichever backend produced the
    /// project directory, detected by marker file.
    pub use_apkeditor: bool,

    /// Stage inputs through fixed ASCII names inside the run's staging
    /// directory, for toolchains that mishandle non-ASCII paths.
    pub utf8_filename_workaround: bool,

    /// Root under which per-run staging directories are created.
    /// Defaults to the system temp directory.
    pub temp_root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_tool_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.zipalign.alignment, 4);
        assert!(config.zipalign.overwrite_output);
        assert!(config.sign.scheme_v1 && config.sign.scheme_v2);
        assert!(!config.sign.scheme_v4);
        assert!(config.sign.delete_idsig);
        assert!(!config.use_apkeditor);
        assert!(!config.utf8_filename_workaround);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RunConfig = toml_like_json(
            r#"{"zipalign": {"alignment": 16}, "use_apkeditor": true}"#,
        );
        assert_eq!(config.zipalign.alignment, 16);
        assert!(config.use_apkeditor);
        assert!(config.sign.scheme_v1);
    }

    fn toml_like_json(text: &str) -> RunConfig {
        serde_json::from_str(text).expect("valid config json")
    }

    #[test]
    fn abi_flag_values() {
        assert_eq!(AbiTarget::Arm64V8a.as_flag_value(), "arm64-v8a");
        assert_eq!(AbiTarget::X86_64.as_flag_value(), "x86_64");
    }
}
