//! `apkforge.toml` loader.

use af_protocol::RunConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::error::{ConfigError, ConfigResult};
use crate::tools::ToolchainConfig;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "apkforge.toml";

/// Everything the application reads from disk at startup: the run
/// configuration snapshot plus tool locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunConfig,
    pub toolchain: ToolchainConfig,
}

/// Load configuration from `dir/apkforge.toml`.
///
/// A missing file is not an error: the built-in defaults apply. A file
/// that exists but cannot be read or parsed is reported with its path.
pub fn load_config(dir: &Path) -> ConfigResult<AppConfig> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
        path: path.clone(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(dir.path()).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.run.zipalign.alignment, 4);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[run]
use_apkeditor = true

[run.zipalign]
alignment = 16

[toolchain]
tools_dir = "/opt/android-tools"
"#,
        )
        .expect("config file");

        let config = load_config(dir.path()).expect("config");
        assert!(config.run.use_apkeditor);
        assert_eq!(config.run.zipalign.alignment, 16);
        // Untouched sections keep the original tool defaults.
        assert!(config.run.sign.scheme_v1);
        assert!(config.run.sign.delete_idsig);
        assert_eq!(
            config.toolchain.tools_dir,
            Some(PathBuf::from("/opt/android-tools"))
        );
    }

    #[test]
    fn malformed_toml_reports_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[run\nbroken").expect("config file");

        match load_config(dir.path()) {
            Err(ConfigError::TomlParse { path, .. }) => {
                assert!(path.ends_with(CONFIG_FILE_NAME));
            }
            other => panic!("expected TomlParse, got {other:?}"),
        }
    }

    #[test]
    fn unknown_abi_value_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[run.adb]\noverride_abi = \"mips\"\n",
        )
        .expect("config file");
        assert!(load_config(dir.path()).is_err());
    }
}
