//! Configuration loading.
//!
//! Settings live in a single `apkforge.toml` next to the working
//! directory (or at an explicit path). Every field is optional; a
//! missing file yields the built-in defaults, which match the original
//! tool defaults.

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, AppConfig, CONFIG_FILE_NAME};
