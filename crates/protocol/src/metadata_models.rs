//! Parsed APK metadata models.
//!
//! The metadata record is built incrementally while scanning a badging
//! dump. Every field defaults to empty rather than absent, so downstream
//! consumers only ever branch on emptiness.

use serde::{Deserialize, Serialize};

/// Marketplace and mirror links derived from a package name.
///
/// Pure string formatting over fixed URL templates; derivation never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLinks {
    pub play_store: String,
    pub apk_combo: String,
    pub apk_pure: String,
    pub apk_support: String,
    pub apk_mirror: String,
    pub apk_gk: String,
}

impl MarketLinks {
    /// Derive the full link set for `package_name`.
    pub fn for_package(package_name: &str) -> Self {
        Self {
            play_store: format!(
                "https://play.google.com/store/apps/details?id={package_name}"
            ),
            apk_combo: format!("https://apkcombo.com/a/{package_name}"),
            apk_pure: format!("https://apkpure.com/a/{package_name}"),
            apk_support: format!("https://apk.support/app/{package_name}"),
            apk_mirror: format!(
                "https://www.apkmirror.com/?post_type=app_release&searchtype=apk&s={package_name}"
            ),
            apk_gk: format!("https://apkgk.com/{package_name}/download"),
        }
    }
}

/// Per-density icon resource paths extracted from a badging dump.
///
/// Keys follow the `application-icon-<density>` lines; `65534` is the
/// anydpi/adaptive slot and takes precedence when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconPaths {
    pub dpi_120: String,
    pub dpi_160: String,
    pub dpi_240: String,
    pub dpi_320: String,
    pub dpi_480: String,
    pub dpi_640: String,
    pub dpi_65534: String,
}

impl IconPaths {
    /// The preferred icon resource path: highest pixel density first,
    /// with the anydpi slot ahead of everything. Empty when no icon line
    /// was present at all.
    pub fn preferred(&self) -> &str {
        [
            &self.dpi_65534,
            &self.dpi_640,
            &self.dpi_480,
            &self.dpi_320,
            &self.dpi_240,
            &self.dpi_160,
            &self.dpi_120,
        ]
        .into_iter()
        .find(|p| !p.is_empty())
        .map_or("", |p| p.as_str())
    }
}

/// The typed result of parsing one badging dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApkMetadata {
    /// Application label.
    pub app_name: String,

    /// Package identifier, e.g. `com.example.app`.
    pub package_name: String,

    /// Human-facing version string.
    pub version_name: String,

    /// Numeric version code, kept as the raw string from the dump.
    pub version_code: String,

    /// Minimum SDK level, raw numeric string.
    pub min_sdk_version: String,

    /// Minimum SDK level mapped through the platform-name table.
    pub min_sdk_version_detailed: String,

    /// Target SDK level, raw numeric string.
    pub target_sdk_version: String,

    /// Target SDK level mapped through the platform-name table.
    pub target_sdk_version_detailed: String,

    /// Fully qualified launchable activity name.
    pub launchable_activity: String,

    /// Requested permissions, one per `uses-permission` line, in source
    /// order with duplicates preserved.
    pub permissions: Vec<String>,

    /// Supported screen classes, comma-joined.
    pub screens: String,

    /// Declared locales, comma-joined.
    pub locales: String,

    /// Declared densities, comma-joined.
    pub densities: String,

    /// Native ABIs, comma-joined; alt-native-code entries precede
    /// native-code entries. This ordering is a fixed contract.
    pub native_code: String,

    /// Per-density icon resource paths.
    pub icons: IconPaths,

    /// Marketplace links derived from the package name.
    pub links: MarketLinks,

    /// The complete raw dump text the record was parsed from.
    pub full_info: String,
}
