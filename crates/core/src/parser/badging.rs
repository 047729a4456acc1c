//! Line-oriented badging-dump parser.
//!
//! Each line is classified by its leading token up to the first colon;
//! unrecognized keys are ignored so future tool output stays
//! forward-compatible. Values are extracted with quoted-value patterns
//! in two shapes: `key: 'value'`-style single values and
//! `key: name='v1' attr='v2'`-style attribute lists.

use af_protocol::{ApkMetadata, MarketLinks};
use regex::Regex;
use std::sync::OnceLock;

use crate::parser::sdk_levels::sdk_to_android_version;

fn name_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"name='([^']*)'").expect("valid regex"))
}

fn version_name_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"versionName='([^']*)'").expect("valid regex"))
}

fn version_code_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"versionCode='([^']*)'").expect("valid regex"))
}

/// `key:'value'` — the value is the substring between the first pair of
/// single quotes following the key.
fn line_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^:]*:\s*'([^']*)'").expect("valid regex"))
}

/// All space-prefixed quoted tokens on a multi-value line.
fn quoted_tokens() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" '([^']*)'").expect("valid regex"))
}

fn first_capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Collect every quoted token after the first colon, in source order,
/// duplicates preserved (the dump may legitimately repeat values).
fn all_quoted_after_colon(line: &str) -> Vec<String> {
    let rest = line.split_once(':').map_or("", |(_, rest)| rest);
    quoted_tokens()
        .captures_iter(rest)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parse one badging dump into a typed metadata record.
///
/// Never fails: missing keys leave their fields empty, unknown keys are
/// skipped. Recognized multi-value keys join all quoted tokens with
/// `", "`; the two ABI-list keys are concatenated with `alt-native-code`
/// entries preceding `native-code` entries — a fixed contract.
pub fn parse_badging(text: &str) -> ApkMetadata {
    let mut meta = ApkMetadata {
        full_info: text.to_string(),
        ..ApkMetadata::default()
    };

    let mut native_code: Vec<String> = Vec::new();
    let mut alt_native_code: Vec<String> = Vec::new();

    for line in text.lines() {
        let key = line.split(':').next().unwrap_or("");
        match key {
            "package" => {
                meta.package_name = first_capture(name_attr(), line);
                meta.version_name = first_capture(version_name_attr(), line);
                meta.version_code = first_capture(version_code_attr(), line);
            }
            "uses-permission" => {
                let permission = first_capture(name_attr(), line);
                if !permission.is_empty() {
                    meta.permissions.push(permission);
                }
            }
            "sdkVersion" => {
                meta.min_sdk_version = first_capture(line_value(), line);
                meta.min_sdk_version_detailed = sdk_to_android_version(&meta.min_sdk_version);
            }
            "targetSdkVersion" => {
                meta.target_sdk_version = first_capture(line_value(), line);
                meta.target_sdk_version_detailed =
                    sdk_to_android_version(&meta.target_sdk_version);
            }
            "application-label" => {
                meta.app_name = first_capture(line_value(), line);
            }
            "launchable-activity" => {
                meta.launchable_activity = first_capture(name_attr(), line);
            }
            "supports-screens" => {
                meta.screens = all_quoted_after_colon(line).join(", ");
            }
            "locales" => {
                meta.locales = all_quoted_after_colon(line).join(", ");
            }
            "densities" => {
                meta.densities = all_quoted_after_colon(line).join(", ");
            }
            "native-code" => {
                native_code = all_quoted_after_colon(line);
            }
            "alt-native-code" => {
                alt_native_code = all_quoted_after_colon(line);
            }
            "application-icon-120" => meta.icons.dpi_120 = first_capture(line_value(), line),
            "application-icon-160" => meta.icons.dpi_160 = first_capture(line_value(), line),
            "application-icon-240" => meta.icons.dpi_240 = first_capture(line_value(), line),
            "application-icon-320" => meta.icons.dpi_320 = first_capture(line_value(), line),
            "application-icon-480" => meta.icons.dpi_480 = first_capture(line_value(), line),
            "application-icon-640" => meta.icons.dpi_640 = first_capture(line_value(), line),
            "application-icon-65534" => meta.icons.dpi_65534 = first_capture(line_value(), line),
            // Forward-compatible: future keys are ignored.
            _ => {}
        }
    }

    let combined: Vec<String> = alt_native_code.into_iter().chain(native_code).collect();
    meta.native_code = combined.join(", ");
    meta.links = MarketLinks::for_package(&meta.package_name);

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
package: name='com.example.demo' versionCode='42' versionName='1.2.3' platformBuildVersionName='14'
sdkVersion:'30'
targetSdkVersion:'34'
uses-permission: name='android.permission.INTERNET'
uses-permission: name='android.permission.CAMERA'
application-label:'Demo App'
launchable-activity: name='com.example.demo.MainActivity'  label='Demo'
supports-screens: 'small' 'normal' 'large' 'xlarge'
locales: 'en' 'de' 'ru'
densities: '160' '240' '65534'
native-code: 'arm64-v8a' 'x86_64'
application-icon-640:'res/mipmap-xxxhdpi-v4/ic_launcher.png'
some-future-key: value='whatever'
";

    #[test]
    fn parses_package_line() {
        let meta = parse_badging(DUMP);
        assert_eq!(meta.package_name, "com.example.demo");
        assert_eq!(meta.version_name, "1.2.3");
        assert_eq!(meta.version_code, "42");
    }

    #[test]
    fn permissions_are_cumulative() {
        let meta = parse_badging(DUMP);
        assert_eq!(
            meta.permissions,
            vec![
                "android.permission.INTERNET",
                "android.permission.CAMERA"
            ]
        );
    }

    #[test]
    fn sdk_versions_mapped_and_raw() {
        let meta = parse_badging(DUMP);
        assert_eq!(meta.min_sdk_version, "30");
        assert!(meta.min_sdk_version_detailed.ends_with("Android 11"));
        assert_eq!(meta.target_sdk_version, "34");
        assert!(meta.target_sdk_version_detailed.ends_with("Android 14"));
    }

    #[test]
    fn multi_value_lines_collect_all_tokens() {
        let meta = parse_badging(DUMP);
        assert_eq!(meta.screens, "small, normal, large, xlarge");
        assert_eq!(meta.locales, "en, de, ru");
        assert_eq!(meta.densities, "160, 240, 65534");
    }

    #[test]
    fn alt_native_code_precedes_native_code() {
        let dump = "\
native-code: 'armeabi-v7a' 'x86' 'x86_64'
alt-native-code: 'arm64-v8a'
";
        let meta = parse_badging(dump);
        assert_eq!(meta.native_code, "arm64-v8a, armeabi-v7a, x86, x86_64");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let meta = parse_badging("brand-new-key: name='x'\nsdkVersion:'29'\n");
        assert_eq!(meta.min_sdk_version, "29");
        assert!(meta.app_name.is_empty());
    }

    #[test]
    fn links_derived_from_package_name() {
        let meta = parse_badging(DUMP);
        assert_eq!(
            meta.links.play_store,
            "https://play.google.com/store/apps/details?id=com.example.demo"
        );
    }

    #[test]
    fn icon_lines_populate_density_slots() {
        let meta = parse_badging(DUMP);
        assert_eq!(meta.icons.dpi_640, "res/mipmap-xxxhdpi-v4/ic_launcher.png");
        assert_eq!(meta.icons.preferred(), "res/mipmap-xxxhdpi-v4/ic_launcher.png");
    }

    #[test]
    fn empty_dump_yields_empty_record() {
        let meta = parse_badging("");
        assert!(meta.package_name.is_empty());
        assert!(meta.native_code.is_empty());
        assert!(meta.permissions.is_empty());
    }
}
