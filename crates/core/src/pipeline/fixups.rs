//! Post-decode project fixups.
//!
//! Decompiled projects frequently fail to rebuild as-is: the manifest
//! carries split/bundle attributes a standalone rebuild rejects, the
//! apktool config enables sparse resources, and apktool leaves
//! `APKTOOL_DUMMY` placeholder entries in the value resources. Each
//! fixup returns whether it applied; a missing target file is simply
//! reported false, never an error.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

/// Manifest attribute replacement table, applied verbatim in order.
const MANIFEST_REPLACEMENTS: &[(&str, &str)] = &[
    ("\\ ", "\\u003"),
    ("android:isSplitRequired=\"true\"", ""),
    ("android:extractNativeLibs=\"false\"", ""),
    ("android:useEmbeddedDex=\"true\"", ""),
    ("android:manageSpace=\"true\"", ""),
    ("android:localeConfig=\"@xml/locales_config\"", ""),
    ("STAMP_TYPE_DISTRIBUTION_APK", "STAMP_TYPE_STANDALONE_APK"),
];

fn dummy_line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^.*APKTOOL_DUMMY.*$").expect("valid regex"))
}

/// Strip split/bundle attributes from `AndroidManifest.xml`.
pub fn fix_android_manifest(project_dir: &Path) -> bool {
    let manifest = project_dir.join("AndroidManifest.xml");
    rewrite_file(&manifest, |text| {
        let mut fixed = text;
        for (from, to) in MANIFEST_REPLACEMENTS {
            fixed = fixed.replace(from, to);
        }
        fixed
    })
}

/// Disable sparse resources in `apktool.yml`.
pub fn fix_apktool_yml(project_dir: &Path) -> bool {
    let yml = project_dir.join("apktool.yml");
    rewrite_file(&yml, |text| {
        text.replace("sparseResources: true", "sparseResources: false")
    })
}

/// Blank every `APKTOOL_DUMMY` line in the `res/values` tree.
pub fn remove_dummy_resources(project_dir: &Path) -> bool {
    let values = project_dir.join("res").join("values");
    if !values.is_dir() {
        return false;
    }
    let mut applied = false;
    for entry in WalkDir::new(&values).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if rewrite_file(entry.path(), |text| {
            dummy_line_pattern().replace_all(&text, "").into_owned()
        }) {
            applied = true;
        }
    }
    applied
}

/// Run every fixup relevant to an apktool project, returning how many applied.
pub fn fix_apktool_project(project_dir: &Path) -> usize {
    [
        fix_android_manifest(project_dir),
        fix_apktool_yml(project_dir),
        remove_dummy_resources(project_dir),
    ]
    .into_iter()
    .filter(|applied| *applied)
    .count()
}

fn rewrite_file(path: &Path, transform: impl FnOnce(String) -> String) -> bool {
    let Ok(text) = fs::read_to_string(path) else {
        return false;
    };
    let fixed = transform(text);
    match fs::write(path, fixed) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "fixup write failed");
            false
        }
    }
}
