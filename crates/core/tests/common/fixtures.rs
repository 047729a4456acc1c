//! Fake-tool fixtures.
//!
//! Each fixture writes an executable shell script that mimics one
//! external tool closely enough for the engine: it accepts the real flag
//! shapes, produces output files where the flags say, and records every
//! invocation in a `<script>.log` file the test can inspect.

use af_core::tools::Toolchain;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Write an executable script into `dir`. The script logs its full
/// argument line to `<path>.log` before `body` runs.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!("#!/bin/sh\nprintf '%s\\n' \"$*\" >> \"$0.log\"\n{body}\n");
    fs::write(&path, script).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Invocation lines recorded by a script written with [`write_script`].
pub fn script_log(script: &Path) -> Vec<String> {
    let log = PathBuf::from(format!("{}.log", script.display()));
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// A fake `java` that dispatches on the jar name, handling apktool's
/// `d`/`b`/`empty-framework-dir` verbs and apksigner's `sign`.
///
/// Decode creates the output directory with an `apktool.yml` marker;
/// build writes its output file; sign writes the output plus its
/// `.idsig` companion. Jar contents are irrelevant, only their names
/// are matched.
pub fn fake_java(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "java",
        r#"jar=$2
shift 2
cmd=$1
shift
out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o|--out) out=$2; shift ;;
    -f|--force) ;;
    --*) case "$1" in *-signing-enabled) shift ;; esac ;;
    *) input=$1 ;;
  esac
  shift
done
case "$jar" in
  *apksigner.jar)
    printf 'signed-from %s\n' "$input" > "$out"
    printf 'sig\n' > "$out.idsig"
    ;;
  *)
    case "$cmd" in
      d)
        mkdir -p "$out"
        printf 'version: 2.9.3\n' > "$out/apktool.yml"
        ;;
      b)
        printf 'built-from %s\n' "$input" > "$out"
        ;;
      m)
        printf 'merged-from %s\n' "$input" > "$out"
        ;;
      empty-framework-dir)
        ;;
    esac
    ;;
esac"#,
    )
}

/// A fake `java` whose apktool decode always fails with a recognizable
/// diagnostic on stderr.
pub fn fake_java_failing_decode(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "java",
        "echo 'brut.androlib.exceptions.AndrolibException: bad resource table' >&2\nexit 1",
    )
}

/// A fake `zipalign` that copies its input to its output (last two
/// positional arguments).
pub fn fake_zipalign(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "zipalign",
        r#"while [ $# -gt 2 ]; do shift; done
cp "$1" "$2""#,
    )
}

/// A fake `zipalign` that always fails.
pub fn fake_zipalign_failing(dir: &Path) -> PathBuf {
    write_script(dir, "zipalign", "echo 'Unable to open as zip archive' >&2\nexit 1")
}

/// Toolchain pointing at the fake tools in `dir`. Tools without a fake
/// resolve to paths that fail to launch, which is what a test wants when
/// a stage must not run.
pub fn fake_toolchain(dir: &Path) -> Toolchain {
    Toolchain {
        java: dir.join("java"),
        apktool_jar: dir.join("apktool.jar"),
        apkeditor_jar: dir.join("APKEditor.jar"),
        apksigner_jar: dir.join("apksigner.jar"),
        aapt: dir.join("aapt"),
        aapt2: dir.join("aapt2"),
        zipalign: dir.join("zipalign"),
        adb: dir.join("adb"),
    }
}
