//! aapt / aapt2 invocation builders for metadata dumps.

use af_protocol::ToolInvocation;
use std::path::Path;

/// `aapt dump badging <apk>`, captured silently for the parser.
///
/// Takes the program path directly rather than the whole toolchain: the
/// metadata reader invokes the same logical dump against aapt and then
/// aapt2 as the fallback hop.
pub fn dump_badging(program: &Path, apk: &Path) -> ToolInvocation {
    ToolInvocation::new(
        program.to_path_buf(),
        vec![
            "dump".to_string(),
            "badging".to_string(),
            apk.display().to_string(),
        ],
    )
    .silent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_protocol::CaptureMode;

    #[test]
    fn badging_dump_is_silent() {
        let inv = dump_badging(Path::new("/t/aapt"), Path::new("app.apk"));
        assert_eq!(inv.capture, CaptureMode::Silent);
        assert_eq!(inv.args, vec!["dump", "badging", "app.apk"]);
    }
}
