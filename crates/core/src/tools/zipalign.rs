//! zipalign invocation builder.

use af_protocol::{ToolInvocation, ZipalignOptions};
use std::path::Path;

use super::Toolchain;

mod flags {
    pub const CHECK_ONLY: &str = "-c";
    pub const OVERWRITE: &str = "-f";
    pub const VERBOSE: &str = "-v";
    pub const RECOMPRESS: &str = "-z";
}

/// `zipalign [-c] [-f] [-v] [-z] <alignment> <input> [<output>]`
///
/// In check-only mode no output path is emitted; otherwise the caller
/// provides the staged output path and commits it after success.
pub fn align(
    toolchain: &Toolchain,
    options: &ZipalignOptions,
    input: &Path,
    output: Option<&Path>,
) -> ToolInvocation {
    let mut args = Vec::new();
    if options.check_only {
        args.push(flags::CHECK_ONLY.to_string());
    } else {
        args.push(flags::OVERWRITE.to_string());
        if options.recompress {
            args.push(flags::RECOMPRESS.to_string());
        }
    }
    if options.verbose {
        args.push(flags::VERBOSE.to_string());
    }
    args.push(options.alignment.to_string());
    args.push(input.display().to_string());
    if !options.check_only {
        if let Some(output) = output {
            args.push(output.display().to_string());
        }
    }
    ToolInvocation::new(toolchain.zipalign.clone(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolchainConfig;
    use std::path::PathBuf;

    fn toolchain() -> Toolchain {
        Toolchain::resolve(&ToolchainConfig {
            zipalign: Some(PathBuf::from("zipalign")),
            ..ToolchainConfig::default()
        })
    }

    #[test]
    fn check_only_has_no_output_path() {
        let options = ZipalignOptions {
            check_only: true,
            verbose: true,
            ..ZipalignOptions::default()
        };
        let inv = align(&toolchain(), &options, Path::new("in.apk"), None);
        assert_eq!(inv.args, vec!["-c", "-v", "4", "in.apk"]);
    }

    #[test]
    fn rewrite_mode_emits_output_path() {
        let options = ZipalignOptions {
            recompress: true,
            alignment: 16,
            ..ZipalignOptions::default()
        };
        let inv = align(
            &toolchain(),
            &options,
            Path::new("in.apk"),
            Some(Path::new("out.apk")),
        );
        assert_eq!(inv.args, vec!["-f", "-z", "16", "in.apk", "out.apk"]);
    }
}
