//! APKEditor invocation builders (alternate decode/build backend, and
//! the only backend that merges split bundles).

use af_protocol::ToolInvocation;
use std::path::Path;

use super::{java_jar, Toolchain};

mod flags {
    pub const DECODE: &str = "d";
    pub const BUILD: &str = "b";
    pub const MERGE: &str = "m";
    pub const INPUT: &str = "-i";
    pub const OUTPUT: &str = "-o";
    pub const FORCE: &str = "-f";
}

/// `APKEditor d -i <input> -o <output> [-f]`
pub fn decode(toolchain: &Toolchain, input: &Path, output: &Path, force: bool) -> ToolInvocation {
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(
            &toolchain.apkeditor_jar,
            io_args(flags::DECODE, input, output, force),
        ),
    )
}

/// `APKEditor b -i <project> -o <output>`
pub fn build(toolchain: &Toolchain, project: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(
            &toolchain.apkeditor_jar,
            io_args(flags::BUILD, project, output, false),
        ),
    )
}

/// `APKEditor m -i <split bundle> -o <merged apk>`
///
/// Accepts `.apks`, `.xapk`, `.apkm`, or a directory of split APKs.
pub fn merge(toolchain: &Toolchain, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(
            &toolchain.apkeditor_jar,
            io_args(flags::MERGE, input, output, false),
        ),
    )
}

fn io_args(command: &str, input: &Path, output: &Path, force: bool) -> Vec<String> {
    let mut args = vec![
        command.to_string(),
        flags::INPUT.to_string(),
        input.display().to_string(),
        flags::OUTPUT.to_string(),
        output.display().to_string(),
    ];
    if force {
        args.push(flags::FORCE.to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolchainConfig;
    use std::path::PathBuf;

    #[test]
    fn merge_builds_expected_line() {
        let toolchain = Toolchain::resolve(&ToolchainConfig {
            tools_dir: Some(PathBuf::from("/t")),
            java: Some(PathBuf::from("java")),
            ..ToolchainConfig::default()
        });
        let inv = merge(&toolchain, Path::new("bundle.apks"), Path::new("merged.apk"));
        assert_eq!(
            inv.args,
            vec!["-jar", "/t/APKEditor.jar", "m", "-i", "bundle.apks", "-o", "merged.apk"]
        );
    }
}
