//! apktool invocation builders (primary decode/build backend).

use af_protocol::ToolInvocation;
use std::path::Path;

use super::{java_jar, Toolchain};

mod flags {
    pub const DECODE: &str = "d";
    pub const BUILD: &str = "b";
    pub const EMPTY_FRAMEWORK_DIR: &str = "empty-framework-dir";
    pub const OUTPUT: &str = "-o";
    pub const FORCE: &str = "-f";
    pub const FORCE_ALL: &str = "--force";
}

/// `apktool d <input> -o <output> [-f]`
pub fn decode(toolchain: &Toolchain, input: &Path, output: &Path, force: bool) -> ToolInvocation {
    let mut args = vec![
        flags::DECODE.to_string(),
        input.display().to_string(),
        flags::OUTPUT.to_string(),
        output.display().to_string(),
    ];
    if force {
        args.push(flags::FORCE.to_string());
    }
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(&toolchain.apktool_jar, args),
    )
}

/// `apktool b <project> -o <output>`
pub fn build(toolchain: &Toolchain, project: &Path, output: &Path) -> ToolInvocation {
    let args = vec![
        flags::BUILD.to_string(),
        project.display().to_string(),
        flags::OUTPUT.to_string(),
        output.display().to_string(),
    ];
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(&toolchain.apktool_jar, args),
    )
}

/// `apktool empty-framework-dir --force`
pub fn clear_framework(toolchain: &Toolchain) -> ToolInvocation {
    let args = vec![
        flags::EMPTY_FRAMEWORK_DIR.to_string(),
        flags::FORCE_ALL.to_string(),
    ];
    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(&toolchain.apktool_jar, args),
    )
}
