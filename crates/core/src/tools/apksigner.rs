//! apksigner invocation builder.

use af_protocol::{SignOptions, ToolInvocation};
use std::path::Path;

use super::{java_jar, Toolchain};

mod flags {
    pub const SIGN: &str = "sign";
    pub const KEYSTORE: &str = "--ks";
    pub const KEYSTORE_PASS: &str = "--ks-pass";
    pub const KEY_ALIAS: &str = "--ks-key-alias";
    pub const KEY_PASS: &str = "--key-pass";
    pub const V1: &str = "--v1-signing-enabled";
    pub const V2: &str = "--v2-signing-enabled";
    pub const V3: &str = "--v3-signing-enabled";
    pub const V4: &str = "--v4-signing-enabled";
    pub const OUT: &str = "--out";
}

/// `apksigner sign --ks … --vN-signing-enabled … --out <output> <input>`
///
/// Keystore flags are only emitted when a keystore is configured;
/// apksigner then falls back to its embedded debug key behaviour being
/// absent, which is a hard tool error surfaced verbatim.
pub fn sign(
    toolchain: &Toolchain,
    options: &SignOptions,
    input: &Path,
    output: &Path,
) -> ToolInvocation {
    let mut args = vec![flags::SIGN.to_string()];

    if let Some(keystore) = &options.keystore {
        args.push(flags::KEYSTORE.to_string());
        args.push(keystore.display().to_string());
        if let Some(pass) = &options.keystore_pass {
            args.push(flags::KEYSTORE_PASS.to_string());
            args.push(format!("pass:{pass}"));
        }
        if let Some(alias) = &options.key_alias {
            args.push(flags::KEY_ALIAS.to_string());
            args.push(alias.clone());
        }
        if let Some(pass) = &options.key_pass {
            args.push(flags::KEY_PASS.to_string());
            args.push(format!("pass:{pass}"));
        }
    }

    for (flag, enabled) in [
        (flags::V1, options.scheme_v1),
        (flags::V2, options.scheme_v2),
        (flags::V3, options.scheme_v3),
        (flags::V4, options.scheme_v4),
    ] {
        args.push(flag.to_string());
        args.push(enabled.to_string());
    }

    args.push(flags::OUT.to_string());
    args.push(output.display().to_string());
    args.push(input.display().to_string());

    ToolInvocation::new(
        toolchain.java.clone(),
        java_jar(&toolchain.apksigner_jar, args),
    )
}
