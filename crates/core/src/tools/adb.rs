//! adb invocation builders (device listing and install).

use af_protocol::{AdbOptions, ToolInvocation};
use std::path::Path;

use super::Toolchain;

mod flags {
    pub const SERIAL: &str = "-s";
    pub const INSTALL: &str = "install";
    pub const DEVICES: &str = "devices";
    pub const LONG: &str = "-l";
    pub const VENDOR: &str = "-i";
    pub const VENDOR_PACKAGE: &str = "com.android.vending";
    pub const REPLACE: &str = "-r";
    pub const ABI: &str = "--abi";
}

/// `adb -s <serial> install [-i com.android.vending -r] [--abi <abi>] <apk>`
pub fn install(
    toolchain: &Toolchain,
    options: &AdbOptions,
    serial: &str,
    apk: &Path,
) -> ToolInvocation {
    let mut args = vec![
        flags::SERIAL.to_string(),
        serial.to_string(),
        flags::INSTALL.to_string(),
    ];
    if options.vendor_install {
        args.push(flags::VENDOR.to_string());
        args.push(flags::VENDOR_PACKAGE.to_string());
        args.push(flags::REPLACE.to_string());
    }
    if let Some(abi) = options.override_abi {
        args.push(flags::ABI.to_string());
        args.push(abi.as_flag_value().to_string());
    }
    args.push(apk.display().to_string());
    ToolInvocation::new(toolchain.adb.clone(), args)
}

/// `adb devices -l`
pub fn devices(toolchain: &Toolchain) -> ToolInvocation {
    ToolInvocation::new(
        toolchain.adb.clone(),
        vec![flags::DEVICES.to_string(), flags::LONG.to_string()],
    )
    .silent()
}
