//! Badging-dump parsing and metadata extraction.
//!
//! - [`badging`]: line-oriented parser from raw dump text to a typed
//!   [`af_protocol::ApkMetadata`] record
//! - [`sdk_levels`]: numeric SDK level to platform-name lookup
//! - [`reader`]: runs the dump tool with a one-hop fallback to the
//!   secondary binary
//! - [`icon`]: best-effort icon resolution on top of a parsed record

pub mod badging;
pub mod icon;
pub mod reader;
pub mod sdk_levels;

pub use badging::parse_badging;
pub use reader::MetadataReader;
pub use sdk_levels::sdk_to_android_version;
