//! Best-effort launcher icon extraction.
//!
//! The badging dump names an icon entry inside the APK, but the entry
//! is frequently an adaptive-icon XML rather than a raster image. The
//! resolver widens the named path into a list of raster candidates,
//! pulls the first one that exists out of the archive, and as a last
//! resort fetches the store-listing artwork from the web. Every step
//! is allowed to fail silently; a missing icon never fails a run.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use af_protocol::ApkMetadata;

/// Raster resource directories probed, in order, when the badging dump
/// points at an `anydpi-v26` adaptive icon.
const RASTER_DIRS: &[&str] = &[
    "mipmap-xxxhdpi-v4",
    "mipmap-xxhdpi-v4",
    "mipmap-xhdpi-v4",
    "mipmap-hdpi-v4",
    "mipmap-mdpi-v4",
    "mipmap-xhdpi",
    "mipmap-hdpi",
    "drawable-xxxhdpi-v4",
    "drawable-xxhdpi-v4",
    "drawable-xhdpi-v4",
    "drawable-hdpi-v4",
    "drawable-mdpi-v4",
];

/// A remote source for store-listing icon artwork.
#[async_trait]
pub trait IconWebSource: Send + Sync {
    /// Fetch the icon for `package_name` and write it to `dest`.
    async fn fetch_icon(&self, package_name: &str, dest: &Path) -> anyhow::Result<()>;
}

/// Scrapes the Play Store listing page for its `"image":"…"` artwork URL.
#[derive(Debug, Default)]
pub struct PlayStoreWebSource {
    client: reqwest::Client,
}

#[async_trait]
impl IconWebSource for PlayStoreWebSource {
    async fn fetch_icon(&self, package_name: &str, dest: &Path) -> anyhow::Result<()> {
        let listing = format!("https://play.google.com/store/apps/details?id={package_name}");
        let page = self.client.get(&listing).send().await?.text().await?;

        let image_url = image_url_pattern()
            .captures(&page)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| anyhow::anyhow!("no artwork url on listing page for {package_name}"))?;

        let bytes = self.client.get(&image_url).send().await?.bytes().await?;
        fs::write(dest, &bytes)?;
        Ok(())
    }
}

fn image_url_pattern() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#""image":"([^"]+)""#).expect("valid regex"))
}

/// Expand the badging icon path into archive entries worth probing.
///
/// The named entry comes first. An `.xml` entry also yields its `.png`
/// sibling, and an `anydpi-v26` entry yields the same file name under
/// each known raster directory.
pub fn candidate_entries(icon_path: &str) -> Vec<String> {
    let mut candidates = vec![icon_path.to_string()];

    if let Some(stem) = icon_path.strip_suffix(".xml") {
        candidates.push(format!("{stem}.png"));
    }

    if icon_path.contains("anydpi-v26") {
        let file_name = Path::new(icon_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if !file_name.is_empty() {
            for dir in RASTER_DIRS {
                candidates.push(format!("res/{dir}/{file_name}.png"));
            }
        }
    }

    candidates
}

/// Extract the launcher icon for `metadata` from `apk` into `dest`,
/// falling back to `web` when no archive entry pans out.
///
/// Returns the written path, or `None` when every source failed.
pub async fn resolve_icon(
    apk: &Path,
    metadata: &ApkMetadata,
    dest: &Path,
    web: &dyn IconWebSource,
) -> Option<PathBuf> {
    let preferred = metadata.icons.preferred();
    if !preferred.is_empty() {
        for entry in candidate_entries(preferred) {
            match extract_entry(apk, &entry, dest) {
                Ok(()) => return Some(dest.to_path_buf()),
                Err(err) => {
                    tracing::debug!(entry, %err, "icon entry not usable");
                }
            }
        }
    }

    if metadata.package_name.is_empty() {
        return None;
    }
    match web.fetch_icon(&metadata.package_name, dest).await {
        Ok(()) => Some(dest.to_path_buf()),
        Err(err) => {
            tracing::debug!(package = %metadata.package_name, %err, "web icon fetch failed");
            None
        }
    }
}

/// Copy one archive entry out to `dest`. Skips entries that are not
/// plausibly raster images (adaptive-icon XML definitions).
fn extract_entry(apk: &Path, entry: &str, dest: &Path) -> anyhow::Result<()> {
    if entry.ends_with(".xml") {
        anyhow::bail!("xml icon entry");
    }
    let file = fs::File::open(apk)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut source = archive.by_name(entry)?;
    let mut out = fs::File::create(dest)?;
    io::copy(&mut source, &mut out)?;
    Ok(())
}
