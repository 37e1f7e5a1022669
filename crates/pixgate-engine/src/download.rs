use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pixgate_contracts::features::Feature;
use tracing::{info, warn};

use crate::{error_chain_text, extension_for, ApiClient};

pub trait LinkOpener {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to the platform's default handler, usually a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserOpener;

impl LinkOpener for BrowserOpener {
    fn open(&self, url: &str) -> Result<()> {
        opener::open(url).with_context(|| format!("failed opening {url}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Opened(String),
    Failed(String),
}

/// `<feature>_<date>_<n>.<ext>`, where `n` is one-based.
pub fn download_file_name(feature: Feature, date: NaiveDate, index: usize, ext: &str) -> String {
    let feature_name = feature.id().replace(['-', '/'], "_");
    format!(
        "{feature_name}_{}_{}.{ext}",
        date.format("%Y-%m-%d"),
        index + 1
    )
}

/// Best-effort save of one result image.
///
/// On any fetch or write failure the original URL is handed to `fallback`
/// instead; nothing here is returned as an error.
pub fn download_image(
    client: &ApiClient,
    url: &str,
    feature: Feature,
    index: usize,
    out_dir: &Path,
    fallback: &dyn LinkOpener,
) -> DownloadOutcome {
    match save_image(client, url, feature, index, out_dir) {
        Ok(path) => {
            info!(path = %path.display(), "image saved");
            DownloadOutcome::Saved(path)
        }
        Err(err) => {
            warn!(url, error = %error_chain_text(&err, 512), "download failed, opening original URL");
            match fallback.open(url) {
                Ok(()) => DownloadOutcome::Opened(url.to_string()),
                Err(open_err) => {
                    let reason = error_chain_text(&open_err, 512);
                    warn!(url, error = %reason, "fallback open failed");
                    DownloadOutcome::Failed(reason)
                }
            }
        }
    }
}

fn save_image(
    client: &ApiClient,
    url: &str,
    feature: Feature,
    index: usize,
    out_dir: &Path,
) -> Result<PathBuf> {
    let bytes = client.fetch_bytes(url)?;
    let ext = image::guess_format(&bytes)
        .map(extension_for)
        .unwrap_or("jpg");
    let today = chrono::Utc::now().date_naive();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating {}", out_dir.display()))?;
    let path = out_dir.join(download_file_name(feature, today, index, ext));
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
