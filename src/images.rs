//! Bounded image downloads into uniquely named scratch files.
//!
//! Each URL is attempted independently; a failed download is logged and
//! excluded without aborting the batch. Files land in the OS temp directory
//! under a name derived from the process id plus a random token, so concurrent
//! downloads never collide. The run that created the files owns their cleanup.

use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use reqwest::Response;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// An image downloaded to local scratch storage for the duration of one run.
#[derive(Debug)]
pub struct DownloadedImage {
    /// Path of the scratch file in the OS temp directory.
    pub local_path: PathBuf,
    /// The URL the bytes came from.
    pub source_url: String,
}

/// Download up to `limit` of the given URLs, skipping failures.
#[instrument(level = "info", skip_all, fields(urls = urls.len(), limit))]
pub async fn fetch_images(
    client: &reqwest::Client,
    urls: &[String],
    limit: usize,
) -> Vec<DownloadedImage> {
    let images: Vec<DownloadedImage> = stream::iter(urls.iter().take(limit).cloned())
        .then(|url| async move {
            match download_image(client, &url).await {
                Ok(local_path) => {
                    debug!(%url, path = %local_path.display(), "Downloaded image");
                    Some(DownloadedImage {
                        local_path,
                        source_url: url,
                    })
                }
                Err(e) => {
                    error!(error = %e, %url, "Image download failed; skipping");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(count = images.len(), "Downloaded images to scratch storage");
    images
}

/// Stream one image to a fresh scratch file.
async fn download_image(
    client: &reqwest::Client,
    url: &str,
) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
    let response = client.get(url).send().await?.error_for_status()?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let ext = file_extension_for(url, content_type.as_deref());
    let path = std::env::temp_dir().join(format!(
        "sonar_digest-{}-{:016x}{}",
        std::process::id(),
        rng().random::<u64>(),
        ext
    ));

    write_body(response, &path).await?;
    Ok(path)
}

async fn write_body(response: Response, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut file = fs::File::create(path).await?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Infer a file extension: URL path suffix first, then content-type, then `.jpg`.
fn file_extension_for(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(ext) = Path::new(parsed.path())
            .extension()
            .and_then(|e| e.to_str())
        {
            return format!(".{}", ext.to_ascii_lowercase());
        }
    }

    match content_type {
        Some(ct) if ct.contains("jpeg") || ct.contains("jpg") => ".jpg".to_string(),
        Some(ct) if ct.contains("png") => ".png".to_string(),
        Some(ct) if ct.contains("webp") => ".webp".to_string(),
        _ => ".jpg".to_string(),
    }
}

/// Remove every scratch file, warning (not failing) on individual errors.
///
/// Called on every exit path of a run, including failures.
#[instrument(level = "info", skip_all, fields(count = images.len()))]
pub async fn cleanup_scratch(images: &[DownloadedImage]) {
    for image in images {
        match fs::remove_file(&image.local_path).await {
            Ok(()) => debug!(path = %image.local_path.display(), "Removed scratch file"),
            Err(e) => {
                warn!(path = %image.local_path.display(), error = %e, "Failed to remove scratch file")
            }
        }
    }
}
