//! HTTP helper for downloading vendor archives.

use std::path::Path;

use crate::error::{Error, FsResultExt, Result};

/// Downloads a URL into a file, creating any parent directories.
///
/// The transfer is not resumable and not interruptible: cancellation is
/// observed by the caller once the download returns.
pub async fn download(client: &reqwest::Client, url: &str, dst: &Path) -> Result<()> {
    log::info!("Downloading {url}");

    let download_err = |source: reqwest::Error| Error::Download {
        url: url.to_string(),
        path: dst.to_path_buf(),
        source,
    };

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let bytes = response.bytes().await.map_err(download_err)?;

    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating", parent)?;
    }
    tokio::fs::write(dst, &bytes)
        .await
        .fs_context("writing", dst)
}
