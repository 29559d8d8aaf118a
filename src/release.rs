//! Release feed queries
//!
//! Resolves the newest published release and the zip asset attached to it.

use crate::types::{GitHubAsset, GitHubRelease, ReleaseInfo};
use crate::version::{read_local_version, LocalVersion, UpdateStatus};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid release feed response: {0}")]
    Parse(String),
    #[error("no archive found in release {version}")]
    NoArchiveAsset { version: String },
}

/// HTTP client shared by the feed query and the archive download.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("packup/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Fetch the raw release document from the feed.
///
/// Transport errors and non-success statuses are both reported as
/// [`ReleaseError::Connection`].
pub async fn fetch_latest_release(
    client: &Client,
    feed_url: &str,
    timeout: Duration,
) -> Result<GitHubRelease, ReleaseError> {
    tracing::debug!("Fetching release info from: {}", feed_url);

    let mut request = client
        .get(feed_url)
        .header("Accept", "application/vnd.github+json")
        .timeout(timeout);

    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        request = request.header("Authorization", format!("token {}", token));
        tracing::debug!("Using GITHUB_TOKEN");
    }

    let response = request
        .send()
        .await
        .map_err(|e| ReleaseError::Connection(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!("Release feed returned {}", status);
        return Err(ReleaseError::Connection(format!(
            "release feed returned {}",
            status
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ReleaseError::Connection(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ReleaseError::Parse(e.to_string()))
}

/// First asset whose name ends with [`ARCHIVE_EXTENSION`].
pub fn find_archive_asset(assets: &[GitHubAsset]) -> Option<&GitHubAsset> {
    assets
        .iter()
        .find(|a| a.name.to_lowercase().ends_with(ARCHIVE_EXTENSION))
}

pub async fn resolve_latest(
    client: &Client,
    feed_url: &str,
    timeout: Duration,
) -> Result<ReleaseInfo, ReleaseError> {
    let release = fetch_latest_release(client, feed_url, timeout).await?;

    let asset = find_archive_asset(&release.assets).ok_or_else(|| {
        ReleaseError::NoArchiveAsset {
            version: release.tag_name.clone(),
        }
    })?;

    tracing::debug!(
        "Latest release {} with archive {}",
        release.tag_name,
        asset.name
    );

    Ok(ReleaseInfo {
        version: release.tag_name.clone(),
        download_url: asset.browser_download_url.clone(),
        archive_name: asset.name.clone(),
    })
}

/// Result of comparing the installed version with the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub latest: String,
    pub local: LocalVersion,
    pub status: UpdateStatus,
}

/// Look up the latest tag and compare it with the marker in `install_dir`.
/// Only the tag is needed here, so a release without a zip asset still checks.
pub async fn check_for_update(
    client: &Client,
    feed_url: &str,
    timeout: Duration,
    install_dir: &Path,
) -> Result<UpdateCheck, ReleaseError> {
    let release = fetch_latest_release(client, feed_url, timeout).await?;
    let local = read_local_version(install_dir);
    let status = UpdateStatus::compare(&local, &release.tag_name);

    tracing::info!("Installed: {}, latest: {} ({})", local, release.tag_name, status);

    Ok(UpdateCheck {
        latest: release.tag_name,
        local,
        status,
    })
}
