//! The install pipeline
//!
//! One background unit of work: resolve the latest release, download its
//! archive, extract it into a staging directory, overlay the contents onto the
//! install directory and record the installed version. Progress is reported
//! as [`InstallEvent`]s over a channel; the last event is always
//! [`InstallEvent::Finished`].

use crate::download::{download_file, extract_zip};
use crate::overlay::{effective_root, overlay};
use crate::release::{resolve_latest, ReleaseError};
use crate::types::{MergeMode, ReleaseInfo};
use crate::version::write_version_marker;
use anyhow::{anyhow, Context};
use reqwest::Client;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

const STAGING_PREFIX: &str = ".packup-staging-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    Log(String),
    /// Download progress in percent, 0..=100.
    Progress(u8),
    Finished(InstallOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub success: bool,
    pub message: String,
    /// The installed release tag, set on success only.
    pub version: Option<String>,
}

impl InstallOutcome {
    pub fn succeeded(message: String, version: String) -> Self {
        Self {
            success: true,
            message,
            version: Some(version),
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            version: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("no archive found in release {0}")]
    NoArchive(String),
    #[error("install directory not found: {}", .0.display())]
    TargetNotFound(PathBuf),
    #[error("no files found to install")]
    NothingInstalled,
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl From<ReleaseError> for InstallError {
    fn from(err: ReleaseError) -> Self {
        match err {
            ReleaseError::Connection(reason) => InstallError::Connection(reason),
            ReleaseError::NoArchiveAsset { version } => InstallError::NoArchive(version),
            other => InstallError::Other(anyhow!(other)),
        }
    }
}

/// Everything one install attempt needs to know.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub feed_url: String,
    pub install_dir: PathBuf,
    /// Receives the downloaded archive and the staging directory.
    pub work_dir: PathBuf,
    pub merge_mode: MergeMode,
    pub feed_timeout: Duration,
}

pub struct InstallPipeline {
    client: Client,
    request: InstallRequest,
    events: UnboundedSender<InstallEvent>,
}

impl InstallPipeline {
    pub fn new(client: Client, request: InstallRequest, events: UnboundedSender<InstallEvent>) -> Self {
        Self {
            client,
            request,
            events,
        }
    }

    /// Run the whole attempt. Every error is turned into a failed outcome,
    /// which is both sent as the final event and returned.
    pub async fn run(self) -> InstallOutcome {
        let outcome = match self.execute().await {
            Ok((count, version)) => {
                InstallOutcome::succeeded(format!("Successfully installed {} items", count), version)
            }
            Err(e) => {
                tracing::error!("Install failed: {}", e);
                InstallOutcome::failed(e.to_string())
            }
        };

        if outcome.success {
            tracing::info!("{}", outcome.message);
        }
        let _ = self.events.send(InstallEvent::Finished(outcome.clone()));
        outcome
    }

    fn log(&self, line: String) {
        tracing::info!("{}", line);
        let _ = self.events.send(InstallEvent::Log(line));
    }

    async fn execute(&self) -> Result<(usize, String), InstallError> {
        let release = resolve_latest(&self.client, &self.request.feed_url, self.request.feed_timeout).await?;
        self.log(format!("Downloading {}", release.version));

        let archive_name = Path::new(&release.archive_name)
            .file_name()
            .ok_or_else(|| anyhow!("Invalid archive name '{}'", release.archive_name))?;
        let archive_path = self.request.work_dir.join(archive_name);

        let result = self.install_archive(&release, &archive_path).await;

        if let Err(e) = fs::remove_file(&archive_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", archive_path.display(), e);
            }
        }

        let installed = result?;
        if installed == 0 {
            return Err(InstallError::NothingInstalled);
        }

        write_version_marker(&self.request.install_dir, &release.version).with_context(|| {
            format!(
                "Installed {} items but could not record version {}",
                installed, release.version
            )
        })?;

        Ok((installed, release.version))
    }

    /// Download, extract and overlay. The caller removes the archive.
    async fn install_archive(&self, release: &ReleaseInfo, archive_path: &Path) -> Result<usize, InstallError> {
        let events = self.events.clone();
        download_file(&self.client, &release.download_url, archive_path, |pct| {
            let _ = events.send(InstallEvent::Progress(pct));
        })
        .await?;

        let install_dir = &self.request.install_dir;
        if !install_dir.is_dir() {
            return Err(InstallError::TargetNotFound(install_dir.clone()));
        }

        self.log("Extracting".to_string());
        // Dropping the TempDir removes it, including on early return
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.request.work_dir)
            .with_context(|| {
                format!(
                    "Could not create staging directory in {}",
                    self.request.work_dir.display()
                )
            })?;
        extract_zip(archive_path, staging.path())?;

        let root = effective_root(staging.path())?;
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        self.log(format!("Copying from: {}", root_name));

        let report = overlay(&root, install_dir, self.request.merge_mode, |line| self.log(line))?;
        if !report.failed.is_empty() {
            tracing::warn!("{} item(s) failed to install", report.failed.len());
        }

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            tracing::warn!("Could not remove {}: {}", staging_path.display(), e);
        }

        Ok(report.installed)
    }
}
