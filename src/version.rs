use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// File inside the install target recording the installed release tag.
pub const VERSION_MARKER: &str = "version.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalVersion {
    Installed(String),
    NotInstalled,
    /// The marker exists but could not be read.
    Unavailable,
}

impl LocalVersion {
    pub fn as_installed(&self) -> Option<&str> {
        match self {
            LocalVersion::Installed(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for LocalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalVersion::Installed(v) => write!(f, "{}", v),
            LocalVersion::NotInstalled => write!(f, "not installed"),
            LocalVersion::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Read the version marker of `install_dir`. Never fails: a missing marker or
/// directory is [`LocalVersion::NotInstalled`], any other error is
/// [`LocalVersion::Unavailable`].
pub fn read_local_version(install_dir: &Path) -> LocalVersion {
    let marker = install_dir.join(VERSION_MARKER);
    match fs::read_to_string(&marker) {
        Ok(content) => {
            let version = content.trim();
            if version.is_empty() {
                LocalVersion::NotInstalled
            } else {
                LocalVersion::Installed(version.to_string())
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => LocalVersion::NotInstalled,
        Err(e) => {
            tracing::debug!("Could not read {}: {}", marker.display(), e);
            LocalVersion::Unavailable
        }
    }
}

pub fn write_version_marker(install_dir: &Path, version: &str) -> io::Result<()> {
    fs::write(install_dir.join(VERSION_MARKER), version)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpdateAvailable { from: String, to: String },
    UpToDate,
    /// Nothing to compare against locally.
    Unknown,
}

impl UpdateStatus {
    pub fn compare(local: &LocalVersion, latest: &str) -> Self {
        match local.as_installed() {
            Some(installed) if installed != latest => UpdateStatus::UpdateAvailable {
                from: installed.to_string(),
                to: latest.to_string(),
            },
            Some(_) => UpdateStatus::UpToDate,
            None => UpdateStatus::Unknown,
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::UpdateAvailable { from, to } => {
                write!(f, "update available, {} → {}", from, to)
            }
            UpdateStatus::UpToDate => write!(f, "up to date"),
            UpdateStatus::Unknown => write!(f, "installed version unknown"),
        }
    }
}
