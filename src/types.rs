use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SOURCE: &str = "vroot2137/cmb-mc";
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 5;

/// How a directory from the archive is combined with an existing directory
/// of the same name in the install target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Remove the existing directory and copy the archive's directory in full.
    #[default]
    Replace,
    /// Copy file by file, keeping files that only exist in the destination.
    Merge,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Replace => write!(f, "replace"),
            MergeMode::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(MergeMode::Replace),
            "merge" => Ok(MergeMode::Merge),
            other => Err(format!(
                "Invalid merge mode '{}'. Expected 'replace' or 'merge'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackupSettings {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_install_dir")]
    pub install_dir: String,
    /// Directory that holds the downloaded archive and the staging area.
    /// Falls back to the current working directory when unset.
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
    #[serde(default)]
    pub merge_mode: MergeMode,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}
fn default_install_dir() -> String {
    crate::platform::default_install_dir()
        .to_string_lossy()
        .to_string()
}
fn default_check_timeout_secs() -> u64 {
    DEFAULT_CHECK_TIMEOUT_SECS
}

impl Default for PackupSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            install_dir: default_install_dir(),
            work_dir: None,
            check_timeout_secs: default_check_timeout_secs(),
            merge_mode: MergeMode::default(),
        }
    }
}

/// The newest published release and the zip asset attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub download_url: String,
    pub archive_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}
