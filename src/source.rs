use regex::Regex;
use std::fmt;

const GITHUB_API: &str = "https://api.github.com";

/// Where the release feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    GitHub { owner: String, repo: String },
    Url(String),
}

impl FeedSource {
    /// Parse a feed source from one of:
    /// - "owner/repo" (GitHub latest release of that repository)
    /// - "https://..." (a release feed endpoint used as-is)
    pub fn parse(source: &str) -> Result<Self, String> {
        let source = source.trim();
        if source.is_empty() {
            return Err("Release source cannot be empty".to_string());
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            return Ok(FeedSource::Url(source.to_string()));
        }

        let re = Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9._-]+)$")
            .map_err(|e| e.to_string())?;
        let caps = re.captures(source).ok_or_else(|| {
            format!(
                "Invalid release source '{}'. Use 'owner/repo' or a full URL",
                source
            )
        })?;

        Ok(FeedSource::GitHub {
            owner: caps[1].to_string(),
            repo: caps[2].trim_end_matches(".git").to_string(),
        })
    }

    /// The endpoint returning the latest release as JSON.
    pub fn feed_url(&self) -> String {
        match self {
            FeedSource::GitHub { owner, repo } => {
                format!("{}/repos/{}/{}/releases/latest", GITHUB_API, owner, repo)
            }
            FeedSource::Url(url) => url.clone(),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::GitHub { owner, repo } => write!(f, "{}/{}", owner, repo),
            FeedSource::Url(url) => write!(f, "{}", url),
        }
    }
}
