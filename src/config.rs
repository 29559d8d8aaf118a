use crate::platform::expand_path;
use crate::source::FeedSource;
use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "packup";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const SETTING_KEYS: &[&str] = &[
    "source",
    "install_dir",
    "work_dir",
    "check_timeout_secs",
    "merge_mode",
];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join(APP_NAME);
    Ok(path)
}

/// `PACKUP_CONFIG` wins over the platform config directory.
pub fn get_config_file_path() -> Result<PathBuf> {
    let path = match std::env::var("PACKUP_CONFIG") {
        Ok(custom) if !custom.trim().is_empty() => expand_path(&custom),
        _ => get_user_config_dir()?.join(CONFIG_FILE_NAME),
    };
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn load_settings() -> Result<PackupSettings> {
    let config_path = get_config_file_path()?;

    let mut settings = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Could not read config file at {}", config_path.display()))?;
        serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")?
    } else {
        PackupSettings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut PackupSettings) {
    if let Ok(source) = std::env::var("PACKUP_SOURCE") {
        settings.source = source;
    }

    if let Ok(install_dir) = std::env::var("PACKUP_INSTALL_DIR") {
        settings.install_dir = install_dir;
    }

    if let Ok(work_dir) = std::env::var("PACKUP_WORK_DIR") {
        settings.work_dir = Some(work_dir);
    }

    if let Ok(secs) = std::env::var("PACKUP_CHECK_TIMEOUT_SECS") {
        match secs.parse::<u64>() {
            Ok(secs) => settings.check_timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring invalid PACKUP_CHECK_TIMEOUT_SECS '{}'", secs),
        }
    }

    if let Ok(mode) = std::env::var("PACKUP_MERGE_MODE") {
        match mode.parse::<MergeMode>() {
            Ok(mode) => settings.merge_mode = mode,
            Err(e) => tracing::warn!("Ignoring PACKUP_MERGE_MODE: {}", e),
        }
    }
}

pub fn save_settings(settings: &PackupSettings) -> Result<()> {
    let config_path = get_config_file_path()?;
    let config_dir = config_path
        .parent()
        .ok_or_else(|| anyhow!("Invalid config path"))?;

    fs::create_dir_all(config_dir)?;

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, content)
        .with_context(|| format!("Could not write config file at {}", config_path.display()))?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &PackupSettings, key: &str) -> Option<String> {
    let value = match normalize_key(key).as_str() {
        "source" => settings.source.clone(),
        "install_dir" => settings.install_dir.clone(),
        "work_dir" => settings.work_dir.clone().unwrap_or_default(),
        "check_timeout_secs" => settings.check_timeout_secs.to_string(),
        "merge_mode" => settings.merge_mode.to_string(),
        _ => return None,
    };
    Some(value)
}

pub fn set_setting(settings: &mut PackupSettings, key: &str, value: &str) -> Result<()> {
    let key = normalize_key(key);
    let value = value.trim();
    match key.as_str() {
        "source" => {
            FeedSource::parse(value).map_err(|e| anyhow!(e))?;
            settings.source = value.to_string();
        }
        "install_dir" => settings.install_dir = value.to_string(),
        "work_dir" => {
            settings.work_dir = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        "check_timeout_secs" => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| anyhow!("'{}' is not a valid number of seconds", value))?;
            if secs == 0 {
                return Err(anyhow!("check_timeout_secs must be greater than zero"));
            }
            settings.check_timeout_secs = secs;
        }
        "merge_mode" => settings.merge_mode = value.parse::<MergeMode>().map_err(|e| anyhow!(e))?,
        _ => return Err(invalid_key(&key)),
    }
    Ok(())
}

pub fn unset_setting(settings: &mut PackupSettings, key: &str) -> Result<()> {
    let key = normalize_key(key);
    let defaults = PackupSettings::default();
    match key.as_str() {
        "source" => settings.source = defaults.source,
        "install_dir" => settings.install_dir = defaults.install_dir,
        "work_dir" => settings.work_dir = defaults.work_dir,
        "check_timeout_secs" => settings.check_timeout_secs = defaults.check_timeout_secs,
        "merge_mode" => settings.merge_mode = defaults.merge_mode,
        _ => return Err(invalid_key(&key)),
    }
    Ok(())
}

fn invalid_key(key: &str) -> anyhow::Error {
    anyhow!(
        "'{}' is not a valid configuration setting. Valid settings: {}",
        key,
        SETTING_KEYS.join(", ")
    )
}

impl PackupSettings {
    pub fn feed_source(&self) -> Result<FeedSource> {
        FeedSource::parse(&self.source).map_err(|e| anyhow!(e))
    }

    pub fn install_path(&self) -> PathBuf {
        expand_path(&self.install_dir)
    }

    pub fn work_path(&self) -> Result<PathBuf> {
        match &self.work_dir {
            Some(dir) if !dir.trim().is_empty() => Ok(expand_path(dir)),
            _ => std::env::current_dir().context("Could not determine the current directory"),
        }
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs.max(1))
    }

    /// The feed query made at the start of an install gets more slack than
    /// the interactive check.
    pub fn install_feed_timeout(&self) -> Duration {
        self.check_timeout() * 2
    }
}
