use regex::{Captures, Regex};
use std::path::PathBuf;

/// Subfolder of the platform data directory that holds the game data.
pub const GAME_DIR_NAME: &str = ".minecraft";

/// Default install target: the platform application-data directory
/// (`%APPDATA%` on Windows, `~/.local/share` on Linux) plus [`GAME_DIR_NAME`].
pub fn default_install_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(GAME_DIR_NAME)
}

/// Expand a user supplied path: a leading `~` becomes the home directory and
/// `$VAR`, `${VAR}` and `%VAR%` references are replaced by their environment
/// values. Unknown variables are left untouched.
pub fn expand_path(input: &str) -> PathBuf {
    let trimmed = input.trim();
    let expanded = expand_env_vars(trimmed);

    if expanded == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    PathBuf::from(expanded)
}

fn expand_env_vars(input: &str) -> String {
    if !input.contains('$') && !input.contains('%') {
        return input.to_string();
    }

    let re = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)|%([A-Za-z_][A-Za-z0-9_]*)%") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };

    re.replace_all(input, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                tracing::trace!("Leaving unknown variable '{}' unexpanded", name);
                caps[0].to_string()
            }
        }
    })
    .into_owned()
}
