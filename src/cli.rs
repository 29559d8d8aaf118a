use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // Tagged builds report just the tag
    if let Some(tag) = option_env!("PACKUP_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("PACKUP_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("PACKUP_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "packup")]
#[command(about = "Download the latest release archive and overlay it onto a game data directory")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Install directory to use instead of the configured one
    #[arg(long, global = true)]
    pub target: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare the installed version with the latest release
    Check,

    /// Download the latest release and install it
    Install,

    /// Show the installed version
    Status,

    /// Manage packup's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'merge-mode=merge' or 'merge-mode merge')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'work-dir')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}

/// Split `set` arguments given either as `key=value` or `key value`.
pub fn parse_key_value(args: &[String]) -> Option<(String, String)> {
    match args {
        [single] => single
            .split_once('=')
            .map(|(k, v)| (k.to_string(), v.to_string())),
        [key, rest @ ..] if !rest.is_empty() => Some((key.clone(), rest.join(" "))),
        _ => None,
    }
}
