use anyhow::{anyhow, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use packup::cli::{parse_key_value, Cli, Commands, ConfigAction};
use packup::config::{
    get_setting, load_settings, save_settings, set_setting, unset_setting, SETTING_KEYS,
};
use packup::pipeline::{InstallEvent, InstallOutcome, InstallRequest};
use packup::release::{build_client, check_for_update};
use packup::session::Session;
use packup::types::PackupSettings;
use packup::version::{read_local_version, UpdateStatus};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let mut settings = load_settings()?;
    if let Some(target) = &cli.target {
        settings.install_dir = target.clone();
    }

    match cli.command {
        Commands::Version => {
            println!("packup v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Status => {
            let install_dir = settings.install_path();
            println!("Install directory: {}", install_dir.display());
            println!("Installed version: {}", read_local_version(&install_dir));
        }

        Commands::Check => {
            if !run_check(&settings).await? {
                std::process::exit(1);
            }
        }

        Commands::Install => {
            let outcome = run_install(&settings, cli.quiet).await?;
            if !outcome.success {
                std::process::exit(1);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Get { key } => {
                if let Some(key) = key {
                    match get_setting(&settings, &key) {
                        Some(value) => println!("{}", value),
                        None => {
                            tracing::error!("Setting '{}' not found", key);
                            std::process::exit(1);
                        }
                    }
                } else {
                    println!("--- packup settings ---");
                    for key in SETTING_KEYS {
                        println!("  {}: {}", key, get_setting(&settings, key).unwrap_or_default());
                    }
                }
            }
            ConfigAction::Set { args } => {
                let (key, value) = parse_key_value(&args)
                    .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'."))?;
                set_setting(&mut settings, &key, &value)?;
                save_settings(&settings)?;
                tracing::info!("Setting '{}' updated to '{}'", key, value);
            }
            ConfigAction::Unset { key } => {
                unset_setting(&mut settings, &key)?;
                save_settings(&settings)?;
                tracing::info!("Setting '{}' unset", key);
            }
            ConfigAction::Show { format } => match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&settings)?),
                "yaml" => print!("{}", serde_yaml::to_string(&settings)?),
                other => return Err(anyhow!("Unsupported format '{}'. Use json or yaml", other)),
            },
        },
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Returns false when the feed could not be queried.
async fn run_check(settings: &PackupSettings) -> Result<bool> {
    let source = settings.feed_source()?;
    let install_dir = settings.install_path();
    let client = build_client()?;

    match check_for_update(&client, &source.feed_url(), settings.check_timeout(), &install_dir).await {
        Ok(check) => {
            println!("Installed version: {}", check.local);
            println!("Latest version:    {}", check.latest);
            match &check.status {
                UpdateStatus::UpdateAvailable { .. } => {
                    println!("{}", style(format!("➜ {}", check.status)).yellow().bold())
                }
                UpdateStatus::UpToDate => println!("{}", style("You have the latest version").green().bold()),
                UpdateStatus::Unknown => {}
            }
            Ok(true)
        }
        Err(e) => {
            println!("Latest version:    {}", style("?").red());
            eprintln!("{}", style(format!("✗ {}", e)).red().bold());
            Ok(false)
        }
    }
}

async fn run_install(settings: &PackupSettings, quiet: bool) -> Result<InstallOutcome> {
    let install_dir = settings.install_path();
    let request = InstallRequest {
        feed_url: settings.feed_source()?.feed_url(),
        install_dir: install_dir.clone(),
        work_dir: settings.work_path()?,
        merge_mode: settings.merge_mode,
        feed_timeout: settings.install_feed_timeout(),
    };

    tracing::info!("Installing into {} ({} mode)", install_dir.display(), settings.merge_mode);

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut session = Session::new();
    session.start(build_client()?, request)?;

    let outcome = session
        .wait(|event| match event {
            // println is a no-op on a hidden bar (quiet, or stderr not a tty)
            InstallEvent::Log(line) if quiet => tracing::debug!("{}", line),
            InstallEvent::Log(line) if pb.is_hidden() => eprintln!("{}", line),
            InstallEvent::Log(line) => pb.println(line),
            InstallEvent::Progress(pct) => pb.set_position(u64::from(*pct)),
            InstallEvent::Finished(_) => {}
        })
        .await
        .ok_or_else(|| anyhow!("install finished without an outcome"))?;
    pb.finish_and_clear();

    if outcome.success {
        println!("{}", style("Installation complete!").green().bold());
        println!("{}", outcome.message);
        if let Some(version) = &outcome.version {
            println!("Installed version: {}", version);
        }
    } else {
        eprintln!("{}", style("Installation failed").red().bold());
        eprintln!("{}", outcome.message);
    }

    Ok(outcome)
}
