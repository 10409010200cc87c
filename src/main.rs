mod addon_id;
mod archive;
mod cli;
mod config;
mod disabled;
mod download;
mod game;
mod install;
mod migrate;
mod provider;
mod scan;
mod select;
mod types;


use addon_id::AddonIdentifier;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction, ShowFormat};
use config::{apply_env_overrides, get_config_file_path, load_config, normalize_key, save_config};
use console::style;
use game::{guess_install_path, GameInstall};
use install::{reconcile, remove_addon, UpdateOutcome};
use provider::HttpSource;
use scan::{scan_untracked, suggested_add_command, ScanResult};
use std::collections::HashSet;
use std::path::PathBuf;
use types::{AddonRecord, Channel, WadmanConfig, WadmanSettings};

const SETTING_KEYS: &str = "install_path, flavor, channel, game_versions";

/// The loaded config plus the values stored on disk, so that environment
/// overrides are never written back.
struct Session {
    path: PathBuf,
    config: WadmanConfig,
    stored_install_path: PathBuf,
    stored_settings: WadmanSettings,
}

impl Session {
    fn load() -> Result<Self> {
        let path = get_config_file_path()?;
        let mut config = load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        let stored_install_path = config.install_path.clone();
        let stored_settings = config.settings.clone();
        apply_env_overrides(&mut config);

        Ok(Self {
            path,
            config,
            stored_install_path,
            stored_settings,
        })
    }

    fn save(&self) -> Result<()> {
        let mut on_disk = self.config.clone();
        on_disk.install_path = self.stored_install_path.clone();
        on_disk.settings = self.stored_settings.clone();
        save_config(&self.path, &on_disk)
            .with_context(|| format!("Failed to save config to {}", self.path.display()))
    }

    /// Sorts the addon list by display name and saves.
    fn save_sorted(&mut self) -> Result<()> {
        self.config
            .addons
            .sort_by_key(|a| a.display_name.to_lowercase());
        self.save()
    }

    fn install(&self) -> Result<GameInstall> {
        let root = if self.config.has_install_path() {
            self.config.install_path.clone()
        } else {
            let guess = guess_install_path().ok_or_else(|| {
                anyhow!(
                    "Could not find a World of Warcraft install. Set it with 'wadman config set install_path=<path>'"
                )
            })?;
            tracing::info!("Using detected install path {}", guess.display());
            guess
        };

        if !root.is_dir() {
            bail!(
                "Install path {} does not exist. Set it with 'wadman config set install_path=<path>'",
                root.display()
            );
        }
        Ok(GameInstall::new(root))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    if let Commands::Version = cli.command {
        println!("wadman {}", cli::get_version());
        return Ok(());
    }

    let mut session = Session::load()?;

    match cli.command {
        Commands::Version => {}

        Commands::Add { addon_ids } => {
            let ids = parse_identifiers(&addon_ids)?;
            let install = session.install()?;
            let source = HttpSource::from_env()?;
            let policy = session.config.settings.policy();

            for id in ids {
                if let Some(index) = session.config.find_addon(id.provider, &id.remote_id) {
                    println!("{} is already tracked", session.config.addons[index].label());
                    continue;
                }

                let mut record = AddonRecord::new(id.provider, id.remote_id.clone());
                let outcome = reconcile(&mut record, &source, &install, &policy, false).await;
                match outcome {
                    UpdateOutcome::Updated { ref version } => {
                        println!("Installed {} version {}", record.label(), version);
                        session.config.addons.push(record);
                        session.save()?;
                    }
                    other => {
                        tracing::error!("Could not add {}: {}", id, other);
                        if let UpdateOutcome::InstallFailed { .. } = other {
                            eprintln!("Not tracking {}: its archive could not be installed", id);
                        }
                    }
                }
            }
            session.save_sorted()?;
        }

        Commands::Remove { addon_ids } => {
            let ids = parse_identifiers(&addon_ids)?;
            let install = session.install()?;

            for id in ids {
                match remove_addon(&mut session.config, &install, &id) {
                    Ok(record) => println!("Removed {}", record.label()),
                    Err(e) => tracing::error!("Failed to remove {}: {:#}", id, e),
                }
            }
            session.save_sorted()?;
        }

        Commands::List => list_addons(&session),

        Commands::Update { addon_ids, force } => {
            let filter = parse_identifiers(&addon_ids)?;
            let install = session.install()?;
            tracing::info!("Checking addons in {}", install.root().display());
            let source = HttpSource::from_env()?;
            let policy = session.config.settings.policy();

            for id in &filter {
                if session.config.find_addon(id.provider, &id.remote_id).is_none() {
                    tracing::warn!("{} is not tracked, skipping", id);
                }
            }

            let mut checked = 0;
            let mut failed = 0;
            let mut install_failures = Vec::new();
            for index in 0..session.config.addons.len() {
                let selected = filter.is_empty()
                    || filter
                        .iter()
                        .any(|id| id.matches(&session.config.addons[index]));
                if !selected {
                    continue;
                }
                let record = &mut session.config.addons[index];
                checked += 1;

                let outcome = reconcile(record, &source, &install, &policy, force).await;
                let label = record.label();
                let short_name = record.short_name();
                if outcome.is_failure() {
                    tracing::error!("{}: {}", label, outcome);
                    failed += 1;
                    if let UpdateOutcome::InstallFailed { .. } = outcome {
                        install_failures.push((label, short_name));
                    }
                } else if let UpdateOutcome::Updated { .. } = outcome {
                    println!("{}: {}", label, outcome);
                    // Keep the file current in case a later addon aborts the run
                    session.save()?;
                } else {
                    tracing::info!("{}: {}", label, outcome);
                }
            }

            session.save_sorted()?;
            if failed > 0 {
                println!("Finished checking {} addons ({} failed)", checked, failed);
            } else {
                println!("Finished checking {} addons", checked);
            }

            if !install_failures.is_empty() {
                eprintln!();
                eprintln!(
                    "{}",
                    style("WARNING: some addons were removed but not reinstalled")
                        .red()
                        .bold()
                );
                for (label, short_name) in install_failures {
                    eprintln!(
                        "  {} -> run {}",
                        label,
                        style(format!("wadman update --force {}", short_name)).yellow()
                    );
                }
            }
        }

        Commands::Scan {
            include_load_on_demand,
        } => {
            let install = session.install()?;
            let tracked: HashSet<String> = session
                .config
                .addons
                .iter()
                .flat_map(|a| a.owned_directories.iter().cloned())
                .collect();

            let entries = scan_untracked(&install, &tracked, include_load_on_demand)
                .with_context(|| {
                    format!("Failed to scan {}", install.addons_dir().display())
                })?;

            println!("--- Untracked Addons ---");
            if entries.is_empty() {
                println!("  All addon directories are tracked.");
                return Ok(());
            }
            for entry in &entries {
                let result = match &entry.result {
                    ScanResult::Known(ids) => ids
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    ScanResult::Unknown => "unknown".to_string(),
                    ScanResult::Error(e) => format!("error: {}", e),
                };
                println!("  {:<32} {}", entry.directory, result);
            }

            if let Some(command) = suggested_add_command(&entries) {
                println!("\nTo track these addons, run:\n  {}", command);
            }
        }

        Commands::Search { query } => {
            let source = HttpSource::from_env()?;
            let query = query.join(" ");
            let hits = source
                .search(&query)
                .await
                .with_context(|| format!("Search for '{}' failed", query))?;

            if hits.is_empty() {
                println!("No addons found matching '{}'", query);
            }
            for hit in hits {
                println!("[{:>6}] {}", hit.remote_id, hit.name);
            }
        }

        Commands::Migrate => {
            session.save()?;
            println!(
                "Config at {} is at schema version {}",
                session.path.display(),
                migrate::CURRENT_SCHEMA_VERSION
            );
        }

        Commands::Config { action } => match action {
            ConfigAction::Get { key } => {
                let settings = setting_values(&session.config);
                match key {
                    Some(key) => {
                        let key = normalize_key(&key);
                        match settings.iter().find(|(k, _)| *k == key) {
                            Some((_, value)) => println!("{}", value),
                            None => bail!(
                                "'{}' is not a valid configuration setting. Valid settings: {}",
                                key,
                                SETTING_KEYS
                            ),
                        }
                    }
                    None => {
                        println!("--- Wadman Settings ---");
                        for (k, v) in settings {
                            println!("  {}: {}", k, v);
                        }
                    }
                }
            }
            ConfigAction::Set { args } => {
                let (key, value) = parse_key_value(&args)?;
                let key = normalize_key(&key);
                match key.as_str() {
                    "install_path" => session.stored_install_path = PathBuf::from(&value),
                    "flavor" => session.stored_settings.flavor = value.clone(),
                    "channel" => {
                        session.stored_settings.channel = value
                            .parse::<Channel>()
                            .map_err(|e| anyhow!("Invalid value for '{}': {}", key, e))?;
                    }
                    "game_versions" => {
                        session.stored_settings.game_versions = value
                            .split(',')
                            .map(|v| v.trim().to_string())
                            .filter(|v| !v.is_empty())
                            .collect();
                    }
                    _ => bail!(
                        "'{}' is not a valid configuration setting. Valid settings: {}",
                        key,
                        SETTING_KEYS
                    ),
                }
                session.save()?;
                tracing::info!("Setting '{}' updated to '{}'", key, value);
            }
            ConfigAction::Show { format } => {
                let rendered = match format {
                    ShowFormat::Json => serde_json::to_string_pretty(&session.config)?,
                    ShowFormat::Yaml => serde_yaml::to_string(&session.config)?,
                };
                println!("{}", rendered.trim_end());
            }
        },
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Any -v on update surfaces the release selection steps
    let verbose = match cli.command {
        Commands::Update { .. } if cli.verbose > 0 => cli.verbose.max(2),
        _ => cli.verbose,
    };

    let level = if cli.quiet {
        "error"
    } else if verbose == 0 {
        "warn"
    } else if verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn parse_identifiers(raw: &[String]) -> Result<Vec<AddonIdentifier>> {
    raw.iter()
        .map(|id| AddonIdentifier::parse(id).map_err(|e| anyhow!("Invalid addon identifier: {}", e)))
        .collect()
}

/// Accepts `key=value` as one argument or `key value` as two.
fn parse_key_value(args: &[String]) -> Result<(String, String)> {
    match args {
        [single] => single
            .split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
        [key, rest @ ..] => Ok((key.clone(), rest.join(" "))),
        [] => bail!("Invalid format. Use 'key=value' or 'key value'."),
    }
}

fn setting_values(config: &WadmanConfig) -> Vec<(&'static str, String)> {
    vec![
        ("install_path", config.install_path.display().to_string()),
        ("flavor", config.settings.flavor.clone()),
        ("channel", config.settings.channel.to_string()),
        ("game_versions", config.settings.game_versions.join(",")),
    ]
}

fn list_addons(session: &Session) {
    println!("--- Installed Addons ---");
    if session.config.addons.is_empty() {
        println!("  No addons installed yet.");
        return;
    }

    // Status columns need the game directory; listing works without it
    let install = session.install().ok();
    let disabled = install
        .as_ref()
        .map(|i| {
            i.disabled_addons().unwrap_or_else(|e| {
                tracing::warn!("Could not read addon state files: {}", e);
                Default::default()
            })
        })
        .unwrap_or_default();

    for addon in &session.config.addons {
        let version = if addon.installed_version_label.is_empty() {
            "not installed".to_string()
        } else {
            addon.installed_version_label.clone()
        };

        let mut status = Vec::new();
        let total = addon.owned_directories.len();
        let disabled_count = addon
            .owned_directories
            .iter()
            .filter(|d| disabled.get(*d).copied().unwrap_or(false))
            .count();
        if total > 0 && disabled_count == total {
            status.push("disabled".to_string());
        } else if disabled_count > 0 {
            status.push(format!("disabled ({}/{})", disabled_count, total));
        }
        if let Some(install) = &install {
            if addon.is_installed() && !install.has_addons(&addon.owned_directories) {
                status.push("missing".to_string());
            }
        }

        if status.is_empty() {
            println!("  - {} ({})", addon.label(), version);
        } else {
            println!("  - {} ({}) [{}]", addon.label(), version, status.join(", "));
        }
    }
}
