use clap::{Parser, Subcommand, ValueEnum};

pub fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // Release builds are cut from a tag
    if let Some(tag) = option_env!("WADMAN_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("WADMAN_GIT_COMMIT").unwrap_or("unknown");

    // Leaked once at startup
    let version = format!("v{}-{}", BASE_VERSION, commit);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "wadman")]
#[command(about = "A CLI addon manager for World of Warcraft")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track one or more addons and install them
    #[command(
        after_help = "Examples:\n  wadman add 61284\n  wadman add curse:3358 wowi:5108\n\nBare numbers are CurseForge project ids."
    )]
    Add {
        /// Addon identifiers (e.g., 'curse:61284', 'wowi:5108' or '61284')
        #[arg(required = true)]
        addon_ids: Vec<String>,
    },

    /// Stop tracking addons and delete their directories
    Remove {
        /// Addon identifiers (e.g., 'curse:61284')
        #[arg(required = true)]
        addon_ids: Vec<String>,
    },

    /// List tracked addons
    List,

    /// Check tracked addons for updates and install them
    #[command(
        after_help = "Examples:\n  wadman update\n  wadman update curse:61284 --force\n  wadman -v update\n\nWith -v the release selection steps are logged for each addon."
    )]
    Update {
        /// Only update these addons (defaults to all)
        addon_ids: Vec<String>,
        /// Reinstall even when the installed release is current
        #[arg(short, long)]
        force: bool,
    },

    /// Look for addon directories that are not tracked yet
    Scan {
        /// Also report load-on-demand addons
        #[arg(long)]
        include_load_on_demand: bool,
    },

    /// Search CurseForge for addons by name
    Search {
        /// Search text
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Rewrite the config file in the current format
    Migrate,

    /// Manage wadman's configuration
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
        /// Key and value (e.g., 'install_path=/games/wow' or 'channel release')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Show full configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = ShowFormat::Json)]
        format: ShowFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_flags() {
        let cli = Cli::parse_from(["wadman", "-vv", "update", "curse:1", "--force"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Update { addon_ids, force } => {
                assert_eq!(addon_ids, vec!["curse:1".to_string()]);
                assert!(force);
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let cli = Cli::parse_from(["wadman", "update", "--verbose"]);
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_config_set_accepts_split_args() {
        let cli = Cli::parse_from(["wadman", "config", "set", "channel", "release"]);
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { args },
            } => assert_eq!(args, vec!["channel".to_string(), "release".to_string()]),
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn test_add_requires_an_id() {
        assert!(Cli::try_parse_from(["wadman", "add"]).is_err());
    }
}
