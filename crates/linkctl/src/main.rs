//! linkctl: command line tool to manage a self-hosted LinkShare service.
//!
//! Resolves the database and schema locations, opens the store, runs one
//! subcommand, and always closes the store before exiting.

mod commands;
mod config;
mod paths;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use linkshare_db::{SettingKind, Store, StoreSettings, SCHEMA_VERSION};
use tracing_subscriber::EnvFilter;

use crate::commands::{BuildInfo, CommandError};
use crate::config::{Config, LoggingConfig};

const DEFAULT_CONFIG_PATH: &str = "linkshare.toml";

#[derive(Parser)]
#[command(name = "linkctl")]
#[command(version)]
#[command(about = "Command line tool to manage your self-hosted LinkShare service")]
struct Cli {
    /// Database file path
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Database commands
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Link commands
    Link {
        #[command(subcommand)]
        command: LinkCommand,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Initialize the database
    Init,

    /// Verify the database schema version
    Check,

    /// Backup the database
    Backup {
        /// Destination file; must not exist yet
        destination: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get { key: String },

    /// Set a configuration value
    Set {
        key: String,
        value: String,

        /// Value kind: int, string, bool, json or glob
        #[arg(short, long, default_value = "string")]
        kind: SettingKind,
    },

    /// List all configuration values
    List,
}

#[derive(Subcommand)]
enum LinkCommand {
    /// Store a new link and print its id
    Add {
        url: String,
        title: String,

        /// Hide the link from public listings
        #[arg(short, long)]
        private: bool,
    },

    /// Show a single link
    Get {
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace a link's url, title and visibility
    Update {
        id: i64,
        url: String,
        title: String,

        /// Hide the link from public listings
        #[arg(short, long)]
        private: bool,
    },

    /// Delete a link
    Delete { id: i64 },

    /// List links, most recent first
    List {
        /// Include private links
        #[arg(short, long)]
        all: bool,

        #[arg(long, default_value = "0")]
        offset: u32,

        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count links
    Count {
        /// Include private links
        #[arg(short, long)]
        all: bool,
    },
}

fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match std::env::var("LINKSHARE_CONFIG_PATH") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so command output stays pipeable.
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging, cli.verbose);
    tracing::debug!(path = %config_path.display(), "resolved configuration path");

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &Config) -> Result<(), CommandError> {
    let mut out = std::io::stdout().lock();

    if let Command::Version = cli.command {
        return commands::version(&BuildInfo::current(), &mut out);
    }

    let db_path = match cli.db.or_else(|| config.database.path.clone()) {
        Some(path) => path,
        None => paths::discover().map_err(CommandError::Paths)?.database_file,
    };

    let settings = StoreSettings {
        expected_schema_version: SCHEMA_VERSION,
        busy_timeout_ms: config.database.busy_timeout_ms,
        ..StoreSettings::default()
    };
    let mut store = Store::open(&db_path, settings)?;

    let result = dispatch(cli.command, &store, config, &mut out);
    store.close();
    result
}

fn dispatch(
    command: Command,
    store: &Store,
    config: &Config,
    out: &mut impl std::io::Write,
) -> Result<(), CommandError> {
    match command {
        Command::Version => commands::version(&BuildInfo::current(), out),
        Command::Db { command } => match command {
            DbCommand::Init => {
                let schema_dir = match &config.database.schema_dir {
                    Some(dir) => dir.clone(),
                    None => paths::discover().map_err(CommandError::Paths)?.schema_dir,
                };
                commands::db_init(store, &schema_dir, out)
            }
            DbCommand::Check => commands::db_check(store, out),
            DbCommand::Backup { destination } => commands::db_backup(store, &destination, out),
        },
        Command::Config { command } => {
            store.check_schema_version()?;
            match command {
                ConfigCommand::Get { key } => commands::config_get(store, &key, out),
                ConfigCommand::Set { key, value, kind } => {
                    commands::config_set(store, &key, &value, kind, out)
                }
                ConfigCommand::List => commands::config_list(store, out),
            }
        }
        Command::Link { command } => {
            store.check_schema_version()?;
            match command {
                LinkCommand::Add {
                    url,
                    title,
                    private,
                } => commands::link_add(store, &url, &title, private, out),
                LinkCommand::Get { id, json } => commands::link_get(store, id, json, out),
                LinkCommand::Update {
                    id,
                    url,
                    title,
                    private,
                } => commands::link_update(store, id, &url, &title, private),
                LinkCommand::Delete { id } => commands::link_delete(store, id),
                LinkCommand::List {
                    all,
                    offset,
                    limit,
                    json,
                } => commands::link_list(store, all, offset, limit, json, out),
                LinkCommand::Count { all } => commands::link_count(store, all, out),
            }
        }
    }
}
