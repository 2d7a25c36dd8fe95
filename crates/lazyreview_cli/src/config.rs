//! Command-line configuration.
//!
//! # Responsibility
//! - Parse flags and environment overrides.
//! - Resolve default locations under the platform data directory.
//!
//! # Invariants
//! - Resolved paths are absolute.

use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use lazyreview_core::{default_log_level, DEFAULT_RETENTION_DAYS};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "lazyreview";
const DB_FILE_NAME: &str = "lazyreview.sqlite3";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Parser)]
#[command(name = "lazyreview", version, about = "Spaced review task tracker for the terminal")]
pub struct Cli {
    /// SQLite task store path.
    #[arg(long, env = "LAZYREVIEW_DB")]
    pub db: Option<PathBuf>,

    /// Directory for rolling log files.
    #[arg(long, env = "LAZYREVIEW_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error.
    #[arg(long, env = "LAZYREVIEW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Days a finished task is kept before it is pruned.
    #[arg(
        long,
        default_value_t = DEFAULT_RETENTION_DAYS,
        value_parser = clap::value_parser!(i64).range(0..=3650)
    )]
    pub retention_days: i64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive review list (default).
    Tui,
    /// Print active tasks and exit.
    List,
    /// Remove finished tasks past the retention window and exit.
    Prune,
}

#[derive(Debug)]
pub enum ConfigError {
    /// No `--db`/`--log-dir` given and the platform has no data directory.
    NoDataDir,
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDir => write!(
                f,
                "cannot determine a data directory; pass --db and --log-dir explicitly"
            ),
            Self::CurrentDir(err) => write!(f, "cannot resolve relative path: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir(err) => Some(err),
            Self::NoDataDir => None,
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub retention: TimeDelta,
    pub command: Command,
}

impl AppConfig {
    /// Resolves CLI input against the platform data directory.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, dirs::data_dir())
    }

    fn resolve(cli: Cli, data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let app_dir = data_dir.map(|dir| dir.join(APP_DIR_NAME));
        let db_path = match cli.db {
            Some(path) => path,
            None => app_dir
                .as_ref()
                .ok_or(ConfigError::NoDataDir)?
                .join(DB_FILE_NAME),
        };
        let log_dir = match cli.log_dir {
            Some(path) => path,
            None => app_dir
                .as_ref()
                .ok_or(ConfigError::NoDataDir)?
                .join(LOG_DIR_NAME),
        };

        Ok(Self {
            db_path: absolutize(&db_path)?,
            log_dir: absolutize(&log_dir)?,
            log_level: cli
                .log_level
                .unwrap_or_else(|| default_log_level().to_string()),
            retention: TimeDelta::days(cli.retention_days),
            command: cli.command.unwrap_or(Command::Tui),
        })
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}
