//! `lazyreview` entry point.
//!
//! # Responsibility
//! - Resolve configuration, start file logging, open the task store.
//! - Dispatch to the interactive UI or a one-shot command.

mod config;
mod input;
mod tui;

use clap::Parser;
use config::{AppConfig, Cli, Command};
use lazyreview_core::db::open_db;
use lazyreview_core::{
    init_logging, Clock, Session, SqliteTaskRepository, SystemClock, TaskRepository,
};
use log::info;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_cli(Cli::parse())?;

    let log_dir = config
        .log_dir
        .to_str()
        .ok_or("log directory path is not valid UTF-8")?;
    init_logging(&config.log_level, log_dir)?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = open_db(&config.db_path)?;
    let repo = SqliteTaskRepository::try_new(&conn)?;
    info!(
        "event=cli_start module=cli status=ok command={:?}",
        config.command
    );

    match config.command {
        Command::Tui => {
            let session = Session::open(repo, SystemClock)?;
            let pruned = tui::run(session, config.retention)?;
            info!("event=cli_exit module=cli status=ok pruned={pruned}");
        }
        Command::List => {
            let session = Session::open(repo, SystemClock)?;
            for line in session.display_lines() {
                println!("{}", line.text);
            }
        }
        Command::Prune => {
            let removed = repo.prune_terminal_older_than(config.retention, SystemClock.now())?;
            println!("pruned {removed} finished task(s)");
        }
    }

    Ok(())
}
