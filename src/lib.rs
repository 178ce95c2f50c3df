//! hydrolog library root.
//! Exposes the CLI parser, the high-level run() function and the engine modules.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod store;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::commands;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;

/// Filter used when `HYDROLOG_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "hydrolog=warn";

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => commands::init::handle(cli),
        Commands::Config { .. } => commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => commands::log::handle(&cli.command, cfg),
        Commands::Status { .. } => commands::status::handle(cli, cfg),
        Commands::Hourlog { .. } => commands::hourlog::handle(cli, cfg),
        Commands::Finalize { .. } => commands::finalize::handle(cli, cfg),
        Commands::Checklist { .. } => commands::checklist::handle(cli, cfg),
        Commands::Issue { .. } => commands::issue::handle(cli, cfg),
        Commands::Tool { .. } => commands::tool::handle(cli, cfg),
        Commands::Export { .. } => commands::export::handle(cli, cfg),
        Commands::Backup { .. } => commands::backup::handle(&cli.command, cfg),
        Commands::Watch { .. } => commands::watch::handle(cli, cfg),
    }
}

/// Structured logs go to stderr so stdout stays clean for `--json` and `tool`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("HYDROLOG_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    init_tracing();

    let cli = Cli::parse();

    // `init` writes the configuration; it must not need a valid one.
    let mut cfg = match cli.command {
        Commands::Init => Config::default(),
        _ => Config::load()?,
    };

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }

    dispatch(&cli, &cfg)
}
