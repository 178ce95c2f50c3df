//! One handler per subcommand, plus the runtime they share.

pub mod backup;
pub mod checklist;
pub mod config;
pub mod db;
pub mod export;
pub mod finalize;
pub mod hourlog;
pub mod init;
pub mod issue;
pub mod log;
pub mod status;
pub mod tool;
pub mod watch;

use crate::cli::parser::Cli;
use crate::config::Config;
use crate::core::PlantContext;
use crate::core::clock::operational_date;
use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::stream::LogStream;
use crate::store::SqliteStore;
use crate::utils::date::parse_date;
use crate::utils::time::{parse_instant, stamp};
use chrono::{DateTime, NaiveDate, Utc};

/// Resolved per-invocation state: plant constants, acting user and clock.
pub struct Runtime {
    pub ctx: PlantContext,
    pub actor: Actor,
    pub now: DateTime<Utc>,
}

impl Runtime {
    pub fn new(cli: &Cli, cfg: &Config) -> AppResult<Self> {
        let now = match &cli.at {
            Some(at) => parse_instant(at)?,
            None => Utc::now(),
        };
        let name = cli
            .user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "operator".to_string());

        Ok(Self {
            ctx: PlantContext::from_config(cfg)?,
            actor: Actor::new(name, cli.role),
            now,
        })
    }

    pub fn open_store(&self, cfg: &Config) -> AppResult<SqliteStore> {
        SqliteStore::open(&cfg.database, self.ctx.tz)
    }

    /// Operational day from an optional `YYYY-MM-DD` argument, today otherwise.
    pub fn day(&self, arg: Option<&str>) -> AppResult<NaiveDate> {
        match arg {
            Some(s) => parse_date(s).ok_or_else(|| AppError::InvalidDate(s.to_string())),
            None => Ok(operational_date(self.now, self.ctx.tz)),
        }
    }

    /// Reject transformer numbers the plant does not have.
    pub fn check_stream(&self, stream: LogStream) -> AppResult<LogStream> {
        match stream {
            LogStream::Transformer(n) if n == 0 || n > self.ctx.transformer_count => {
                Err(AppError::InvalidValue(format!(
                    "transformer {n} (plant has {})",
                    self.ctx.transformer_count
                )))
            }
            s => Ok(s),
        }
    }

    /// Plant-local timestamp of `now`.
    pub fn local_now(&self) -> String {
        stamp(self.now, self.ctx.tz)
    }
}
