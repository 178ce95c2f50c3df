use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::finalize::finalize_day;
use crate::errors::AppResult;
use crate::ui::messages::success;

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Finalize { stream, date } = &cli.command {
        let rt = Runtime::new(cli, cfg)?;
        let stream = rt.check_stream(*stream)?;
        let date = rt.day(date.as_deref())?;
        let mut store = rt.open_store(cfg)?;

        let fin = finalize_day(&mut store, &rt.actor, date, stream, rt.now)?;
        success(format!(
            "{} {} finalized by {} at {}",
            fin.stream, fin.date, fin.finalized_by, fin.finalized_at
        ));
    }
    Ok(())
}
