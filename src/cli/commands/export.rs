use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::export::{ExportRequest, export, parse_range};
use crate::errors::AppResult;
use crate::utils::path::absolute_output;

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        scope,
        format,
        file,
        range,
        transformer,
        force,
    } = &cli.command
    {
        let rt = Runtime::new(cli, cfg)?;
        let range = match range {
            Some(r) => parse_range(r)?,
            None => {
                let today = rt.day(None)?;
                (today, today)
            }
        };
        let file = absolute_output(file)?;
        let store = rt.open_store(cfg)?;

        export(
            &store,
            &ExportRequest {
                scope: *scope,
                format: *format,
                file: &file,
                range,
                transformer: *transformer,
                force: *force,
            },
        )?;
    }
    Ok(())
}
