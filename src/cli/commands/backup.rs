use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::backup::backup;
use crate::errors::AppResult;
use crate::utils::path::absolute_output;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Backup {
        file,
        compress,
        force,
    } = cmd
    {
        let dest = absolute_output(file)?;
        backup(&cfg.database, &dest, *compress, *force)?;
    }

    Ok(())
}
