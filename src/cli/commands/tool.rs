use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::tools::{TOOL_NAMES, ToolFacade};
use crate::errors::AppResult;
use serde_json::Value;

/// Prints the tool result as JSON on stdout; nothing else goes to stdout.
pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Tool { name, args, list } = &cli.command {
        if *list {
            for t in TOOL_NAMES {
                println!("{t}");
            }
            return Ok(());
        }
        let Some(name) = name else {
            return Ok(());
        };

        let args: Value = match args {
            Some(raw) => serde_json::from_str(raw)?,
            None => Value::Null,
        };

        let rt = Runtime::new(cli, cfg)?;
        let mut store = rt.open_store(cfg)?;
        let mut facade = ToolFacade::new(&mut store, &rt.ctx, rt.actor.clone());
        let out = facade.call(name, args, rt.now)?;
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(())
}
