use crate::config::Config;
use crate::core::clock::SessionSchedule;
use crate::errors::AppResult;

use crate::cli::parser::Commands;
use crate::ui::messages::{success, warning};

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
    } = cmd
    {
        let path = Config::config_file();

        if *print_config {
            println!("📄 Current configuration ({}):\n", path.display());
            println!("{}", serde_yaml::to_string(cfg)?);
        }

        if *check {
            cfg.validate()?;
            let schedule = SessionSchedule::from_config(cfg)?;

            if path.exists() {
                let missing = Config::missing_keys(&path)?;
                if missing.is_empty() {
                    success("Configuration file has every known key.");
                } else {
                    warning(format!(
                        "Missing keys (defaults in use): {}",
                        missing.join(", ")
                    ));
                }
            } else {
                warning(format!(
                    "No configuration file at {}; defaults in use.",
                    path.display()
                ));
            }

            let windows: Vec<String> = (1..=schedule.anchors().len() as u8)
                .filter_map(|n| schedule.window_label(n).map(|w| format!("{n}: {w}")))
                .collect();
            success(format!(
                "Session windows (UTC{}): {}",
                cfg.utc_offset,
                windows.join("  ")
            ));
        }
    }

    Ok(())
}
