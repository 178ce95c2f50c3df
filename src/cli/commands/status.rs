use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::status::{PlantStatus, plant_status};
use crate::errors::AppResult;
use crate::ui::messages::header;
use crate::utils::colors::{GREEN, GREY, RED, RESET, YELLOW};

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Status { json } = &cli.command {
        let rt = Runtime::new(cli, cfg)?;
        let store = rt.open_store(cfg)?;
        let status = plant_status(&store, &rt.ctx, rt.now)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_status(&status);
        }
    }
    Ok(())
}

fn print_status(s: &PlantStatus) {
    header(format!("Plant status {}", s.date), &s.at);

    match &s.current_session {
        Some(cur) => println!("Checklist session {} open", cur.number),
        None => println!(
            "{GREY}No checklist session open; next is session {} on {}{RESET}",
            s.next_session.number, s.next_session.date
        ),
    }
    println!();

    for st in &s.streams {
        let mark = if st.finalized {
            format!("{GREEN}finalized{RESET}")
        } else if st.current_hour_logged {
            format!("{GREEN}current hour logged{RESET}")
        } else {
            format!("{YELLOW}{:02}:00 not logged{RESET}", s.current_hour)
        };
        println!(
            "{:<15} {:>2}/24 hours  {}",
            st.stream.to_string(),
            st.hours_logged,
            mark
        );
        if !st.missing_hours.is_empty() && !st.finalized {
            let list: Vec<String> = st.missing_hours.iter().map(|h| format!("{h:02}")).collect();
            println!("{GREY}  missing: {}{RESET}", list.join(" "));
        }
    }
    println!();

    match &s.checklist {
        Some(c) if c.submitted => println!(
            "Checklist: {}% {GREEN}submitted{RESET} by {}",
            c.completion_pct,
            c.submitted_by.as_deref().unwrap_or("-")
        ),
        Some(c) => println!("Checklist: {}% (draft)", c.completion_pct),
        None => println!("{GREY}Checklist: not started{RESET}"),
    }

    let critical = if s.critical_open > 0 {
        format!(" ({RED}{} critical{RESET})", s.critical_open)
    } else {
        String::new()
    };
    println!("Open issues: {}{}", s.open_issues, critical);
}
