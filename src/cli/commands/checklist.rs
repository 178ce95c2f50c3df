use crate::cli::commands::Runtime;
use crate::cli::parser::{ChecklistAction, Cli, Commands};
use crate::config::Config;
use crate::core::checklist::{parse_module_data, summarize};
use crate::core::gate::{CategoryState, ChecklistGate, GateOverview};
use crate::errors::AppResult;
use crate::store::ChecklistStore;
use crate::ui::messages::{header, info, success, warning};
use crate::utils::colors::{GREEN, GREY, RESET, YELLOW};
use crate::utils::table::{Column, Table};

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Checklist { action } = &cli.command else {
        return Ok(());
    };
    let rt = Runtime::new(cli, cfg)?;
    let mut gate = ChecklistGate::new(
        rt.open_store(cfg)?,
        rt.actor.clone(),
        rt.ctx.tz,
        rt.ctx.schedule.clone(),
        rt.ctx.modules.clone(),
    );

    match action {
        ChecklistAction::Status { json } => {
            let overview = gate.overview(rt.now)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                header(format!("Checklist {}", overview.date), &rt.local_now());
                print_overview(&overview);
            }
        }

        ChecklistAction::Fill {
            module,
            qr,
            emergency,
            data,
        } => {
            let data = parse_module_data(data)?;
            if let Some(reason) = emergency {
                gate.arm_emergency(reason, rt.now)?;
            }

            let state = gate.scan_qr(*module, qr, rt.now)?;
            if let CategoryState::Unlocked { source } = state {
                info(format!("Module {module} unlocked ({})", source.as_str()));
            }

            let day = gate.complete(*module, &data, rt.now)?;
            success(format!(
                "Module {module} completed; checklist {} at {}%",
                day.date, day.completion_pct
            ));
            if gate.emergency().is_some() {
                warning("Emergency override not used; it expires with this command.");
            }
        }

        ChecklistAction::Submit => {
            let day = gate.submit(rt.now)?;
            success(format!(
                "Checklist {} submitted by {} ({}%)",
                day.date,
                day.submitted_by.as_deref().unwrap_or("-"),
                day.completion_pct
            ));
        }

        ChecklistAction::List { limit } => {
            let days = gate.store().list_days(*limit)?;
            if days.is_empty() {
                println!("{GREY}No checklist days.{RESET}");
                return Ok(());
            }
            let mut table = Table::new(vec![
                Column::new("Date", 10),
                Column::new("Done", 5),
                Column::new("Missing", 8),
                Column::new("Submitted", 25),
            ]);
            for day in &days {
                let s = summarize(day);
                let missing: Vec<String> = s.modules_missing.iter().map(u8::to_string).collect();
                table.add_row(vec![
                    s.date.to_string(),
                    format!("{}%", s.completion_pct),
                    missing.join(","),
                    match (&s.submitted_by, &s.submitted_at) {
                        (Some(by), Some(at)) => format!("{by} {at}"),
                        _ => "-".to_string(),
                    },
                ]);
            }
            print!("{}", table.render());
        }
    }
    Ok(())
}

fn print_overview(o: &GateOverview) {
    match &o.current {
        Some(s) => println!("Session {} open", s.number),
        None => println!(
            "{GREY}Outside session windows (working on session {}); next is session {} on {}{RESET}",
            o.working_session, o.next.number, o.next.date
        ),
    }

    for m in &o.modules {
        let state = match &m.state {
            CategoryState::Locked => format!("{GREY}locked{RESET}"),
            CategoryState::Unlocked { source } => {
                format!("{YELLOW}unlocked ({}){RESET}", source.as_str())
            }
            CategoryState::Completed { by, source } => {
                format!("{GREEN}completed by {by} ({}){RESET}", source.as_str())
            }
        };
        println!("  {}. {:<34} {}", m.number, m.name, state);
    }

    if o.session_complete {
        println!("{GREEN}Session {} complete{RESET}", o.working_session);
    }
    match &o.day {
        Some(d) if d.submitted => println!("Day {}%, {GREEN}submitted{RESET}", d.completion_pct),
        Some(d) => println!("Day {}%, draft", d.completion_pct),
        None => println!("{GREY}Day record not created yet{RESET}"),
    }
}
