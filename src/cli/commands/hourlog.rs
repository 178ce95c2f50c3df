use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands, HourlogAction};
use crate::config::Config;
use crate::core::session::{FlagOutcome, LogSession, SaveOutcome};
use crate::core::validation::{Status, classify_field, classify_slot};
use crate::errors::{AppError, AppResult};
use crate::models::field::{FieldKind, catalogue};
use crate::models::hour_slot::HourSlot;
use crate::models::stream::LogStream;
use crate::store::SlotStore;
use crate::ui::messages::{header, info, notice, success, warning};
use crate::utils::colors::{GREY, RESET, color_for_status, colorize_optional};
use crate::utils::table::{Column, Table};
use chrono::Duration;

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Hourlog { action } = &cli.command else {
        return Ok(());
    };
    let rt = Runtime::new(cli, cfg)?;

    match action {
        HourlogAction::Show {
            stream,
            date,
            hour,
            json,
        } => {
            let stream = rt.check_stream(*stream)?;
            let date = rt.day(date.as_deref())?;
            let store = rt.open_store(cfg)?;
            let slots = store.list_slots(stream.kind(), date, Some(stream))?;

            if let Some(h) = hour {
                if *h > 23 {
                    return Err(AppError::InvalidHour(h.to_string()));
                }
                let slot = slots
                    .into_iter()
                    .find(|s| s.hour == *h)
                    .unwrap_or_else(|| HourSlot::blank(date, *h, stream));
                if *json {
                    println!("{}", serde_json::to_string_pretty(&slot)?);
                } else {
                    print_slot(&slot);
                }
            } else if *json {
                println!("{}", serde_json::to_string_pretty(&slots)?);
            } else {
                header(format!("{stream} {date}"), &rt.local_now());
                if let Some(fin) = store.finalization(date, stream)? {
                    info(format!("Finalized by {} at {}", fin.finalized_by, fin.finalized_at));
                }
                print_day(&slots);
            }
        }

        HourlogAction::Set {
            stream,
            values,
            remark,
            flag,
            description,
            severity,
        } => {
            let stream = rt.check_stream(*stream)?;
            let debounce = Duration::seconds(cfg.autosave_secs(stream.kind()) as i64);
            let mut session = LogSession::new(
                rt.open_store(cfg)?,
                rt.actor.clone(),
                stream,
                rt.ctx.tz,
                debounce,
            );
            session.load(rt.now)?;

            for pair in values {
                let (field, raw) = pair.split_once('=').ok_or_else(|| {
                    AppError::InvalidValue(format!("expected field=value, got '{pair}'"))
                })?;
                let cls = session.set_field(field.trim(), raw, rt.now)?;
                if let Some(msg) = cls.message
                    && cls.status != Status::Normal
                {
                    warning(format!("{}: {}", field.trim(), msg));
                }
            }
            if let Some(r) = remark {
                session.set_remark(r, rt.now)?;
            }

            match session.save(rt.now)? {
                SaveOutcome::Saved { hour, change, .. } => success(format!(
                    "{stream} {:02}:00 saved ({})",
                    hour,
                    change.as_str()
                )),
                SaveOutcome::Unchanged => info("Nothing to save."),
                SaveOutcome::Queued => info("Save queued behind a write in flight."),
            }

            if let Some(field) = flag {
                match session.flag_field(field, description.as_deref(), *severity, rt.now)? {
                    FlagOutcome::Created(issue) => success(format!(
                        "Issue {} flagged ({})",
                        issue.code,
                        issue.severity.as_str()
                    )),
                    // A queued issue would not outlive this command.
                    FlagOutcome::Queued(p) => {
                        return Err(AppError::InvalidValue(format!(
                            "{stream} {:02}:00 has no saved log yet; set a value before flagging",
                            p.hour
                        )));
                    }
                }
            }

            for n in session.take_notices() {
                notice(n);
            }
        }

        HourlogAction::Fields { stream } => print_fields(rt.check_stream(*stream)?),
    }

    Ok(())
}

fn print_day(slots: &[HourSlot]) {
    if slots.is_empty() {
        println!("{GREY}No hours logged.{RESET}");
        return;
    }

    let mut table = Table::new(vec![
        Column::new("Hour", 5),
        Column::new("Filled", 6),
        Column::new("Alerts", 6),
        Column::new("By", 12),
        Column::new("Updated", 25),
        Column::new("Remark", 20),
    ]);

    for s in slots {
        let alerts = classify_slot(s)
            .iter()
            .filter(|c| c.classification.status != Status::Normal)
            .count();
        table.add_row(vec![
            format!("{:02}:00", s.hour),
            s.filled_count().to_string(),
            alerts.to_string(),
            s.logged_by.clone(),
            s.updated_at.clone(),
            s.remark.clone(),
        ]);
    }
    print!("{}", table.render());
}

fn print_slot(slot: &HourSlot) {
    println!(
        "{} {} {:02}:00  {}",
        slot.stream,
        slot.date_str(),
        slot.hour,
        if slot.id.is_some() {
            format!("logged by {}", slot.logged_by)
        } else {
            format!("{GREY}not logged{RESET}")
        }
    );

    let mut section = "";
    for spec in catalogue(slot.stream.kind()) {
        if spec.section != section {
            section = spec.section;
            println!("\n[{section}]");
        }
        let value = slot.get(spec.key).cloned().unwrap_or_else(|| spec.default_value());
        let cls = classify_field(spec, &value);
        let color = color_for_status(cls.status);
        println!(
            "  {:<32} {}{}{} {}",
            spec.label,
            color,
            colorize_optional(&value.to_string()),
            RESET,
            spec.unit
        );
    }

    if !slot.remark.is_empty() {
        println!("\nRemark: {}", slot.remark);
    }
}

fn print_fields(stream: LogStream) {
    let mut table = Table::new(vec![
        Column::new("Field", 24),
        Column::new("Label", 30),
        Column::new("Unit", 6),
        Column::new("Range", 18),
        Column::new("Ideal", 14),
    ]);

    for spec in catalogue(stream.kind()) {
        let (range, ideal) = match spec.kind {
            FieldKind::Numeric(r) => (
                format!("{}..{}", r.min, r.max),
                r.ideal
                    .map(|(lo, hi)| format!("{lo}..{hi}"))
                    .unwrap_or_default(),
            ),
            FieldKind::Choice(options) => (options.join("|"), String::new()),
        };
        table.add_row(vec![
            spec.key.to_string(),
            spec.label.to_string(),
            spec.unit.to_string(),
            range,
            ideal,
        ]);
    }
    print!("{}", table.render());
}
