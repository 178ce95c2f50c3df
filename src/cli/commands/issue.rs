use crate::cli::commands::Runtime;
use crate::cli::parser::{Cli, Commands, IssueAction};
use crate::config::Config;
use crate::core::issues::{advance, checklist_issue, list, raise};
use crate::errors::{AppError, AppResult};
use crate::models::issue::{FlaggedIssue, IssueFilter, IssueLocation, IssueTarget};
use crate::ui::messages::success;
use crate::utils::colors::{GREY, RESET, color_for_issue_status, color_for_severity};
use crate::utils::date::parse_date;
use crate::utils::table::{Column, Table};

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Issue { action } = &cli.command else {
        return Ok(());
    };
    let rt = Runtime::new(cli, cfg)?;
    let mut store = rt.open_store(cfg)?;

    match action {
        IssueAction::List {
            status,
            severity,
            module,
            date,
            limit,
            json,
        } => {
            let date = date
                .as_deref()
                .map(|d| parse_date(d).ok_or_else(|| AppError::InvalidDate(d.to_string())))
                .transpose()?;
            let filter = IssueFilter {
                status: *status,
                severity: *severity,
                module: module.clone(),
                date,
                limit: *limit,
            };
            let issues = list(&store, &filter)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&issues)?);
            } else {
                print_issues(&issues);
            }
        }

        IssueAction::Flag {
            module,
            section,
            item,
            unit,
            severity,
            description,
        } => {
            let issue = checklist_issue(
                rt.day(None)?,
                IssueLocation {
                    module: module.clone(),
                    section: section.clone(),
                    item: item.clone(),
                    unit: unit.clone(),
                },
                *severity,
                description,
            );
            let created = raise(&mut store, &rt.actor, &issue, rt.now)?;
            success(format!(
                "Issue {} flagged ({})",
                created.code,
                created.severity.as_str()
            ));
        }

        IssueAction::Status { code, status } => {
            let updated = advance(&mut store, &rt.actor, code, *status, rt.now)?;
            success(format!("Issue {} is now {}", updated.code, updated.status));
        }
    }
    Ok(())
}

fn print_issues(issues: &[FlaggedIssue]) {
    if issues.is_empty() {
        println!("{GREY}No issues.{RESET}");
        return;
    }

    let mut table = Table::new(vec![
        Column::new("Code", 16),
        Column::new("Severity", 8),
        Column::new("Status", 11),
        Column::new("Target", 20),
        Column::new("Module", 14),
        Column::new("Description", 30),
    ]);

    for i in issues {
        let target = match &i.target {
            IssueTarget::ChecklistDay { date } => format!("checklist {date}"),
            IssueTarget::HourSlot { kind, slot_id } => format!("{} #{slot_id}", kind.as_str()),
        };
        table.add_row(vec![
            i.code.clone(),
            i.severity.as_str().to_string(),
            i.status.as_str().to_string(),
            target,
            i.location.module.clone(),
            i.description.clone(),
        ]);
    }

    // Colour per row after padding so widths stay right.
    let rendered = table.render();
    let mut lines = rendered.lines();
    if let Some(head) = lines.next() {
        println!("{head}");
    }
    for (line, i) in lines.zip(issues) {
        println!(
            "{}{}{} {}",
            color_for_severity(i.severity),
            line,
            RESET,
            format_args!("{}●{}", color_for_issue_status(i.status), RESET)
        );
    }
}
