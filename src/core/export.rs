//! Plain CSV / JSON export of hour logs and issues.

use crate::errors::{AppError, AppResult};
use crate::models::field::catalogue;
use crate::models::hour_slot::HourSlot;
use crate::models::issue::{FlaggedIssue, IssueFilter, IssueTarget};
use crate::models::stream::{LogKind, LogStream};
use crate::store::{IssueStore, SlotStore};
use crate::ui::messages::{info, success, warning};
use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use csv::Writer;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Longest range accepted by one export.
const MAX_RANGE_DAYS: i64 = 366;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportScope {
    Generator,
    Transformer,
    Issues,
}

/// Parse `YYYY-MM-DD`, `YYYY-MM` or `YYYY-MM-DD:YYYY-MM-DD`.
pub fn parse_range(r: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let parse_day = |s: &str| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::InvalidDate(s.trim().to_string()))
    };

    let (start, end) = if let Some((a, b)) = r.split_once(':') {
        (parse_day(a)?, parse_day(b)?)
    } else if r.trim().len() == 7 {
        let first = parse_day(&format!("{}-01", r.trim()))?;
        let next = first
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| AppError::InvalidDate(r.to_string()))?;
        (first, next - Duration::days(1))
    } else {
        let d = parse_day(r)?;
        (d, d)
    };

    if end < start {
        return Err(AppError::InvalidDate(format!("{r}: end before start")));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::InvalidDate(format!(
            "{r}: ranges are limited to {MAX_RANGE_DAYS} days"
        )));
    }
    Ok((start, end))
}

/// The file may be created, or overwritten when `force` is set or the user confirms.
fn ensure_writable(path: &Path, force: bool) -> AppResult<()> {
    if !path.exists() || force {
        return Ok(());
    }

    warning(format!("The file '{}' already exists.", path.display()));
    print!("Overwrite? [y/N]: ");
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let ans = answer.trim().to_ascii_lowercase();

    if ans == "y" || ans == "yes" {
        info("Existing file will be overwritten.");
        Ok(())
    } else {
        Err(AppError::from(io::Error::other(
            "Export cancelled: existing file not overwritten",
        )))
    }
}

fn load_slots<S: SlotStore>(
    store: &S,
    kind: LogKind,
    stream: Option<LogStream>,
    (start, end): (NaiveDate, NaiveDate),
) -> AppResult<Vec<HourSlot>> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        out.extend(store.list_slots(kind, day, stream)?);
        day += Duration::days(1);
    }
    Ok(out)
}

fn write_slots_csv(kind: LogKind, slots: &[HourSlot], path: &Path) -> AppResult<()> {
    let fields = catalogue(kind);
    let mut wtr = Writer::from_path(path)?;

    let mut header = vec!["date", "hour", "stream"];
    header.extend(fields.iter().map(|f| f.key));
    header.extend(["remark", "logged_by", "updated_at"]);
    wtr.write_record(&header)?;

    for s in slots {
        let mut row = vec![s.date_str(), format!("{:02}", s.hour), s.stream.to_string()];
        row.extend(
            fields
                .iter()
                .map(|f| s.get(f.key).map(|v| v.to_string()).unwrap_or_default()),
        );
        row.extend([s.remark.clone(), s.logged_by.clone(), s.updated_at.clone()]);
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn issue_target(t: &IssueTarget) -> String {
    match t {
        IssueTarget::ChecklistDay { date } => format!("checklist:{date}"),
        IssueTarget::HourSlot { kind, slot_id } => format!("{}:{slot_id}", kind.as_str()),
    }
}

fn write_issues_csv(issues: &[FlaggedIssue], path: &Path) -> AppResult<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record([
        "code",
        "target",
        "module",
        "section",
        "item",
        "unit",
        "severity",
        "status",
        "description",
        "reported_by",
        "created_at",
        "updated_at",
    ])?;

    for i in issues {
        wtr.write_record([
            i.code.as_str(),
            &issue_target(&i.target),
            &i.location.module,
            &i.location.section,
            &i.location.item,
            i.location.unit.as_deref().unwrap_or(""),
            i.severity.as_str(),
            i.status.as_str(),
            &i.description,
            &i.reported_by,
            &i.created_at,
            &i.updated_at,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_json<T: serde::Serialize>(items: &[T], path: &Path) -> AppResult<()> {
    let json = serde_json::to_string_pretty(items)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

pub struct ExportRequest<'a> {
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub file: &'a str,
    pub range: (NaiveDate, NaiveDate),
    pub transformer: Option<u8>,
    pub force: bool,
}

/// Export and return the number of exported records.
pub fn export<S: SlotStore + IssueStore>(store: &S, req: &ExportRequest) -> AppResult<usize> {
    let path = Path::new(req.file);
    if !path.is_absolute() {
        return Err(AppError::from(io::Error::other(format!(
            "Output file path must be absolute: {}",
            req.file
        ))));
    }
    ensure_writable(path, req.force)?;

    let count = match req.scope {
        ExportScope::Generator | ExportScope::Transformer => {
            let (kind, stream) = match req.scope {
                ExportScope::Generator => (LogKind::Generator, None),
                _ => (LogKind::Transformer, req.transformer.map(LogStream::Transformer)),
            };
            let slots = load_slots(store, kind, stream, req.range)?;
            if slots.is_empty() {
                warning("No hour slots found for the selected range.");
                return Ok(0);
            }
            match req.format {
                ExportFormat::Csv => write_slots_csv(kind, &slots, path)?,
                ExportFormat::Json => write_json(&slots, path)?,
            }
            slots.len()
        }
        ExportScope::Issues => {
            let (start, end) = req.range;
            let issues: Vec<FlaggedIssue> = store
                .list_issues(&IssueFilter::default())?
                .into_iter()
                .filter(|i| {
                    NaiveDate::parse_from_str(i.created_at.get(..10).unwrap_or(""), "%Y-%m-%d")
                        .is_ok_and(|d| d >= start && d <= end)
                })
                .collect();
            if issues.is_empty() {
                warning("No issues found for the selected range.");
                return Ok(0);
            }
            match req.format {
                ExportFormat::Csv => write_issues_csv(&issues, path)?,
                ExportFormat::Json => write_json(&issues, path)?,
            }
            issues.len()
        }
    };

    success(format!(
        "{} export completed: {} ({} records)",
        req.format.as_str().to_uppercase(),
        path.display(),
        count
    ));
    Ok(count)
}
