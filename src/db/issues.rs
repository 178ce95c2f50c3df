//! Flagged issue queries.

use crate::errors::{AppError, AppResult};
use crate::models::issue::{
    FlaggedIssue, IssueFilter, IssueLocation, IssueStatus, IssueTarget, NewIssue, Severity,
};
use crate::models::stream::LogKind;
use crate::utils::date::compact;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

fn conversion_error(msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(AppError::InvalidValue(msg)),
    )
}

fn map_issue(row: &Row) -> rusqlite::Result<FlaggedIssue> {
    let checklist_date: Option<String> = row.get("checklist_date")?;
    let slot_kind: Option<String> = row.get("slot_kind")?;
    let slot_id: Option<i64> = row.get("slot_id")?;

    let target = match (checklist_date, slot_kind, slot_id) {
        (Some(d), _, _) => {
            let date = NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .map_err(|_| conversion_error(format!("invalid checklist date '{d}'")))?;
            IssueTarget::ChecklistDay { date }
        }
        (None, Some(k), Some(id)) => {
            let kind = LogKind::from_db_str(&k)
                .ok_or_else(|| conversion_error(format!("invalid slot kind '{k}'")))?;
            IssueTarget::HourSlot { kind, slot_id: id }
        }
        _ => return Err(conversion_error("issue without target".to_string())),
    };

    let severity_raw: String = row.get("severity")?;
    let status_raw: String = row.get("status")?;

    Ok(FlaggedIssue {
        code: row.get("code")?,
        target,
        location: IssueLocation {
            module: row.get("module")?,
            section: row.get("section")?,
            item: row.get("item")?,
            unit: row.get("unit")?,
        },
        severity: Severity::from_db_str(&severity_raw)
            .ok_or_else(|| conversion_error(format!("invalid severity '{severity_raw}'")))?,
        description: row.get("description")?,
        status: IssueStatus::from_db_str(&status_raw)
            .ok_or_else(|| conversion_error(format!("invalid status '{status_raw}'")))?,
        reported_by: row.get("reported_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Next free `ISS-YYYYMMDD-NNN` code for the given day. The sequence is
/// compared numerically so it keeps counting past 999.
pub fn next_code(conn: &Connection, day: &NaiveDate) -> AppResult<String> {
    let prefix = format!("ISS-{}-", compact(day));
    let last: Option<i64> = conn
        .query_row(
            "SELECT MAX(CAST(substr(code, length(?1) + 1) AS INTEGER))
             FROM issues WHERE code LIKE ?1 || '%'",
            [&prefix],
            |r| r.get(0),
        )
        .optional()?
        .flatten();

    let n = last.unwrap_or(0);
    Ok(format!("{prefix}{:03}", n + 1))
}

pub fn insert_issue(
    conn: &Connection,
    code: &str,
    issue: &NewIssue,
    reported_by: &str,
    at: &str,
) -> AppResult<()> {
    let (checklist_date, slot_kind, slot_id) = match issue.target {
        Some(IssueTarget::ChecklistDay { date }) => {
            (Some(date.format("%Y-%m-%d").to_string()), None, None)
        }
        Some(IssueTarget::HourSlot { kind, slot_id }) => (None, Some(kind.as_str()), Some(slot_id)),
        None => return Err(AppError::MissingIssueTarget),
    };

    conn.execute(
        "INSERT INTO issues
            (code, checklist_date, slot_kind, slot_id, module, section, item, unit,
             severity, description, status, reported_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'reported', ?11, ?12, ?12)",
        params![
            code,
            checklist_date,
            slot_kind,
            slot_id,
            issue.location.module,
            issue.location.section,
            issue.location.item,
            issue.location.unit,
            issue.severity.as_str(),
            issue.description,
            reported_by,
            at,
        ],
    )?;
    Ok(())
}

pub fn get_issue(conn: &Connection, code: &str) -> AppResult<Option<FlaggedIssue>> {
    let issue = conn
        .query_row("SELECT * FROM issues WHERE code = ?1", [code], map_issue)
        .optional()?;
    Ok(issue)
}

pub fn list_issues(conn: &Connection, filter: &IssueFilter) -> AppResult<Vec<FlaggedIssue>> {
    let mut sql = String::from("SELECT * FROM issues WHERE 1 = 1");
    let mut args: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        args.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(severity) = filter.severity {
        sql.push_str(" AND severity = ?");
        args.push(Value::Text(severity.as_str().to_string()));
    }
    if let Some(module) = &filter.module {
        sql.push_str(" AND module = ?");
        args.push(Value::Text(module.clone()));
    }
    if let Some(date) = filter.date {
        sql.push_str(" AND (checklist_date = ? OR substr(created_at, 1, 10) = ?)");
        let d = date.format("%Y-%m-%d").to_string();
        args.push(Value::Text(d.clone()));
        args.push(Value::Text(d));
    }

    sql.push_str(" ORDER BY created_at DESC, code DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        args.push(Value::Integer(limit as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), map_issue)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn update_status(
    conn: &Connection,
    code: &str,
    status: IssueStatus,
    at: &str,
) -> AppResult<usize> {
    let changed = conn.execute(
        "UPDATE issues SET status = ?1, updated_at = ?2 WHERE code = ?3",
        params![status.as_str(), at, code],
    )?;
    Ok(changed)
}
