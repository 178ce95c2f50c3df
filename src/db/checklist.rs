//! Checklist day / completion queries.

use crate::errors::{AppError, AppResult};
use crate::models::checklist::{
    CHECKLIST_MODULES, ChecklistCompletion, ChecklistDay, UnlockSource,
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

fn date_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn conversion_error(msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(AppError::InvalidValue(msg)),
    )
}

fn module_column(module: u8) -> AppResult<&'static str> {
    match module {
        1 => Ok("module_1"),
        2 => Ok("module_2"),
        3 => Ok("module_3"),
        4 => Ok("module_4"),
        other => Err(AppError::InvalidValue(format!(
            "checklist module {other} (expected 1..{CHECKLIST_MODULES})"
        ))),
    }
}

fn map_day(row: &Row) -> rusqlite::Result<ChecklistDay> {
    let date_raw: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
        .map_err(|_| conversion_error(format!("invalid checklist date '{date_raw}'")))?;

    let mut modules = BTreeMap::new();
    for m in 1..=CHECKLIST_MODULES {
        let col = format!("module_{m}");
        let raw: Option<String> = row.get(col.as_str())?;
        if let Some(raw) = raw {
            let v: Value = serde_json::from_str(&raw)
                .map_err(|e| conversion_error(format!("module {m} data: {e}")))?;
            modules.insert(m, v);
        }
    }

    let contributors_raw: String = row.get("contributors")?;
    let contributors: BTreeMap<u8, BTreeSet<String>> = serde_json::from_str(&contributors_raw)
        .map_err(|e| conversion_error(format!("contributors: {e}")))?;

    Ok(ChecklistDay {
        date,
        modules,
        completion_pct: row.get("completion_pct")?,
        submitted: row.get::<_, i64>("submitted")? == 1,
        submitted_at: row.get("submitted_at")?,
        submitted_by: row.get("submitted_by")?,
        contributors,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_completion(row: &Row) -> rusqlite::Result<ChecklistCompletion> {
    let date_raw: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
        .map_err(|_| conversion_error(format!("invalid completion date '{date_raw}'")))?;
    let source_raw: String = row.get("unlock_source")?;
    let unlock_source = UnlockSource::from_db_str(&source_raw)
        .ok_or_else(|| conversion_error(format!("invalid unlock source '{source_raw}'")))?;

    Ok(ChecklistCompletion {
        date,
        session: row.get("session")?,
        module: row.get("module")?,
        completed_by: row.get("completed_by")?,
        completed_at: row.get("completed_at")?,
        unlock_source,
        emergency_reason: row.get("emergency_reason")?,
    })
}

pub fn get_day(conn: &Connection, date: &NaiveDate) -> AppResult<Option<ChecklistDay>> {
    let day = conn
        .query_row(
            "SELECT * FROM checklist_days WHERE date = ?1",
            [date_str(date)],
            map_day,
        )
        .optional()?;
    Ok(day)
}

/// Create the day row if missing. Concurrent creators converge on one row.
pub fn ensure_day(conn: &Connection, date: &NaiveDate, at: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO checklist_days (date, created_at, updated_at)
         VALUES (?1, ?2, ?2)",
        params![date_str(date), at],
    )?;
    Ok(())
}

pub fn list_days(conn: &Connection, limit: usize) -> AppResult<Vec<ChecklistDay>> {
    let mut stmt = conn.prepare("SELECT * FROM checklist_days ORDER BY date DESC LIMIT ?1")?;
    let rows = stmt.query_map([limit as i64], map_day)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn completions(
    conn: &Connection,
    date: &NaiveDate,
    session: Option<u8>,
) -> AppResult<Vec<ChecklistCompletion>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM checklist_completions
         WHERE date = ?1 AND (?2 IS NULL OR session = ?2)
         ORDER BY session ASC, module ASC",
    )?;
    let rows = stmt.query_map(params![date_str(date), session], map_completion)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Insert the completion fact and merge the module data into the day row.
pub fn complete_module(
    conn: &mut Connection,
    completion: &ChecklistCompletion,
    data: &Value,
    at: &str,
) -> AppResult<ChecklistDay> {
    let column = module_column(completion.module)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    ensure_day(&tx, &completion.date, at)?;
    let day = get_day(&tx, &completion.date)?
        .ok_or_else(|| AppError::Other(format!("checklist {} vanished", completion.date)))?;

    if day.submitted {
        return Err(AppError::AlreadySubmitted(date_str(&completion.date)));
    }

    tx.execute(
        "INSERT INTO checklist_completions
            (date, session, module, completed_by, completed_at, unlock_source, emergency_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            date_str(&completion.date),
            completion.session,
            completion.module,
            completion.completed_by,
            completion.completed_at,
            completion.unlock_source.as_str(),
            completion.emergency_reason,
        ],
    )?;

    let mut contributors = day.contributors.clone();
    contributors
        .entry(completion.module)
        .or_default()
        .insert(completion.completed_by.clone());

    let mut filled: BTreeSet<u8> = day.modules.keys().copied().collect();
    filled.insert(completion.module);
    let pct = ChecklistDay::completion_for(filled.len());

    let sql = format!(
        "UPDATE checklist_days
         SET {column} = ?1, completion_pct = ?2, contributors = ?3, updated_at = ?4
         WHERE date = ?5 AND submitted = 0"
    );
    tx.execute(
        &sql,
        params![
            serde_json::to_string(data)?,
            pct,
            serde_json::to_string(&contributors)?,
            at,
            date_str(&completion.date),
        ],
    )?;

    let updated = get_day(&tx, &completion.date)?
        .ok_or_else(|| AppError::Other(format!("checklist {} vanished", completion.date)))?;
    tx.commit()?;
    Ok(updated)
}

/// Compare-and-swap `submitted` 0 → 1. Returns false when another writer won.
pub fn try_submit(conn: &Connection, date: &NaiveDate, actor: &str, at: &str) -> AppResult<bool> {
    let changed = conn.execute(
        "UPDATE checklist_days
         SET submitted = 1, submitted_at = ?1, submitted_by = ?2, updated_at = ?1
         WHERE date = ?3 AND submitted = 0",
        params![at, actor, date_str(date)],
    )?;
    Ok(changed == 1)
}
