//! Hour slot queries (generator_logs / transformer_logs / slot_edits).

use crate::db::schema::stream_column;
use crate::errors::{AppError, AppResult};
use crate::models::field::{FieldKind, FieldValue, catalogue};
use crate::models::hour_slot::{DayFinalization, HourSlot};
use crate::models::stream::{LogKind, LogStream};
use crate::store::{ChangeEvent, ChangeType, UpsertOutcome};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{
    Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter,
};
use serde::Serialize;
use std::collections::BTreeMap;

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

pub fn map_slot(row: &Row, kind: LogKind) -> rusqlite::Result<HourSlot> {
    let date_raw: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
        .map_err(|_| conversion_error(format!("invalid slot date '{date_raw}'")))?;

    let stream = match stream_column(kind) {
        Some(col) => LogStream::from_parts(kind, row.get::<_, u8>(col)?),
        None => LogStream::Generator,
    };

    let mut values = BTreeMap::new();
    for field in catalogue(kind) {
        let v = match field.kind {
            FieldKind::Numeric(_) => FieldValue::Number(row.get::<_, f64>(field.key)?),
            FieldKind::Choice(_) => FieldValue::Choice(row.get::<_, String>(field.key)?),
        };
        values.insert(field.key.to_string(), v);
    }

    Ok(HourSlot {
        id: Some(row.get("id")?),
        date,
        hour: row.get("hour")?,
        stream,
        values,
        remark: row.get("remark")?,
        logged_by: row.get("logged_by")?,
        updated_at: row.get("updated_at")?,
    })
}

/// WHERE fragment + params selecting one stream of a day.
fn stream_filter(stream: Option<LogStream>) -> (String, Vec<Value>) {
    match stream.and_then(|s| stream_column(s.kind()).map(|c| (c, s))) {
        Some((col, s)) => (format!(" AND {col} = ?"), vec![Value::Integer(s.number() as i64)]),
        None => (String::new(), Vec::new()),
    }
}

pub fn list_slots(
    conn: &Connection,
    kind: LogKind,
    date: &NaiveDate,
    stream: Option<LogStream>,
) -> AppResult<Vec<HourSlot>> {
    let (filter, extra) = stream_filter(stream);
    let order = match stream_column(kind) {
        Some(col) => format!("hour ASC, {col} ASC"),
        None => "hour ASC".to_string(),
    };
    let sql = format!(
        "SELECT * FROM {} WHERE date = ?{} ORDER BY {}",
        kind.table(),
        filter,
        order
    );

    let mut args = vec![Value::Text(date_str(date))];
    args.extend(extra);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter()), |r| map_slot(r, kind))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_slot(
    conn: &Connection,
    date: &NaiveDate,
    hour: u32,
    stream: LogStream,
) -> AppResult<Option<HourSlot>> {
    let kind = stream.kind();
    let (filter, extra) = stream_filter(Some(stream));
    let sql = format!(
        "SELECT * FROM {} WHERE date = ? AND hour = ?{}",
        kind.table(),
        filter
    );

    let mut args = vec![Value::Text(date_str(date)), Value::Integer(hour as i64)];
    args.extend(extra);

    let mut stmt = conn.prepare(&sql)?;
    let slot = stmt
        .query_row(params_from_iter(args.iter()), |r| map_slot(r, kind))
        .optional()?;
    Ok(slot)
}

fn find_slot_id(conn: &Connection, slot: &HourSlot) -> AppResult<Option<i64>> {
    let (filter, extra) = stream_filter(Some(slot.stream));
    let sql = format!(
        "SELECT id FROM {} WHERE date = ? AND hour = ?{}",
        slot.stream.table(),
        filter
    );
    let mut args = vec![Value::Text(slot.date_str()), Value::Integer(slot.hour as i64)];
    args.extend(extra);

    let id = conn
        .query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))
        .optional()?;
    Ok(id)
}

fn field_param(v: Option<&FieldValue>, kind: &FieldKind) -> Value {
    match (v, kind) {
        (Some(FieldValue::Number(n)), _) => Value::Real(*n),
        (Some(FieldValue::Choice(s)), _) => Value::Text(s.clone()),
        (None, FieldKind::Numeric(_)) => Value::Real(0.0),
        (None, FieldKind::Choice(_)) => Value::Text(String::new()),
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    values: &'a BTreeMap<String, FieldValue>,
    remark: &'a str,
}

/// Insert-or-update by natural key and append the edit to `slot_edits`.
pub fn upsert_slot(
    conn: &mut Connection,
    slot: &HourSlot,
    actor: &str,
    at: &str,
) -> AppResult<UpsertOutcome> {
    let kind = slot.stream.kind();
    let fields = catalogue(kind);

    let mut cols: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    let conflict_key = match stream_column(kind) {
        Some(col) => {
            cols.push(col);
            args.push(Value::Integer(slot.stream.number() as i64));
            format!("{col}, date, hour")
        }
        None => "date, hour".to_string(),
    };

    cols.extend(["date", "hour"]);
    args.push(Value::Text(slot.date_str()));
    args.push(Value::Integer(slot.hour as i64));

    for f in fields {
        cols.push(f.key);
        args.push(field_param(slot.values.get(f.key), &f.kind));
    }

    cols.extend(["remark", "logged_by", "created_at", "updated_at"]);
    args.push(Value::Text(slot.remark.clone()));
    args.push(Value::Text(actor.to_string()));
    args.push(Value::Text(at.to_string()));
    args.push(Value::Text(at.to_string()));

    let updates = fields
        .iter()
        .map(|f| f.key)
        .chain(["remark", "logged_by", "updated_at"])
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    let placeholders = vec!["?"; cols.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})
         ON CONFLICT({}) DO UPDATE SET {}",
        kind.table(),
        cols.join(", "),
        placeholders,
        conflict_key,
        updates
    );

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let existing = find_slot_id(&tx, slot)?;
    tx.execute(&sql, params_from_iter(args.iter()))?;
    let id = find_slot_id(&tx, slot)?
        .ok_or_else(|| AppError::Other(format!("slot {} vanished after upsert", slot.key())))?;

    let change = if existing.is_some() {
        ChangeType::Update
    } else {
        ChangeType::Insert
    };

    let snapshot = serde_json::to_string(&Snapshot {
        values: &slot.values,
        remark: &slot.remark,
    })?;

    tx.execute(
        "INSERT INTO slot_edits (log_kind, stream, date, hour, slot_id, change_type, actor, at, snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            kind.as_str(),
            slot.stream.number(),
            slot.date_str(),
            slot.hour,
            id,
            change.as_str(),
            actor,
            at,
            snapshot
        ],
    )?;

    tx.commit()?;

    Ok(UpsertOutcome { id, change })
}

/// Highest edit id recorded for a day (0 when nothing was saved yet).
pub fn last_edit_id(conn: &Connection, date: &NaiveDate, stream: LogStream) -> AppResult<i64> {
    let id: i64 = conn.query_row(
        "SELECT IFNULL(MAX(id), 0) FROM slot_edits
         WHERE log_kind = ?1 AND stream = ?2 AND date = ?3",
        params![stream.kind().as_str(), stream.number(), date_str(date)],
        |r| r.get(0),
    )?;
    Ok(id)
}

pub fn edits_since(
    conn: &Connection,
    date: &NaiveDate,
    stream: LogStream,
    after: i64,
) -> AppResult<Vec<ChangeEvent>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, hour, change_type, actor FROM slot_edits
         WHERE log_kind = ?1 AND stream = ?2 AND date = ?3 AND id > ?4
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(
        params![stream.kind().as_str(), stream.number(), date_str(date), after],
        |r| {
            let change_raw: String = r.get(2)?;
            let change_type = ChangeType::from_db_str(&change_raw)
                .ok_or_else(|| conversion_error(format!("invalid change type '{change_raw}'")))?;
            Ok(ChangeEvent {
                seq: r.get(0)?,
                stream,
                hour: r.get(1)?,
                change_type,
                actor: r.get(3)?,
            })
        },
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_hours(conn: &Connection, date: &NaiveDate, stream: LogStream) -> AppResult<u32> {
    let (filter, extra) = stream_filter(Some(stream));
    let sql = format!(
        "SELECT COUNT(DISTINCT hour) FROM {} WHERE date = ?{}",
        stream.table(),
        filter
    );
    let mut args = vec![Value::Text(date_str(date))];
    args.extend(extra);

    let n: u32 = conn.query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))?;
    Ok(n)
}

pub fn finalization(
    conn: &Connection,
    date: &NaiveDate,
    stream: LogStream,
) -> AppResult<Option<DayFinalization>> {
    let row = conn
        .query_row(
            "SELECT finalized_by, finalized_at FROM day_finalizations
             WHERE log_kind = ?1 AND stream = ?2 AND date = ?3",
            params![stream.kind().as_str(), stream.number(), date_str(date)],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?;

    Ok(row.map(|(finalized_by, finalized_at)| DayFinalization {
        date: *date,
        stream,
        finalized_by,
        finalized_at,
    }))
}

pub fn insert_finalization(
    conn: &Connection,
    date: &NaiveDate,
    stream: LogStream,
    actor: &str,
    at: &str,
) -> AppResult<DayFinalization> {
    conn.execute(
        "INSERT INTO day_finalizations (log_kind, stream, date, finalized_by, finalized_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![stream.kind().as_str(), stream.number(), date_str(date), actor, at],
    )?;

    Ok(DayFinalization {
        date: *date,
        stream,
        finalized_by: actor.to_string(),
        finalized_at: at.to_string(),
    })
}
