//! Collective checklist day: lazy creation, module data, one-way submission.

use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::checklist::{CHECKLIST_MODULES, ChecklistDay};
use crate::store::ChecklistStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Metadata view of a checklist day (no module blobs).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistSummary {
    pub date: NaiveDate,
    pub completion_pct: u8,
    pub submitted: bool,
    pub submitted_at: Option<String>,
    pub submitted_by: Option<String>,
    pub modules_filled: Vec<u8>,
    pub modules_missing: Vec<u8>,
    pub contributors: BTreeMap<u8, BTreeSet<String>>,
}

pub fn summarize(day: &ChecklistDay) -> ChecklistSummary {
    let filled: Vec<u8> = day.modules.keys().copied().collect();
    let missing = (1..=CHECKLIST_MODULES)
        .filter(|m| !day.modules.contains_key(m))
        .collect();

    ChecklistSummary {
        date: day.date,
        completion_pct: day.completion_pct,
        submitted: day.submitted,
        submitted_at: day.submitted_at.clone(),
        submitted_by: day.submitted_by.clone(),
        modules_filled: filled,
        modules_missing: missing,
        contributors: day.contributors.clone(),
    }
}

pub fn open_day<S: ChecklistStore>(
    store: &mut S,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<ChecklistDay> {
    store.get_or_create_day(date, now)
}

/// Submit the day. Exactly one of several concurrent submitters wins;
/// the others get `AlreadySubmitted` and cause no side effects.
pub fn submit<S: ChecklistStore>(
    store: &mut S,
    actor: &Actor,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<ChecklistDay> {
    if !actor.role.can_write_logs() {
        return Err(AppError::PermissionDenied(format!(
            "{} ({}) cannot submit checklists",
            actor.name,
            actor.role.as_str()
        )));
    }
    store.submit_day(date, &actor.name, now)
}

/// Parse module form data: a JSON object, or `key=value` pairs.
pub fn parse_module_data(raw: &[String]) -> AppResult<Value> {
    if let [single] = raw
        && single.trim_start().starts_with('{')
    {
        let v: Value = serde_json::from_str(single)?;
        if !v.is_object() {
            return Err(AppError::InvalidValue("module data must be a JSON object".into()));
        }
        return Ok(v);
    }

    let mut map = Map::new();
    for pair in raw {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| AppError::InvalidValue(format!("expected key=value, got '{pair}'")))?;
        let k = k.trim();
        if k.is_empty() {
            return Err(AppError::InvalidValue(format!("empty key in '{pair}'")));
        }
        map.insert(k.to_string(), Value::String(v.trim().to_string()));
    }
    Ok(Value::Object(map))
}
