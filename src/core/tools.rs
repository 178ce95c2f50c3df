//! JSON tool surface for an external agent layer.
//!
//! A thin read-mostly façade over the store: every call takes a JSON object
//! of arguments and returns a JSON value. The only write is `create_issue`.

use crate::core::PlantContext;
use crate::core::checklist::summarize;
use crate::core::clock::operational_date;
use crate::core::issues::{checklist_issue, raise};
use crate::core::status::plant_status;
use crate::core::validation::{FieldCheck, Status, classify_slot};
use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::field::{FieldValue, lookup};
use crate::models::hour_slot::HourSlot;
use crate::models::issue::{IssueFilter, IssueLocation, Severity};
use crate::models::stream::{LogKind, LogStream};
use crate::store::PlantStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

pub const TOOL_NAMES: &[&str] = &[
    "get_plant_status",
    "get_generator_logs",
    "get_transformer_logs",
    "get_checklists",
    "get_issues",
    "create_issue",
];

const DEFAULT_CHECKLIST_DAYS: usize = 7;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorLogsArgs {
    date: Option<NaiveDate>,
    hour: Option<u32>,
    fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransformerLogsArgs {
    date: Option<NaiveDate>,
    transformer: Option<u8>,
    hour: Option<u32>,
    fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChecklistArgs {
    date: Option<NaiveDate>,
    #[serde(default)]
    full: bool,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateIssueArgs {
    module: String,
    section: String,
    item: String,
    description: String,
    severity: Severity,
    unit: Option<String>,
}

/// Slot as returned to the agent layer: values optionally narrowed to a
/// field list, plus the non-normal classifications.
#[derive(Debug, Serialize)]
struct SlotView {
    id: Option<i64>,
    date: NaiveDate,
    hour: u32,
    stream: LogStream,
    values: BTreeMap<String, FieldValue>,
    remark: String,
    logged_by: String,
    updated_at: String,
    alerts: Vec<FieldCheck>,
}

fn slot_view(slot: HourSlot, fields: Option<&[String]>) -> SlotView {
    let alerts = classify_slot(&slot)
        .into_iter()
        .filter(|c| c.classification.status != Status::Normal)
        .filter(|c| fields.is_none_or(|f| f.iter().any(|k| k == c.field)))
        .collect();

    let values = match fields {
        Some(list) => slot
            .values
            .into_iter()
            .filter(|(k, _)| list.contains(k))
            .collect(),
        None => slot.values,
    };

    SlotView {
        id: slot.id,
        date: slot.date,
        hour: slot.hour,
        stream: slot.stream,
        values,
        remark: slot.remark,
        logged_by: slot.logged_by,
        updated_at: slot.updated_at,
        alerts,
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> AppResult<T> {
    let args = if args.is_null() { json!({}) } else { args };
    Ok(serde_json::from_value(args)?)
}

pub struct ToolFacade<'a, S> {
    store: &'a mut S,
    ctx: &'a PlantContext,
    actor: Actor,
}

impl<'a, S: PlantStore> ToolFacade<'a, S> {
    pub fn new(store: &'a mut S, ctx: &'a PlantContext, actor: Actor) -> Self {
        Self { store, ctx, actor }
    }

    pub fn call(&mut self, name: &str, args: Value, now: DateTime<Utc>) -> AppResult<Value> {
        debug!(tool = name, "tool call");
        match name {
            "get_plant_status" => Ok(serde_json::to_value(plant_status(
                &*self.store,
                self.ctx,
                now,
            )?)?),
            "get_generator_logs" => {
                let a: GeneratorLogsArgs = parse_args(args)?;
                let date = a.date.unwrap_or_else(|| operational_date(now, self.ctx.tz));
                self.logs(LogKind::Generator, date, None, a.hour, a.fields)
            }
            "get_transformer_logs" => {
                let a: TransformerLogsArgs = parse_args(args)?;
                let date = a.date.unwrap_or_else(|| operational_date(now, self.ctx.tz));
                let stream = match a.transformer {
                    Some(n) if n == 0 || n > self.ctx.transformer_count => {
                        return Err(AppError::InvalidValue(format!(
                            "transformer {n} (plant has {})",
                            self.ctx.transformer_count
                        )));
                    }
                    Some(n) => Some(LogStream::Transformer(n)),
                    None => None,
                };
                self.logs(LogKind::Transformer, date, stream, a.hour, a.fields)
            }
            "get_checklists" => {
                let a: ChecklistArgs = parse_args(args)?;
                self.checklists(a)
            }
            "get_issues" => {
                let filter: IssueFilter = parse_args(args)?;
                Ok(serde_json::to_value(self.store.list_issues(&filter)?)?)
            }
            "create_issue" => {
                let a: CreateIssueArgs = parse_args(args)?;
                let issue = checklist_issue(
                    operational_date(now, self.ctx.tz),
                    IssueLocation {
                        module: a.module,
                        section: a.section,
                        item: a.item,
                        unit: a.unit,
                    },
                    a.severity,
                    &a.description,
                );
                let created = raise(&mut *self.store, &self.actor, &issue, now)?;
                Ok(serde_json::to_value(created)?)
            }
            other => Err(AppError::UnknownTool(other.to_string())),
        }
    }

    fn logs(
        &self,
        kind: LogKind,
        date: NaiveDate,
        stream: Option<LogStream>,
        hour: Option<u32>,
        fields: Option<Vec<String>>,
    ) -> AppResult<Value> {
        if let Some(h) = hour
            && h > 23
        {
            return Err(AppError::InvalidHour(h.to_string()));
        }
        if let Some(list) = &fields
            && let Some(bad) = list.iter().find(|f| lookup(kind, f).is_none())
        {
            return Err(AppError::UnknownField(bad.clone()));
        }

        let views: Vec<SlotView> = self
            .store
            .list_slots(kind, date, stream)?
            .into_iter()
            .filter(|s| hour.is_none_or(|h| s.hour == h))
            .map(|s| slot_view(s, fields.as_deref()))
            .collect();

        Ok(json!({
            "date": date,
            "log": kind.as_str(),
            "count": views.len(),
            "slots": views,
        }))
    }

    fn checklists(&self, a: ChecklistArgs) -> AppResult<Value> {
        let days = match a.date {
            Some(d) => self.store.get_day(d)?.into_iter().collect(),
            None => self
                .store
                .list_days(a.limit.unwrap_or(DEFAULT_CHECKLIST_DAYS))?,
        };

        if a.full {
            return Ok(serde_json::to_value(days)?);
        }
        let summaries: Vec<_> = days.iter().map(summarize).collect();
        Ok(serde_json::to_value(summaries)?)
    }
}
