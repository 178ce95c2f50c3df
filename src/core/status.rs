//! Plant status summary shared by `hydrolog status` and the tool surface.

use crate::core::PlantContext;
use crate::core::checklist::{ChecklistSummary, summarize};
use crate::core::clock::{Session, UpcomingSession, current_hour, current_session, next_session, operational_date};
use crate::errors::AppResult;
use crate::models::issue::{IssueFilter, IssueStatus, Severity};
use crate::models::stream::LogStream;
use crate::store::PlantStore;
use crate::utils::time::stamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStatus {
    pub stream: LogStream,
    pub hours_logged: usize,
    pub current_hour_logged: bool,
    /// Hours up to and including the current one that have no slot yet.
    pub missing_hours: Vec<u32>,
    pub finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantStatus {
    pub at: String,
    pub date: NaiveDate,
    pub current_hour: u32,
    pub current_session: Option<Session>,
    pub next_session: UpcomingSession,
    pub streams: Vec<StreamStatus>,
    pub checklist: Option<ChecklistSummary>,
    pub open_issues: usize,
    pub critical_open: usize,
}

pub fn plant_status<S: PlantStore>(
    store: &S,
    ctx: &PlantContext,
    now: DateTime<Utc>,
) -> AppResult<PlantStatus> {
    let date = operational_date(now, ctx.tz);
    let hour = current_hour(now, ctx.tz);

    let mut streams = Vec::new();
    for stream in ctx.streams() {
        let logged: BTreeSet<u32> = store
            .list_slots(stream.kind(), date, Some(stream))?
            .iter()
            .map(|s| s.hour)
            .collect();

        streams.push(StreamStatus {
            stream,
            hours_logged: logged.len(),
            current_hour_logged: logged.contains(&hour),
            missing_hours: (0..=hour).filter(|h| !logged.contains(h)).collect(),
            finalized: store.finalization(date, stream)?.is_some(),
        });
    }

    let open: Vec<_> = store
        .list_issues(&IssueFilter::default())?
        .into_iter()
        .filter(|i| i.status != IssueStatus::Resolved)
        .collect();

    Ok(PlantStatus {
        at: stamp(now, ctx.tz),
        date,
        current_hour: hour,
        current_session: current_session(now, ctx.tz, &ctx.schedule),
        next_session: next_session(now, ctx.tz, &ctx.schedule),
        streams,
        checklist: store.get_day(date)?.as_ref().map(summarize),
        open_issues: open.len(),
        critical_open: open
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count(),
    })
}
