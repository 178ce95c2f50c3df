//! Reconciliation of remote change notifications into a log session.

use crate::core::session::{LogSession, Notice};
use crate::errors::AppResult;
use crate::store::{ChangeEvent, IssueStore, SlotStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// What to do with a batch of change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Events for the hour the operator is editing (local edits win).
    pub ignored: Vec<ChangeEvent>,
    /// Other hours that changed; any entry triggers a re-fetch of the day.
    pub refetch_hours: BTreeSet<u32>,
}

impl SyncPlan {
    pub fn needs_refetch(&self) -> bool {
        !self.refetch_hours.is_empty()
    }
}

/// Split events into ignored and re-fetch-worthy ones.
///
/// Events for the selected hour are ignored while the operator is editing
/// it, and always when they are the operator's own saves echoing back.
/// Duplicates (at-least-once delivery) collapse into one hour entry.
pub fn plan(events: &[ChangeEvent], selected_hour: u32, editing: bool, own_actor: &str) -> SyncPlan {
    let mut out = SyncPlan::default();
    for ev in events {
        if ev.hour == selected_hour && (editing || ev.actor == own_actor) {
            out.ignored.push(ev.clone());
        } else {
            out.refetch_hours.insert(ev.hour);
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub received: usize,
    pub ignored: usize,
    pub refreshed_hours: Vec<u32>,
}

/// Apply a batch of events to the session.
pub fn apply_changes<S: SlotStore + IssueStore>(
    session: &mut LogSession<S>,
    events: &[ChangeEvent],
    now: DateTime<Utc>,
) -> AppResult<SyncReport> {
    let plan = plan(
        events,
        session.selected_hour(),
        session.is_editing(),
        &session.actor().name,
    );

    for ev in &plan.ignored {
        debug!(hour = ev.hour, actor = %ev.actor, seq = ev.seq, "change for the hour being edited ignored");
    }

    let refreshed_hours: Vec<u32> = plan.refetch_hours.iter().copied().collect();
    if plan.needs_refetch() {
        session.refresh_day(now)?;
        session.push_notice(Notice::RemoteUpdate {
            hours: refreshed_hours.clone(),
        });
    }

    Ok(SyncReport {
        received: events.len(),
        ignored: plan.ignored.len(),
        refreshed_hours,
    })
}

/// Poll the session's change feed and apply whatever arrived.
pub fn pump<S: SlotStore + IssueStore>(
    session: &mut LogSession<S>,
    now: DateTime<Utc>,
) -> AppResult<SyncReport> {
    let events = session.poll_changes()?;
    if events.is_empty() {
        return Ok(SyncReport::default());
    }
    apply_changes(session, &events, now)
}
