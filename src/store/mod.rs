//! Store seams consumed by the engine.
//!
//! The hosted backend is modelled as three traits (slots, checklists,
//! issues); `SqliteStore` implements all of them over one connection.
//! Two stores opened on the same database file behave like two operators.

mod errors;
mod sqlite;

pub use errors::translate;
pub use sqlite::SqliteStore;

use crate::errors::AppResult;
use crate::models::checklist::{ChecklistCompletion, ChecklistDay};
use crate::models::hour_slot::{DayFinalization, HourSlot};
use crate::models::issue::{FlaggedIssue, IssueFilter, IssueStatus, NewIssue};
use crate::models::stream::{LogKind, LogStream};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Insert,
    Update,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => "insert",
            ChangeType::Update => "update",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(ChangeType::Insert),
            "update" => Some(ChangeType::Update),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub change: ChangeType,
}

/// Notification that an hour of the subscribed day changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub seq: i64,
    pub stream: LogStream,
    pub hour: u32,
    pub change_type: ChangeType,
    pub actor: String,
}

/// Cursor over the change log of one (day, stream).
///
/// Delivery is at-least-once: a feed that is re-created from an older
/// cursor replays events, and consumers must tolerate duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFeed {
    pub date: NaiveDate,
    pub stream: LogStream,
    pub cursor: i64,
}

pub trait SlotStore {
    /// All slots of a day, ordered by hour ascending. `None` = every stream of the kind.
    fn list_slots(
        &self,
        kind: LogKind,
        date: NaiveDate,
        stream: Option<LogStream>,
    ) -> AppResult<Vec<HourSlot>>;

    fn get_slot(&self, date: NaiveDate, hour: u32, stream: LogStream)
    -> AppResult<Option<HourSlot>>;

    /// Write keyed by (date, hour, stream); repeated saves overwrite.
    fn upsert_slot(
        &mut self,
        slot: &HourSlot,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UpsertOutcome>;

    /// Subscribe to changes of a day, starting after everything already stored.
    fn subscribe_day_changes(&self, date: NaiveDate, stream: LogStream) -> AppResult<ChangeFeed>;

    /// Events recorded after the feed cursor; advances the cursor.
    fn poll_changes(&self, feed: &mut ChangeFeed) -> AppResult<Vec<ChangeEvent>>;

    /// Distinct hours stored for a day.
    fn count_hours(&self, date: NaiveDate, stream: LogStream) -> AppResult<u32>;

    fn finalization(&self, date: NaiveDate, stream: LogStream)
    -> AppResult<Option<DayFinalization>>;

    fn insert_finalization(
        &mut self,
        date: NaiveDate,
        stream: LogStream,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DayFinalization>;
}

pub trait ChecklistStore {
    fn get_day(&self, date: NaiveDate) -> AppResult<Option<ChecklistDay>>;

    /// Lazily creates the collective record on first access.
    fn get_or_create_day(&mut self, date: NaiveDate, now: DateTime<Utc>)
    -> AppResult<ChecklistDay>;

    fn list_days(&self, limit: usize) -> AppResult<Vec<ChecklistDay>>;

    fn completions(&self, date: NaiveDate, session: Option<u8>)
    -> AppResult<Vec<ChecklistCompletion>>;

    /// Record a module completion and store its form data in one step.
    fn complete_module(
        &mut self,
        completion: &ChecklistCompletion,
        data: &Value,
        now: DateTime<Utc>,
    ) -> AppResult<ChecklistDay>;

    /// One-way submission guarded by compare-and-swap on `submitted`.
    fn submit_day(
        &mut self,
        date: NaiveDate,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ChecklistDay>;
}

pub trait IssueStore {
    fn create_issue(
        &mut self,
        issue: &NewIssue,
        reported_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue>;

    fn get_issue(&self, code: &str) -> AppResult<Option<FlaggedIssue>>;

    fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<FlaggedIssue>>;

    fn set_issue_status(
        &mut self,
        code: &str,
        status: IssueStatus,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue>;
}

/// Everything the plant engine needs from one backend.
pub trait PlantStore: SlotStore + ChecklistStore + IssueStore {}

impl<T: SlotStore + ChecklistStore + IssueStore> PlantStore for T {}
