//! SQLite-backed implementation of the store seams.

use super::errors::translate;
use super::{ChangeEvent, ChangeFeed, ChecklistStore, IssueStore, SlotStore, UpsertOutcome};
use crate::db::initialize::init_db;
use crate::db::log::audit;
use crate::db::pool::DbPool;
use crate::db::{checklist, issues, slots};
use crate::errors::{AppError, AppResult, FieldViolation};
use crate::models::checklist::{ChecklistCompletion, ChecklistDay};
use crate::models::field::lookup;
use crate::models::hour_slot::{DayFinalization, HourSlot};
use crate::models::issue::{FlaggedIssue, IssueFilter, IssueStatus, IssueTarget, NewIssue};
use crate::models::stream::{LogKind, LogStream};
use crate::utils::date::{format_date, today};
use crate::utils::time::stamp;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, warn};

/// How many fresh issue codes are tried before a duplicate is reported.
const CODE_ATTEMPTS: usize = 3;

pub struct SqliteStore {
    pool: DbPool,
    tz: FixedOffset,
}

impl SqliteStore {
    /// Open (and migrate) the database file shared by every operator.
    pub fn open(path: &str, tz: FixedOffset) -> AppResult<Self> {
        let pool = DbPool::new(path).map_err(|e| translate(AppError::Db(e), path))?;
        init_db(&pool.conn)?;
        Ok(Self { pool, tz })
    }

    pub fn in_memory(tz: FixedOffset) -> AppResult<Self> {
        let pool = DbPool::open_in_memory()?;
        init_db(&pool.conn)?;
        Ok(Self { pool, tz })
    }

    pub fn tz(&self) -> FixedOffset {
        self.tz
    }

    pub fn conn(&self) -> &Connection {
        &self.pool.conn
    }

    fn stamp(&self, now: DateTime<Utc>) -> String {
        stamp(now, self.tz)
    }
}

/// Fill in the offending value and bounds of a check-constraint failure.
fn enrich_violation(err: AppError, slot: &HourSlot) -> AppError {
    match err {
        AppError::RangeViolation(list) => AppError::RangeViolation(
            list.into_iter()
                .map(|v| {
                    let range = lookup(slot.stream.kind(), &v.field).and_then(|f| f.range());
                    FieldViolation {
                        value: slot.get(&v.field).and_then(|x| x.as_number()),
                        min: range.map(|r| r.min),
                        max: range.map(|r| r.max),
                        field: v.field,
                    }
                })
                .collect(),
        ),
        other => other,
    }
}

impl SlotStore for SqliteStore {
    fn list_slots(
        &self,
        kind: LogKind,
        date: NaiveDate,
        stream: Option<LogStream>,
    ) -> AppResult<Vec<HourSlot>> {
        slots::list_slots(&self.pool.conn, kind, &date, stream)
            .map_err(|e| translate(e, &format_date(&date)))
    }

    fn get_slot(
        &self,
        date: NaiveDate,
        hour: u32,
        stream: LogStream,
    ) -> AppResult<Option<HourSlot>> {
        slots::get_slot(&self.pool.conn, &date, hour, stream)
            .map_err(|e| translate(e, &format_date(&date)))
    }

    fn upsert_slot(
        &mut self,
        slot: &HourSlot,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UpsertOutcome> {
        let at = self.stamp(now);
        let context = slot.key().to_string();

        let outcome = slots::upsert_slot(&mut self.pool.conn, slot, actor, &at)
            .map_err(|e| enrich_violation(translate(e, &context), slot))?;

        audit(
            &self.pool.conn,
            "slot_save",
            &context,
            &format!("{} by {}", outcome.change.as_str(), actor),
        )?;
        debug!(slot = %context, id = outcome.id, change = outcome.change.as_str(), "slot saved");
        Ok(outcome)
    }

    fn subscribe_day_changes(&self, date: NaiveDate, stream: LogStream) -> AppResult<ChangeFeed> {
        let cursor = slots::last_edit_id(&self.pool.conn, &date, stream)
            .map_err(|e| translate(e, &format_date(&date)))?;
        Ok(ChangeFeed {
            date,
            stream,
            cursor,
        })
    }

    fn poll_changes(&self, feed: &mut ChangeFeed) -> AppResult<Vec<ChangeEvent>> {
        let events = slots::edits_since(&self.pool.conn, &feed.date, feed.stream, feed.cursor)
            .map_err(|e| translate(e, &format_date(&feed.date)))?;
        if let Some(last) = events.last() {
            feed.cursor = last.seq;
        }
        Ok(events)
    }

    fn count_hours(&self, date: NaiveDate, stream: LogStream) -> AppResult<u32> {
        slots::count_hours(&self.pool.conn, &date, stream)
            .map_err(|e| translate(e, &format_date(&date)))
    }

    fn finalization(
        &self,
        date: NaiveDate,
        stream: LogStream,
    ) -> AppResult<Option<DayFinalization>> {
        slots::finalization(&self.pool.conn, &date, stream)
            .map_err(|e| translate(e, &format_date(&date)))
    }

    fn insert_finalization(
        &mut self,
        date: NaiveDate,
        stream: LogStream,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DayFinalization> {
        let at = self.stamp(now);
        let target = format!("{stream} {}", format_date(&date));

        let fin = slots::insert_finalization(&self.pool.conn, &date, stream, actor, &at)
            .map_err(|e| translate(e, &target))?;
        audit(
            &self.pool.conn,
            "finalize",
            &target,
            &format!("Day finalized by {actor}"),
        )?;
        Ok(fin)
    }
}

impl ChecklistStore for SqliteStore {
    fn get_day(&self, date: NaiveDate) -> AppResult<Option<ChecklistDay>> {
        checklist::get_day(&self.pool.conn, &date).map_err(|e| translate(e, &format_date(&date)))
    }

    fn get_or_create_day(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> AppResult<ChecklistDay> {
        let key = format_date(&date);
        let at = self.stamp(now);
        checklist::ensure_day(&self.pool.conn, &date, &at).map_err(|e| translate(e, &key))?;
        checklist::get_day(&self.pool.conn, &date)
            .map_err(|e| translate(e, &key))?
            .ok_or_else(|| AppError::Other(format!("checklist {key} could not be created")))
    }

    fn list_days(&self, limit: usize) -> AppResult<Vec<ChecklistDay>> {
        checklist::list_days(&self.pool.conn, limit).map_err(|e| translate(e, "checklists"))
    }

    fn completions(
        &self,
        date: NaiveDate,
        session: Option<u8>,
    ) -> AppResult<Vec<ChecklistCompletion>> {
        checklist::completions(&self.pool.conn, &date, session)
            .map_err(|e| translate(e, &format_date(&date)))
    }

    fn complete_module(
        &mut self,
        completion: &ChecklistCompletion,
        data: &Value,
        now: DateTime<Utc>,
    ) -> AppResult<ChecklistDay> {
        let at = self.stamp(now);
        let key = format_date(&completion.date);

        let day = checklist::complete_module(&mut self.pool.conn, completion, data, &at).map_err(
            |e| match translate(e, &key) {
                AppError::DuplicateKey(_) => AppError::AlreadyCompleted(completion.module),
                other => other,
            },
        )?;

        audit(
            &self.pool.conn,
            "checklist_complete",
            &key,
            &format!(
                "Module {} completed in session {} by {} ({})",
                completion.module,
                completion.session,
                completion.completed_by,
                completion.unlock_source.as_str()
            ),
        )?;
        Ok(day)
    }

    fn submit_day(
        &mut self,
        date: NaiveDate,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ChecklistDay> {
        let key = format_date(&date);
        let at = self.stamp(now);

        checklist::ensure_day(&self.pool.conn, &date, &at).map_err(|e| translate(e, &key))?;
        let won =
            checklist::try_submit(&self.pool.conn, &date, actor, &at).map_err(|e| translate(e, &key))?;
        if !won {
            return Err(AppError::AlreadySubmitted(key));
        }

        audit(
            &self.pool.conn,
            "checklist_submit",
            &key,
            &format!("Checklist submitted by {actor}"),
        )?;

        checklist::get_day(&self.pool.conn, &date)
            .map_err(|e| translate(e, &key))?
            .ok_or_else(|| AppError::Other(format!("checklist {key} vanished")))
    }
}

impl IssueStore for SqliteStore {
    fn create_issue(
        &mut self,
        issue: &NewIssue,
        reported_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue> {
        let at = self.stamp(now);
        let day = today(now, self.tz);

        if let Some(IssueTarget::ChecklistDay { date }) = issue.target {
            checklist::ensure_day(&self.pool.conn, &date, &at)
                .map_err(|e| translate(e, &format_date(&date)))?;
        }

        let mut last_err = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = issues::next_code(&self.pool.conn, &day)?;
            match issues::insert_issue(&self.pool.conn, &code, issue, reported_by, &at)
                .map_err(|e| translate(e, &code))
            {
                Ok(()) => {
                    audit(
                        &self.pool.conn,
                        "issue_create",
                        &code,
                        &format!("{} issue on {}", issue.severity.as_str(), issue.location.module),
                    )?;
                    return issues::get_issue(&self.pool.conn, &code)?
                        .ok_or(AppError::IssueNotFound(code));
                }
                Err(AppError::DuplicateKey(code)) => {
                    warn!(code = %code, "issue code taken by a concurrent writer, retrying");
                    last_err = Some(AppError::DuplicateKey(code));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Other("issue code allocation failed".into())))
    }

    fn get_issue(&self, code: &str) -> AppResult<Option<FlaggedIssue>> {
        issues::get_issue(&self.pool.conn, code).map_err(|e| translate(e, code))
    }

    fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<FlaggedIssue>> {
        issues::list_issues(&self.pool.conn, filter).map_err(|e| translate(e, "issues"))
    }

    fn set_issue_status(
        &mut self,
        code: &str,
        status: IssueStatus,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue> {
        let at = self.stamp(now);
        let changed =
            issues::update_status(&self.pool.conn, code, status, &at).map_err(|e| translate(e, code))?;
        if changed == 0 {
            return Err(AppError::IssueNotFound(code.to_string()));
        }

        audit(
            &self.pool.conn,
            "issue_status",
            code,
            &format!("Status set to {status}"),
        )?;

        issues::get_issue(&self.pool.conn, code)?
            .ok_or_else(|| AppError::IssueNotFound(code.to_string()))
    }
}
