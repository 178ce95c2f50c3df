//! Collective log session.
//!
//! One session per log stream (generator, transformer N). It holds the draft
//! of the selected hour and owns the edit → validate → save lifecycle. The
//! session is driven by its caller: edits, `tick(now)` on the refresh
//! interval and change-feed polling (see `core::sync`).
//!
//! Saves are split into `begin_save` / `complete_save` around the store
//! write so that a completion arriving after the selection moved on is
//! recognised as stale and discarded.

use crate::core::clock::{HOURS_PER_DAY, current_hour, operational_date};
use crate::core::validation::{Classification, FieldCheck, classify_field, classify_slot, hard_violations, prefill};
use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::field::lookup;
use crate::models::hour_slot::{DayFinalization, HourSlot, SlotKey};
use crate::models::issue::{FlaggedIssue, IssueTarget, NewIssue, PendingIssue, Severity};
use crate::models::stream::LogStream;
use crate::store::{ChangeEvent, ChangeFeed, ChangeType, IssueStore, SlotStore, UpsertOutcome};
use crate::utils::date::format_date;
use crate::utils::time::stamp;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LockReason {
    /// Only the current wall-clock hour is editable.
    NotCurrentHour { current: u32 },
    Finalized,
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockReason::NotCurrentHour { current } => {
                write!(f, "only hour {current:02}:00 is editable now")
            }
            LockReason::Finalized => f.write_str("the day has been finalized"),
        }
    }
}

/// Observable state, derived from the session fields on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Ready { hour: u32 },
    Editing { hour: u32 },
    Saving { hour: u32 },
    Locked { hour: u32, reason: LockReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Debounced save; failures only reach the indicator and the log.
    Auto,
    /// Operator-triggered save; failures are returned.
    Manual,
}

/// Lightweight autosave status shown next to the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveIndicator {
    Idle,
    Pending,
    Saving,
    Saved { hour: u32, at: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        hour: u32,
        id: i64,
        change: ChangeType,
    },
    /// Nothing to write.
    Unchanged,
    /// A write for the same key is in flight; a follow-up save was scheduled.
    Queued,
}

/// Things the operator should be told about, collected until taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    HourLocked { hour: u32 },
    DayChanged { date: NaiveDate },
    RemoteUpdate { hours: Vec<u32> },
    AutosaveFailed { hour: u32, message: String },
    IssueFlushed { hour: u32, code: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::HourLocked { hour } => write!(f, "Hour {hour:02}:00 is now locked"),
            Notice::DayChanged { date } => write!(f, "New operational day {date}"),
            Notice::RemoteUpdate { hours } => {
                let list = hours
                    .iter()
                    .map(|h| format!("{h:02}:00"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Updated by another operator: {list}")
            }
            Notice::AutosaveFailed { hour, message } => {
                write!(f, "Autosave of {hour:02}:00 failed: {message}")
            }
            Notice::IssueFlushed { hour, code } => {
                write!(f, "Queued issue for {hour:02}:00 recorded as {code}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    key: SlotKey,
    ticket: u64,
}

/// Serialises writes: never more than one in-flight save per slot key.
#[derive(Debug, Default)]
pub struct SaveQueue {
    in_flight: Option<InFlight>,
    follow_up: bool,
    next_ticket: u64,
}

impl SaveQueue {
    /// Register a write for `key`. Returns `None` (and records a follow-up)
    /// when a write is already in flight.
    pub fn try_begin(&mut self, key: SlotKey) -> Option<u64> {
        if self.in_flight.is_some() {
            self.follow_up = true;
            return None;
        }
        self.next_ticket += 1;
        self.in_flight = Some(InFlight {
            key,
            ticket: self.next_ticket,
        });
        Some(self.next_ticket)
    }

    /// Release the ticket; returns whether a follow-up was requested meanwhile.
    pub fn finish(&mut self, ticket: u64) -> bool {
        if self.in_flight.map(|f| f.ticket) != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        std::mem::take(&mut self.follow_up)
    }

    pub fn in_flight(&self) -> Option<SlotKey> {
        self.in_flight.map(|f| f.key)
    }
}

/// A save between `begin_save` and `complete_save`.
#[derive(Debug, Clone)]
pub struct PendingSave {
    ticket: u64,
    rev: u64,
    pub mode: SaveMode,
    pub slot: HourSlot,
}

#[derive(Debug)]
pub enum SaveStart {
    Ready(PendingSave),
    Unchanged,
    Queued,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlagOutcome {
    Created(FlaggedIssue),
    Queued(PendingIssue),
}

pub struct LogSession<S> {
    store: S,
    actor: Actor,
    stream: LogStream,
    tz: FixedOffset,
    debounce: Duration,

    loaded: bool,
    date: NaiveDate,
    current_hour: u32,
    selected_hour: u32,
    draft: HourSlot,
    draft_rev: u64,
    saved_rev: u64,
    autosave_due: Option<DateTime<Utc>>,
    queue: SaveQueue,
    in_flight_rev: u64,
    stranded: Option<HourSlot>,

    hours_with_data: BTreeSet<u32>,
    finalized: Option<DayFinalization>,
    pending: Vec<PendingIssue>,
    feed: Option<ChangeFeed>,
    indicator: SaveIndicator,
    notices: Vec<Notice>,
}

impl<S: SlotStore + IssueStore> LogSession<S> {
    pub fn new(
        store: S,
        actor: Actor,
        stream: LogStream,
        tz: FixedOffset,
        debounce: Duration,
    ) -> Self {
        let date = NaiveDate::default();
        Self {
            store,
            actor,
            stream,
            tz,
            debounce,
            loaded: false,
            date,
            current_hour: 0,
            selected_hour: 0,
            draft: HourSlot::blank(date, 0, stream),
            draft_rev: 0,
            saved_rev: 0,
            autosave_due: None,
            queue: SaveQueue::default(),
            in_flight_rev: 0,
            stranded: None,
            hours_with_data: BTreeSet::new(),
            finalized: None,
            pending: Vec::new(),
            feed: None,
            indicator: SaveIndicator::Idle,
            notices: Vec::new(),
        }
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn stream(&self) -> LogStream {
        self.stream
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn current_hour(&self) -> u32 {
        self.current_hour
    }

    pub fn selected_hour(&self) -> u32 {
        self.selected_hour
    }

    pub fn draft(&self) -> &HourSlot {
        &self.draft
    }

    pub fn hours_with_data(&self) -> &BTreeSet<u32> {
        &self.hours_with_data
    }

    pub fn finalization(&self) -> Option<&DayFinalization> {
        self.finalized.as_ref()
    }

    pub fn indicator(&self) -> &SaveIndicator {
        &self.indicator
    }

    pub fn pending_issues(&self) -> &[PendingIssue] {
        &self.pending
    }

    pub fn autosave_due(&self) -> Option<DateTime<Utc>> {
        self.autosave_due
    }

    pub fn is_dirty(&self) -> bool {
        self.draft_rev != self.saved_rev
    }

    /// The operator is actively editing the selected hour.
    pub fn is_editing(&self) -> bool {
        self.is_dirty() || self.queue.in_flight().is_some()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn lock_reason(&self) -> Option<LockReason> {
        if self.finalized.is_some() {
            Some(LockReason::Finalized)
        } else if self.selected_hour != self.current_hour {
            Some(LockReason::NotCurrentHour {
                current: self.current_hour,
            })
        } else {
            None
        }
    }

    pub fn state(&self) -> SessionState {
        let hour = self.selected_hour;
        if !self.loaded {
            SessionState::Loading
        } else if self.queue.in_flight().is_some() {
            SessionState::Saving { hour }
        } else if let Some(reason) = self.lock_reason() {
            SessionState::Locked { hour, reason }
        } else if self.is_dirty() {
            SessionState::Editing { hour }
        } else {
            SessionState::Ready { hour }
        }
    }

    /// Per-field classification of the draft, for colouring the form.
    pub fn field_checks(&self) -> Vec<FieldCheck> {
        classify_slot(&self.draft)
    }

    fn ensure_loaded(&self) -> AppResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(AppError::Other("log session not loaded".into()))
        }
    }

    fn ensure_writer(&self, action: &str) -> AppResult<()> {
        if self.actor.role.can_write_logs() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "{} ({}) cannot {}",
                self.actor.name,
                self.actor.role.as_str(),
                action
            )))
        }
    }

    fn ensure_editable(&self) -> AppResult<()> {
        match self.lock_reason() {
            None => Ok(()),
            Some(LockReason::Finalized) => Err(AppError::DayFinalized(format_date(&self.date))),
            Some(reason) => Err(AppError::HourLocked {
                hour: self.selected_hour,
                reason: reason.to_string(),
            }),
        }
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Fetch the operational day and select the current hour.
    pub fn load(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.date = operational_date(now, self.tz);
        self.current_hour = current_hour(now, self.tz);

        // Subscribe before reading so nothing saved in between is missed.
        self.feed = Some(self.store.subscribe_day_changes(self.date, self.stream)?);
        self.finalized = self.store.finalization(self.date, self.stream)?;

        let slots = self
            .store
            .list_slots(self.stream.kind(), self.date, Some(self.stream))?;
        self.hours_with_data = slots.iter().map(|s| s.hour).collect();

        let hour = self.current_hour;
        let draft = slots
            .into_iter()
            .find(|s| s.hour == hour)
            .unwrap_or_else(|| HourSlot::blank(self.date, hour, self.stream));
        self.replace_draft(draft);
        self.loaded = true;

        debug!(
            stream = %self.stream,
            date = %self.date,
            hour,
            hours = self.hours_with_data.len(),
            "log session loaded"
        );
        Ok(())
    }

    fn replace_draft(&mut self, slot: HourSlot) {
        self.selected_hour = slot.hour;
        self.draft = slot;
        self.draft_rev = 0;
        self.saved_rev = 0;
        self.autosave_due = None;
        self.indicator = SaveIndicator::Idle;
    }

    fn switch_to(&mut self, hour: u32) -> AppResult<()> {
        let slot = self
            .store
            .get_slot(self.date, hour, self.stream)?
            .unwrap_or_else(|| HourSlot::blank(self.date, hour, self.stream));
        self.replace_draft(slot);
        Ok(())
    }

    /// Select another hour. A dirty draft is saved first; if that save
    /// fails the switch is refused and the error returned.
    pub fn select_hour(&mut self, hour: u32, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_loaded()?;
        if hour >= HOURS_PER_DAY {
            return Err(AppError::InvalidHour(hour.to_string()));
        }
        if hour == self.selected_hour {
            return Ok(());
        }

        if self.is_dirty() {
            match self.queue.in_flight() {
                // Edits made after the in-flight write started would be lost.
                Some(busy) if self.draft_rev > self.in_flight_rev => {
                    return Err(AppError::SaveInProgress(busy.hour));
                }
                Some(_) => {}
                None => {
                    self.commit(SaveMode::Manual, now)?;
                }
            }
        }
        self.switch_to(hour)
    }

    /// Edit one measurement of the selected hour.
    pub fn set_field(
        &mut self,
        field: &str,
        raw: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Classification> {
        self.ensure_loaded()?;
        self.ensure_writer("edit hour logs")?;
        self.ensure_editable()?;

        let spec = lookup(self.stream.kind(), field)
            .ok_or_else(|| AppError::UnknownField(field.to_string()))?;
        let value = spec
            .parse(raw)
            .ok_or_else(|| AppError::InvalidValue(format!("{field} = '{raw}'")))?;

        let classification = classify_field(spec, &value);
        self.draft.values.insert(spec.key.to_string(), value);
        self.touch(now);
        Ok(classification)
    }

    pub fn set_remark(&mut self, remark: &str, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_loaded()?;
        self.ensure_writer("edit hour logs")?;
        self.ensure_editable()?;

        self.draft.remark = remark.trim().to_string();
        self.touch(now);
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.draft_rev += 1;
        self.autosave_due = Some(now + self.debounce);
        self.indicator = SaveIndicator::Pending;
    }

    /// Drive timers: hour rollover first, then the debounced autosave.
    pub fn tick(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_loaded()?;

        let date = operational_date(now, self.tz);
        let hour = current_hour(now, self.tz);

        if date != self.date || hour != self.current_hour {
            self.roll_over(date, hour, now)?;
        }

        if let Some(due) = self.autosave_due
            && due <= now
        {
            self.autosave_due = None;
            if self.is_dirty() && self.lock_reason().is_none() {
                self.autosave(now);
            }
        }
        Ok(())
    }

    fn roll_over(&mut self, date: NaiveDate, hour: u32, now: DateTime<Utc>) -> AppResult<()> {
        let closed = self.current_hour;

        // The closing hour is still current here, so its draft can be flushed.
        if self.selected_hour == closed && self.is_dirty() && self.finalized.is_none() {
            match self.commit(SaveMode::Auto, now) {
                Ok(SaveOutcome::Queued) => {
                    // Written once the in-flight save for this hour completes.
                    self.stranded = Some(self.stamped_draft(now));
                }
                Ok(_) => {}
                Err(e) if e.is_silent() => {}
                Err(e) => {
                    warn!(stream = %self.stream, hour = closed, error = %e, "rollover flush failed");
                    self.notices.push(Notice::AutosaveFailed {
                        hour: closed,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.notices.push(Notice::HourLocked { hour: closed });
        info!(stream = %self.stream, closed, current = hour, "hour rolled over");

        if date != self.date {
            self.load(now)?;
            self.notices.push(Notice::DayChanged { date });
            self.flush_older_pending(now);
        } else {
            self.current_hour = hour;
            self.switch_to(hour)?;
        }
        Ok(())
    }

    fn autosave(&mut self, now: DateTime<Utc>) {
        match self.commit(SaveMode::Auto, now) {
            Ok(_) => {}
            Err(e) if e.is_silent() => {
                debug!(stream = %self.stream, error = %e, "autosave resolved silently");
            }
            Err(e) => {
                warn!(stream = %self.stream, hour = self.selected_hour, error = %e, "autosave failed");
            }
        }
    }

    // ---------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------

    /// Manual save of the selected hour; every failure is returned.
    pub fn save(&mut self, now: DateTime<Utc>) -> AppResult<SaveOutcome> {
        self.ensure_loaded()?;
        self.commit(SaveMode::Manual, now)
    }

    fn commit(&mut self, mode: SaveMode, now: DateTime<Utc>) -> AppResult<SaveOutcome> {
        match self.begin_save(mode, now)? {
            SaveStart::Unchanged => Ok(SaveOutcome::Unchanged),
            SaveStart::Queued => Ok(SaveOutcome::Queued),
            SaveStart::Ready(pending) => {
                let result = self.run_save(&pending, now);
                self.complete_save(pending, result, now)
            }
        }
    }

    /// Validate locally and register the write with the save queue.
    pub fn begin_save(&mut self, mode: SaveMode, now: DateTime<Utc>) -> AppResult<SaveStart> {
        self.ensure_loaded()?;
        self.ensure_writer("save hour logs")?;
        self.ensure_editable()?;

        if !self.is_dirty() {
            return Ok(SaveStart::Unchanged);
        }

        let violations = hard_violations(&self.draft);
        if !violations.is_empty() {
            let err = AppError::RangeViolation(violations);
            self.indicator = SaveIndicator::Failed {
                message: err.to_string(),
            };
            return Err(err);
        }

        let Some(ticket) = self.queue.try_begin(self.draft.key()) else {
            return Ok(SaveStart::Queued);
        };

        let slot = self.stamped_draft(now);
        self.in_flight_rev = self.draft_rev;
        self.autosave_due = None;
        self.indicator = SaveIndicator::Saving;
        Ok(SaveStart::Ready(PendingSave {
            ticket,
            rev: self.draft_rev,
            mode,
            slot,
        }))
    }

    fn stamped_draft(&self, now: DateTime<Utc>) -> HourSlot {
        let mut slot = self.draft.clone();
        slot.logged_by = self.actor.name.clone();
        slot.updated_at = stamp(now, self.tz);
        slot
    }

    /// The store write for a pending save.
    pub fn run_save(&mut self, pending: &PendingSave, now: DateTime<Utc>) -> AppResult<UpsertOutcome> {
        self.upsert(&pending.slot, now)
    }

    /// A DuplicateKey is retried once with a fresh upsert.
    fn upsert(&mut self, slot: &HourSlot, now: DateTime<Utc>) -> AppResult<UpsertOutcome> {
        match self.store.upsert_slot(slot, &self.actor.name, now) {
            Err(AppError::DuplicateKey(key)) => {
                debug!(slot = %key, "duplicate key on upsert, retrying once");
                self.store.upsert_slot(slot, &self.actor.name, now)
            }
            other => other,
        }
    }

    /// Write the draft left behind by a rollover while its hour was still
    /// being saved.
    fn write_stranded(&mut self, key: SlotKey, follow_up: bool, now: DateTime<Utc>) {
        let Some(slot) = self.stranded.take_if(|s| s.key() == key) else {
            if follow_up {
                warn!(slot = %key, "follow-up save requested for an hour no longer held");
            }
            return;
        };
        match self.upsert(&slot, now) {
            Ok(outcome) => {
                if key.date == self.date {
                    self.hours_with_data.insert(key.hour);
                }
                self.flush_pending(key.date, key.hour, outcome.id, now);
                debug!(slot = %key, id = outcome.id, "stranded draft written");
            }
            Err(e) => {
                warn!(slot = %key, error = %e, "stranded draft could not be written");
                self.notices.push(Notice::AutosaveFailed {
                    hour: key.hour,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Apply the write result, unless the selection moved on (StaleWrite).
    pub fn complete_save(
        &mut self,
        pending: PendingSave,
        result: AppResult<UpsertOutcome>,
        now: DateTime<Utc>,
    ) -> AppResult<SaveOutcome> {
        let follow_up = self.queue.finish(pending.ticket);
        let key = pending.slot.key();
        let still_selected = key.date == self.date && key.hour == self.selected_hour;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if !still_selected {
                    debug!(slot = %key, error = %e, "stale save failed after selection moved");
                    self.write_stranded(key, follow_up, now);
                    return Err(AppError::StaleWrite(key.hour));
                }
                if let AppError::DayFinalized(_) = e {
                    self.finalized = self.store.finalization(self.date, self.stream)?;
                }
                self.indicator = SaveIndicator::Failed {
                    message: e.to_string(),
                };
                return Err(e);
            }
        };

        // The row exists now, whether or not the hour is still selected.
        if key.date == self.date {
            self.hours_with_data.insert(key.hour);
        }
        self.flush_pending(key.date, key.hour, outcome.id, now);

        if !still_selected {
            debug!(slot = %key, "save completed for an hour no longer selected, discarded");
            self.write_stranded(key, follow_up, now);
            return Err(AppError::StaleWrite(key.hour));
        }

        self.draft.id = Some(outcome.id);
        self.draft.logged_by = pending.slot.logged_by.clone();
        self.draft.updated_at = pending.slot.updated_at.clone();
        self.saved_rev = self.saved_rev.max(pending.rev);
        self.indicator = SaveIndicator::Saved {
            hour: key.hour,
            at: pending.slot.updated_at.clone(),
        };

        if follow_up || self.is_dirty() {
            self.autosave_due = Some(now);
        }

        debug!(slot = %key, id = outcome.id, mode = ?pending.mode, "save applied");
        Ok(SaveOutcome::Saved {
            hour: key.hour,
            id: outcome.id,
            change: outcome.change,
        })
    }

    // ---------------------------------------------------------------
    // Issues
    // ---------------------------------------------------------------

    /// Flag a field of the selected hour. Severity and description default
    /// to the values derived from the field's classification.
    pub fn flag_field(
        &mut self,
        field: &str,
        description: Option<&str>,
        severity: Option<Severity>,
        now: DateTime<Utc>,
    ) -> AppResult<FlagOutcome> {
        self.ensure_loaded()?;
        self.ensure_writer("flag issues")?;

        let spec = lookup(self.stream.kind(), field)
            .ok_or_else(|| AppError::UnknownField(field.to_string()))?;
        let value = self
            .draft
            .get(field)
            .cloned()
            .unwrap_or_else(|| spec.default_value());
        let pre = prefill(&self.stream.to_string(), spec, &value);

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or(pre.description);
        let severity = severity.unwrap_or(pre.severity);

        match self.draft.id {
            Some(slot_id) => {
                let issue = NewIssue {
                    target: Some(IssueTarget::HourSlot {
                        kind: self.stream.kind(),
                        slot_id,
                    }),
                    location: pre.location,
                    severity,
                    description,
                };
                let created = self.store.create_issue(&issue, &self.actor.name, now)?;
                Ok(FlagOutcome::Created(created))
            }
            None => {
                let pending = PendingIssue {
                    kind: self.stream.kind(),
                    date: self.date,
                    hour: self.selected_hour,
                    location: pre.location,
                    severity,
                    description,
                    raised_by: self.actor.name.clone(),
                };
                debug!(hour = pending.hour, field, "issue queued until the slot is saved");
                self.pending.push(pending.clone());
                Ok(FlagOutcome::Queued(pending))
            }
        }
    }

    fn flush_pending(&mut self, date: NaiveDate, hour: u32, slot_id: i64, now: DateTime<Utc>) {
        let (ready, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.date == date && p.hour == hour);
        self.pending = rest;

        for p in ready {
            let raised_by = p.raised_by.clone();
            let issue = p.clone().into_new_issue(slot_id);
            match self.store.create_issue(&issue, &raised_by, now) {
                Ok(created) => {
                    info!(code = %created.code, hour, "queued issue flushed");
                    self.notices.push(Notice::IssueFlushed {
                        hour,
                        code: created.code,
                    });
                }
                Err(e) => {
                    warn!(hour, error = %e, "could not flush queued issue, keeping it");
                    self.pending.push(p);
                }
            }
        }
    }

    /// Pending issues of older days whose slot was saved by someone else.
    fn flush_older_pending(&mut self, now: DateTime<Utc>) {
        let keys: BTreeSet<(NaiveDate, u32)> = self
            .pending
            .iter()
            .filter(|p| p.date != self.date)
            .map(|p| (p.date, p.hour))
            .collect();

        for (date, hour) in keys {
            match self.store.get_slot(date, hour, self.stream) {
                Ok(Some(slot)) => {
                    if let Some(id) = slot.id {
                        self.flush_pending(date, hour, id, now);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(%date, hour, error = %e, "could not resolve queued issue"),
            }
        }
    }

    // ---------------------------------------------------------------
    // Remote changes
    // ---------------------------------------------------------------

    /// Events recorded since the last poll of the day's change feed.
    pub fn poll_changes(&mut self) -> AppResult<Vec<ChangeEvent>> {
        self.ensure_loaded()?;
        match self.feed.as_mut() {
            Some(feed) => self.store.poll_changes(feed),
            None => Ok(Vec::new()),
        }
    }

    /// Re-fetch the whole day. The selected draft is replaced only when the
    /// operator is not editing it.
    pub fn refresh_day(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_loaded()?;

        self.finalized = self.store.finalization(self.date, self.stream)?;
        let slots = self
            .store
            .list_slots(self.stream.kind(), self.date, Some(self.stream))?;
        self.hours_with_data = slots.iter().map(|s| s.hour).collect();

        let pending_hours: BTreeSet<u32> = self
            .pending
            .iter()
            .filter(|p| p.date == self.date)
            .map(|p| p.hour)
            .collect();

        let editing = self.is_editing();
        for slot in slots {
            if let Some(id) = slot.id
                && pending_hours.contains(&slot.hour)
            {
                self.flush_pending(self.date, slot.hour, id, now);
            }
            if slot.hour == self.selected_hour && !editing {
                self.draft = slot;
            }
        }
        Ok(())
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
