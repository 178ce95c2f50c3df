use chrono::{DateTime, NaiveDate, Utc};
use hydrolog::core::session::{
    FlagOutcome, LockReason, LogSession, Notice, SaveIndicator, SaveMode, SaveOutcome, SaveStart,
    SessionState,
};
use hydrolog::core::sync::pump;
use hydrolog::core::validation::Status;
use hydrolog::errors::{AppError, AppResult};
use hydrolog::models::actor::{Actor, Role};
use hydrolog::models::field::FieldValue;
use hydrolog::models::hour_slot::{DayFinalization, HourSlot};
use hydrolog::models::issue::{
    FlaggedIssue, IssueFilter, IssueStatus, IssueTarget, NewIssue, Severity,
};
use hydrolog::models::stream::{LogKind, LogStream};
use hydrolog::store::{
    ChangeEvent, ChangeFeed, ChangeType, IssueStore, SlotStore, SqliteStore, UpsertOutcome,
};

mod common;
use common::{
    at, at_on, day, generator_session, memory_store, open_store, save_hour, secs, setup_test_db,
    tz,
};

fn alice() -> Actor {
    Actor::operator("alice")
}

fn stored_value(store: &impl SlotStore, hour: u32, field: &str) -> Option<FieldValue> {
    store
        .get_slot(day(), hour, LogStream::Generator)
        .unwrap()
        .and_then(|s| s.get(field).cloned())
}

#[test]
fn test_load_selects_the_current_hour() {
    let mut session = generator_session(memory_store(), alice());
    assert_eq!(session.state(), SessionState::Loading);

    session.load(at(14, 20)).unwrap();
    assert_eq!(session.date(), day());
    assert_eq!(session.current_hour(), 14);
    assert_eq!(session.state(), SessionState::Ready { hour: 14 });
    assert!(session.draft().id.is_none());
}

#[test]
fn test_edit_returns_classification_and_marks_dirty() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();

    let c = session.set_field("stator_temp_r_c", "190", at(14, 21)).unwrap();
    assert_eq!(c.status, Status::Warning);
    assert_eq!(session.state(), SessionState::Editing { hour: 14 });
    assert_eq!(*session.indicator(), SaveIndicator::Pending);

    let err = session.set_field("no_such_field", "1", at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::UnknownField(_)));
    let err = session.set_field("frequency_hz", "fifty", at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue(_)));
}

#[test]
fn test_autosave_waits_for_the_debounce() {
    let mut session = generator_session(memory_store(), alice());
    let t0 = at(14, 20);
    session.load(t0).unwrap();

    session.set_field("active_power_mw", "6.2", t0).unwrap();
    session.tick(t0 + secs(1)).unwrap();
    assert!(session.is_dirty());
    assert!(stored_value(session.store(), 14, "active_power_mw").is_none());

    session.tick(t0 + secs(2)).unwrap();
    assert!(!session.is_dirty());
    assert_eq!(
        stored_value(session.store(), 14, "active_power_mw"),
        Some(FieldValue::Number(6.2))
    );
    assert!(matches!(session.indicator(), SaveIndicator::Saved { hour: 14, .. }));
    assert!(session.hours_with_data().contains(&14));
}

#[test]
fn test_every_edit_restarts_the_debounce() {
    let mut session = generator_session(memory_store(), alice());
    let t0 = at(14, 20);
    session.load(t0).unwrap();

    session.set_field("active_power_mw", "6.2", t0).unwrap();
    session.set_field("reactive_power_mvar", "1.1", t0 + secs(1)).unwrap();
    assert_eq!(session.autosave_due(), Some(t0 + secs(3)));

    session.tick(t0 + secs(2)).unwrap();
    assert!(session.is_dirty());

    session.tick(t0 + secs(3)).unwrap();
    assert!(!session.is_dirty());
    assert_eq!(
        stored_value(session.store(), 14, "reactive_power_mvar"),
        Some(FieldValue::Number(1.1))
    );
}

#[test]
fn test_manual_save_inserts_then_updates() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();

    session.set_field("frequency_hz", "50.01", at(14, 21)).unwrap();
    let first = session.save(at(14, 21)).unwrap();
    assert!(matches!(
        first,
        SaveOutcome::Saved { hour: 14, change: ChangeType::Insert, .. }
    ));

    assert_eq!(session.save(at(14, 22)).unwrap(), SaveOutcome::Unchanged);

    session.set_field("frequency_hz", "49.98", at(14, 23)).unwrap();
    let second = session.save(at(14, 23)).unwrap();
    assert!(matches!(
        second,
        SaveOutcome::Saved { change: ChangeType::Update, .. }
    ));
    assert_eq!(session.draft().logged_by, "alice");
}

#[test]
fn test_past_hours_are_read_only() {
    let mut store = memory_store();
    save_hour(&mut store, day(), 13, LogStream::Generator, "bob", &[("frequency_hz", 50.0)]);

    let mut session = generator_session(store, alice());
    session.load(at(14, 20)).unwrap();
    session.select_hour(13, at(14, 21)).unwrap();

    assert_eq!(session.draft().get("frequency_hz"), Some(&FieldValue::Number(50.0)));
    assert_eq!(
        session.state(),
        SessionState::Locked {
            hour: 13,
            reason: LockReason::NotCurrentHour { current: 14 }
        }
    );

    let err = session.set_field("frequency_hz", "49.0", at(14, 22)).unwrap_err();
    assert!(matches!(err, AppError::HourLocked { hour: 13, .. }), "got {err:?}");
}

#[test]
fn test_hard_violation_blocks_save_and_hour_switch() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();

    let c = session.set_field("stator_temp_r_c", "205", at(14, 21)).unwrap();
    assert_eq!(c.status, Status::Danger);

    let err = session.save(at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::RangeViolation(_)));
    assert!(matches!(session.indicator(), SaveIndicator::Failed { .. }));

    let err = session.select_hour(13, at(14, 22)).unwrap_err();
    assert!(matches!(err, AppError::RangeViolation(_)));
    assert_eq!(session.selected_hour(), 14);
    assert!(session.is_dirty());
}

#[test]
fn test_rollover_flushes_the_closing_hour() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at_on(day(), 14, 59, 50)).unwrap();

    session
        .set_field("active_power_mw", "5.5", at_on(day(), 14, 59, 58))
        .unwrap();
    session.tick(at_on(day(), 15, 0, 1)).unwrap();

    assert_eq!(
        stored_value(session.store(), 14, "active_power_mw"),
        Some(FieldValue::Number(5.5))
    );
    assert_eq!(session.current_hour(), 15);
    assert_eq!(session.state(), SessionState::Ready { hour: 15 });
    assert!(session.draft().id.is_none());

    let notices = session.take_notices();
    assert!(notices.contains(&Notice::HourLocked { hour: 14 }));
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_midnight_starts_a_new_day() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at_on(day(), 23, 59, 59)).unwrap();

    let next = day().succ_opt().unwrap();
    session.tick(at_on(next, 0, 0, 1)).unwrap();

    assert_eq!(session.date(), next);
    assert_eq!(session.state(), SessionState::Ready { hour: 0 });
    let notices = session.take_notices();
    assert!(notices.contains(&Notice::HourLocked { hour: 23 }));
    assert!(notices.contains(&Notice::DayChanged { date: next }));
}

#[test]
fn test_remote_change_to_the_edited_hour_is_ignored() {
    let db = setup_test_db("session_remote_same_hour");
    let mut session = generator_session(open_store(&db), alice());
    let mut bob = open_store(&db);
    session.load(at(14, 20)).unwrap();

    session.set_field("active_power_mw", "6.0", at(14, 21)).unwrap();
    save_hour(&mut bob, day(), 14, LogStream::Generator, "bob", &[("active_power_mw", 9.9)]);

    let report = pump(&mut session, at(14, 22)).unwrap();
    assert_eq!(report.received, 1);
    assert_eq!(report.ignored, 1);
    assert!(report.refreshed_hours.is_empty());
    assert_eq!(
        session.draft().get("active_power_mw"),
        Some(&FieldValue::Number(6.0))
    );
    assert!(session.is_dirty());
}

#[test]
fn test_remote_change_to_another_hour_refreshes_the_day() {
    let db = setup_test_db("session_remote_other_hour");
    let mut session = generator_session(open_store(&db), alice());
    let mut bob = open_store(&db);
    session.load(at(14, 20)).unwrap();
    session.set_field("active_power_mw", "6.0", at(14, 21)).unwrap();

    save_hour(&mut bob, day(), 13, LogStream::Generator, "bob", &[]);
    let report = pump(&mut session, at(14, 22)).unwrap();

    assert_eq!(report.refreshed_hours, vec![13]);
    assert!(session.hours_with_data().contains(&13));
    assert!(session.is_dirty(), "local draft survives the refresh");
    assert!(session
        .take_notices()
        .contains(&Notice::RemoteUpdate { hours: vec![13] }));

    // nothing new: nothing to do
    assert_eq!(pump(&mut session, at(14, 23)).unwrap().received, 0);
}

#[test]
fn test_own_saves_echo_back_ignored() {
    let db = setup_test_db("session_own_echo");
    let mut session = generator_session(open_store(&db), alice());
    session.load(at(14, 20)).unwrap();

    session.set_field("active_power_mw", "6.0", at(14, 21)).unwrap();
    session.save(at(14, 21)).unwrap();

    let report = pump(&mut session, at(14, 22)).unwrap();
    assert_eq!(report.received, 1);
    assert_eq!(report.ignored, 1);
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_save_finishing_after_selection_moved_is_stale() {
    let mut store = memory_store();
    save_hour(&mut store, day(), 13, LogStream::Generator, "bob", &[]);
    let mut session = generator_session(store, alice());
    session.load(at(14, 20)).unwrap();
    session.set_field("active_power_mw", "6.0", at(14, 21)).unwrap();

    let pending = match session.begin_save(SaveMode::Auto, at(14, 21)).unwrap() {
        SaveStart::Ready(p) => p,
        other => panic!("expected a ready save, got {other:?}"),
    };
    assert_eq!(session.state(), SessionState::Saving { hour: 14 });

    // the switch cannot start a second write for the same key
    session.select_hour(13, at(14, 21)).unwrap();
    assert_eq!(session.selected_hour(), 13);

    let result = session.run_save(&pending, at(14, 21));
    let err = session.complete_save(pending, result, at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::StaleWrite(14)));
    assert!(err.is_silent());

    assert!(session.hours_with_data().contains(&14));
    assert_eq!(session.draft().hour, 13);
    assert_eq!(
        stored_value(session.store(), 14, "active_power_mw"),
        Some(FieldValue::Number(6.0))
    );
}

#[test]
fn test_issue_on_unsaved_hour_is_flushed_by_own_save() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();
    session.set_field("stator_temp_r_c", "190", at(14, 21)).unwrap();

    let outcome = session.flag_field("stator_temp_r_c", None, None, at(14, 21)).unwrap();
    assert!(matches!(outcome, FlagOutcome::Queued(_)));
    assert_eq!(session.pending_issues().len(), 1);
    assert!(session.store().list_issues(&IssueFilter::default()).unwrap().is_empty());

    session.save(at(14, 22)).unwrap();
    assert!(session.pending_issues().is_empty());

    let issues = session.store().list_issues(&IssueFilter::default()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::High);
    assert_eq!(issues[0].reported_by, "alice");
    assert_eq!(
        issues[0].target,
        IssueTarget::HourSlot {
            kind: LogKind::Generator,
            slot_id: session.draft().id.unwrap()
        }
    );

    let notices = session.take_notices();
    assert!(notices.iter().any(|n| matches!(
        n,
        Notice::IssueFlushed { hour: 14, code } if code == &issues[0].code
    )));
}

#[test]
fn test_issue_on_saved_hour_is_created_at_once() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();
    session.set_field("frequency_hz", "50.0", at(14, 21)).unwrap();
    session.save(at(14, 21)).unwrap();

    let outcome = session
        .flag_field("frequency_hz", Some("governor hunting"), Some(Severity::Low), at(14, 25))
        .unwrap();
    match outcome {
        FlagOutcome::Created(issue) => {
            assert_eq!(issue.description, "governor hunting");
            assert_eq!(issue.severity, Severity::Low);
        }
        FlagOutcome::Queued(_) => panic!("slot already has an id"),
    }
}

#[test]
fn test_issue_is_flushed_when_someone_else_saves_the_hour() {
    let db = setup_test_db("session_remote_flush");
    let mut session = generator_session(open_store(&db), alice());
    let mut bob = open_store(&db);
    session.load(at(14, 20)).unwrap();

    let outcome = session
        .flag_field("thrust_bearing_temp_c", Some("noisy sensor"), None, at(14, 21))
        .unwrap();
    assert!(matches!(outcome, FlagOutcome::Queued(_)));
    assert!(!session.is_dirty());

    save_hour(&mut bob, day(), 14, LogStream::Generator, "bob", &[]);
    pump(&mut session, at(14, 22)).unwrap();

    assert!(session.pending_issues().is_empty());
    let issues = bob.list_issues(&IssueFilter::default()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].description, "noisy sensor");
    assert!(session.draft().id.is_some(), "not editing: draft picks up bob's row");
}

#[test]
fn test_viewer_cannot_edit() {
    let viewer = Actor::new("vic", Role::Viewer);
    let mut session = generator_session(memory_store(), viewer);
    session.load(at(14, 20)).unwrap();

    let err = session.set_field("frequency_hz", "50", at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
    assert!(err.to_string().contains("vic (viewer)"));
}

#[test]
fn test_finalized_day_is_locked() {
    let mut store = memory_store();
    for h in 0..24 {
        save_hour(&mut store, day(), h, LogStream::Generator, "bob", &[]);
    }
    store
        .insert_finalization(day(), LogStream::Generator, "admin", at(14, 0))
        .unwrap();

    let mut session = generator_session(store, alice());
    session.load(at(14, 20)).unwrap();
    assert_eq!(
        session.state(),
        SessionState::Locked {
            hour: 14,
            reason: LockReason::Finalized
        }
    );
    let err = session.set_field("frequency_hz", "50", at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::DayFinalized(_)));
}

#[test]
fn test_unreachable_store_keeps_the_draft() {
    let db = setup_test_db("session_network_failure");
    let mut session = generator_session(open_store(&db), alice());
    let other = open_store(&db);
    session.load(at(14, 20)).unwrap();
    session.set_field("active_power_mw", "7.0", at(14, 21)).unwrap();

    other.conn().execute_batch("BEGIN EXCLUSIVE").unwrap();
    let err = session.save(at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::NetworkFailure(_)), "got {err:?}");
    assert!(err.is_transient());
    assert!(session.is_dirty());
    assert!(matches!(session.indicator(), SaveIndicator::Failed { .. }));

    other.conn().execute_batch("COMMIT").unwrap();
    let saved = session.save(at(14, 22)).unwrap();
    assert!(matches!(saved, SaveOutcome::Saved { hour: 14, .. }));
    assert!(!session.is_dirty());
}

#[test]
fn test_saving_an_untouched_hour_writes_nothing() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 20)).unwrap();

    assert_eq!(session.save(at(14, 21)).unwrap(), SaveOutcome::Unchanged);
    assert!(stored_value(session.store(), 14, "frequency_hz").is_none());
    assert!(session.hours_with_data().is_empty());
}

#[test]
fn test_hour_switch_refused_while_newer_edits_wait_on_a_save() {
    let mut store = memory_store();
    save_hour(&mut store, day(), 13, LogStream::Generator, "bob", &[]);
    let mut session = generator_session(store, alice());
    session.load(at(14, 20)).unwrap();
    session.set_field("active_power_mw", "6.0", at(14, 21)).unwrap();

    let pending = match session.begin_save(SaveMode::Auto, at(14, 21)).unwrap() {
        SaveStart::Ready(p) => p,
        other => panic!("expected a ready save, got {other:?}"),
    };
    session.set_field("frequency_hz", "50.1", at(14, 21)).unwrap();

    let err = session.select_hour(13, at(14, 21)).unwrap_err();
    assert!(matches!(err, AppError::SaveInProgress(14)), "got {err:?}");
    assert_eq!(session.selected_hour(), 14);

    let result = session.run_save(&pending, at(14, 21));
    session.complete_save(pending, result, at(14, 21)).unwrap();
    assert!(session.is_dirty());
    assert_eq!(session.autosave_due(), Some(at(14, 21)));

    session.tick(at(14, 21)).unwrap();
    assert!(!session.is_dirty());
    assert_eq!(
        stored_value(session.store(), 14, "frequency_hz"),
        Some(FieldValue::Number(50.1))
    );

    session.select_hour(13, at(14, 22)).unwrap();
    assert_eq!(session.selected_hour(), 13);
}

#[test]
fn test_rollover_during_a_save_keeps_the_newer_edits() {
    let mut session = generator_session(memory_store(), alice());
    session.load(at(14, 58)).unwrap();
    session.set_field("active_power_mw", "6.0", at(14, 58)).unwrap();

    let pending = match session.begin_save(SaveMode::Auto, at(14, 58)).unwrap() {
        SaveStart::Ready(p) => p,
        other => panic!("expected a ready save, got {other:?}"),
    };
    session.set_field("frequency_hz", "50.1", at(14, 59)).unwrap();

    session.tick(at(15, 0)).unwrap();
    assert_eq!(session.selected_hour(), 15);

    let result = session.run_save(&pending, at(15, 0));
    let err = session.complete_save(pending, result, at(15, 0)).unwrap_err();
    assert!(matches!(err, AppError::StaleWrite(14)));

    assert_eq!(
        stored_value(session.store(), 14, "active_power_mw"),
        Some(FieldValue::Number(6.0))
    );
    assert_eq!(
        stored_value(session.store(), 14, "frequency_hz"),
        Some(FieldValue::Number(50.1))
    );
}

/// Reports a duplicate key for the next `collisions` upserts.
struct CollidingStore {
    inner: SqliteStore,
    collisions: u32,
}

impl SlotStore for CollidingStore {
    fn list_slots(
        &self,
        kind: LogKind,
        date: NaiveDate,
        stream: Option<LogStream>,
    ) -> AppResult<Vec<HourSlot>> {
        self.inner.list_slots(kind, date, stream)
    }

    fn get_slot(&self, date: NaiveDate, hour: u32, stream: LogStream) -> AppResult<Option<HourSlot>> {
        self.inner.get_slot(date, hour, stream)
    }

    fn upsert_slot(
        &mut self,
        slot: &HourSlot,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UpsertOutcome> {
        if self.collisions > 0 {
            self.collisions -= 1;
            return Err(AppError::DuplicateKey(slot.key().to_string()));
        }
        self.inner.upsert_slot(slot, actor, now)
    }

    fn subscribe_day_changes(&self, date: NaiveDate, stream: LogStream) -> AppResult<ChangeFeed> {
        self.inner.subscribe_day_changes(date, stream)
    }

    fn poll_changes(&self, feed: &mut ChangeFeed) -> AppResult<Vec<ChangeEvent>> {
        self.inner.poll_changes(feed)
    }

    fn count_hours(&self, date: NaiveDate, stream: LogStream) -> AppResult<u32> {
        self.inner.count_hours(date, stream)
    }

    fn finalization(&self, date: NaiveDate, stream: LogStream) -> AppResult<Option<DayFinalization>> {
        self.inner.finalization(date, stream)
    }

    fn insert_finalization(
        &mut self,
        date: NaiveDate,
        stream: LogStream,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DayFinalization> {
        self.inner.insert_finalization(date, stream, actor, now)
    }
}

impl IssueStore for CollidingStore {
    fn create_issue(
        &mut self,
        issue: &NewIssue,
        reported_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue> {
        self.inner.create_issue(issue, reported_by, now)
    }

    fn get_issue(&self, code: &str) -> AppResult<Option<FlaggedIssue>> {
        self.inner.get_issue(code)
    }

    fn list_issues(&self, filter: &IssueFilter) -> AppResult<Vec<FlaggedIssue>> {
        self.inner.list_issues(filter)
    }

    fn set_issue_status(
        &mut self,
        code: &str,
        status: IssueStatus,
        now: DateTime<Utc>,
    ) -> AppResult<FlaggedIssue> {
        self.inner.set_issue_status(code, status, now)
    }
}

#[test]
fn test_duplicate_key_is_retried_once() {
    let store = CollidingStore {
        inner: memory_store(),
        collisions: 1,
    };
    let mut session = LogSession::new(store, alice(), LogStream::Generator, tz(), secs(2));
    session.load(at(14, 20)).unwrap();

    session.set_field("frequency_hz", "50.0", at(14, 21)).unwrap();
    let saved = session.save(at(14, 21)).unwrap();
    assert!(matches!(
        saved,
        SaveOutcome::Saved { hour: 14, change: ChangeType::Insert, .. }
    ));
    assert_eq!(session.store().collisions, 0);

    // a second collision in a row is surfaced
    session.store_mut().collisions = 2;
    session.set_field("frequency_hz", "49.9", at(14, 22)).unwrap();
    let err = session.save(at(14, 22)).unwrap_err();
    assert!(matches!(err, AppError::DuplicateKey(_)), "got {err:?}");
    assert_eq!(session.store().collisions, 0);
    assert!(session.is_dirty());
    assert_eq!(
        stored_value(session.store(), 14, "frequency_hz"),
        Some(FieldValue::Number(50.0))
    );
}
