use hydrolog::core::gate::CategoryState;
use hydrolog::db::log::load_log;
use hydrolog::errors::AppError;
use hydrolog::models::actor::{Actor, Role};
use hydrolog::models::checklist::UnlockSource;
use hydrolog::store::ChecklistStore;
use serde_json::json;

mod common;
use common::{at, day, gate, memory_store, open_store, qr, setup_test_db};

fn alice() -> Actor {
    Actor::operator("alice")
}

#[test]
fn test_modules_start_locked() {
    let mut g = gate(memory_store(), alice());
    g.refresh(at(8, 0)).unwrap();
    assert_eq!(g.state(1), CategoryState::Locked);

    let err = g.complete(1, &json!({"ok": true}), at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::CategoryLocked(1)));

    let err = g.scan_qr(1, "HPP-CHK-02-SWITCHYARD", at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::InvalidQrCode(1)));
    assert_eq!(g.state(1), CategoryState::Locked);

    let err = g.scan_qr(9, "anything", at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue(_)));
}

#[test]
fn test_scan_and_complete_inside_the_window() {
    let mut g = gate(memory_store(), alice());

    let state = g.scan_qr(1, &qr(1), at(8, 0)).unwrap();
    assert_eq!(state, CategoryState::Unlocked { source: UnlockSource::Qr });

    let record = g.complete(1, &json!({"turbine_noise": "normal"}), at(8, 5)).unwrap();
    assert_eq!(record.completion_pct, 25);
    assert_eq!(record.modules.get(&1), Some(&json!({"turbine_noise": "normal"})));
    assert!(record.contributors[&1].contains("alice"));
    assert_eq!(
        g.state(1),
        CategoryState::Completed {
            by: "alice".into(),
            source: UnlockSource::Qr
        }
    );

    let again = g.scan_qr(1, &qr(1), at(8, 6)).unwrap_err();
    assert!(matches!(again, AppError::AlreadyCompleted(1)));

    let completions = g.store().completions(day(), Some(1)).unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].session, 1);
    assert!(completions[0].emergency_reason.is_none());
}

#[test]
fn test_scan_outside_a_window_names_the_next_session() {
    let mut g = gate(memory_store(), alice());
    let err = g.scan_qr(1, &qr(1), at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::SessionClosed(_)));
    let msg = err.to_string();
    assert!(msg.contains("session 2"), "{msg}");
    assert!(msg.contains("11:30-12:30"), "{msg}");
}

#[test]
fn test_emergency_override_is_one_shot() {
    let mut g = gate(memory_store(), alice());
    g.arm_emergency("turbine vibration alarm", at(9, 0)).unwrap();
    assert!(g.emergency().is_some());

    let state = g.scan_qr(1, &qr(1), at(9, 1)).unwrap();
    assert_eq!(
        state,
        CategoryState::Unlocked {
            source: UnlockSource::Emergency
        }
    );
    assert!(g.emergency().is_none(), "override consumed by the unlock");

    // emergency unlocks survive outside any window on the same day
    g.complete(1, &json!({}), at(10, 0)).unwrap();
    let completions = g.store().completions(day(), None).unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].unlock_source, UnlockSource::Emergency);
    assert_eq!(
        completions[0].emergency_reason.as_deref(),
        Some("turbine vibration alarm")
    );

    let err = g.scan_qr(2, &qr(2), at(10, 1)).unwrap_err();
    assert!(matches!(err, AppError::SessionClosed(_)));
}

#[test]
fn test_emergency_needs_a_reason() {
    let mut g = gate(memory_store(), alice());
    let err = g.arm_emergency("   ", at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue(_)));
    assert!(g.emergency().is_none());
}

#[test]
fn test_override_not_spent_inside_a_window() {
    let mut g = gate(memory_store(), alice());
    g.arm_emergency("routine", at(7, 50)).unwrap();

    let state = g.scan_qr(1, &qr(1), at(8, 0)).unwrap();
    assert_eq!(state, CategoryState::Unlocked { source: UnlockSource::Qr });
    assert!(g.emergency().is_some());
}

#[test]
fn test_qr_unlock_expires_with_the_window() {
    let mut g = gate(memory_store(), alice());
    g.scan_qr(1, &qr(1), at(8, 10)).unwrap();

    let err = g.complete(1, &json!({}), at(8, 40)).unwrap_err();
    assert!(matches!(err, AppError::CategoryLocked(1)));
}

#[test]
fn test_session_complete_after_all_modules() {
    let mut g = gate(memory_store(), alice());
    let mut last = None;
    for m in 1..=4 {
        g.scan_qr(m, &qr(m), at(12, 0)).unwrap();
        last = Some(g.complete(m, &json!({"module": m}), at(12, 5)).unwrap());
    }

    assert_eq!(last.unwrap().completion_pct, 100);
    assert!(g.session_complete(day(), 2).unwrap());
    assert!(!g.session_complete(day(), 1).unwrap());

    let overview = g.overview(at(12, 10)).unwrap();
    assert_eq!(overview.working_session, 2);
    assert!(overview.session_complete);
    assert!(overview
        .modules
        .iter()
        .all(|m| matches!(m.state, CategoryState::Completed { .. })));
}

#[test]
fn test_module_completed_once_per_session() {
    let mut g = gate(memory_store(), alice());
    g.scan_qr(2, &qr(2), at(8, 0)).unwrap();
    g.complete(2, &json!({}), at(8, 1)).unwrap();

    // next session: the same module can be done again
    g.scan_qr(2, &qr(2), at(16, 0)).unwrap();
    let record = g.complete(2, &json!({"round": 3}), at(16, 5)).unwrap();
    assert_eq!(record.modules[&2], json!({"round": 3}));
    assert_eq!(g.store().completions(day(), None).unwrap().len(), 2);
}

#[test]
fn test_viewer_cannot_touch_the_checklist() {
    let mut g = gate(memory_store(), Actor::new("vic", Role::Viewer));
    let err = g.scan_qr(1, &qr(1), at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
    let err = g.arm_emergency("flood", at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
    let err = g.submit(at(8, 0)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[test]
fn test_submit_happens_exactly_once() {
    let db = setup_test_db("gate_submit_once");
    let mut a = gate(open_store(&db), alice());
    let mut b = gate(open_store(&db), Actor::operator("bob"));

    a.scan_qr(1, &qr(1), at(8, 0)).unwrap();
    a.complete(1, &json!({}), at(8, 1)).unwrap();

    let first = a.submit(at(8, 10));
    let second = b.submit(at(8, 10));

    let record = first.unwrap();
    assert!(record.submitted);
    assert_eq!(record.submitted_by.as_deref(), Some("alice"));
    assert_eq!(record.completion_pct, 25, "submission does not require completion");
    assert!(matches!(second.unwrap_err(), AppError::AlreadySubmitted(_)));

    let rows = load_log(a.store().conn(), Some("checklist_submit")).unwrap();
    assert_eq!(rows.len(), 1);

    // the record is read-only from now on
    b.scan_qr(2, &qr(2), at(8, 15)).unwrap();
    let err = b.complete(2, &json!({}), at(8, 16)).unwrap_err();
    assert!(matches!(err, AppError::AlreadySubmitted(_)), "got {err:?}");
}

#[test]
fn test_completion_by_one_operator_is_seen_by_another() {
    let db = setup_test_db("gate_shared_completion");
    let mut a = gate(open_store(&db), alice());
    let mut b = gate(open_store(&db), Actor::operator("bob"));

    a.scan_qr(3, &qr(3), at(20, 0)).unwrap();
    a.complete(3, &json!({"spillway": "closed"}), at(20, 2)).unwrap();

    let err = b.scan_qr(3, &qr(3), at(20, 5)).unwrap_err();
    assert!(matches!(err, AppError::AlreadyCompleted(3)));

    b.refresh(at(20, 5)).unwrap();
    assert_eq!(
        b.state(3),
        CategoryState::Completed {
            by: "alice".into(),
            source: UnlockSource::Qr
        }
    );
}
