use hydrolog::core::issues::{advance, checklist_issue, list, raise};
use hydrolog::errors::AppError;
use hydrolog::models::actor::{Actor, Role};
use hydrolog::models::issue::{
    IssueFilter, IssueLocation, IssueStatus, IssueTarget, NewIssue, Severity,
};
use hydrolog::store::ChecklistStore;

mod common;
use common::{at, day, memory_store};

fn location(module: &str) -> IssueLocation {
    IssueLocation {
        module: module.to_string(),
        section: "inspection".to_string(),
        item: "oil leak".to_string(),
        unit: None,
    }
}

fn alice() -> Actor {
    Actor::operator("alice")
}

#[test]
fn test_codes_are_sequential_per_day() {
    let mut store = memory_store();
    let a = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("powerhouse"), Severity::Medium, "drip under bearing"),
        at(9, 0),
    )
    .unwrap();
    let b = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("switchyard"), Severity::Critical, "arc marks"),
        at(9, 5),
    )
    .unwrap();

    assert_eq!(a.code, "ISS-20250610-001");
    assert_eq!(b.code, "ISS-20250610-002");
    assert_eq!(a.status, IssueStatus::Reported);
    assert_eq!(a.reported_by, "alice");
    assert_eq!(a.target, IssueTarget::ChecklistDay { date: day() });

    // the referenced checklist day exists now
    assert!(store.get_day(day()).unwrap().is_some());
}

#[test]
fn test_issue_needs_a_target_and_text() {
    let mut store = memory_store();
    let orphan = NewIssue {
        target: None,
        location: location("powerhouse"),
        severity: Severity::Low,
        description: "nothing to point at".into(),
    };
    let err = raise(&mut store, &alice(), &orphan, at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::MissingIssueTarget));

    let blank = checklist_issue(day(), location("powerhouse"), Severity::Low, "   ");
    let err = raise(&mut store, &alice(), &blank, at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue(_)));

    let nameless = checklist_issue(day(), location(""), Severity::Low, "leak");
    let err = raise(&mut store, &alice(), &nameless, at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::InvalidValue(_)));
}

#[test]
fn test_status_moves_forward_only() {
    let mut store = memory_store();
    let issue = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("intake"), Severity::High, "trash rack clogged"),
        at(9, 0),
    )
    .unwrap();

    let moved = advance(&mut store, &alice(), &issue.code, IssueStatus::InProgress, at(10, 0)).unwrap();
    assert_eq!(moved.status, IssueStatus::InProgress);

    let err = advance(&mut store, &alice(), &issue.code, IssueStatus::Reported, at(10, 5)).unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let done = advance(&mut store, &alice(), &issue.code, IssueStatus::Resolved, at(11, 0)).unwrap();
    assert_eq!(done.status, IssueStatus::Resolved);

    let err = advance(&mut store, &alice(), &issue.code, IssueStatus::InProgress, at(11, 5)).unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[test]
fn test_unknown_issue() {
    let mut store = memory_store();
    let err = advance(&mut store, &alice(), "ISS-20250610-999", IssueStatus::Resolved, at(9, 0))
        .unwrap_err();
    assert!(matches!(err, AppError::IssueNotFound(_)));
}

#[test]
fn test_list_filters() {
    let mut store = memory_store();
    for (module, sev) in [
        ("powerhouse", Severity::Low),
        ("switchyard", Severity::Critical),
        ("powerhouse", Severity::Critical),
    ] {
        raise(
            &mut store,
            &alice(),
            &checklist_issue(day(), location(module), sev, "check"),
            at(9, 0),
        )
        .unwrap();
    }

    let all = list(&store, &IssueFilter::default()).unwrap();
    assert_eq!(all.len(), 3);

    let critical = list(
        &store,
        &IssueFilter {
            severity: Some(Severity::Critical),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(critical.len(), 2);

    let filtered = list(
        &store,
        &IssueFilter {
            severity: Some(Severity::Critical),
            module: Some("powerhouse".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(filtered.len(), 1);

    let limited = list(
        &store,
        &IssueFilter {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(limited.len(), 2);

    let other_day = list(
        &store,
        &IssueFilter {
            date: day().succ_opt(),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(other_day.is_empty());
}

#[test]
fn test_viewer_cannot_flag_or_advance() {
    let mut store = memory_store();
    let viewer = Actor::new("vic", Role::Viewer);
    let issue = checklist_issue(day(), location("powerhouse"), Severity::Low, "leak");

    let err = raise(&mut store, &viewer, &issue, at(9, 0)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let created = raise(&mut store, &alice(), &issue, at(9, 0)).unwrap();
    let err = advance(&mut store, &viewer, &created.code, IssueStatus::Resolved, at(9, 1)).unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[test]
fn test_codes_keep_counting_past_999() {
    let mut store = memory_store();
    let first = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("intake"), Severity::Low, "gate seal weeping"),
        at(9, 0),
    )
    .unwrap();
    store
        .conn()
        .execute(
            "UPDATE issues SET code = 'ISS-20250610-999' WHERE code = ?1",
            [&first.code],
        )
        .unwrap();

    let next = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("intake"), Severity::Low, "trash rack"),
        at(9, 5),
    )
    .unwrap();
    assert_eq!(next.code, "ISS-20250610-1000");

    let after = raise(
        &mut store,
        &alice(),
        &checklist_issue(day(), location("intake"), Severity::Low, "stop log"),
        at(9, 10),
    )
    .unwrap();
    assert_eq!(after.code, "ISS-20250610-1001");
}
