//! Flagged issues: creation, listing and forward-only status changes.

use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::issue::{
    FlaggedIssue, IssueFilter, IssueLocation, IssueStatus, IssueTarget, NewIssue, Severity,
};
use crate::store::IssueStore;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

/// Issue against a checklist day.
pub fn checklist_issue(
    date: NaiveDate,
    location: IssueLocation,
    severity: Severity,
    description: &str,
) -> NewIssue {
    NewIssue {
        target: Some(IssueTarget::ChecklistDay { date }),
        location,
        severity,
        description: description.trim().to_string(),
    }
}

pub fn raise<S: IssueStore>(
    store: &mut S,
    actor: &Actor,
    issue: &NewIssue,
    now: DateTime<Utc>,
) -> AppResult<FlaggedIssue> {
    if !actor.role.can_write_logs() {
        return Err(AppError::PermissionDenied(format!(
            "{} ({}) cannot flag issues",
            actor.name,
            actor.role.as_str()
        )));
    }
    if issue.target.is_none() {
        return Err(AppError::MissingIssueTarget);
    }
    if issue.location.module.trim().is_empty() {
        return Err(AppError::InvalidValue("issue module must not be empty".into()));
    }
    if issue.description.trim().is_empty() {
        return Err(AppError::InvalidValue(
            "issue description must not be empty".into(),
        ));
    }

    let created = store.create_issue(issue, &actor.name, now)?;
    info!(code = %created.code, severity = created.severity.as_str(), "issue flagged");
    Ok(created)
}

pub fn list<S: IssueStore>(store: &S, filter: &IssueFilter) -> AppResult<Vec<FlaggedIssue>> {
    store.list_issues(filter)
}

/// Move an issue forward (reported → in_progress → resolved).
pub fn advance<S: IssueStore>(
    store: &mut S,
    actor: &Actor,
    code: &str,
    status: IssueStatus,
    now: DateTime<Utc>,
) -> AppResult<FlaggedIssue> {
    if !actor.role.can_write_logs() {
        return Err(AppError::PermissionDenied(format!(
            "{} ({}) cannot change issue status",
            actor.name,
            actor.role.as_str()
        )));
    }

    let issue = store
        .get_issue(code)?
        .ok_or_else(|| AppError::IssueNotFound(code.to_string()))?;

    if !issue.status.can_transition_to(status) {
        return Err(AppError::InvalidTransition(format!(
            "{code}: {} -> {status}",
            issue.status
        )));
    }

    store.set_issue_status(code, status, now)
}
