use super::stream::LogKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum IssueStatus {
    Reported,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "reported" => Some(IssueStatus::Reported),
            "in_progress" => Some(IssueStatus::InProgress),
            "resolved" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }

    /// Status only moves forward: reported → in_progress → resolved.
    /// Skipping straight to resolved is allowed.
    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Reported, IssueStatus::InProgress)
                | (IssueStatus::Reported, IssueStatus::Resolved)
                | (IssueStatus::InProgress, IssueStatus::Resolved)
        )
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a flagged issue points at. Exactly one target per issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueTarget {
    ChecklistDay { date: NaiveDate },
    HourSlot { kind: LogKind, slot_id: i64 },
}

/// Location of an issue inside the plant forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssueLocation {
    pub module: String,
    pub section: String,
    pub item: String,
    pub unit: Option<String>,
}

/// Issue about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub target: Option<IssueTarget>,
    pub location: IssueLocation,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedIssue {
    pub code: String,
    pub target: IssueTarget,
    #[serde(flatten)]
    pub location: IssueLocation,
    pub severity: Severity,
    pub description: String,
    pub status: IssueStatus,
    pub reported_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Issue raised against an hour that has no stored slot yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingIssue {
    pub kind: LogKind,
    pub date: NaiveDate,
    pub hour: u32,
    pub location: IssueLocation,
    pub severity: Severity,
    pub description: String,
    pub raised_by: String,
}

impl PendingIssue {
    pub fn into_new_issue(self, slot_id: i64) -> NewIssue {
        NewIssue {
            target: Some(IssueTarget::HourSlot {
                kind: self.kind,
                slot_id,
            }),
            location: self.location,
            severity: self.severity,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub severity: Option<Severity>,
    pub module: Option<String>,
    pub date: Option<NaiveDate>,
    pub limit: Option<usize>,
}
