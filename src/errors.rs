//! Unified application error type.
//! Every layer (store, engine, cli) returns AppError so that a manual save,
//! an autosave and a CLI command all see the same taxonomy.

use std::fmt;
use std::io;
use thiserror::Error;

/// One measurement that fell outside its hard bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub value: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value, self.min, self.max) {
            (Some(v), Some(lo), Some(hi)) => {
                write!(f, "{} = {} (allowed {}..{})", self.field, v, lo, hi)
            }
            (Some(v), _, _) => write!(f, "{} = {}", self.field, v),
            _ => write!(f, "{}", self.field),
        }
    }
}

fn join_violations(list: &[FieldViolation]) -> String {
    list.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO / foreign errors
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Store taxonomy
    // ---------------------------
    #[error("Value out of range: {}", join_violations(.0))]
    RangeViolation(Vec<FieldViolation>),

    #[error("Duplicate key for {0}")]
    DuplicateKey(String),

    #[error("Save for hour {0:02}:00 completed after the selection moved on")]
    StaleWrite(u32),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Checklist for {0} has already been submitted")]
    AlreadySubmitted(String),

    #[error("Store unreachable: {0}")]
    NetworkFailure(String),

    #[error("Hour {0:02}:00 is still being saved; retry once the save completes")]
    SaveInProgress(u32),

    // ---------------------------
    // Engine logic
    // ---------------------------
    #[error("Hour {hour:02}:00 is locked: {reason}")]
    HourLocked { hour: u32, reason: String },

    #[error("Day {0} is finalized and can no longer be edited")]
    DayFinalized(String),

    #[error("Cannot finalize: {present} of {required} hours logged ({} missing)", .required - .present)]
    IncompleteDay { present: u32, required: u32 },

    #[error("No checklist session is open right now (next: {0})")]
    SessionClosed(String),

    #[error("Module {0} is locked for this session: scan its QR code first")]
    CategoryLocked(u8),

    #[error("QR code does not match module {0}")]
    InvalidQrCode(u8),

    #[error("Module {0} was already completed in this session")]
    AlreadyCompleted(u8),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("An issue must reference either a checklist day or an hour slot")]
    MissingIssueTarget,

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid hour: {0} (expected 0..23)")]
    InvalidHour(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid session schedule: {0}")]
    InvalidSchedule(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Errors that are resolved automatically and never shown to the operator.
    pub fn is_silent(&self) -> bool {
        matches!(self, AppError::StaleWrite(_) | AppError::DuplicateKey(_))
    }

    /// Errors that leave the local draft untouched so the operator can retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::NetworkFailure(_) | AppError::SaveInProgress(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
