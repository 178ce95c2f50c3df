//! Mapping of SQLite failures onto the engine's error taxonomy.

use crate::db::schema::{CHECK_PREFIX, FINALIZED_MESSAGE, SUBMITTED_MESSAGE};
use crate::errors::{AppError, FieldViolation};
use regex::Regex;
use rusqlite::ErrorCode;
use std::sync::OnceLock;

fn check_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"CHECK constraint failed: {CHECK_PREFIX}([A-Za-z0-9_]+)"))
            .expect("valid constraint pattern")
    })
}

/// Translate a store error, leaving non-database errors untouched.
///
/// `context` names the record being written (used for DuplicateKey).
pub fn translate(err: AppError, context: &str) -> AppError {
    match err {
        AppError::Db(e) => translate_sqlite(e, context),
        other => other,
    }
}

fn translate_sqlite(err: rusqlite::Error, context: &str) -> AppError {
    let (code, message) = match &err {
        rusqlite::Error::SqliteFailure(f, msg) => (f.code, msg.clone().unwrap_or_default()),
        _ => return AppError::Db(err),
    };

    match code {
        ErrorCode::ConstraintViolation => {
            if message.contains(FINALIZED_MESSAGE) {
                return AppError::DayFinalized(context.to_string());
            }
            if message.contains(SUBMITTED_MESSAGE) {
                return AppError::AlreadySubmitted(context.to_string());
            }
            if message.starts_with("UNIQUE constraint failed") {
                return AppError::DuplicateKey(context.to_string());
            }
            if let Some(caps) = check_pattern().captures(&message) {
                return AppError::RangeViolation(vec![FieldViolation {
                    field: caps[1].to_string(),
                    value: None,
                    min: None,
                    max: None,
                }]);
            }
            AppError::Db(err)
        }
        ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::CannotOpen
        | ErrorCode::SystemIoFailure => {
            if message.is_empty() {
                AppError::NetworkFailure(err.to_string())
            } else {
                AppError::NetworkFailure(message)
            }
        }
        _ => AppError::Db(err),
    }
}
