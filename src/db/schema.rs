//! DDL built from the measurement catalogue.
//!
//! Every numeric field gets a named `ck_<field>` constraint so that a failed
//! check can be reported back to the operator by field name.

use crate::models::field::{FieldKind, FieldSpec, catalogue};
use crate::models::stream::LogKind;

/// Prefix of the per-field check constraints.
pub const CHECK_PREFIX: &str = "ck_";

/// Message raised by the freeze triggers on finalized days.
pub const FINALIZED_MESSAGE: &str = "day finalized";

/// Message raised when a submitted checklist day is written.
pub const SUBMITTED_MESSAGE: &str = "checklist submitted";

fn sql_number(v: f64) -> String {
    format!("{v}")
}

pub fn column_ddl(field: &FieldSpec) -> String {
    let name = field.key;
    match field.kind {
        FieldKind::Numeric(range) => format!(
            "{name} REAL NOT NULL DEFAULT 0 CONSTRAINT {CHECK_PREFIX}{name} CHECK ({name} = 0 OR {name} BETWEEN {} AND {})",
            sql_number(range.min),
            sql_number(range.max)
        ),
        FieldKind::Choice(options) => {
            let list = std::iter::once("''".to_string())
                .chain(options.iter().map(|o| format!("'{o}'")))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{name} TEXT NOT NULL DEFAULT '' CONSTRAINT {CHECK_PREFIX}{name} CHECK ({name} IN ({list}))"
            )
        }
    }
}

/// Column holding the stream number, if the table has one.
pub fn stream_column(kind: LogKind) -> Option<&'static str> {
    match kind {
        LogKind::Generator => None,
        LogKind::Transformer => Some("transformer_number"),
    }
}

pub fn create_slot_table(kind: LogKind) -> String {
    let table = kind.table();
    let fields = catalogue(kind)
        .iter()
        .map(|f| format!("            {},", column_ddl(f)))
        .collect::<Vec<_>>()
        .join("\n");

    let (stream_col, unique) = match stream_column(kind) {
        Some(col) => (
            format!("            {col} INTEGER NOT NULL CHECK({col} >= 1),\n"),
            format!("UNIQUE({col}, date, hour)"),
        ),
        None => (String::new(), "UNIQUE(date, hour)".to_string()),
    };

    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
{stream_col}            date        TEXT NOT NULL,
            hour        INTEGER NOT NULL CHECK(hour BETWEEN 0 AND 23),
{fields}
            remark      TEXT NOT NULL DEFAULT '',
            logged_by   TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            {unique}
        );

        CREATE INDEX IF NOT EXISTS idx_{table}_date ON {table}(date, hour);
        "#
    )
}

/// Triggers refusing inserts/updates of slots on a finalized day.
pub fn create_freeze_triggers(kind: LogKind) -> String {
    let table = kind.table();
    let kind_str = kind.as_str();
    let stream_expr = match stream_column(kind) {
        Some(col) => format!("NEW.{col}"),
        None => "0".to_string(),
    };

    let mut out = String::new();
    for op in ["INSERT", "UPDATE"] {
        let op_lower = op.to_lowercase();
        out.push_str(&format!(
            r#"
        CREATE TRIGGER IF NOT EXISTS trg_{table}_frozen_{op_lower}
        BEFORE {op} ON {table}
        WHEN EXISTS (
            SELECT 1 FROM day_finalizations
            WHERE log_kind = '{kind_str}' AND stream = {stream_expr} AND date = NEW.date
        )
        BEGIN
            SELECT RAISE(ABORT, '{FINALIZED_MESSAGE}');
        END;
        "#
        ));
    }
    out
}

pub const CREATE_SLOT_EDITS: &str = r#"
        CREATE TABLE IF NOT EXISTS slot_edits (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            log_kind    TEXT NOT NULL CHECK(log_kind IN ('generator','transformer')),
            stream      INTEGER NOT NULL DEFAULT 0,
            date        TEXT NOT NULL,
            hour        INTEGER NOT NULL,
            slot_id     INTEGER NOT NULL,
            change_type TEXT NOT NULL CHECK(change_type IN ('insert','update')),
            actor       TEXT NOT NULL,
            at          TEXT NOT NULL,
            snapshot    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_slot_edits_day ON slot_edits(log_kind, stream, date, id);
"#;

pub const CREATE_DAY_FINALIZATIONS: &str = r#"
        CREATE TABLE IF NOT EXISTS day_finalizations (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            log_kind     TEXT NOT NULL CHECK(log_kind IN ('generator','transformer')),
            stream       INTEGER NOT NULL DEFAULT 0,
            date         TEXT NOT NULL,
            finalized_by TEXT NOT NULL,
            finalized_at TEXT NOT NULL,
            UNIQUE(log_kind, stream, date)
        );
"#;

pub fn create_checklist_tables() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS checklist_days (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            date           TEXT NOT NULL UNIQUE,
            module_1       TEXT,
            module_2       TEXT,
            module_3       TEXT,
            module_4       TEXT,
            completion_pct INTEGER NOT NULL DEFAULT 0 CHECK(completion_pct BETWEEN 0 AND 100),
            submitted      INTEGER NOT NULL DEFAULT 0 CHECK(submitted IN (0,1)),
            submitted_at   TEXT,
            submitted_by   TEXT,
            contributors   TEXT NOT NULL DEFAULT '{{}}',
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TRIGGER IF NOT EXISTS trg_checklist_days_submitted
        BEFORE UPDATE ON checklist_days
        WHEN OLD.submitted = 1
        BEGIN
            SELECT RAISE(ABORT, '{SUBMITTED_MESSAGE}');
        END;

        CREATE TABLE IF NOT EXISTS checklist_completions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            date             TEXT NOT NULL,
            session          INTEGER NOT NULL CHECK(session BETWEEN 1 AND 4),
            module           INTEGER NOT NULL CHECK(module BETWEEN 1 AND 4),
            completed_by     TEXT NOT NULL,
            completed_at     TEXT NOT NULL,
            unlock_source    TEXT NOT NULL CHECK(unlock_source IN ('qr','emergency')),
            emergency_reason TEXT,
            UNIQUE(date, session, module)
        );

        CREATE INDEX IF NOT EXISTS idx_checklist_completions_day
            ON checklist_completions(date, session);
        "#
    )
}

pub const CREATE_ISSUES: &str = r#"
        CREATE TABLE IF NOT EXISTS issues (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            code           TEXT NOT NULL UNIQUE,
            checklist_date TEXT REFERENCES checklist_days(date),
            slot_kind      TEXT CHECK(slot_kind IN ('generator','transformer')),
            slot_id        INTEGER,
            module         TEXT NOT NULL,
            section        TEXT NOT NULL DEFAULT '',
            item           TEXT NOT NULL DEFAULT '',
            unit           TEXT,
            severity       TEXT NOT NULL CHECK(severity IN ('low','medium','high','critical')),
            description    TEXT NOT NULL,
            status         TEXT NOT NULL DEFAULT 'reported'
                           CHECK(status IN ('reported','in_progress','resolved')),
            reported_by    TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            CHECK ((checklist_date IS NULL) <> (slot_id IS NULL)),
            CHECK ((slot_id IS NULL) = (slot_kind IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status, severity);
"#;
