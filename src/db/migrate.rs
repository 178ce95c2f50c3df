use crate::db::schema;
use crate::errors::{AppError, AppResult};
use crate::models::stream::LogKind;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

/// Ensure that the `log` table exists: it also records applied migrations.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: fn() -> String,
}

fn slot_tables() -> String {
    [LogKind::Generator, LogKind::Transformer]
        .iter()
        .map(|k| schema::create_slot_table(*k))
        .collect()
}

fn finalizations() -> String {
    let mut sql = schema::CREATE_DAY_FINALIZATIONS.to_string();
    for kind in [LogKind::Generator, LogKind::Transformer] {
        sql.push_str(&schema::create_freeze_triggers(kind));
    }
    sql
}

fn slot_edits() -> String {
    schema::CREATE_SLOT_EDITS.to_string()
}

fn issues() -> String {
    schema::CREATE_ISSUES.to_string()
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250901_0001_create_slot_tables",
        description: "Created generator_logs and transformer_logs",
        sql: slot_tables,
    },
    Migration {
        version: "20250901_0002_create_slot_edits",
        description: "Created append-only slot_edits change log",
        sql: slot_edits,
    },
    Migration {
        version: "20250901_0003_create_day_finalizations",
        description: "Created day_finalizations and freeze triggers",
        sql: finalizations,
    },
    Migration {
        version: "20250901_0004_create_checklists",
        description: "Created checklist_days and checklist_completions",
        sql: schema::create_checklist_tables,
    },
    Migration {
        version: "20250901_0005_create_issues",
        description: "Created issues",
        sql: issues,
    },
];

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    let batch = format!("BEGIN;\n{}\nCOMMIT;", (m.sql)());
    if let Err(e) = conn.execute_batch(&batch) {
        let _ = conn.execute_batch("ROLLBACK;");
        return Err(AppError::Migration(format!("{}: {}", m.version, e)));
    }

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [m.version, m.description],
    )?;
    Ok(())
}

/// Names of migrations not yet recorded in the `log` table.
pub fn pending_migrations(conn: &Connection) -> AppResult<Vec<&'static str>> {
    ensure_log_table(conn)?;
    let mut out = Vec::new();
    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            out.push(m.version);
        }
    }
    Ok(out)
}

/// Public entry point: run all pending migrations in order.
///
/// Invoked by db::initialize::init_db() and `hydrolog db --migrate`.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<usize> {
    ensure_log_table(conn)?;

    let mut applied = 0;
    for m in MIGRATIONS {
        if is_applied(conn, m.version)? {
            continue;
        }
        apply(conn, m)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "database migrations applied");
    }
    Ok(applied)
}
