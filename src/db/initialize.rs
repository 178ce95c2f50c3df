use crate::db::migrate::run_pending_migrations;
use crate::errors::{AppError, AppResult};
use crate::models::field::catalogue;
use crate::models::stream::LogKind;
use rusqlite::Connection;
use std::collections::HashSet;

/// Bring the schema up to date and check that every slot table carries a
/// column for each field of its catalogue.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    run_pending_migrations(conn)?;

    for kind in [LogKind::Generator, LogKind::Transformer] {
        let columns = table_columns(conn, kind.table())?;
        if let Some(missing) = catalogue(kind)
            .iter()
            .find(|f| !columns.contains(f.key))
        {
            return Err(AppError::Migration(format!(
                "table {} has no column for field '{}'",
                kind.table(),
                missing.key
            )));
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> AppResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut out = HashSet::new();
    for n in names {
        out.insert(n?);
    }
    Ok(out)
}
