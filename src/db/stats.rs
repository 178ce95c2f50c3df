use crate::db::pool::DbPool;
use crate::models::stream::LogKind;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

fn count(pool: &DbPool, sql: &str) -> rusqlite::Result<i64> {
    pool.conn.query_row(sql, [], |row| row.get(0))
}

pub fn print_db_info(pool: &DbPool, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) HOUR SLOTS PER LOG
    //
    for kind in [LogKind::Generator, LogKind::Transformer] {
        let table = kind.table();
        let slots = count(pool, &format!("SELECT COUNT(*) FROM {table}"))?;
        let days = count(pool, &format!("SELECT COUNT(DISTINCT date) FROM {table}"))?;

        let first: Option<String> = pool
            .conn
            .query_row(&format!("SELECT MIN(date) FROM {table}"), [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();
        let last: Option<String> = pool
            .conn
            .query_row(&format!("SELECT MAX(date) FROM {table}"), [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        println!(
            "{}• {} slots:{} {}{}{} over {} day(s)",
            CYAN,
            kind.as_str(),
            RESET,
            GREEN,
            slots,
            RESET,
            days
        );
        println!(
            "    from: {}",
            first.unwrap_or_else(|| format!("{GREY}--{RESET}"))
        );
        println!(
            "    to:   {}",
            last.unwrap_or_else(|| format!("{GREY}--{RESET}"))
        );
    }

    //
    // 3) FINALIZED DAYS / EDITS
    //
    let finalized = count(pool, "SELECT COUNT(*) FROM day_finalizations")?;
    let edits = count(pool, "SELECT COUNT(*) FROM slot_edits")?;
    println!("{}• Finalized days:{} {}", CYAN, RESET, finalized);
    println!("{}• Recorded edits:{} {}", CYAN, RESET, edits);

    //
    // 4) CHECKLISTS
    //
    let checklist_days = count(pool, "SELECT COUNT(*) FROM checklist_days")?;
    let submitted = count(
        pool,
        "SELECT COUNT(*) FROM checklist_days WHERE submitted = 1",
    )?;
    println!(
        "{}• Checklist days:{} {} ({} submitted)",
        CYAN, RESET, checklist_days, submitted
    );

    //
    // 5) OPEN ISSUES
    //
    let open = count(pool, "SELECT COUNT(*) FROM issues WHERE status <> 'resolved'")?;
    let total = count(pool, "SELECT COUNT(*) FROM issues")?;
    println!(
        "{}• Issues:{} {}{}{} open / {} total",
        CYAN, RESET, YELLOW, open, RESET, total
    );

    println!();
    Ok(())
}
