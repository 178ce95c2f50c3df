use crate::db::log::{LogEntry, load_log};
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use rusqlite::Connection;
use std::sync::OnceLock;

/// Visible width of the operation column.
const OP_WIDTH: usize = 60;

fn strip_ansi(s: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1B\[[0-9;]*[mK]").expect("valid ansi pattern"));
    re.replace_all(s, "").into_owned()
}

fn color_for_operation(op: &str) -> Colour {
    match op {
        "finalize" => Colour::Red,
        "slot_save" => Colour::RGB(120, 200, 255),
        "checklist_complete" => Colour::Green,
        "checklist_submit" => Colour::Cyan,
        "issue_create" => Colour::Yellow,
        "issue_status" => Colour::RGB(255, 153, 51),
        "migration_applied" => Colour::Purple,
        "backup" => Colour::Blue,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

fn truncate_visible(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn format_entry(e: &LogEntry, id_w: usize, date_w: usize) -> String {
    let date = chrono::DateTime::parse_from_rfc3339(&e.date)
        .map(|dt| dt.format("%FT%T%:z").to_string())
        .unwrap_or_else(|_| e.date.clone());

    let op_target = if e.target.is_empty() {
        e.operation.clone()
    } else {
        format!("{} ({})", e.operation, e.target)
    };
    let visible = truncate_visible(&op_target, OP_WIDTH);

    // Only the operation word is coloured.
    let color = color_for_operation(&e.operation);
    let colored = match visible.split_once(' ') {
        Some((op, rest)) => format!("{} {}", color.paint(op), rest),
        None => color.paint(visible.as_str()).to_string(),
    };
    let padding = " ".repeat(OP_WIDTH.saturating_sub(strip_ansi(&colored).chars().count()));

    format!(
        "{:>id_w$}: {:<date_w$} | {}{} => {}",
        e.id, date, colored, padding, e.message
    )
}

/// Print the internal audit log, optionally restricted to one operation.
pub fn print_log(conn: &Connection, operation: Option<&str>) -> AppResult<()> {
    let entries = load_log(conn, operation)?;
    if entries.is_empty() {
        println!("📜 Internal log is empty.");
        return Ok(());
    }

    let id_w = entries
        .iter()
        .map(|e| e.id.to_string().len())
        .max()
        .unwrap_or(1);
    let date_w = entries.iter().map(|e| e.date.len()).max().unwrap_or(10);

    println!("📜 Internal log:\n");
    for e in &entries {
        println!("{}", format_entry(e, id_w, date_w));
    }
    Ok(())
}
