/// ANSI color helper utilities for terminal output.
use crate::core::validation::Status;
use crate::models::issue::{IssueStatus, Severity};

pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

pub fn color_for_status(status: Status) -> &'static str {
    match status {
        Status::Normal => RESET,
        Status::Warning => YELLOW,
        Status::Danger => RED,
    }
}

pub fn color_for_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => GREY,
        Severity::Medium => BLUE,
        Severity::High => YELLOW,
        Severity::Critical => RED,
    }
}

pub fn color_for_issue_status(status: IssueStatus) -> &'static str {
    match status {
        IssueStatus::Reported => MAGENTA,
        IssueStatus::InProgress => YELLOW,
        IssueStatus::Resolved => GREEN,
    }
}

/// Grey out unset values ("0", "" or "--").
pub fn colorize_optional(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() || v == "--" || v == "0" {
        format!("{GREY}{}{RESET}", if v.is_empty() { "--" } else { v })
    } else {
        value.to_string()
    }
}
