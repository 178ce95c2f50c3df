use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Calendar date of `now` in the operational time zone.
pub fn today(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Compact form used inside issue codes (YYYYMMDD).
pub fn compact(d: &NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}
