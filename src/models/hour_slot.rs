use super::field::{FieldValue, catalogue};
use super::stream::LogStream;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One hour of measurements for one equipment stream on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    /// Store identity, assigned on first save.
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub hour: u32,
    pub stream: LogStream,
    pub values: BTreeMap<String, FieldValue>,
    pub remark: String,
    pub logged_by: String,
    pub updated_at: String,
}

impl HourSlot {
    /// An unsaved slot with every field at its unset default.
    pub fn blank(date: NaiveDate, hour: u32, stream: LogStream) -> Self {
        let values = catalogue(stream.kind())
            .iter()
            .map(|f| (f.key.to_string(), f.default_value()))
            .collect();

        Self {
            id: None,
            date,
            hour,
            stream,
            values,
            remark: String::new(),
            logged_by: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            hour: self.hour,
            stream: self.stream,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Number of fields that hold something other than the unset default.
    pub fn filled_count(&self) -> usize {
        self.values.values().filter(|v| !v.is_unset()).count()
    }

    /// True when two slots carry the same operator-entered content.
    pub fn same_content(&self, other: &HourSlot) -> bool {
        self.values == other.values && self.remark == other.remark
    }
}

/// Natural composite key of an hour slot: never the record owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub hour: u32,
    pub stream: LogStream,
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {:02}:00", self.stream, self.date, self.hour)
    }
}

/// Administrative freeze of a full day of one stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayFinalization {
    pub date: NaiveDate,
    pub stream: LogStream,
    pub finalized_by: String,
    pub finalized_at: String,
}
