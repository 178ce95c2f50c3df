//! Range classification of measurements.
//!
//! Pure functions only. Classification feeds the colour of a field, the
//! local pre-save check and the pre-filled severity/description offered when
//! an operator flags a field. It never creates issues by itself.

use crate::errors::FieldViolation;
use crate::models::field::{FieldKind, FieldSpec, FieldValue, ValueRange, catalogue};
use crate::models::hour_slot::HourSlot;
use crate::models::issue::{IssueLocation, Severity};
use serde::Serialize;
use std::fmt;

/// Unset sentinel: an untouched numeric field reads as zero and is never validated.
pub const UNSET: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Normal,
    Warning,
    Danger,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Normal => "normal",
            Status::Warning => "warning",
            Status::Danger => "danger",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub status: Status,
    pub message: Option<String>,
}

impl Classification {
    fn normal() -> Self {
        Self {
            status: Status::Normal,
            message: None,
        }
    }
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

pub fn classify(value: f64, range: &ValueRange) -> Classification {
    if value == UNSET {
        return Classification::normal();
    }

    if value < range.min || value > range.max {
        return Classification {
            status: Status::Danger,
            message: Some(format!(
                "outside safe limits {}..{}",
                fmt_num(range.min),
                fmt_num(range.max)
            )),
        };
    }

    if let Some((lo, hi)) = range.ideal
        && (value < lo || value > hi)
    {
        return Classification {
            status: Status::Warning,
            message: Some(format!("outside ideal band {}..{}", fmt_num(lo), fmt_num(hi))),
        };
    }

    Classification::normal()
}

/// Enumerated fields are always normal.
pub fn classify_field(spec: &FieldSpec, value: &FieldValue) -> Classification {
    match (&spec.kind, value.as_number()) {
        (FieldKind::Numeric(range), Some(v)) => classify(v, range),
        _ => Classification::normal(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCheck {
    pub field: &'static str,
    pub value: f64,
    pub classification: Classification,
}

/// Classification of every numeric field of a slot, in catalogue order.
pub fn classify_slot(slot: &HourSlot) -> Vec<FieldCheck> {
    catalogue(slot.stream.kind())
        .iter()
        .filter_map(|spec| {
            let range = spec.range()?;
            let value = slot.get(spec.key).and_then(FieldValue::as_number).unwrap_or(UNSET);
            Some(FieldCheck {
                field: spec.key,
                value,
                classification: classify(value, range),
            })
        })
        .collect()
}

/// Fields outside their hard bounds; a non-empty list blocks the save locally.
pub fn hard_violations(slot: &HourSlot) -> Vec<FieldViolation> {
    catalogue(slot.stream.kind())
        .iter()
        .filter_map(|spec| {
            let range = spec.range()?;
            let value = slot.get(spec.key).and_then(FieldValue::as_number)?;
            (classify(value, range).status == Status::Danger).then(|| FieldViolation {
                field: spec.key.to_string(),
                value: Some(value),
                min: Some(range.min),
                max: Some(range.max),
            })
        })
        .collect()
}

pub fn suggested_severity(status: Status) -> Severity {
    match status {
        Status::Danger => Severity::Critical,
        Status::Warning => Severity::High,
        Status::Normal => Severity::Medium,
    }
}

pub fn suggested_description(
    spec: &FieldSpec,
    value: &FieldValue,
    classification: &Classification,
) -> String {
    let reading = if spec.unit.is_empty() {
        value.to_string()
    } else {
        format!("{} {}", value, spec.unit)
    };

    match &classification.message {
        Some(msg) => format!("{} reading {} is {}", spec.label, reading, msg),
        None => format!("{} reading {} needs attention", spec.label, reading),
    }
}

/// Advisory values shown when an operator flags a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuePrefill {
    pub location: IssueLocation,
    pub severity: Severity,
    pub description: String,
    pub classification: Classification,
}

pub fn prefill(module: &str, spec: &FieldSpec, value: &FieldValue) -> IssuePrefill {
    let classification = classify_field(spec, value);

    IssuePrefill {
        location: IssueLocation {
            module: module.to_string(),
            section: spec.section.to_string(),
            item: spec.label.to_string(),
            unit: (!spec.unit.is_empty()).then(|| spec.unit.to_string()),
        },
        severity: suggested_severity(classification.status),
        description: suggested_description(spec, value, &classification),
        classification,
    }
}
