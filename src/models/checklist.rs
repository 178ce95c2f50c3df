use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Number of inspection modules carried by every checklist day.
pub const CHECKLIST_MODULES: u8 = 4;

/// Inspection module definition (name and the QR code posted at the equipment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistModule {
    pub number: u8,
    pub name: String,
    pub qr_code: String,
}

/// Collective checklist record for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistDay {
    pub date: NaiveDate,
    /// Module number → latest form data, absent until the module is first saved.
    pub modules: BTreeMap<u8, Value>,
    pub completion_pct: u8,
    pub submitted: bool,
    pub submitted_at: Option<String>,
    pub submitted_by: Option<String>,
    /// Module number → everyone who touched it.
    pub contributors: BTreeMap<u8, BTreeSet<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChecklistDay {
    pub fn completion_for(modules_filled: usize) -> u8 {
        let pct = modules_filled * 100 / CHECKLIST_MODULES as usize;
        pct.min(100) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockSource {
    Qr,
    Emergency,
}

impl UnlockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockSource::Qr => "qr",
            UnlockSource::Emergency => "emergency",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "qr" => Some(UnlockSource::Qr),
            "emergency" => Some(UnlockSource::Emergency),
            _ => None,
        }
    }
}

/// Persisted fact: module M was completed in session S of a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistCompletion {
    pub date: NaiveDate,
    pub session: u8,
    pub module: u8,
    pub completed_by: String,
    pub completed_at: String,
    pub unlock_source: UnlockSource,
    pub emergency_reason: Option<String>,
}
