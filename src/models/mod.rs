pub mod actor;
pub mod checklist;
pub mod field;
pub mod hour_slot;
pub mod issue;
pub mod stream;
