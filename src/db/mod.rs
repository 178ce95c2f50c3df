pub mod checklist;
pub mod initialize;
pub mod issues;
pub mod log;
pub mod migrate;
pub mod pool;
pub mod schema;
pub mod slots;
pub mod stats;
