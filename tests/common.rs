#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use hydrolog::config::Config;
use hydrolog::core::PlantContext;
use hydrolog::core::gate::ChecklistGate;
use hydrolog::core::session::LogSession;
use hydrolog::models::actor::Actor;
use hydrolog::models::field::FieldValue;
use hydrolog::models::hour_slot::HourSlot;
use hydrolog::models::stream::LogStream;
use hydrolog::store::{SlotStore, SqliteStore};
use hydrolog::utils::time::local_instant;
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn hyd() -> Command {
    cargo_bin_cmd!("hydrolog")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_hydrolog.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// Plant offset used by every test (+07:00).
pub fn tz() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).expect("valid offset")
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date")
}

/// Plant-local wall clock on the test day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    at_on(day(), hour, minute, 0)
}

pub fn at_on(date: NaiveDate, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    local_instant(tz(), date, hour, minute, second).expect("valid local instant")
}

/// RFC 3339 form of a plant-local instant, for `--at`.
pub fn at_arg(hour: u32, minute: u32) -> String {
    at(hour, minute).with_timezone(&tz()).to_rfc3339()
}

pub fn secs(n: i64) -> Duration {
    Duration::seconds(n)
}

pub fn memory_store() -> SqliteStore {
    SqliteStore::in_memory(tz()).expect("in-memory store")
}

pub fn open_store(path: &str) -> SqliteStore {
    SqliteStore::open(path, tz()).expect("open store")
}

/// Default plant: four anchors 08/12/16/20 ±30 min, two transformers.
pub fn context() -> PlantContext {
    let mut cfg = Config::with_database("unused.sqlite");
    cfg.utc_offset = "+07:00".to_string();
    PlantContext::from_config(&cfg).expect("default plant context")
}

pub fn generator_session(store: SqliteStore, actor: Actor) -> LogSession<SqliteStore> {
    LogSession::new(store, actor, LogStream::Generator, tz(), secs(2))
}

pub fn gate(store: SqliteStore, actor: Actor) -> ChecklistGate<SqliteStore> {
    let ctx = context();
    ChecklistGate::new(store, actor, ctx.tz, ctx.schedule, ctx.modules)
}

/// QR code of a default checklist module.
pub fn qr(module: u8) -> String {
    context()
        .modules
        .iter()
        .find(|m| m.number == module)
        .map(|m| m.qr_code.clone())
        .expect("known module")
}

/// Store one hour directly, bypassing the session.
pub fn save_hour<S: SlotStore>(
    store: &mut S,
    date: NaiveDate,
    hour: u32,
    stream: LogStream,
    actor: &str,
    values: &[(&str, f64)],
) -> i64 {
    let mut slot = HourSlot::blank(date, hour, stream);
    for (k, v) in values {
        slot.values.insert(k.to_string(), FieldValue::Number(*v));
    }
    let now = at_on(date, hour, 10, 0);
    store
        .upsert_slot(&slot, actor, now)
        .expect("upsert slot")
        .id
}
