use predicates::prelude::*;
use predicates::str::contains;
use std::fs;

mod common;
use common::{at_arg, hyd, setup_test_db, temp_out};

fn init(db: &str) {
    hyd()
        .args(["--db", db, "--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));
}

/// `hydrolog --db <db> --at <plant-local HH:MM> --user alice ...`
fn as_alice(db: &str, hour: u32, minute: u32, args: &[&str]) -> assert_cmd::assert::Assert {
    let at = at_arg(hour, minute);
    hyd()
        .args(["--db", db, "--at", &at, "--user", "alice"])
        .args(args)
        .assert()
}

#[test]
fn test_init_creates_the_database() {
    let db = setup_test_db("cli_init");
    init(&db);
    assert!(fs::metadata(&db).is_ok());

    hyd()
        .args(["--db", &db, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("init"));
}

#[test]
fn test_hourlog_set_and_show() {
    let db = setup_test_db("cli_hourlog");
    init(&db);

    as_alice(
        &db,
        9,
        15,
        &["hourlog", "set", "active_power_mw=6.4", "stator_temp_r_c=190", "--remark", "steady"],
    )
    .success()
    .stdout(contains("generator 09:00 saved (insert)"))
    .stdout(contains("outside ideal band 0..180"));

    as_alice(&db, 9, 40, &["hourlog", "show"])
        .success()
        .stdout(contains("09:00"))
        .stdout(contains("alice"));

    as_alice(&db, 9, 40, &["hourlog", "show", "--hour", "9", "--json"])
        .success()
        .stdout(contains("\"stator_temp_r_c\": 190.0"))
        .stdout(contains("\"remark\": \"steady\""));

    hyd()
        .args(["--db", &db, "log", "--print", "--op", "slot_save"])
        .assert()
        .success()
        .stdout(contains("slot_save"))
        .stdout(contains("insert by alice"));
}

#[test]
fn test_flag_needs_a_saved_hour() {
    let db = setup_test_db("cli_flag_unsaved");
    init(&db);

    as_alice(&db, 10, 5, &["hourlog", "set", "--flag", "vibration_mm_s"])
        .failure()
        .stdout(contains("Nothing to save"))
        .stderr(contains("no saved log yet"));

    as_alice(
        &db,
        10,
        6,
        &["hourlog", "set", "vibration_mm_s=6.1", "--flag", "vibration_mm_s"],
    )
    .success()
    .stdout(contains("Issue ISS-"));
}

#[test]
fn test_out_of_range_value_is_rejected() {
    let db = setup_test_db("cli_out_of_range");
    init(&db);

    as_alice(&db, 9, 15, &["hourlog", "set", "stator_temp_r_c=205"])
        .failure()
        .stderr(contains("stator_temp_r_c = 205 (allowed 0..200)"));

    as_alice(&db, 9, 16, &["hourlog", "show", "--json"])
        .success()
        .stdout(contains("[]"));
}

#[test]
fn test_viewer_cannot_write() {
    let db = setup_test_db("cli_viewer");
    init(&db);

    as_alice(&db, 9, 15, &["--role", "viewer", "hourlog", "set", "frequency_hz=50"])
        .failure()
        .stderr(contains("Permission denied"));
}

#[test]
fn test_transformer_stream_argument() {
    let db = setup_test_db("cli_transformer");
    init(&db);

    as_alice(&db, 3, 5, &["hourlog", "set", "--stream", "t2", "oil_temp_c=64"])
        .success()
        .stdout(contains("transformer-2 03:00 saved"));

    as_alice(&db, 3, 5, &["hourlog", "set", "--stream", "transformer-7", "oil_temp_c=64"])
        .failure()
        .stderr(contains("transformer 7"));
}

#[test]
fn test_tool_surface_prints_json() {
    let db = setup_test_db("cli_tool");
    init(&db);

    as_alice(&db, 10, 0, &["tool", "get_plant_status"])
        .success()
        .stdout(contains("\"streams\""))
        .stdout(contains("\"current_hour\": 10"));

    as_alice(&db, 10, 0, &["tool", "--list"])
        .success()
        .stdout(contains("get_generator_logs"));

    as_alice(&db, 10, 0, &["tool", "drop_tables"])
        .failure()
        .stderr(contains("Unknown tool"));
}

#[test]
fn test_checklist_fill_needs_an_open_window() {
    let db = setup_test_db("cli_checklist_window");
    init(&db);

    as_alice(
        &db,
        9,
        0,
        &["checklist", "fill", "1", "--qr", "HPP-CHK-01-POWERHOUSE", "turbine=ok"],
    )
    .failure()
    .stderr(contains("No checklist session is open"));

    as_alice(
        &db,
        8,
        5,
        &["checklist", "fill", "1", "--qr", "HPP-CHK-01-POWERHOUSE", "turbine=ok"],
    )
    .success()
    .stdout(contains("Module 1 completed"))
    .stdout(contains("25%"));

    as_alice(
        &db,
        9,
        0,
        &[
            "checklist",
            "fill",
            "2",
            "--qr",
            "HPP-CHK-02-SWITCHYARD",
            "--emergency",
            "breaker smoke alarm",
        ],
    )
    .success()
    .stdout(contains("unlocked (emergency)"));
}

#[test]
fn test_checklist_submit_once() {
    let db = setup_test_db("cli_checklist_submit");
    init(&db);

    as_alice(&db, 8, 10, &["checklist", "submit"])
        .success()
        .stdout(contains("submitted by alice"));

    hyd()
        .args(["--db", &db, "--at", &at_arg(8, 11), "--user", "bob", "checklist", "submit"])
        .assert()
        .failure()
        .stderr(contains("already been submitted"));
}

#[test]
fn test_issue_flag_and_list() {
    let db = setup_test_db("cli_issue");
    init(&db);

    as_alice(
        &db,
        9,
        0,
        &[
            "issue",
            "flag",
            "--module",
            "powerhouse",
            "--severity",
            "high",
            "--description",
            "oil drip under thrust bearing",
        ],
    )
    .success()
    .stdout(contains("Issue ISS-"))
    .stdout(contains("(high)"));

    as_alice(&db, 9, 5, &["issue", "list", "--json"])
        .success()
        .stdout(contains("oil drip under thrust bearing"))
        .stdout(contains("\"status\": \"reported\""));

    as_alice(&db, 9, 5, &["issue", "list", "--severity", "low", "--json"])
        .success()
        .stdout(contains("oil drip").not());
}

#[test]
fn test_finalize_requires_admin() {
    let db = setup_test_db("cli_finalize");
    init(&db);

    as_alice(&db, 23, 50, &["finalize"])
        .failure()
        .stderr(contains("cannot finalize"));

    as_alice(&db, 23, 50, &["--role", "admin", "finalize"])
        .failure()
        .stderr(contains("0 of 24 hours logged"));
}

#[test]
fn test_export_csv() {
    let db = setup_test_db("cli_export");
    let out = temp_out("cli_export", "csv");
    init(&db);

    as_alice(&db, 9, 15, &["hourlog", "set", "frequency_hz=50.02"]).success();

    as_alice(&db, 9, 20, &["export", "--file", &out, "--range", "2025-06-10"]).success();

    let content = fs::read_to_string(&out).expect("export file");
    let header = content.lines().next().unwrap_or_default();
    assert!(header.starts_with("date,hour,stream"));
    assert!(header.contains("stator_temp_r_c"));
    assert!(content.contains("2025-06-10,09,generator"));
}

#[test]
fn test_config_check() {
    let db = setup_test_db("cli_config");
    init(&db);

    hyd()
        .args(["--db", &db, "config", "--check"])
        .assert()
        .success()
        .stdout(contains("Session windows"))
        .stdout(contains("07:30-08:30"));
}
