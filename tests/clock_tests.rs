use chrono::{Duration, NaiveTime, TimeZone, Utc};
use hydrolog::core::clock::{
    SessionSchedule, current_hour, current_session, hour_rolled_over, next_session,
    operational_date,
};
use hydrolog::errors::AppError;

mod common;
use common::{at, at_on, context, day, tz};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn test_current_hour_uses_plant_offset() {
    // 18:30 UTC is 01:30 the next day at +07:00
    let now = Utc.with_ymd_and_hms(2025, 6, 9, 18, 30, 0).unwrap();
    assert_eq!(current_hour(now, tz()), 1);
    assert_eq!(operational_date(now, tz()), day());
}

#[test]
fn test_hour_is_monotonic_within_a_day() {
    let mut prev = 0;
    let start = at(0, 0);
    for minute in 0..(24 * 60) {
        let h = current_hour(start + Duration::minutes(minute), tz());
        assert!(h >= prev, "hour went back at minute {minute}");
        assert!(h < 24);
        prev = h;
    }
    assert_eq!(prev, 23);
}

#[test]
fn test_hour_rollover_detection() {
    assert!(hour_rolled_over(at(14, 59), at(15, 0), tz()));
    assert!(!hour_rolled_over(at(14, 10), at(14, 50), tz()));
    assert!(hour_rolled_over(
        at(23, 59),
        at_on(day().succ_opt().unwrap(), 0, 0, 0),
        tz()
    ));
}

#[test]
fn test_session_open_only_within_tolerance() {
    let schedule = context().schedule;

    assert!(current_session(at(7, 29), tz(), &schedule).is_none());

    let s = current_session(at(7, 30), tz(), &schedule).expect("opening edge is inside");
    assert_eq!(s.number, 1);
    assert_eq!(s.date, day());

    assert_eq!(current_session(at(8, 29), tz(), &schedule).unwrap().number, 1);
    assert!(current_session(at(8, 30), tz(), &schedule).is_none());

    assert_eq!(current_session(at(12, 0), tz(), &schedule).unwrap().number, 2);
    assert_eq!(current_session(at(19, 45), tz(), &schedule).unwrap().number, 4);
    assert!(current_session(at(3, 0), tz(), &schedule).is_none());
}

#[test]
fn test_session_window_wraps_midnight() {
    let schedule = SessionSchedule::new(&[t(0, 10), t(6, 0), t(12, 0), t(18, 0)], 30).unwrap();

    // 23:50 belongs to session 1 of the next day
    let late = current_session(at(23, 50), tz(), &schedule).expect("window crosses midnight");
    assert_eq!(late.number, 1);
    assert_eq!(late.date, day().succ_opt().unwrap());

    let early = current_session(at(0, 20), tz(), &schedule).unwrap();
    assert_eq!(early.number, 1);
    assert_eq!(early.date, day());

    assert!(current_session(at(0, 40), tz(), &schedule).is_none());
}

#[test]
fn test_schedule_validation() {
    let err = SessionSchedule::new(&[t(8, 0), t(12, 0), t(16, 0)], 30).unwrap_err();
    assert!(matches!(err, AppError::InvalidSchedule(_)));

    let err = SessionSchedule::new(&[t(12, 0), t(8, 0), t(16, 0), t(20, 0)], 30).unwrap_err();
    assert!(err.to_string().contains("ascending"));

    let err = SessionSchedule::new(&[t(8, 0), t(12, 0), t(16, 0), t(20, 0)], 0).unwrap_err();
    assert!(matches!(err, AppError::InvalidSchedule(_)));

    // windows would overlap: 30 minutes apart with ±30
    let err = SessionSchedule::new(&[t(8, 0), t(8, 30), t(12, 0), t(16, 0)], 30).unwrap_err();
    assert!(err.to_string().contains("need at least 60"));

    // the overnight gap counts too: 23:30 → 01:00 is 90 minutes
    let err = SessionSchedule::new(&[t(1, 0), t(7, 0), t(13, 0), t(23, 30)], 60).unwrap_err();
    assert!(err.to_string().contains("90 minutes apart"));

    assert!(SessionSchedule::new(&[t(8, 0), t(12, 0), t(16, 0), t(20, 0)], 30).is_ok());
}

#[test]
fn test_next_session() {
    let schedule = context().schedule;

    let n = next_session(at(9, 0), tz(), &schedule);
    assert_eq!((n.number, n.date), (2, day()));
    assert_eq!(n.at, at(12, 0));

    // strictly after: at the anchor itself the next one is returned
    assert_eq!(next_session(at(8, 0), tz(), &schedule).number, 2);

    let n = next_session(at(21, 0), tz(), &schedule);
    assert_eq!(n.number, 1);
    assert_eq!(n.date, day().succ_opt().unwrap());
}

#[test]
fn test_window_label() {
    let schedule = context().schedule;
    assert_eq!(schedule.window_label(1).as_deref(), Some("07:30-08:30"));
    assert_eq!(schedule.window_label(4).as_deref(), Some("19:30-20:30"));
    assert_eq!(schedule.window_label(5), None);
    assert_eq!(schedule.window_label(0), None);
}
