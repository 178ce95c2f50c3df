//! Wall-clock window resolution.
//!
//! Everything here is a pure function of an injected instant and the plant's
//! fixed offset. Callers re-evaluate on their refresh interval instead of
//! caching results.

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::utils::time::{format_hhmm, parse_time};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;

pub const HOURS_PER_DAY: u32 = 24;

/// Fixed number of checklist sessions per day.
pub const SESSIONS_PER_DAY: u8 = 4;

/// Editable hour (0..23) in the operational time zone.
pub fn current_hour(now: DateTime<Utc>, tz: FixedOffset) -> u32 {
    now.with_timezone(&tz).hour()
}

pub fn operational_date(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// True when `now` falls in a different (date, hour) than `prev`.
pub fn hour_rolled_over(prev: DateTime<Utc>, now: DateTime<Utc>, tz: FixedOffset) -> bool {
    operational_date(prev, tz) != operational_date(now, tz)
        || current_hour(prev, tz) != current_hour(now, tz)
}

fn to_utc(local: NaiveDateTime, tz: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::seconds(tz.local_minus_utc() as i64)))
}

/// An open checklist session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub number: u8,
    /// Day the anchor belongs to (may differ from today for windows crossing midnight).
    pub date: NaiveDate,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpcomingSession {
    pub number: u8,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
}

/// Four daily anchors and the tolerance around each.
///
/// A session is open in the half-open window `[anchor - tol, anchor + tol)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSchedule {
    anchors: Vec<NaiveTime>,
    tolerance: Duration,
}

impl SessionSchedule {
    pub fn new(anchors: &[NaiveTime], tolerance_minutes: i64) -> AppResult<Self> {
        if anchors.len() != SESSIONS_PER_DAY as usize {
            return Err(AppError::InvalidSchedule(format!(
                "expected {} anchors, found {}",
                SESSIONS_PER_DAY,
                anchors.len()
            )));
        }
        if tolerance_minutes <= 0 {
            return Err(AppError::InvalidSchedule(
                "tolerance must be a positive number of minutes".into(),
            ));
        }

        let minutes: Vec<i64> = anchors
            .iter()
            .map(|t| (t.num_seconds_from_midnight() / 60) as i64)
            .collect();

        if minutes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::InvalidSchedule(
                "anchors must be strictly ascending".into(),
            ));
        }

        // Circular spacing, including the gap from the last anchor to the next day's first.
        let min_gap = 2 * tolerance_minutes;
        let mut gaps: Vec<i64> = minutes.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.push(minutes[0] + 24 * 60 - minutes[minutes.len() - 1]);

        if let Some(gap) = gaps.iter().find(|g| **g < min_gap) {
            return Err(AppError::InvalidSchedule(format!(
                "anchors {gap} minutes apart, need at least {min_gap} (twice the tolerance)"
            )));
        }

        Ok(Self {
            anchors: anchors.to_vec(),
            tolerance: Duration::minutes(tolerance_minutes),
        })
    }

    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let anchors = cfg
            .session_anchors
            .iter()
            .map(|s| parse_time(s).ok_or_else(|| AppError::InvalidTime(s.clone())))
            .collect::<AppResult<Vec<_>>>()?;
        Self::new(&anchors, cfg.session_tolerance_minutes)
    }

    pub fn anchors(&self) -> &[NaiveTime] {
        &self.anchors
    }

    pub fn tolerance_minutes(&self) -> i64 {
        self.tolerance.num_minutes()
    }

    /// "HH:MM-HH:MM" label of a session window.
    pub fn window_label(&self, number: u8) -> Option<String> {
        let anchor = self.anchors.get(number.checked_sub(1)? as usize)?;
        let open = *anchor - self.tolerance;
        let close = *anchor + self.tolerance;
        Some(format!("{}-{}", format_hhmm(&open), format_hhmm(&close)))
    }
}

/// Session whose window contains `now`, if any.
pub fn current_session(
    now: DateTime<Utc>,
    tz: FixedOffset,
    schedule: &SessionSchedule,
) -> Option<Session> {
    let local = now.with_timezone(&tz).naive_local();
    let today = local.date();

    for offset in [-1i64, 0, 1] {
        let date = today + Duration::days(offset);
        for (i, anchor) in schedule.anchors.iter().enumerate() {
            let at = date.and_time(*anchor);
            let open = at - schedule.tolerance;
            let close = at + schedule.tolerance;
            if local >= open && local < close {
                return Some(Session {
                    number: i as u8 + 1,
                    date,
                    opens_at: to_utc(open, tz),
                    closes_at: to_utc(close, tz),
                });
            }
        }
    }
    None
}

/// Soonest anchor strictly after `now`, wrapping to tomorrow's first anchor.
pub fn next_session(
    now: DateTime<Utc>,
    tz: FixedOffset,
    schedule: &SessionSchedule,
) -> UpcomingSession {
    let local = now.with_timezone(&tz).naive_local();
    let today = local.date();

    for (i, anchor) in schedule.anchors.iter().enumerate() {
        let at = today.and_time(*anchor);
        if at > local {
            return UpcomingSession {
                number: i as u8 + 1,
                date: today,
                at: to_utc(at, tz),
            };
        }
    }

    let tomorrow = today + Duration::days(1);
    UpcomingSession {
        number: 1,
        date: tomorrow,
        at: to_utc(tomorrow.and_time(schedule.anchors[0]), tz),
    }
}
