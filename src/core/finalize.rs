//! Administrative freeze of a complete day.

use crate::core::clock::HOURS_PER_DAY;
use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::hour_slot::DayFinalization;
use crate::models::stream::LogStream;
use crate::store::SlotStore;
use crate::utils::date::format_date;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

/// Freeze all hours of `date` for one stream. Requires an admin and all
/// 24 distinct hours, saved in any order.
pub fn finalize_day<S: SlotStore>(
    store: &mut S,
    actor: &Actor,
    date: NaiveDate,
    stream: LogStream,
    now: DateTime<Utc>,
) -> AppResult<DayFinalization> {
    if !actor.role.can_finalize() {
        return Err(AppError::PermissionDenied(format!(
            "{} ({}) cannot finalize days",
            actor.name,
            actor.role.as_str()
        )));
    }

    let label = format!("{stream} {}", format_date(&date));
    if store.finalization(date, stream)?.is_some() {
        return Err(AppError::DayFinalized(label));
    }

    let present = store.count_hours(date, stream)?;
    if present < HOURS_PER_DAY {
        return Err(AppError::IncompleteDay {
            present,
            required: HOURS_PER_DAY,
        });
    }

    let fin = store
        .insert_finalization(date, stream, &actor.name, now)
        .map_err(|e| match e {
            AppError::DuplicateKey(_) => AppError::DayFinalized(label.clone()),
            other => other,
        })?;

    info!(day = %label, by = %actor.name, "day finalized");
    Ok(fin)
}
