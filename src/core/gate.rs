//! Checklist session gate.
//!
//! Per session and module the state moves `Locked -> Unlocked -> Completed`.
//! Unlocks live in memory only; completions are read back from the store
//! for the working session on every refresh.

use crate::core::checklist;
use crate::core::clock::{Session, SessionSchedule, UpcomingSession, current_session, next_session, operational_date};
use crate::errors::{AppError, AppResult};
use crate::models::actor::Actor;
use crate::models::checklist::{ChecklistCompletion, ChecklistDay, ChecklistModule, UnlockSource};
use crate::store::ChecklistStore;
use crate::utils::time::stamp;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CategoryState {
    Locked,
    Unlocked { source: UnlockSource },
    Completed { by: String, source: UnlockSource },
}

/// Justified bypass of the session window for one unlock. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyOverride {
    pub reason: String,
    pub armed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Unlock {
    date: NaiveDate,
    session: u8,
    source: UnlockSource,
    reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    pub number: u8,
    pub name: String,
    #[serde(flatten)]
    pub state: CategoryState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateOverview {
    pub date: NaiveDate,
    pub current: Option<Session>,
    pub next: UpcomingSession,
    /// Session the module states refer to.
    pub working_session: u8,
    pub modules: Vec<ModuleStatus>,
    pub session_complete: bool,
    pub override_armed: bool,
    pub day: Option<ChecklistDay>,
}

pub struct ChecklistGate<S> {
    store: S,
    actor: Actor,
    tz: FixedOffset,
    schedule: SessionSchedule,
    modules: Vec<ChecklistModule>,

    current: Option<Session>,
    working: (NaiveDate, u8),
    unlocks: BTreeMap<u8, Unlock>,
    completed: BTreeMap<u8, ChecklistCompletion>,
    emergency: Option<EmergencyOverride>,
}

impl<S: ChecklistStore> ChecklistGate<S> {
    pub fn new(
        store: S,
        actor: Actor,
        tz: FixedOffset,
        schedule: SessionSchedule,
        modules: Vec<ChecklistModule>,
    ) -> Self {
        Self {
            store,
            actor,
            tz,
            schedule,
            modules,
            current: None,
            working: (NaiveDate::default(), 1),
            unlocks: BTreeMap::new(),
            completed: BTreeMap::new(),
            emergency: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn emergency(&self) -> Option<&EmergencyOverride> {
        self.emergency.as_ref()
    }

    pub fn current(&self) -> Option<Session> {
        self.current
    }

    /// (date, session) the gate currently works on.
    pub fn working_session(&self) -> (NaiveDate, u8) {
        self.working
    }

    /// Session used outside any window: the last anchor already passed today,
    /// or the first session before the first anchor.
    fn fallback_session(&self, now: DateTime<Utc>) -> (NaiveDate, u8) {
        let t = now.with_timezone(&self.tz).time();
        let number = self
            .schedule
            .anchors()
            .iter()
            .rposition(|a| *a <= t)
            .map(|i| i as u8 + 1)
            .unwrap_or(1);
        (operational_date(now, self.tz), number)
    }

    /// Re-evaluate the window and reload completions of the working session.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.current = current_session(now, self.tz, &self.schedule);
        let working = match self.current {
            Some(s) => (s.date, s.number),
            None => self.fallback_session(now),
        };

        if working != self.working {
            debug!(date = %working.0, session = working.1, "checklist working session changed");
        }
        self.working = working;

        // QR unlocks only last for the window they were made in; emergency
        // unlocks last until completed on the same day.
        let current = self.current;
        let today = operational_date(now, self.tz);
        self.unlocks.retain(|_, u| match u.source {
            UnlockSource::Qr => current.is_some_and(|s| s.date == u.date && s.number == u.session),
            UnlockSource::Emergency => u.date == today,
        });

        let (date, session) = self.working;
        self.completed = self
            .store
            .completions(date, Some(session))?
            .into_iter()
            .map(|c| (c.module, c))
            .collect();
        Ok(())
    }

    fn module(&self, number: u8) -> AppResult<&ChecklistModule> {
        self.modules
            .iter()
            .find(|m| m.number == number)
            .ok_or_else(|| AppError::InvalidValue(format!("unknown checklist module {number}")))
    }

    fn ensure_operator(&self, action: &str) -> AppResult<()> {
        if self.actor.role.can_write_logs() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "{} ({}) cannot {}",
                self.actor.name,
                self.actor.role.as_str(),
                action
            )))
        }
    }

    pub fn state(&self, number: u8) -> CategoryState {
        if let Some(c) = self.completed.get(&number) {
            return CategoryState::Completed {
                by: c.completed_by.clone(),
                source: c.unlock_source,
            };
        }
        match self.unlocks.get(&number) {
            Some(u) => CategoryState::Unlocked { source: u.source },
            None => CategoryState::Locked,
        }
    }

    /// Arm a one-shot override. The reason is mandatory.
    pub fn arm_emergency(&mut self, reason: &str, now: DateTime<Utc>) -> AppResult<&EmergencyOverride> {
        self.ensure_operator("use the emergency override")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidValue(
                "an emergency override needs a reason".into(),
            ));
        }

        info!(actor = %self.actor.name, reason, "emergency override armed");
        Ok(self.emergency.insert(EmergencyOverride {
            reason: reason.to_string(),
            armed_at: now,
        }))
    }

    /// Unlock a module by its QR code. Needs an open session window or an
    /// armed override, which this call consumes.
    pub fn scan_qr(&mut self, number: u8, code: &str, now: DateTime<Utc>) -> AppResult<CategoryState> {
        self.ensure_operator("unlock checklist modules")?;
        self.refresh(now)?;

        let module = self.module(number)?;
        if module.qr_code != code.trim() {
            return Err(AppError::InvalidQrCode(number));
        }

        match self.state(number) {
            CategoryState::Completed { .. } => return Err(AppError::AlreadyCompleted(number)),
            state @ CategoryState::Unlocked { .. } => return Ok(state),
            CategoryState::Locked => {}
        }

        let unlock = match (self.current, self.emergency.take()) {
            (Some(s), armed) => {
                // Inside a window the override is not needed; keep it armed.
                self.emergency = armed;
                Unlock {
                    date: s.date,
                    session: s.number,
                    source: UnlockSource::Qr,
                    reason: None,
                }
            }
            (None, Some(ov)) => {
                let (date, session) = self.working;
                Unlock {
                    date,
                    session,
                    source: UnlockSource::Emergency,
                    reason: Some(ov.reason),
                }
            }
            (None, None) => {
                let next = next_session(now, self.tz, &self.schedule);
                let label = self
                    .schedule
                    .window_label(next.number)
                    .unwrap_or_default();
                return Err(AppError::SessionClosed(format!(
                    "session {} on {} ({})",
                    next.number, next.date, label
                )));
            }
        };

        debug!(module = number, session = unlock.session, source = unlock.source.as_str(), "module unlocked");
        let source = unlock.source;
        self.unlocks.insert(number, unlock);
        Ok(CategoryState::Unlocked { source })
    }

    /// Complete an unlocked module: records the completion and stores the form data.
    pub fn complete(&mut self, number: u8, data: &Value, now: DateTime<Utc>) -> AppResult<ChecklistDay> {
        self.ensure_operator("complete checklists")?;
        self.module(number)?;
        self.refresh(now)?;

        if self.completed.contains_key(&number) {
            return Err(AppError::AlreadyCompleted(number));
        }
        let unlock = self
            .unlocks
            .get(&number)
            .cloned()
            .ok_or(AppError::CategoryLocked(number))?;

        let completion = ChecklistCompletion {
            date: unlock.date,
            session: unlock.session,
            module: number,
            completed_by: self.actor.name.clone(),
            completed_at: stamp(now, self.tz),
            unlock_source: unlock.source,
            emergency_reason: unlock.reason.clone(),
        };

        let day = self.store.complete_module(&completion, data, now)?;
        self.unlocks.remove(&number);
        self.completed.insert(number, completion);
        info!(module = number, session = unlock.session, actor = %self.actor.name, "checklist module completed");
        Ok(day)
    }

    /// Every module completed in the given session of a day.
    pub fn session_complete(&self, date: NaiveDate, session: u8) -> AppResult<bool> {
        let done = self.store.completions(date, Some(session))?;
        Ok(self
            .modules
            .iter()
            .all(|m| done.iter().any(|c| c.module == m.number)))
    }

    pub fn overview(&mut self, now: DateTime<Utc>) -> AppResult<GateOverview> {
        self.refresh(now)?;
        let (date, session) = self.working;

        let modules = self
            .modules
            .iter()
            .map(|m| ModuleStatus {
                number: m.number,
                name: m.name.clone(),
                state: self.state(m.number),
            })
            .collect();

        Ok(GateOverview {
            date,
            current: self.current,
            next: next_session(now, self.tz, &self.schedule),
            working_session: session,
            modules,
            session_complete: self.session_complete(date, session)?,
            override_armed: self.emergency.is_some(),
            day: self.store.get_day(date)?,
        })
    }

    /// Submit the checklist day of the working session.
    pub fn submit(&mut self, now: DateTime<Utc>) -> AppResult<ChecklistDay> {
        self.refresh(now)?;
        let (date, _) = self.working;
        checklist::submit(&mut self.store, &self.actor, date, now)
    }
}
