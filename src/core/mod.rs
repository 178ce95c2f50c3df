pub mod backup;
pub mod checklist;
pub mod clock;
pub mod export;
pub mod finalize;
pub mod gate;
pub mod issues;
pub mod log;
pub mod session;
pub mod status;
pub mod sync;
pub mod tools;
pub mod validation;

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::checklist::ChecklistModule;
use crate::models::stream::LogStream;
use clock::SessionSchedule;
use chrono::FixedOffset;

/// Plant-wide constants resolved once from the configuration.
#[derive(Debug, Clone)]
pub struct PlantContext {
    pub tz: FixedOffset,
    pub schedule: SessionSchedule,
    pub transformer_count: u8,
    pub modules: Vec<ChecklistModule>,
}

impl PlantContext {
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        Ok(Self {
            tz: cfg.offset()?,
            schedule: SessionSchedule::from_config(cfg)?,
            transformer_count: cfg.transformer_count,
            modules: cfg.checklist_modules.clone(),
        })
    }

    /// Generator first, then every transformer.
    pub fn streams(&self) -> Vec<LogStream> {
        std::iter::once(LogStream::Generator)
            .chain((1..=self.transformer_count).map(LogStream::Transformer))
            .collect()
    }
}
