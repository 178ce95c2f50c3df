use crate::errors::{AppError, AppResult};
use crate::models::checklist::{CHECKLIST_MODULES, ChecklistModule};
use crate::models::stream::LogKind;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    /// Fixed operational time zone of the plant, e.g. "+07:00".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_session_anchors")]
    pub session_anchors: Vec<String>,
    #[serde(default = "default_session_tolerance")]
    pub session_tolerance_minutes: i64,
    #[serde(default = "default_generator_debounce")]
    pub generator_autosave_secs: u64,
    #[serde(default = "default_transformer_debounce")]
    pub transformer_autosave_secs: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_transformer_count")]
    pub transformer_count: u8,
    #[serde(default = "default_checklist_modules")]
    pub checklist_modules: Vec<ChecklistModule>,
}

fn default_utc_offset() -> String {
    "+07:00".to_string()
}
fn default_session_anchors() -> Vec<String> {
    ["08:00", "12:00", "16:00", "20:00"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_session_tolerance() -> i64 {
    30
}
fn default_generator_debounce() -> u64 {
    2
}
fn default_transformer_debounce() -> u64 {
    3
}
fn default_refresh_interval() -> u64 {
    60
}
fn default_transformer_count() -> u8 {
    2
}
fn default_checklist_modules() -> Vec<ChecklistModule> {
    [
        (1, "Powerhouse & generator", "HPP-CHK-01-POWERHOUSE"),
        (2, "Transformer yard & switchgear", "HPP-CHK-02-SWITCHYARD"),
        (3, "Intake, penstock & spillway", "HPP-CHK-03-INTAKE"),
        (4, "Auxiliary systems & battery room", "HPP-CHK-04-AUXILIARY"),
    ]
    .into_iter()
    .map(|(number, name, qr)| ChecklistModule {
        number,
        name: name.to_string(),
        qr_code: qr.to_string(),
    })
    .collect()
}

/// Keys every configuration file is expected to carry.
const KNOWN_KEYS: &[&str] = &[
    "database",
    "utc_offset",
    "session_anchors",
    "session_tolerance_minutes",
    "generator_autosave_secs",
    "transformer_autosave_secs",
    "refresh_interval_secs",
    "transformer_count",
    "checklist_modules",
];

impl Default for Config {
    fn default() -> Self {
        Self::with_database(Self::database_file())
    }
}

impl Config {
    pub fn with_database(path: impl AsRef<Path>) -> Self {
        Self {
            database: path.as_ref().to_string_lossy().to_string(),
            utc_offset: default_utc_offset(),
            session_anchors: default_session_anchors(),
            session_tolerance_minutes: default_session_tolerance(),
            generator_autosave_secs: default_generator_debounce(),
            transformer_autosave_secs: default_transformer_debounce(),
            refresh_interval_secs: default_refresh_interval(),
            transformer_count: default_transformer_count(),
            checklist_modules: default_checklist_modules(),
        }
    }

    /// Return the standard configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hydrolog")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("hydrolog.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("hydrolog.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the values that the engine relies on.
    pub fn validate(&self) -> AppResult<()> {
        self.offset()?;

        if self.transformer_count == 0 {
            return Err(AppError::Config(
                "transformer_count must be at least 1".into(),
            ));
        }

        if self.checklist_modules.len() != CHECKLIST_MODULES as usize {
            return Err(AppError::Config(format!(
                "expected {} checklist modules, found {}",
                CHECKLIST_MODULES,
                self.checklist_modules.len()
            )));
        }

        for (i, m) in self.checklist_modules.iter().enumerate() {
            if m.number as usize != i + 1 {
                return Err(AppError::Config(format!(
                    "checklist modules must be numbered 1..{} in order (found {} at position {})",
                    CHECKLIST_MODULES,
                    m.number,
                    i + 1
                )));
            }
            if m.qr_code.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "checklist module {} has an empty QR code",
                    m.number
                )));
            }
        }

        Ok(())
    }

    /// Fixed offset of the operational time zone.
    pub fn offset(&self) -> AppResult<FixedOffset> {
        crate::utils::time::parse_utc_offset(&self.utc_offset)
            .ok_or_else(|| AppError::Config(format!("invalid utc_offset '{}'", self.utc_offset)))
    }

    pub fn autosave_secs(&self, kind: LogKind) -> u64 {
        match kind {
            LogKind::Generator => self.generator_autosave_secs,
            LogKind::Transformer => self.transformer_autosave_secs,
        }
    }

    /// Keys missing from the configuration file on disk.
    pub fn missing_keys(path: &Path) -> AppResult<Vec<&'static str>> {
        let content = fs::read_to_string(path)?;
        let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;
        let map = yaml
            .as_mapping()
            .ok_or_else(|| AppError::Config("configuration file is not a mapping".into()))?;

        Ok(KNOWN_KEYS
            .iter()
            .copied()
            .filter(|k| !map.contains_key(serde_yaml::Value::String(k.to_string())))
            .collect())
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config::with_database(&db_path);

        if !is_test {
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }

        println!("✅ Database:    {:?}", db_path);

        Ok(config)
    }
}
