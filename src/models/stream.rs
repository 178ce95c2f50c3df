use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The two hourly log tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Generator,
    Transformer,
}

impl LogKind {
    pub fn table(&self) -> &'static str {
        match self {
            LogKind::Generator => "generator_logs",
            LogKind::Transformer => "transformer_logs",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Generator => "generator",
            LogKind::Transformer => "transformer",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "generator" => Some(LogKind::Generator),
            "transformer" => Some(LogKind::Transformer),
            _ => None,
        }
    }
}

/// One equipment stream: the generator log, or the log of transformer N.
///
/// Together with date and hour it forms the natural key of an hour slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogStream {
    Generator,
    Transformer(u8),
}

impl LogStream {
    pub fn kind(&self) -> LogKind {
        match self {
            LogStream::Generator => LogKind::Generator,
            LogStream::Transformer(_) => LogKind::Transformer,
        }
    }

    /// Stream number as stored: 0 for the generator, N for transformer N.
    pub fn number(&self) -> u8 {
        match self {
            LogStream::Generator => 0,
            LogStream::Transformer(n) => *n,
        }
    }

    pub fn from_parts(kind: LogKind, number: u8) -> Self {
        match kind {
            LogKind::Generator => LogStream::Generator,
            LogKind::Transformer => LogStream::Transformer(number),
        }
    }

    pub fn table(&self) -> &'static str {
        self.kind().table()
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStream::Generator => write!(f, "generator"),
            LogStream::Transformer(n) => write!(f, "transformer-{n}"),
        }
    }
}

impl Serialize for LogStream {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `generator`, `transformer-N`, `tN` or a bare `N` for a transformer.
impl FromStr for LogStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "generator" || s == "gen" || s == "g" {
            return Ok(LogStream::Generator);
        }
        let digits = s
            .strip_prefix("transformer-")
            .or_else(|| s.strip_prefix("transformer"))
            .or_else(|| s.strip_prefix('t'))
            .unwrap_or(&s);
        match digits.parse::<u8>() {
            Ok(n) if n > 0 => Ok(LogStream::Transformer(n)),
            _ => Err(format!(
                "invalid stream '{s}' (expected generator or transformer-N)"
            )),
        }
    }
}
