//! Engine configuration, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cpu_8086::timing::{ClockSink, CycleCounter, NullClock};
use crate::error::ConfigError;
use crate::logging::{LogCategory, LogConfig, LogLevel};

/// Clock accounting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    #[default]
    Off,
    Cycles,
}

impl TimingMode {
    /// Fresh clock sink for this mode
    pub fn sink(self) -> Box<dyn ClockSink> {
        match self {
            TimingMode::Off => Box::new(NullClock),
            TimingMode::Cycles => Box::new(CycleCounter::default()),
        }
    }
}

/// Register values installed by `reset()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetVector {
    pub cs: u16,
    pub ip: u16,
    pub ss: u16,
    pub sp: u16,
}

impl Default for ResetVector {
    fn default() -> Self {
        Self {
            cs: 0xFFFF,
            ip: 0x0000,
            ss: 0x0000,
            sp: 0x0000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timing: TimingMode,
    pub reset: ResetVector,
    /// Global log level name, e.g. "warn"
    pub log_level: Option<String>,
    /// Per-category overrides, e.g. {"interrupts": "debug"}
    pub log_levels: BTreeMap<String, String>,
    pub log_file: Option<PathBuf>,
}

impl EngineConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate the log settings and install them into `LogConfig::global()`
    ///
    /// Nothing is applied if any level or category name is unknown.
    pub fn apply_logging(&self) -> Result<(), ConfigError> {
        let global = self
            .log_level
            .as_deref()
            .map(|name| LogLevel::from_str(name).ok_or_else(|| ConfigError::LogLevel(name.to_string())))
            .transpose()?;

        let mut overrides = Vec::with_capacity(self.log_levels.len());
        for (category, level) in &self.log_levels {
            let cat = LogCategory::from_str(category)
                .ok_or_else(|| ConfigError::LogCategory(category.clone()))?;
            let lvl = LogLevel::from_str(level).ok_or_else(|| ConfigError::LogLevel(level.clone()))?;
            overrides.push((cat, lvl));
        }

        let config = LogConfig::global();
        if let Some(level) = global {
            config.set_global_level(level);
        }
        for (category, level) in overrides {
            config.set_level(category, level);
        }
        if let Some(path) = &self.log_file {
            config.set_log_file(path.clone())?;
        }
        Ok(())
    }
}
