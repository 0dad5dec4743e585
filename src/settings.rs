use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "cubetimer";
const CONFIG_FILE: &str = "config.toml";
const MAX_TICK_MS: u64 = 1000;
/// Keys the app handles itself: help, quit and the quit dialog.
const RESERVED_KEYS: &[char] = &['?', 'q', 'y', 'n'];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("tick_interval_ms must be between 1 and 1000, got {0}")]
    InvalidTickInterval(u64),

    #[error("trigger_key must be \"space\", \"enter\" or a single character, got {0:?}")]
    InvalidTriggerKey(String),

    #[error("trigger_key {0:?} is reserved for help or quit")]
    ReservedTriggerKey(char),
}

/// Physical key that drives the down/up signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerKey {
    Space,
    Enter,
    Char(char),
}

impl TryFrom<String> for TriggerKey {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "space" | " " => return Ok(TriggerKey::Space),
            "enter" | "return" => return Ok(TriggerKey::Enter),
            _ => {}
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if RESERVED_KEYS.contains(&c) => {
                Err(SettingsError::ReservedTriggerKey(c))
            }
            (Some(c), None) if !c.is_control() => Ok(TriggerKey::Char(c)),
            _ => Err(SettingsError::InvalidTriggerKey(value)),
        }
    }
}

impl From<TriggerKey> for String {
    fn from(key: TriggerKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKey::Space => f.write_str("space"),
            TriggerKey::Enter => f.write_str("enter"),
            TriggerKey::Char(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub tick_interval_ms: u64,
    pub trigger_key: TriggerKey,
    /// Left mouse button inside the timer panel acts as a second trigger.
    pub mouse: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: timer_core::DEFAULT_TICK_MS,
            trigger_key: TriggerKey::Space,
            mouse: true,
        }
    }
}

impl Settings {
    /// `<config_dir>/cubetimer/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path`. A missing file is not an error and yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Like `load`, but a broken file is logged and replaced by defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_TICK_MS {
            return Err(SettingsError::InvalidTickInterval(self.tick_interval_ms));
        }
        Ok(())
    }
}
