use std::{path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::tag::TagId;

/// Env var naming a JSON file that replaces the env-based configuration.
pub const CONFIG_FILE_ENV: &str = "PUZZLE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

/// Configuration for both puzzles. Defaults describe the wired rig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beam: BeamConfig,
    pub tag_lock: TagLockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    /// BCM numbers of the beam sensors, in beam order (beam 1 first).
    pub sensor_pins: Vec<u8>,
    pub buzzer_pin: u8,
    pub poll_ms: u64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            sensor_pins: vec![4, 17, 27, 22, 23, 24, 25],
            buzzer_pin: 21,
            poll_ms: 100,
        }
    }
}

impl BeamConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagLockConfig {
    /// Relay pin. LOW energises the relay and opens the lock.
    pub lock_pin: u8,
    /// Chip-select BCM numbers, one per reader, in reader order.
    pub reader_cs_pins: Vec<u8>,
    /// Expected tag per reader, same order as `reader_cs_pins`.
    pub correct_tags: Vec<TagId>,
    pub poll_ms: u64,
    pub read_timeout_ms: u64,
    pub tag_expiry_ms: u64,
    pub connect_attempts: u32,
    pub connect_delay_ms: u64,
    pub spi_hz: u32,
}

impl Default for TagLockConfig {
    fn default() -> Self {
        Self {
            lock_pin: 18,
            reader_cs_pins: vec![26, 5, 6, 16],
            correct_tags: vec![
                TagId::new(0x668005b8),
                TagId::new(0xb1b69ba3),
                TagId::new(0x86f514b8),
                TagId::new(0x5144d29b),
            ],
            poll_ms: 50,
            read_timeout_ms: 50,
            tag_expiry_ms: 2000,
            connect_attempts: 5,
            connect_delay_ms: 500,
            spi_hz: 500_000,
        }
    }
}

impl TagLockConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn tag_expiry(&self) -> Duration {
        Duration::from_millis(self.tag_expiry_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}

impl Config {
    /// Loads from the JSON file named by `PUZZLE_CONFIG` if set, else from env vars.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let beam = &mut config.beam;
        override_list(&lookup, "BEAM_SENSOR_PINS", &mut beam.sensor_pins)?;
        override_value(&lookup, "BEAM_BUZZER_PIN", &mut beam.buzzer_pin)?;
        override_value(&lookup, "BEAM_POLL_MS", &mut beam.poll_ms)?;

        let lock = &mut config.tag_lock;
        override_value(&lookup, "LOCK_PIN", &mut lock.lock_pin)?;
        override_list(&lookup, "LOCK_READER_CS_PINS", &mut lock.reader_cs_pins)?;
        override_list(&lookup, "LOCK_CORRECT_TAGS", &mut lock.correct_tags)?;
        override_value(&lookup, "LOCK_POLL_MS", &mut lock.poll_ms)?;
        override_value(&lookup, "LOCK_READ_TIMEOUT_MS", &mut lock.read_timeout_ms)?;
        override_value(&lookup, "LOCK_TAG_EXPIRY_MS", &mut lock.tag_expiry_ms)?;
        override_value(&lookup, "LOCK_CONNECT_ATTEMPTS", &mut lock.connect_attempts)?;
        override_value(&lookup, "LOCK_CONNECT_DELAY_MS", &mut lock.connect_delay_ms)?;
        override_value(&lookup, "LOCK_SPI_HZ", &mut lock.spi_hz)?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beam.sensor_pins.is_empty() {
            return Err(ConfigError::Validation(
                "beam monitor needs at least one sensor pin".into(),
            ));
        }
        if self.beam.poll_ms == 0 || self.tag_lock.poll_ms == 0 {
            return Err(ConfigError::Validation("poll periods must be non-zero".into()));
        }
        let lock = &self.tag_lock;
        if lock.reader_cs_pins.is_empty() {
            return Err(ConfigError::Validation("tag lock needs at least one reader".into()));
        }
        if lock.correct_tags.len() != lock.reader_cs_pins.len() {
            return Err(ConfigError::Validation(format!(
                "{} correct tags configured for {} readers",
                lock.correct_tags.len(),
                lock.reader_cs_pins.len()
            )));
        }
        if lock.connect_attempts == 0 {
            return Err(ConfigError::Validation("connect attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn override_value<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw.clone() })?;
    }
    Ok(())
}

fn override_list<F, T>(lookup: &F, key: &'static str, slot: &mut Vec<T>) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.trim().parse())
            .collect::<Result<_, _>>()
            .map_err(|_| ConfigError::Invalid { key, value: raw.clone() })?;
    }
    Ok(())
}
