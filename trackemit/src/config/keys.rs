//! Typed access to individual configuration keys.
//!
//! Every key the INI file understands is a [`ConfigKey`] variant. Loading,
//! saving and the `config get/set/list` commands all go through the same
//! `get`/`set` pair, so parsing rules live in one place.

use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConfigError;
use super::ConfigFile;
use crate::logging::{LogFormat, LogLevel};
use crate::schedule::OutputFormat;
use crate::synth::DwellAltitude;

/// A `section.key` configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    SynthesisSpeed,
    SynthesisRate,
    SynthesisMinSpeed,
    SynthesisAltitude,
    SynthesisSmooth,
    SynthesisVertices,
    SynthesisLastPoint,
    SynthesisQuiet,
    SynthesisJitter,
    SynthesisJitterSeed,
    SynthesisDwellAltitude,
    SmoothingRadius,
    SmoothingMinTurn,
    SmoothingArcPoints,
    SchedulerIdleWaitMs,
    SchedulerSpeed,
    SchedulerFormat,
    LoggingLevel,
    LoggingFormat,
    LoggingFile,
}

const ALL_KEYS: &[ConfigKey] = &[
    ConfigKey::SynthesisSpeed,
    ConfigKey::SynthesisRate,
    ConfigKey::SynthesisMinSpeed,
    ConfigKey::SynthesisAltitude,
    ConfigKey::SynthesisSmooth,
    ConfigKey::SynthesisVertices,
    ConfigKey::SynthesisLastPoint,
    ConfigKey::SynthesisQuiet,
    ConfigKey::SynthesisJitter,
    ConfigKey::SynthesisJitterSeed,
    ConfigKey::SynthesisDwellAltitude,
    ConfigKey::SmoothingRadius,
    ConfigKey::SmoothingMinTurn,
    ConfigKey::SmoothingArcPoints,
    ConfigKey::SchedulerIdleWaitMs,
    ConfigKey::SchedulerSpeed,
    ConfigKey::SchedulerFormat,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFormat,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        ALL_KEYS
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SynthesisSpeed | SynthesisRate | SynthesisMinSpeed | SynthesisAltitude
            | SynthesisSmooth | SynthesisVertices | SynthesisLastPoint | SynthesisQuiet
            | SynthesisJitter | SynthesisJitterSeed | SynthesisDwellAltitude => "synthesis",
            SmoothingRadius | SmoothingMinTurn | SmoothingArcPoints => "smoothing",
            SchedulerIdleWaitMs | SchedulerSpeed | SchedulerFormat => "scheduler",
            LoggingLevel | LoggingFormat | LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SynthesisSpeed => "speed",
            SynthesisRate => "rate",
            SynthesisMinSpeed => "min_speed",
            SynthesisAltitude => "altitude",
            SynthesisSmooth => "smooth",
            SynthesisVertices => "vertices",
            SynthesisLastPoint => "last_point",
            SynthesisQuiet => "quiet",
            SynthesisJitter => "jitter",
            SynthesisJitterSeed => "jitter_seed",
            SynthesisDwellAltitude => "dwell_altitude",
            SmoothingRadius => "radius",
            SmoothingMinTurn => "min_turn",
            SmoothingArcPoints => "arc_points",
            SchedulerIdleWaitMs => "idle_wait_ms",
            SchedulerSpeed => "speed",
            SchedulerFormat => "format",
            LoggingLevel => "level",
            LoggingFormat => "format",
            LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty if unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let s = &config.synthesis;
        match self {
            SynthesisSpeed => s.speed.to_string(),
            SynthesisRate => s.rate.to_string(),
            SynthesisMinSpeed => s.min_speed.to_string(),
            SynthesisAltitude => s.altitude.to_string(),
            SynthesisSmooth => s.smooth.to_string(),
            SynthesisVertices => s.vertices.to_string(),
            SynthesisLastPoint => s.last_point.to_string(),
            SynthesisQuiet => s.quiet.to_string(),
            SynthesisJitter => s.jitter.to_string(),
            SynthesisJitterSeed => s.jitter_seed.map(|v| v.to_string()).unwrap_or_default(),
            SynthesisDwellAltitude => s.dwell_altitude.as_str().to_string(),
            SmoothingRadius => config.smoothing.radius_m.to_string(),
            SmoothingMinTurn => config.smoothing.min_turn_deg.to_string(),
            SmoothingArcPoints => config.smoothing.arc_points.to_string(),
            SchedulerIdleWaitMs => config.scheduler.idle_wait_ms.to_string(),
            SchedulerSpeed => config.scheduler.speed.to_string(),
            SchedulerFormat => config.scheduler.format.as_str().to_string(),
            LoggingLevel => config.logging.level.as_str().to_string(),
            LoggingFormat => config.logging.format.as_str().to_string(),
            LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse `value` and store it in `config`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        let s = &mut config.synthesis;
        match self {
            SynthesisSpeed => s.speed = self.non_negative(value)?,
            SynthesisRate => s.rate = self.positive(value)?,
            SynthesisMinSpeed => s.min_speed = self.positive(value)?,
            SynthesisAltitude => s.altitude = self.boolean(value)?,
            SynthesisSmooth => s.smooth = self.boolean(value)?,
            SynthesisVertices => s.vertices = self.boolean(value)?,
            SynthesisLastPoint => s.last_point = self.boolean(value)?,
            SynthesisQuiet => s.quiet = self.boolean(value)?,
            SynthesisJitter => s.jitter = self.non_negative(value)?,
            SynthesisJitterSeed => {
                s.jitter_seed = if value.is_empty() {
                    None
                } else {
                    Some(self.parse::<u64>(value, "expected an unsigned integer")?)
                }
            }
            SynthesisDwellAltitude => {
                s.dwell_altitude = DwellAltitude::from_config_str(value)
                    .ok_or_else(|| self.invalid(value, "expected 'hold' or 'ground'"))?
            }
            SmoothingRadius => config.smoothing.radius_m = self.positive(value)?,
            SmoothingMinTurn => config.smoothing.min_turn_deg = self.non_negative(value)?,
            SmoothingArcPoints => {
                config.smoothing.arc_points =
                    self.parse::<usize>(value, "expected an unsigned integer")?
            }
            SchedulerIdleWaitMs => {
                let ms = self.parse::<u64>(value, "expected milliseconds")?;
                if ms == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.scheduler.idle_wait_ms = ms;
            }
            SchedulerSpeed => config.scheduler.speed = self.positive(value)?,
            SchedulerFormat => {
                config.scheduler.format = value
                    .parse::<OutputFormat>()
                    .map_err(|_| self.invalid(value, "expected 'geojson' or 'flat'"))?
            }
            LoggingLevel => {
                config.logging.level = LogLevel::from_config_str(value)
                    .ok_or_else(|| self.invalid(value, "expected trace, debug, info, warn or error"))?
            }
            LoggingFormat => {
                config.logging.format = LogFormat::from_config_str(value)
                    .ok_or_else(|| self.invalid(value, "expected pretty, compact or full"))?
            }
            LoggingFile => {
                config.logging.file = if value.is_empty() {
                    None
                } else {
                    Some(expand_home(value))
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.section(),
            key: self.key_name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse<T: FromStr>(&self, value: &str, reason: &str) -> Result<T, ConfigError> {
        value.parse().map_err(|_| self.invalid(value, reason))
    }

    fn non_negative(&self, value: &str) -> Result<f64, ConfigError> {
        let v: f64 = self.parse(value, "expected a number")?;
        if !(v.is_finite() && v >= 0.0) {
            return Err(self.invalid(value, "must be a non-negative number"));
        }
        Ok(v)
    }

    fn positive(&self, value: &str) -> Result<f64, ConfigError> {
        let v = self.non_negative(value)?;
        if v == 0.0 {
            return Err(self.invalid(value, "must be greater than zero"));
        }
        Ok(v)
    }

    fn boolean(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
