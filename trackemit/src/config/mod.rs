//! INI configuration file.
//!
//! Lives at `~/.trackemit/config.ini` by default. A missing file means
//! defaults; a present file only needs the keys it wants to change.
//!
//! ```ini
//! [synthesis]
//! speed = 10
//! rate = 30
//! min_speed = 1.4
//! quiet = false
//! dwell_altitude = hold
//!
//! [smoothing]
//! radius = 50
//! min_turn = 15
//! arc_points = 5
//!
//! [scheduler]
//! idle_wait_ms = 1000
//! speed = 1
//! format = geojson
//!
//! [logging]
//! level = info
//! format = compact
//! file = ~/.trackemit/trackemit.log
//! ```

mod error;
mod keys;

pub use error::ConfigError;
pub use keys::ConfigKey;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use crate::logging::LogConfig;
use crate::schedule::{EmissionDaemonConfig, OutputFormat, DEFAULT_IDLE_WAIT_MS};
use crate::synth::{ArcSmoother, SynthOptions, DEFAULT_ARC_POINTS, DEFAULT_MIN_TURN_DEG, DEFAULT_RADIUS_M};

/// Directory under the home directory holding trackemit files.
pub const CONFIG_DIR_NAME: &str = ".trackemit";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default configuration file location.
pub fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// `[smoothing]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingSettings {
    pub radius_m: f64,
    pub min_turn_deg: f64,
    pub arc_points: usize,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            min_turn_deg: DEFAULT_MIN_TURN_DEG,
            arc_points: DEFAULT_ARC_POINTS,
        }
    }
}

impl SmoothingSettings {
    /// Build the smoother these settings describe.
    pub fn smoother(&self) -> ArcSmoother {
        ArcSmoother::new(self.radius_m, self.min_turn_deg, self.arc_points)
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub idle_wait_ms: u64,
    /// Emission clock speed against real time.
    pub speed: f64,
    /// Line format of streamed samples.
    pub format: OutputFormat,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
            speed: 1.0,
            format: OutputFormat::default(),
        }
    }
}

impl SchedulerSettings {
    /// Daemon configuration for these settings.
    pub fn daemon_config(&self) -> EmissionDaemonConfig {
        EmissionDaemonConfig::default().with_idle_wait(Duration::from_millis(self.idle_wait_ms))
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub synthesis: SynthOptions,
    pub smoothing: SmoothingSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LogConfig,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini(&ini)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Render as INI. Unset optional keys are omitted.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }
}
