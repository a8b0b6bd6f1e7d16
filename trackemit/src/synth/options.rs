//! Synthesis options.
//!
//! Field names follow the external JSON convention (`minSpeed`, `lastPoint`,
//! ...), so options can be read straight from a request body.

use serde::{Deserialize, Serialize};

use super::error::SynthError;

/// Default cruise/target speed when a vertex has none (m/s).
pub const DEFAULT_SPEED: f64 = 10.0;

/// Default sampling cadence (s).
pub const DEFAULT_RATE: f64 = 30.0;

/// Default speed floor (m/s). 1.4 m/s is walking pace, about 5 km/h.
pub const DEFAULT_MIN_SPEED: f64 = 1.4;

/// What happens to altitude while the entity is dwelling at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellAltitude {
    /// Keep the vertex altitude.
    #[default]
    Hold,
    /// Force ground level (0 m).
    Ground,
}

impl DwellAltitude {
    /// Parse from a config string.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hold" => Some(DwellAltitude::Hold),
            "ground" => Some(DwellAltitude::Ground),
            _ => None,
        }
    }

    /// Config/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DwellAltitude::Hold => "hold",
            DwellAltitude::Ground => "ground",
        }
    }
}

/// Options controlling trajectory synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthOptions {
    /// Default target speed for vertices without one (m/s).
    pub speed: f64,

    /// Sampling cadence (s).
    pub rate: f64,

    /// Speed floor applied to propagated speeds and to mid-segment speeds (m/s).
    pub min_speed: f64,

    /// Track altitude (3D samples).
    pub altitude: bool,

    /// Replace sharp turns with arcs before integrating.
    pub smooth: bool,

    /// Emit a sample at every vertex.
    pub vertices: bool,

    /// Emit a sample at the final vertex.
    pub last_point: bool,

    /// Suppress dwell samples unless a sync marker is attached.
    pub quiet: bool,

    /// Positional noise radius (m). 0 disables jitter.
    pub jitter: f64,

    /// Seed for the jitter generator. `None` draws from the OS.
    pub jitter_seed: Option<u64>,

    /// Altitude behaviour while dwelling.
    pub dwell_altitude: DwellAltitude,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            rate: DEFAULT_RATE,
            min_speed: DEFAULT_MIN_SPEED,
            altitude: false,
            smooth: false,
            vertices: false,
            last_point: true,
            quiet: false,
            jitter: 0.0,
            jitter_seed: None,
            dwell_altitude: DwellAltitude::Hold,
        }
    }
}

impl SynthOptions {
    /// Set the default target speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the sampling cadence.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the speed floor.
    pub fn with_min_speed(mut self, min_speed: f64) -> Self {
        self.min_speed = min_speed;
        self
    }

    /// Enable or disable altitude tracking.
    pub fn with_altitude(mut self, enabled: bool) -> Self {
        self.altitude = enabled;
        self
    }

    /// Enable or disable turn smoothing.
    pub fn with_smooth(mut self, enabled: bool) -> Self {
        self.smooth = enabled;
        self
    }

    /// Enable or disable per-vertex samples.
    pub fn with_vertices(mut self, enabled: bool) -> Self {
        self.vertices = enabled;
        self
    }

    /// Enable or disable the final-vertex sample.
    pub fn with_last_point(mut self, enabled: bool) -> Self {
        self.last_point = enabled;
        self
    }

    /// Enable or disable quiet dwells.
    pub fn with_quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    /// Set the jitter radius and, optionally, a fixed seed.
    pub fn with_jitter(mut self, radius_m: f64, seed: Option<u64>) -> Self {
        self.jitter = radius_m;
        self.jitter_seed = seed;
        self
    }

    /// Set dwell altitude behaviour.
    pub fn with_dwell_altitude(mut self, mode: DwellAltitude) -> Self {
        self.dwell_altitude = mode;
        self
    }

    /// Reject options the integrator cannot work with.
    pub fn validate(&self) -> Result<(), SynthError> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(SynthError::InvalidOption {
                name: "rate",
                reason: format!("must be positive, got {}", self.rate),
            });
        }
        // A zero floor lets a decelerating entity creep towards a stopped
        // vertex forever.
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            return Err(SynthError::InvalidOption {
                name: "minSpeed",
                reason: format!("must be positive, got {}", self.min_speed),
            });
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(SynthError::InvalidOption {
                name: "speed",
                reason: format!("must be non-negative, got {}", self.speed),
            });
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(SynthError::InvalidOption {
                name: "jitter",
                reason: format!("must be non-negative, got {}", self.jitter),
            });
        }
        Ok(())
    }
}
