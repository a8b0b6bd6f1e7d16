//! Output formats for delivered samples.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::job::EntityId;
use crate::synth::Sample;

/// Separator between path segments of a flattened key.
pub const FLAT_KEY_SEPARATOR: &str = ":";

/// Turns one delivery into a JSON value.
pub trait SampleFormatter: Send + Sync {
    /// Format name, also stamped into the output.
    fn name(&self) -> &'static str;

    /// Render `sample` of `entity`.
    fn format(&self, entity: &EntityId, sample: &Sample) -> Value;
}

/// A GeoJSON `Point` feature whose `id` is the entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonFormatter;

impl SampleFormatter for GeoJsonFormatter {
    fn name(&self) -> &'static str {
        "geojson"
    }

    fn format(&self, entity: &EntityId, sample: &Sample) -> Value {
        let mut feature = sample.to_feature();
        if let Value::Object(map) = &mut feature {
            map.insert("id".into(), Value::from(entity.as_str()));
        }
        feature
    }
}

/// The GeoJSON feature flattened into one level of keys, nested names joined
/// with [`FLAT_KEY_SEPARATOR`] (`geometry:coordinates`, `properties:speed`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFormatter;

impl SampleFormatter for FlatFormatter {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn format(&self, entity: &EntityId, sample: &Sample) -> Value {
        let feature = GeoJsonFormatter.format(entity, sample);
        let mut flat = Map::new();
        flatten_into(&mut flat, None, feature);
        flat.insert(
            format!("properties{}format", FLAT_KEY_SEPARATOR),
            Value::from(self.name()),
        );
        Value::Object(flat)
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, value: Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                let name = match prefix {
                    Some(prefix) => format!("{}{}{}", prefix, FLAT_KEY_SEPARATOR, key),
                    None => key,
                };
                flatten_into(out, Some(name.as_str()), inner);
            }
        }
        other => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), other);
            }
        }
    }
}

/// Formatter choice for configuration and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    GeoJson,
    Flat,
}

impl OutputFormat {
    /// Name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Flat => "flat",
        }
    }

    /// The formatter for this choice.
    pub fn formatter(&self) -> Arc<dyn SampleFormatter> {
        match self {
            OutputFormat::GeoJson => Arc::new(GeoJsonFormatter),
            OutputFormat::Flat => Arc::new(FlatFormatter),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geojson" => Ok(OutputFormat::GeoJson),
            "flat" => Ok(OutputFormat::Flat),
            other => Err(format!("unknown format '{}', expected geojson or flat", other)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
