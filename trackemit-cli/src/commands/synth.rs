//! Synth command - turn a route into a GeoJSON FeatureCollection of samples.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;
use trackemit::config::ConfigFile;

use super::{read_feature, synthesizer, SynthArgs};
use crate::error::CliError;

/// Arguments for the synth command.
pub struct SynthCommandArgs {
    pub input: PathBuf,
    pub out: Option<PathBuf>,
    pub compact: bool,
    pub synth: SynthArgs,
}

/// Run the synth command.
pub fn run(args: SynthCommandArgs, config: &ConfigFile) -> Result<(), CliError> {
    let path = read_feature(&args.input)?;
    let options = args.synth.resolve(config);
    let synthesis = synthesizer(config).synthesize(&path, &options)?;

    info!(
        input = %args.input.display(),
        vertices = path.len(),
        samples = synthesis.len(),
        duration_s = synthesis.duration,
        "Route synthesized"
    );

    let collection = synthesis.to_feature_collection();
    let text = if args.compact {
        serde_json::to_string(&collection)
    } else {
        serde_json::to_string_pretty(&collection)
    }
    .map_err(|e| CliError::Runtime(e.to_string()))?;

    match &args.out {
        Some(out) => std::fs::write(out, text + "\n").map_err(|source| CliError::Write {
            path: out.clone(),
            source,
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text).map_err(|source| CliError::Write {
                path: PathBuf::from("-"),
                source,
            })
        }
    }
}
