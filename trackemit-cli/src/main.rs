//! trackemit CLI - synthesize and stream position reports from route files.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use trackemit::config::{config_file_path, ConfigFile};
use trackemit::logging::{init_logging, LogLevel};
use trackemit::schedule::OutputFormat;

use commands::config::ConfigCommands;
use commands::emit::EmitArgs;
use commands::synth::SynthCommandArgs;
use commands::SynthArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "trackemit", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.trackemit/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesize a route into a GeoJSON FeatureCollection of samples
    Synth {
        /// GeoJSON LineString feature ('-' for stdin)
        input: PathBuf,

        /// Write output here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        synth: SynthArgs,
    },

    /// Stream samples of one or more routes as JSON lines at their due times
    Emit {
        /// GeoJSON LineString features
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Entity id (single input only; defaults to callsign or file name)
        #[arg(long)]
        entity: Option<String>,

        /// Seconds to wait before the first sample
        #[arg(long, default_value_t = 0.0)]
        delay_secs: f64,

        /// Sync mark to pin in time (requires --at)
        #[arg(long, requires = "at")]
        anchor: Option<String>,

        /// RFC 3339 instant at which the anchor mark is emitted
        #[arg(long, requires = "anchor")]
        at: Option<String>,

        /// Emission clock speed against real time (overrides scheduler.speed)
        #[arg(long, value_name = "FACTOR")]
        speed_factor: Option<f64>,

        /// RFC 3339 instant the emission clock starts at (defaults to now)
        #[arg(long, value_name = "TIME")]
        start_time: Option<String>,

        /// Output line format: geojson or flat (overrides scheduler.format)
        #[arg(long)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        synth: SynthArgs,
    },

    /// View or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(config_file_path);

    let command = match cli.command {
        Commands::Config { command } => return commands::config::run(command, &config_path),
        other => other,
    };

    let config = ConfigFile::load_from(&config_path)?;
    let mut log_config = config.logging.clone();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    let _log_guard = init_logging(&log_config)?;
    tracing::debug!(
        version = trackemit::VERSION,
        config = %config_path.display(),
        "trackemit starting"
    );

    match command {
        Commands::Synth {
            input,
            out,
            compact,
            synth,
        } => commands::synth::run(
            SynthCommandArgs {
                input,
                out,
                compact,
                synth,
            },
            &config,
        ),
        Commands::Emit {
            inputs,
            entity,
            delay_secs,
            anchor,
            at,
            speed_factor,
            start_time,
            format,
            synth,
        } => commands::emit::run(
            EmitArgs {
                inputs,
                entity,
                delay_secs,
                anchor,
                at,
                speed_factor,
                start_time,
                format,
                synth,
            },
            &config,
        ),
        Commands::Config { .. } => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
