//! Emit command - stream samples as JSON lines at their due instants.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use trackemit::config::ConfigFile;
use trackemit::schedule::{
    seconds, EmissionClock, EmissionDaemon, EmissionJob, EmissionScheduler, EntityId,
    JsonLinesSink, OutputFormat, ScaledClock, SystemClock,
};
use trackemit::synth::Synthesis;

use super::{read_feature, synthesizer, SynthArgs};
use crate::error::CliError;

/// Arguments for the emit command.
pub struct EmitArgs {
    pub inputs: Vec<PathBuf>,
    pub entity: Option<String>,
    pub delay_secs: f64,
    pub anchor: Option<String>,
    pub at: Option<String>,
    pub speed_factor: Option<f64>,
    pub start_time: Option<String>,
    pub format: Option<OutputFormat>,
    pub synth: SynthArgs,
}

/// Entity id for an input: explicit, else the `callsign` property, else the
/// file stem.
fn entity_for(input: &Path, synthesis: &Synthesis, explicit: Option<&str>) -> EntityId {
    if let Some(id) = explicit {
        return EntityId::from(id);
    }
    if let Some(callsign) = synthesis.properties.get("callsign").and_then(|v| v.as_str()) {
        return EntityId::from(callsign);
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entity".to_string());
    EntityId::from(stem)
}

/// Build the emission job for one synthesis.
fn build_job(
    synthesis: Synthesis,
    anchor: Option<(&str, DateTime<Utc>)>,
    start: DateTime<Utc>,
) -> Result<EmissionJob, CliError> {
    match anchor {
        Some((mark, moment)) => Ok(EmissionJob::anchored(synthesis.samples, mark, moment)?),
        None => Ok(EmissionJob::from_synthesis(synthesis, start)),
    }
}

fn parse_instant(flag: &str, text: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(text)
        .map(|moment| moment.with_timezone(&Utc))
        .map_err(|e| CliError::Config(format!("Invalid {} time '{}': {}", flag, text, e)))
}

fn parse_anchor(args: &EmitArgs) -> Result<Option<(&str, DateTime<Utc>)>, CliError> {
    match (&args.anchor, &args.at) {
        (None, None) => Ok(None),
        (Some(mark), Some(at)) => Ok(Some((mark.as_str(), parse_instant("--at", at)?))),
        _ => Err(CliError::Config(
            "--anchor and --at must be given together".to_string(),
        )),
    }
}

/// Clock the daemon runs on: the wall clock, or a scaled clock when a speed
/// factor or a start time is given.
fn emission_clock(
    args: &EmitArgs,
    config: &ConfigFile,
) -> Result<Arc<dyn EmissionClock>, CliError> {
    let speed = args.speed_factor.unwrap_or(config.scheduler.speed);
    let start = args
        .start_time
        .as_deref()
        .map(|text| parse_instant("--start-time", text))
        .transpose()?;

    if speed == 1.0 && start.is_none() {
        return Ok(Arc::new(SystemClock));
    }
    let clock = ScaledClock::new(start.unwrap_or_else(Utc::now), speed)?;
    info!(speed, start = %clock.now(), "Using scaled emission clock");
    Ok(Arc::new(clock))
}

/// Instant of the first sample: `now` plus the requested delay.
fn start_instant(now: DateTime<Utc>, delay_secs: f64) -> Result<DateTime<Utc>, CliError> {
    if !(delay_secs.is_finite() && delay_secs >= 0.0) {
        return Err(CliError::Config(format!(
            "--delay-secs must be non-negative, got {}",
            delay_secs
        )));
    }
    now.checked_add_signed(seconds(delay_secs)).ok_or_else(|| {
        CliError::Config(format!("--delay-secs {} is out of range", delay_secs))
    })
}

/// Run the emit command.
pub fn run(args: EmitArgs, config: &ConfigFile) -> Result<(), CliError> {
    if args.entity.is_some() && args.inputs.len() > 1 {
        return Err(CliError::Config(
            "--entity can only be used with a single input".to_string(),
        ));
    }

    let anchor = parse_anchor(&args)?;
    let clock = emission_clock(&args, config)?;
    let start = start_instant(clock.now(), args.delay_secs)?;
    let options = args.synth.resolve(config);
    let synthesizer = synthesizer(config);

    let scheduler = Arc::new(EmissionScheduler::new());
    for input in &args.inputs {
        let path = read_feature(input)?;
        let synthesis = synthesizer.synthesize(&path, &options)?;
        let entity = entity_for(input, &synthesis, args.entity.as_deref());
        let duration = synthesis.duration;
        let job = build_job(synthesis, anchor, start)?;

        info!(
            entity = %entity,
            samples = job.len(),
            duration_s = duration,
            starts = %job.base(),
            "Entity queued"
        );
        scheduler.schedule(entity, job);
    }

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, stopping...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("Failed to create tokio runtime: {}", e)))?;

    let format = args.format.unwrap_or(config.scheduler.format);
    let (sink, writer) = JsonLinesSink::spawn_with_formatter(std::io::stdout(), format.formatter())
        .map_err(|e| CliError::Runtime(format!("Failed to start output writer: {}", e)))?;
    let daemon_config = config.scheduler.daemon_config().with_stop_when_empty(true);
    let daemon = EmissionDaemon::new(Arc::clone(&scheduler), Arc::new(sink), daemon_config)
        .with_clock(clock);
    runtime.block_on(daemon.run(shutdown));

    writer.finish().map_err(|source| CliError::Write {
        path: PathBuf::from("-"),
        source,
    })?;

    let snapshot = scheduler.metrics().snapshot();
    info!(
        delivered = snapshot.delivered,
        outstanding = snapshot.outstanding(),
        format = %format,
        "Emission finished"
    );
    Ok(())
}
