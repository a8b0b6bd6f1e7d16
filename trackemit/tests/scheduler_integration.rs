//! Integration tests for synthesis feeding the emission scheduler.
//!
//! Run with: `cargo test --test scheduler_integration`

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use trackemit::geo::{GeoProvider, Position, Spherical};
use trackemit::path::PathFeature;
use trackemit::schedule::{
    seconds, ChannelSink, EmissionDaemon, EmissionDaemonConfig, EmissionJob, EmissionScheduler,
    EntityId, JsonLinesSink, ScaledClock, ScheduleError,
};
use trackemit::synth::{synthesize, Synthesis, SynthOptions};

// ============================================================================
// Helper Functions
// ============================================================================

fn taxi_path(length_m: f64, mark: &str) -> PathFeature {
    let a = Position::new(51.608, 25.273);
    let b = Spherical.destination(&a, 120.0, length_m / 2.0);
    let c = Spherical.destination(&b, 120.0, length_m / 2.0);
    PathFeature::builder(vec![a, b, c])
        .speed(0, 0.0)
        .speed(1, 8.0)
        .speed(2, 0.0)
        .sync(2, json!({"mark": mark}))
        .property("callsign", "QTR9")
        .build()
        .unwrap()
}

fn synthesis(length_m: f64, rate: f64, mark: &str) -> Synthesis {
    let options = SynthOptions::default().with_rate(rate);
    synthesize(&taxi_path(length_m, mark), &options).unwrap()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A replaced job never leaks a sample, even when both are due at drain time.
#[test]
fn test_superseded_job_never_delivers() {
    let scheduler = EmissionScheduler::new();
    let (sink, mut rx) = ChannelSink::new();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let first = synthesis(1200.0, 20.0, "first");
    let second = synthesis(1200.0, 20.0, "second");
    let first_len = first.len();

    scheduler.schedule("QTR9", EmissionJob::from_synthesis(first, base));
    scheduler.schedule("QTR9", EmissionJob::from_synthesis(second.clone(), base));

    let remaining = scheduler.drain(base + seconds(second.duration + 1.0), &sink);
    assert_eq!(remaining, None);

    let mut delivered = Vec::new();
    while let Ok(delivery) = rx.try_recv() {
        delivered.push(delivery);
    }
    assert_eq!(delivered.len(), second.len());
    assert!(delivered.iter().all(|d| d.entity.as_str() == "QTR9"));
    assert_eq!(delivered.last().unwrap().sample.mark(), Some("second"));

    let snapshot = scheduler.metrics().snapshot();
    assert_eq!(snapshot.jobs_superseded, 1);
    assert_eq!(snapshot.stale_discarded, first_len as u64);
    assert_eq!(snapshot.outstanding(), 0);
}

#[test]
fn test_interleaved_entities_in_due_order() {
    let scheduler = EmissionScheduler::new();
    let (sink, mut rx) = ChannelSink::new();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let a = synthesis(900.0, 15.0, "a");
    let b = synthesis(600.0, 10.0, "b");
    let horizon = a.duration.max(b.duration) + 30.0;

    let job_a = EmissionJob::from_synthesis(a.clone(), base);
    let job_b = EmissionJob::from_synthesis(b.clone(), base + seconds(7.0));
    let base_b = job_b.base();
    scheduler.schedule("A", job_a);
    scheduler.schedule("B", job_b);
    scheduler.drain(base + seconds(horizon), &sink);

    let mut last_due = None;
    let mut counts = (0, 0);
    while let Ok(delivery) = rx.try_recv() {
        let start = if delivery.entity.as_str() == "A" {
            counts.0 += 1;
            base
        } else {
            counts.1 += 1;
            base_b
        };
        let due = start + seconds(delivery.sample.elapsed);
        if let Some(prev) = last_due {
            assert!(due >= prev);
        }
        last_due = Some(due);
    }
    assert_eq!(counts, (a.len(), b.len()));
}

#[test]
fn test_retire_cancels_pending_deliveries() {
    let scheduler = EmissionScheduler::new();
    let (sink, mut rx) = ChannelSink::new();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let s = synthesis(1500.0, 10.0, "stand");
    let delivered_before = s.len() / 2;
    let cut = s.samples[delivered_before - 1].elapsed;

    scheduler.schedule("QTR9", EmissionJob::from_synthesis(s.clone(), base));
    scheduler.drain(base + seconds(cut), &sink);
    assert_eq!(scheduler.retire(&EntityId::from("QTR9")), Some(2));
    assert_eq!(scheduler.retire(&EntityId::from("unknown")), None);
    scheduler.drain(base + seconds(s.duration + 60.0), &sink);

    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, delivered_before);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_anchored_job_pins_mark() {
    let s = synthesis(1000.0, 10.0, "onblock");
    let on_block = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    let job = EmissionJob::anchored(s.samples.clone(), "onblock", on_block).unwrap();
    let marked = job.samples().iter().find(|x| x.mark() == Some("onblock")).unwrap();
    assert_eq!(job.due_at(marked), on_block);
    assert!(job.base() < on_block);

    let missing = EmissionJob::anchored(s.samples, "pushback", on_block);
    assert!(matches!(missing, Err(ScheduleError::MarkNotFound(m)) if m == "pushback"));
}

#[tokio::test]
async fn test_daemon_writes_json_lines() {
    let s = synthesis(300.0, 1.0, "gate");
    let expected = s.len();

    // Replay at 1000x so the run takes well under a second
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ScaledClock::new(start, 1000.0).unwrap());

    let scheduler = Arc::new(EmissionScheduler::new());
    let (sink, writer) = JsonLinesSink::spawn(Vec::<u8>::new()).unwrap();
    scheduler.schedule("QTR9", EmissionJob::from_synthesis(s, start));

    let config = EmissionDaemonConfig::default()
        .with_idle_wait(Duration::from_millis(20))
        .with_stop_when_empty(true);
    let daemon = EmissionDaemon::new(scheduler.clone(), Arc::new(sink), config).with_clock(clock);

    tokio::time::timeout(Duration::from_secs(5), daemon.run(CancellationToken::new()))
        .await
        .expect("daemon stops once the queue is empty");

    // The daemon owned the only sink handle, so the writer drains and exits
    let output = writer.finish().unwrap();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), expected);
    assert_eq!(lines[0]["properties"]["category"], json!("start"));
    assert_eq!(lines.last().unwrap()["properties"]["mark"], json!("gate"));
    for line in &lines {
        assert_eq!(line["id"], json!("QTR9"));
        assert_eq!(line["geometry"]["type"], json!("Point"));
        assert_eq!(line["properties"]["callsign"], json!("QTR9"));
    }
}

/// Producers re-plan their entities while a consumer drains. A drain never
/// delivers a job that was already superseded when the drain began, and the
/// last job of every entity arrives in full.
#[test]
fn test_concurrent_supersede_and_drain() {
    const PRODUCERS: usize = 4;
    const JOBS: u64 = 200;

    let scheduler = EmissionScheduler::new();
    let (sink, mut rx) = ChannelSink::new();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let horizon = base + chrono::Duration::days(1);
    let template: Vec<_> = synthesis(300.0, 10.0, "gate").samples[..3].to_vec();

    let latest: Vec<AtomicU64> = (0..PRODUCERS).map(|_| AtomicU64::new(0)).collect();
    let producers_done = AtomicBool::new(false);

    let final_deliveries = std::thread::scope(|scope| {
        let consumer = scope.spawn(|| {
            let mut final_deliveries = vec![0usize; PRODUCERS];
            loop {
                let finished = producers_done.load(Ordering::SeqCst);
                let floor: Vec<u64> = latest.iter().map(|v| v.load(Ordering::SeqCst)).collect();

                scheduler.drain(horizon, &sink);

                while let Ok(delivery) = rx.try_recv() {
                    let producer: usize = delivery.entity.as_str()[1..].parse().unwrap();
                    let job = delivery.sample.sync.as_ref().unwrap()["job"].as_u64().unwrap();
                    assert!(
                        job >= floor[producer],
                        "{} delivered job {} after job {} replaced it",
                        delivery.entity,
                        job,
                        floor[producer]
                    );
                    if job == JOBS {
                        final_deliveries[producer] += 1;
                    }
                }

                if finished {
                    break final_deliveries;
                }
                std::thread::yield_now();
            }
        });

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let scheduler = &scheduler;
                let latest = &latest;
                let template = &template;
                scope.spawn(move || {
                    let entity = EntityId::from(format!("E{}", p));
                    for job in 1..=JOBS {
                        let samples = template
                            .iter()
                            .cloned()
                            .map(|mut sample| {
                                sample.sync = Some(json!({"job": job}));
                                sample
                            })
                            .collect();
                        let version =
                            scheduler.schedule(entity.clone(), EmissionJob::new(samples, base));
                        assert_eq!(version, job);
                        latest[p].store(version, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        producers_done.store(true, Ordering::SeqCst);
        consumer.join().unwrap()
    });

    assert_eq!(final_deliveries, vec![template.len(); PRODUCERS]);
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(scheduler.metrics().snapshot().outstanding(), 0);
}

#[tokio::test]
async fn test_daemon_wakes_for_earlier_job() {
    let scheduler = Arc::new(EmissionScheduler::new());
    let (sink, mut rx) = ChannelSink::new();
    // Long idle wait: only the schedule notification can get the early job out in time
    let config = EmissionDaemonConfig::default().with_idle_wait(Duration::from_secs(30));
    let daemon = EmissionDaemon::new(scheduler.clone(), Arc::new(sink), config);

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(daemon.run(shutdown.clone()));

    let late = synthesis(300.0, 10.0, "late");
    scheduler.schedule(
        "LATE",
        EmissionJob::from_synthesis(late, Utc::now() + chrono::Duration::hours(1)),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    let early = synthesis(300.0, 10.0, "early");
    scheduler.schedule("EARLY", EmissionJob::starting_now(early.samples[..1].to_vec()));

    let delivery = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("woken by the earlier job")
        .unwrap();
    assert_eq!(delivery.entity.as_str(), "EARLY");

    shutdown.cancel();
    handle.await.unwrap();
}
