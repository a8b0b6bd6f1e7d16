//! Delivery targets for due samples.

use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::format::{GeoJsonFormatter, SampleFormatter};
use super::job::EntityId;
use crate::synth::Sample;

/// Receives samples as they fall due.
///
/// `publish` runs with the scheduler lock held, once per delivered sample,
/// in due order. It must not call back into the scheduler (the lock is not
/// reentrant) and must not block: hand the sample to a channel or a buffer.
pub trait SampleSink: Send + Sync {
    /// Deliver one sample.
    fn publish(&self, entity: &EntityId, sample: &Sample);
}

impl<T: SampleSink + ?Sized> SampleSink for Arc<T> {
    fn publish(&self, entity: &EntityId, sample: &Sample) {
        (**self).publish(entity, sample)
    }
}

/// A delivered sample with its entity.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub entity: EntityId,
    pub sample: Sample,
}

/// Forwards deliveries to a tokio unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SampleSink for ChannelSink {
    fn publish(&self, entity: &EntityId, sample: &Sample) {
        let delivery = Delivery {
            entity: entity.clone(),
            sample: sample.clone(),
        };
        if self.tx.send(delivery).is_err() {
            trace!(entity = %entity, "Receiver dropped, sample discarded");
        }
    }
}

/// Writes each delivery as one line of JSON.
///
/// `publish` only formats and queues the line. The I/O happens on a
/// dedicated writer thread.
pub struct JsonLinesSink {
    formatter: Arc<dyn SampleFormatter>,
    lines: mpsc::UnboundedSender<String>,
}

/// Handle on the writer thread of a [`JsonLinesSink`].
pub struct LineWriter<W> {
    handle: JoinHandle<W>,
}

impl JsonLinesSink {
    /// Start a writer thread over `writer`, formatting as GeoJSON features.
    pub fn spawn<W>(writer: W) -> std::io::Result<(Self, LineWriter<W>)>
    where
        W: Write + Send + 'static,
    {
        Self::spawn_with_formatter(writer, Arc::new(GeoJsonFormatter))
    }

    /// Start a writer thread over `writer` with a custom formatter.
    pub fn spawn_with_formatter<W>(
        writer: W,
        formatter: Arc<dyn SampleFormatter>,
    ) -> std::io::Result<(Self, LineWriter<W>)>
    where
        W: Write + Send + 'static,
    {
        let (lines, mut rx) = mpsc::unbounded_channel::<String>();
        let handle = std::thread::Builder::new()
            .name("trackemit-lines".into())
            .spawn(move || {
                let mut writer = writer;
                let mut written = 0u64;
                while let Some(line) = rx.blocking_recv() {
                    let result = writer
                        .write_all(line.as_bytes())
                        .and_then(|_| writer.write_all(b"\n"))
                        .and_then(|_| writer.flush());
                    match result {
                        Ok(()) => written += 1,
                        Err(e) => warn!(error = %e, "Failed to write sample"),
                    }
                }
                debug!(lines = written, "Line writer finished");
                writer
            })?;
        Ok((Self { formatter, lines }, LineWriter { handle }))
    }

    /// Name of the output format.
    pub fn format_name(&self) -> &'static str {
        self.formatter.name()
    }
}

impl SampleSink for JsonLinesSink {
    fn publish(&self, entity: &EntityId, sample: &Sample) {
        let line = self.formatter.format(entity, sample).to_string();
        if self.lines.send(line).is_err() {
            warn!(entity = %entity, "Line writer gone, sample discarded");
        }
    }
}

impl<W> LineWriter<W> {
    /// Wait for every queued line to be written and return the writer.
    ///
    /// Returns once all [`JsonLinesSink`] handles feeding this writer have
    /// been dropped.
    pub fn finish(self) -> std::io::Result<W> {
        self.handle
            .join()
            .map_err(|_| std::io::Error::other("line writer thread panicked"))
    }
}
