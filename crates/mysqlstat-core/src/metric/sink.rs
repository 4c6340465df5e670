//! Write-only emission channel between the scrape driver and its consumer.
//!
//! The producer owns a [`ChannelSink`] for the duration of one poll; dropping
//! it closes the channel, which is how the consumer's [`ObservationStream`]
//! learns that the poll's observation sequence has ended.

use std::sync::mpsc::{self, Receiver, SyncSender};

use tracing::debug;

use super::Observation;

/// Destination for observations produced during a poll.
pub trait MetricSink {
    fn emit(&mut self, observation: Observation);
}

impl MetricSink for Vec<Observation> {
    fn emit(&mut self, observation: Observation) {
        self.push(observation);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn emit(&mut self, observation: Observation) {
        (**self).emit(observation);
    }
}

/// Producer half of a bounded observation channel.
pub struct ChannelSink {
    tx: SyncSender<Observation>,
    closed: bool,
}

impl MetricSink for ChannelSink {
    fn emit(&mut self, observation: Observation) {
        if self.closed {
            return;
        }
        if self.tx.send(observation).is_err() {
            debug!("observation stream dropped by consumer, discarding rest of poll");
            self.closed = true;
        }
    }
}

/// Consumer half: yields observations in emission order until the sink is dropped.
pub struct ObservationStream {
    rx: Receiver<Observation>,
}

impl Iterator for ObservationStream {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        self.rx.recv().ok()
    }
}

/// Creates a bounded channel. The producer blocks when `capacity` observations
/// are waiting, so producer and consumer must run on different threads unless
/// the consumer only reads after the poll and the poll fits in `capacity`.
pub fn observation_channel(capacity: usize) -> (ChannelSink, ObservationStream) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (ChannelSink { tx, closed: false }, ObservationStream { rx })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::metric::{MetricIdentity, Subsystem, ValueKind};

    fn obs(value: f64) -> Observation {
        let identity = Arc::new(MetricIdentity::new(
            Subsystem::GlobalStatus,
            "uptime",
            "Generic metric from SHOW GLOBAL STATUS.",
            &[],
        ));
        Observation::new(identity, ValueKind::Untyped, value, vec![]).unwrap()
    }

    #[test]
    fn stream_ends_when_sink_is_dropped() {
        let (mut sink, stream) = observation_channel(1);
        let producer = thread::spawn(move || {
            for i in 0..5 {
                sink.emit(obs(i as f64));
            }
        });
        let values: Vec<f64> = stream.map(|o| o.value).collect();
        producer.join().unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn emitting_after_consumer_left_is_ignored() {
        let (mut sink, stream) = observation_channel(4);
        drop(stream);
        sink.emit(obs(1.0));
        sink.emit(obs(2.0));
        assert!(sink.closed);
    }

    fn emit_one<S: MetricSink>(mut sink: S) {
        sink.emit(obs(7.0));
    }

    #[test]
    fn mutable_reference_forwards_to_vec() {
        let mut collected = Vec::new();
        emit_one(&mut collected);
        emit_one(&mut collected);
        assert_eq!(collected.len(), 2);
    }
}
