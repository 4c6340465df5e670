//! Exporter self-observation: duration, count and error flag of the last poll.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Counter, Gauge, Opts};

use crate::error::SetupError;
use crate::metric::{MetricIdentity, MetricSink, NAMESPACE, Observation, Subsystem, ValueKind};

/// The three long-lived meta-metrics. Created once, mutated in place by
/// every poll, emitted after every poll.
pub struct SelfMetrics {
    duration: Tracked<Gauge>,
    scrapes: Tracked<Counter>,
    error: Tracked<Gauge>,
}

struct Tracked<M> {
    identity: Arc<MetricIdentity>,
    metric: M,
}

fn opts(identity: &MetricIdentity) -> Opts {
    Opts::new(identity.name.clone(), identity.help.clone())
        .namespace(NAMESPACE)
        .subsystem(identity.subsystem.as_str())
}

fn identity(name: &str, help: &str) -> Arc<MetricIdentity> {
    Arc::new(MetricIdentity::new(Subsystem::Exporter, name, help, &[]))
}

impl SelfMetrics {
    pub fn new() -> Result<Self, SetupError> {
        let duration = identity(
            "last_scrape_duration_seconds",
            "Duration of the last scrape of metrics from MySQL.",
        );
        let scrapes = identity(
            "scrapes_total",
            "Total number of times MySQL was scraped for metrics.",
        );
        let error = identity(
            "last_scrape_error",
            "Whether the last scrape of metrics from MySQL resulted in an error (1 for error, 0 for success).",
        );
        Ok(Self {
            duration: Tracked {
                metric: Gauge::with_opts(opts(&duration))?,
                identity: duration,
            },
            scrapes: Tracked {
                metric: Counter::with_opts(opts(&scrapes))?,
                identity: scrapes,
            },
            error: Tracked {
                metric: Gauge::with_opts(opts(&error))?,
                identity: error,
            },
        })
    }

    /// Poll entry: clears the error flag and counts the attempt.
    pub(crate) fn begin(&self) {
        self.error.metric.set(0.0);
        self.scrapes.metric.inc();
    }

    /// Poll exit, on every path.
    pub(crate) fn finish(&self, elapsed: Duration, failed: bool) {
        self.duration.metric.set(elapsed.as_secs_f64());
        if failed {
            self.error.metric.set(1.0);
        }
    }

    /// Emits the current values: duration, total scrapes, error flag.
    pub fn emit(&self, sink: &mut impl MetricSink) {
        let current = [
            (&self.duration.identity, ValueKind::Gauge, self.duration.metric.get()),
            (&self.scrapes.identity, ValueKind::Counter, self.scrapes.metric.get()),
            (&self.error.identity, ValueKind::Gauge, self.error.metric.get()),
        ];
        for (identity, kind, value) in current {
            if let Some(obs) = Observation::new(identity.clone(), kind, value, Vec::new()) {
                sink.emit(obs);
            }
        }
    }

    pub fn last_duration(&self) -> f64 {
        self.duration.metric.get()
    }

    pub fn scrapes_total(&self) -> f64 {
        self.scrapes.metric.get()
    }

    pub fn last_error(&self) -> f64 {
        self.error.metric.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metrics_are_zero_and_emitted() {
        let metrics = SelfMetrics::new().unwrap();
        let mut out: Vec<Observation> = Vec::new();
        metrics.emit(&mut out);

        let names: Vec<String> = out.iter().map(|o| o.identity.fq_name()).collect();
        assert_eq!(
            names,
            vec![
                "db_exporter_last_scrape_duration_seconds",
                "db_exporter_scrapes_total",
                "db_exporter_last_scrape_error",
            ]
        );
        assert!(out.iter().all(|o| o.value == 0.0));
        assert_eq!(out[1].kind, ValueKind::Counter);
    }

    #[test]
    fn error_flag_reflects_only_latest_poll() {
        let metrics = SelfMetrics::new().unwrap();

        metrics.begin();
        metrics.finish(Duration::from_millis(250), true);
        assert_eq!(metrics.last_error(), 1.0);
        assert_eq!(metrics.last_duration(), 0.25);

        metrics.begin();
        assert_eq!(metrics.last_error(), 0.0);
        metrics.finish(Duration::from_millis(10), false);
        assert_eq!(metrics.last_error(), 0.0);
        assert_eq!(metrics.scrapes_total(), 2.0);
    }
}
