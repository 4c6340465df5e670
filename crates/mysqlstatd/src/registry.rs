//! Prometheus registry adapter.
//!
//! Bridges the synchronous scrape driver into `prometheus::Registry`: every
//! `gather()` runs exactly one poll and converts its observations into
//! metric families.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, LabelPair, MetricFamily, MetricType};
use tracing::{error, warn};

use mysqlstat_core::collector::StatusSource;
use mysqlstat_core::{Exporter, MetricIdentity, Observation, ValueKind, observation_channel};

/// Observations buffered between the producer thread and the family builder.
const CHANNEL_CAPACITY: usize = 256;

/// [`Collector`] running one [`Exporter`] poll per collect.
pub struct ExporterCollector<S> {
    exporter: Exporter<S>,
    descs: Vec<Desc>,
    /// Single-flight gate: the exporter's self-metrics are shared between polls.
    poll_gate: Mutex<()>,
}

impl<S> ExporterCollector<S>
where
    S: StatusSource + Send + Sync,
{
    /// Wraps `exporter` and harvests its descriptors with a dry-run poll.
    pub fn new(exporter: Exporter<S>) -> Self {
        let identities = exporter.describe();
        let descs = descs_from_identities(&identities);
        Self {
            exporter,
            descs,
            poll_gate: Mutex::new(()),
        }
    }

    fn poll(&self) -> Vec<MetricFamily> {
        let _gate = self.poll_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let (sink, stream) = observation_channel(CHANNEL_CAPACITY);

        thread::scope(|s| {
            let producer = s.spawn(move || self.exporter.collect(sink));
            let families = build_families(stream);
            if producer.join().is_err() {
                error!("scrape thread panicked, exposing partial results");
            }
            families
        })
    }
}

impl<S> Collector for ExporterCollector<S>
where
    S: StatusSource + Send + Sync,
{
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.poll()
    }
}

fn descs_from_identities(identities: &[Arc<MetricIdentity>]) -> Vec<Desc> {
    let mut seen = HashSet::new();
    identities
        .iter()
        .filter(|identity| seen.insert(identity.fq_name()))
        .filter_map(|identity| {
            match Desc::new(
                identity.fq_name(),
                identity.help.clone(),
                identity.label_names.clone(),
                HashMap::new(),
            ) {
                Ok(desc) => Some(desc),
                Err(e) => {
                    warn!(metric = %identity.fq_name(), error = %e, "skipping invalid metric description");
                    None
                }
            }
        })
        .collect()
}

/// Groups observations by fully-qualified name, keeping emission order
/// within each family. The first observation of a name fixes its help and type.
fn build_families(observations: impl IntoIterator<Item = Observation>) -> Vec<MetricFamily> {
    let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
    for obs in observations {
        let family = families.entry(obs.identity.fq_name()).or_insert_with_key(|name| {
            let mut family = MetricFamily::default();
            family.set_name(name.clone());
            family.set_help(obs.identity.help.clone());
            family.set_field_type(metric_type(obs.kind));
            family
        });
        if family.get_field_type() != metric_type(obs.kind) {
            warn!(metric = family.get_name(), "observation kind differs from family type, dropped");
            continue;
        }
        family.mut_metric().push(to_metric(&obs));
    }
    families.into_values().collect()
}

fn metric_type(kind: ValueKind) -> MetricType {
    match kind {
        ValueKind::Counter => MetricType::COUNTER,
        ValueKind::Gauge => MetricType::GAUGE,
        ValueKind::Untyped => MetricType::UNTYPED,
    }
}

fn to_metric(obs: &Observation) -> proto::Metric {
    let mut metric = proto::Metric::default();

    let mut labels: Vec<LabelPair> = obs
        .identity
        .label_names
        .iter()
        .zip(&obs.label_values)
        .map(|(name, value)| {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            pair
        })
        .collect();
    labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));
    for pair in labels {
        metric.mut_label().push(pair);
    }

    match obs.kind {
        ValueKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(obs.value);
            metric.set_counter(counter);
        }
        ValueKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(obs.value);
            metric.set_gauge(gauge);
        }
        ValueKind::Untyped => {
            let mut untyped = proto::Untyped::default();
            untyped.set_value(obs.value);
            metric.set_untyped(untyped);
        }
    }
    metric
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysqlstat_core::ScrapeConfig;
    use mysqlstat_core::collector::MockSource;
    use mysqlstat_core::collector::queries;
    use prometheus::Registry;

    use crate::exposition::encode_text;

    fn collector(source: MockSource) -> ExporterCollector<MockSource> {
        let config = ScrapeConfig {
            perf_schema_table_waits: true,
            user_statistics: true,
            deadline: None,
        };
        ExporterCollector::new(Exporter::new(source, config).unwrap())
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families.iter().find(|f| f.get_name() == name).unwrap()
    }

    #[test]
    fn describe_runs_at_construction() {
        let source = MockSource::with_optional_tables();
        let collector = collector(source.clone());

        let names: Vec<&str> = collector.desc().iter().map(|d| d.fq_name.as_str()).collect();
        assert!(names.contains(&"db_global_status_commands_total"));
        assert!(names.contains(&"db_perf_schema_table_io_waits_total"));
        assert!(names.contains(&"db_exporter_last_scrape_error"));
        assert_eq!(collector.exporter.self_metrics().scrapes_total(), 1.0);
        assert_eq!(source.open_connections(), 0);
    }

    #[test]
    fn labeled_family_groups_all_label_values() {
        let families = collector(MockSource::with_optional_tables()).collect();

        let commands = family(&families, "db_global_status_commands_total");
        assert_eq!(commands.get_field_type(), MetricType::COUNTER);
        assert_eq!(commands.get_help(), "Total number of executed MySQL commands.");
        let values: Vec<(&str, f64)> = commands
            .get_metric()
            .iter()
            .map(|m| (m.get_label()[0].get_value(), m.get_counter().get_value()))
            .collect();
        assert_eq!(values, vec![("insert", 42.0), ("select", 1200.0)]);

        let waits = family(&families, "db_perf_schema_table_io_waits_total");
        assert_eq!(waits.get_metric().len(), 12);
        let label_names: Vec<&str> = waits.get_metric()[0]
            .get_label()
            .iter()
            .map(|l| l.get_name())
            .collect();
        assert_eq!(label_names, vec!["name", "operation", "schema"]);
    }

    #[test]
    fn untyped_and_gauge_values_are_set() {
        let families = collector(MockSource::with_optional_tables()).collect();

        let uptime = family(&families, "db_global_status_uptime");
        assert_eq!(uptime.get_field_type(), MetricType::UNTYPED);
        assert_eq!(uptime.get_metric()[0].get_untyped().get_value(), 86400.0);

        let error = family(&families, "db_exporter_last_scrape_error");
        assert_eq!(error.get_field_type(), MetricType::GAUGE);
        assert_eq!(error.get_metric()[0].get_gauge().get_value(), 0.0);
    }

    #[test]
    fn every_collect_is_one_poll() {
        let collector = collector(MockSource::with_optional_tables());
        collector.collect();
        let families = collector.collect();
        let scrapes = family(&families, "db_exporter_scrapes_total");
        assert_eq!(scrapes.get_metric()[0].get_counter().get_value(), 3.0);
    }

    #[test]
    fn failed_poll_still_exposes_self_metrics() {
        let source = MockSource::typical_primary()
            .with_query_error(queries::SLAVE_STATUS, "Access denied");
        let families = collector(source).collect();

        let error = family(&families, "db_exporter_last_scrape_error");
        assert_eq!(error.get_metric()[0].get_gauge().get_value(), 1.0);
        assert!(families.iter().any(|f| f.get_name() == "db_global_status_commands_total"));
        assert!(!families.iter().any(|f| f.get_name().starts_with("db_slave_status_")));
    }

    #[test]
    fn registry_gathers_and_encodes() {
        let registry = Registry::new();
        let exporter = Exporter::new(MockSource::typical_replica(), ScrapeConfig::default()).unwrap();
        registry
            .register(Box::new(ExporterCollector::new(exporter)))
            .unwrap();

        let mut buffer = Vec::new();
        encode_text(&registry.gather(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("# TYPE db_global_status_commands_total counter"));
        assert!(text.contains("db_global_status_commands_total{command=\"insert\"} 42"));
        assert!(text.contains("# TYPE db_slave_status_master_log_file untyped"));
        assert!(text.contains("db_slave_status_master_log_file 123"));
        assert!(text.contains("db_exporter_scrapes_total 2"));
    }

    #[test]
    fn unreachable_server_still_registers() {
        let registry = Registry::new();
        let source = MockSource::new().refuse_connections("connection refused");
        registry.register(Box::new(collector(source))).unwrap();

        let families = registry.gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert_eq!(
            names,
            vec![
                "db_exporter_last_scrape_duration_seconds",
                "db_exporter_last_scrape_error",
                "db_exporter_scrapes_total",
            ]
        );
    }
}
