//! Typed, labeled observations and the sink they are emitted into.
//!
//! An [`Observation`] is the only thing the collector produces. Its
//! [`MetricIdentity`] is stable for a given raw column name, so the
//! exposition side sees the same metric schema on every poll.

mod sink;

use std::fmt;
use std::sync::Arc;

pub use sink::{ChannelSink, MetricSink, ObservationStream, observation_channel};

/// Namespace prefix of every exported metric.
pub const NAMESPACE: &str = "db";

/// Second component of a metric name, chosen by the query that produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    Exporter,
    GlobalStatus,
    SlaveStatus,
    PerfSchema,
    InfoSchema,
}

impl Subsystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Exporter => "exporter",
            Subsystem::GlobalStatus => "global_status",
            Subsystem::SlaveStatus => "slave_status",
            Subsystem::PerfSchema => "perf_schema",
            Subsystem::InfoSchema => "info_schema",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value semantics of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Counter,
    Gauge,
    Untyped,
}

/// Stable identity of a metric: namespace, subsystem, name and label names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    pub subsystem: Subsystem,
    pub name: String,
    /// One-line description shown by the exposition format.
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricIdentity {
    pub fn new(
        subsystem: Subsystem,
        name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
    ) -> Self {
        Self {
            subsystem,
            name: name.into(),
            help: help.into(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    /// Fully-qualified name: `<namespace>_<subsystem>_<name>`.
    pub fn fq_name(&self) -> String {
        format!("{}_{}_{}", NAMESPACE, self.subsystem, self.name)
    }
}

/// One typed, labeled data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identity: Arc<MetricIdentity>,
    pub kind: ValueKind,
    pub value: f64,
    /// Label values, in the order of `identity.label_names`.
    pub label_values: Vec<String>,
}

impl Observation {
    /// Builds an observation, or `None` if the value is not finite or the
    /// number of label values does not match the identity.
    pub fn new(
        identity: Arc<MetricIdentity>,
        kind: ValueKind,
        value: f64,
        label_values: Vec<String>,
    ) -> Option<Self> {
        if !value.is_finite() || label_values.len() != identity.label_names.len() {
            return None;
        }
        Some(Self {
            identity,
            kind,
            value,
            label_values,
        })
    }

    /// Value of the named label, if the identity declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.identity
            .label_names
            .iter()
            .position(|l| l == name)
            .map(|idx| self.label_values[idx].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Arc<MetricIdentity> {
        Arc::new(MetricIdentity::new(
            Subsystem::GlobalStatus,
            "commands_total",
            "Total number of executed MySQL commands.",
            &["command"],
        ))
    }

    #[test]
    fn fq_name_joins_namespace_subsystem_and_name() {
        assert_eq!(commands().fq_name(), "db_global_status_commands_total");
        assert_eq!(commands().namespace(), "db");
    }

    #[test]
    fn observation_rejects_non_finite_values() {
        let labels = vec!["x".to_string()];
        assert!(Observation::new(commands(), ValueKind::Counter, f64::NAN, labels.clone()).is_none());
        assert!(Observation::new(commands(), ValueKind::Gauge, f64::INFINITY, labels).is_none());
    }

    #[test]
    fn observation_rejects_label_arity_mismatch() {
        assert!(Observation::new(commands(), ValueKind::Counter, 1.0, vec![]).is_none());
        assert!(
            Observation::new(
                commands(),
                ValueKind::Counter,
                1.0,
                vec!["a".into(), "b".into()]
            )
            .is_none()
        );
    }

    #[test]
    fn label_lookup_by_name() {
        let obs =
            Observation::new(commands(), ValueKind::Counter, 3.0, vec!["select".into()]).unwrap();
        assert_eq!(obs.label("command"), Some("select"));
        assert_eq!(obs.label("user"), None);
    }
}
