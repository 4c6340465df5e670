//! Column classification.
//!
//! Maps raw status variable and column names onto stable metric identities.
//! Rules are tried in order: exact-match tables, then the global status
//! pattern families, then a generic untyped fallback. The fallback never
//! fails, so columns added by future server versions are always exported.
//!
//! All tables are built once in [`Classifier::new`] and never change.

mod user_stats;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use tracing::warn;

use crate::error::SetupError;
use crate::metric::{MetricIdentity, Observation, Subsystem, ValueKind};
use user_stats::USER_STATISTICS_COLUMNS;

const GLOBAL_STATUS_PATTERN: &str = r"^(com|connection_errors|innodb_rows|performance_schema)_(.*)$";

const GLOBAL_STATUS_HELP: &str = "Generic metric from SHOW GLOBAL STATUS.";
const SLAVE_STATUS_HELP: &str = "Generic metric from SHOW SLAVE STATUS.";

/// Operations reported by the table I/O waits summary, in column order.
pub const TABLE_IO_OPERATIONS: [&str; 6] = ["read", "write", "fetch", "insert", "update", "delete"];

/// A resolved metric for one column: identity and value kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRule {
    pub identity: Arc<MetricIdentity>,
    pub kind: ValueKind,
}

impl ColumnRule {
    fn new(identity: MetricIdentity, kind: ValueKind) -> Self {
        Self {
            identity: Arc::new(identity),
            kind,
        }
    }

    /// Builds the observation for `value` with the given label values.
    pub fn observe(&self, value: f64, label_values: Vec<String>) -> Option<Observation> {
        Observation::new(self.identity.clone(), self.kind, value, label_values)
    }
}

/// Global status classification: the rule plus the label values it derived from the key.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub rule: ColumnRule,
    pub label_values: Vec<String>,
}

/// Immutable rule tables for every query path.
#[derive(Debug)]
pub struct Classifier {
    global_status: Regex,
    commands: ColumnRule,
    connection_errors: ColumnRule,
    innodb_row_ops: ColumnRule,
    performance_schema_lost: ColumnRule,
    table_io_waits: ColumnRule,
    user_statistics: HashMap<&'static str, ColumnRule>,
}

impl Classifier {
    pub fn new() -> Result<Self, SetupError> {
        let family = |name: &str, help: &str, label: &str| {
            ColumnRule::new(
                MetricIdentity::new(Subsystem::GlobalStatus, name, help, &[label]),
                ValueKind::Counter,
            )
        };

        let user_statistics = USER_STATISTICS_COLUMNS
            .iter()
            .map(|col| {
                let identity = MetricIdentity::new(
                    Subsystem::InfoSchema,
                    format!("user_statistics_{}", col.column.to_lowercase()),
                    col.help,
                    &["user"],
                );
                (col.column, ColumnRule::new(identity, col.kind))
            })
            .collect();

        Ok(Self {
            global_status: Regex::new(GLOBAL_STATUS_PATTERN)?,
            commands: family(
                "commands_total",
                "Total number of executed MySQL commands.",
                "command",
            ),
            connection_errors: family(
                "connection_errors_total",
                "Total number of MySQL connection errors.",
                "error",
            ),
            innodb_row_ops: family(
                "innodb_row_ops_total",
                "Total number of MySQL InnoDB row operations.",
                "operation",
            ),
            performance_schema_lost: family(
                "performance_schema_lost_total",
                "Total number of MySQL instrumentations that could not be loaded or created due to memory constraints.",
                "instrumentation",
            ),
            table_io_waits: ColumnRule::new(
                MetricIdentity::new(
                    Subsystem::PerfSchema,
                    "table_io_waits_total",
                    "The total number of table I/O wait events for each table and operation.",
                    &["schema", "name", "operation"],
                ),
                ValueKind::Counter,
            ),
            user_statistics,
        })
    }

    /// Classifies one `SHOW GLOBAL STATUS` variable name.
    pub fn classify_global_status(&self, key: &str) -> Classified {
        let key = key.to_lowercase();
        if let Some(caps) = self.global_status.captures(&key) {
            let rule = match &caps[1] {
                "com" => &self.commands,
                "connection_errors" => &self.connection_errors,
                "innodb_rows" => &self.innodb_row_ops,
                _ => &self.performance_schema_lost,
            };
            return Classified {
                rule: rule.clone(),
                label_values: vec![caps[2].to_string()],
            };
        }
        Classified {
            rule: fallback(Subsystem::GlobalStatus, &key, GLOBAL_STATUS_HELP),
            label_values: Vec::new(),
        }
    }

    /// Resolves every `SHOW SLAVE STATUS` column. All are untyped and unlabeled.
    ///
    /// One entry per column; `None` marks a column whose metric name is
    /// already taken by an earlier column.
    pub fn slave_status_plan(&self, columns: &[String]) -> Vec<Option<ColumnRule>> {
        dedup_plan(columns.iter().map(|col| {
            (
                col.as_str(),
                fallback(Subsystem::SlaveStatus, &col.to_lowercase(), SLAVE_STATUS_HELP),
            )
        }))
    }

    /// Resolves `USER_STATISTICS` columns after the first (the user name).
    /// Unknown columns become untyped `user_statistics_<column>` metrics.
    /// Name collisions are resolved as in [`Classifier::slave_status_plan`].
    pub fn user_statistics_plan(&self, columns: &[String]) -> Vec<Option<ColumnRule>> {
        dedup_plan(columns.iter().skip(1).map(|col| {
            let rule = match self.user_statistics.get(col.as_str()) {
                Some(rule) => rule.clone(),
                None => ColumnRule::new(
                    MetricIdentity::new(
                        Subsystem::InfoSchema,
                        format!("user_statistics_{}", sanitize_name(&col.to_lowercase())),
                        format!("Unsupported metric from column {}", col),
                        &["user"],
                    ),
                    ValueKind::Untyped,
                ),
            };
            (col.as_str(), rule)
        }))
    }

    /// Shared identity of all table I/O wait counters.
    pub fn table_io_waits(&self) -> &ColumnRule {
        &self.table_io_waits
    }
}

/// Keeps the first column of every fully-qualified name.
fn dedup_plan<'a>(rules: impl Iterator<Item = (&'a str, ColumnRule)>) -> Vec<Option<ColumnRule>> {
    let mut seen = HashSet::new();
    rules
        .map(|(column, rule)| {
            let fq_name = rule.identity.fq_name();
            if seen.insert(fq_name.clone()) {
                Some(rule)
            } else {
                warn!(column, metric = %fq_name, "column maps to an already exported metric, skipped");
                None
            }
        })
        .collect()
}

fn fallback(subsystem: Subsystem, lower_name: &str, help: &str) -> ColumnRule {
    ColumnRule::new(
        MetricIdentity::new(subsystem, sanitize_name(lower_name), help, &[]),
        ValueKind::Untyped,
    )
}

/// Replaces characters that cannot appear in a metric name with `_`.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
