//! Scrape driver.
//!
//! One poll walks a fixed sequence of states against a single connection:
//!
//! ```text
//! Connecting ─► GlobalStatus ─► SlaveStatus ─► [PerfSchemaTableWaits] ─► [UserStatistics] ─► Done
//!      │              │              │                  │                       │
//!      └──────────────┴──────────────┴──────────────────┴───────────────────────┴──► Failed
//! ```
//!
//! Optional states run only when enabled in [`ScrapeConfig`]. A connect,
//! query or scan error stops the poll; observations already emitted stay
//! emitted. Whatever the outcome, the three self-observation metrics are
//! updated and emitted last, and the connection is dropped before
//! [`Exporter::collect`] returns.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::classifier::{Classifier, TABLE_IO_OPERATIONS};
use super::parser::StatusParser;
use super::queries;
use super::self_metrics::SelfMetrics;
use super::source::{ResultStream, StatusConnection, StatusSource};
use super::{ScrapeConfig, ScrapeStage};
use crate::error::{ScrapeError, SetupError, SourceError};
use crate::metric::{MetricIdentity, MetricSink, Observation};

/// Outcome of one poll.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub duration: Duration,
    /// Observations emitted by the queries, not counting the self-metrics.
    pub observations: usize,
    pub rows_seen: usize,
    pub error: Option<ScrapeError>,
}

impl ScrapeReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-poll state. Created at poll entry, discarded at poll exit.
struct ScrapeState<'a, K: MetricSink> {
    started: Instant,
    rows_seen: usize,
    observations: usize,
    sink: &'a mut K,
}

impl<K: MetricSink> ScrapeState<'_, K> {
    fn emit(&mut self, observation: Option<Observation>) {
        if let Some(observation) = observation {
            self.sink.emit(observation);
            self.observations += 1;
        }
    }
}

/// Polls one MySQL server and turns its status into observations.
pub struct Exporter<S> {
    source: S,
    config: ScrapeConfig,
    parser: StatusParser,
    classifier: Classifier,
    self_metrics: SelfMetrics,
}

impl<S: StatusSource> Exporter<S> {
    /// Builds the rule tables and self-metrics once.
    pub fn new(source: S, config: ScrapeConfig) -> Result<Self, SetupError> {
        Ok(Self {
            source,
            config,
            parser: StatusParser::new()?,
            classifier: Classifier::new()?,
            self_metrics: SelfMetrics::new()?,
        })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn self_metrics(&self) -> &SelfMetrics {
        &self.self_metrics
    }

    /// Runs one poll, emitting every observation into `sink`, followed by
    /// the three self-observations.
    ///
    /// Callers must not run two polls of the same exporter at once: the
    /// self-metrics are shared between polls.
    pub fn collect<K: MetricSink>(&self, mut sink: K) -> ScrapeReport {
        let started = Instant::now();
        self.self_metrics.begin();

        let mut state = ScrapeState {
            started,
            rows_seen: 0,
            observations: 0,
            sink: &mut sink,
        };
        let result = self.scrape(&mut state);
        let (rows_seen, observations) = (state.rows_seen, state.observations);

        let duration = started.elapsed();
        self.self_metrics.finish(duration, result.is_err());

        match &result {
            Ok(()) => debug!(
                duration_ms = duration.as_millis() as u64,
                observations,
                rows = rows_seen,
                "scrape completed"
            ),
            Err(e) => warn!(
                stage = %e.stage(),
                error = %e,
                duration_ms = duration.as_millis() as u64,
                observations,
                "scrape failed"
            ),
        }

        self.self_metrics.emit(&mut sink);

        ScrapeReport {
            duration,
            observations,
            rows_seen,
            error: result.err(),
        }
    }

    /// Harvests metric identities by running one poll and discarding the values.
    ///
    /// Best-effort: if the server is unreachable, only the self-metric
    /// identities come back. The dry run counts towards `scrapes_total`.
    pub fn describe(&self) -> Vec<Arc<MetricIdentity>> {
        let mut observed: Vec<Observation> = Vec::new();
        let report = self.collect(&mut observed);
        if let Some(e) = &report.error {
            warn!(error = %e, "describe: dry-run scrape failed, metric descriptions are incomplete");
        }

        let mut seen = HashSet::new();
        observed
            .into_iter()
            .filter_map(|obs| {
                let fresh = seen.insert(obs.identity.fq_name());
                fresh.then_some(obs.identity)
            })
            .collect()
    }

    fn scrape<K: MetricSink>(&self, state: &mut ScrapeState<'_, K>) -> Result<(), ScrapeError> {
        let mut conn = self.source.connect().map_err(ScrapeError::Connect)?;

        self.check_deadline(state, ScrapeStage::GlobalStatus)?;
        self.scrape_global_status(&mut conn, state)?;

        self.check_deadline(state, ScrapeStage::SlaveStatus)?;
        self.scrape_slave_status(&mut conn, state)?;

        if self.config.perf_schema_table_waits {
            self.check_deadline(state, ScrapeStage::PerfSchemaTableWaits)?;
            self.scrape_table_io_waits(&mut conn, state)?;
        }

        if self.config.user_statistics {
            self.check_deadline(state, ScrapeStage::UserStatistics)?;
            self.scrape_user_statistics(&mut conn, state)?;
        }

        Ok(())
    }

    fn check_deadline<K: MetricSink>(
        &self,
        state: &ScrapeState<'_, K>,
        stage: ScrapeStage,
    ) -> Result<(), ScrapeError> {
        if let Some(limit) = self.config.deadline
            && state.started.elapsed() >= limit
        {
            return Err(ScrapeError::Deadline { stage, limit });
        }
        Ok(())
    }

    /// `SHOW GLOBAL STATUS`: two columns, variable name and value.
    fn scrape_global_status<C: StatusConnection, K: MetricSink>(
        &self,
        conn: &mut C,
        state: &mut ScrapeState<'_, K>,
    ) -> Result<(), ScrapeError> {
        let stage = ScrapeStage::GlobalStatus;
        let rows = run_query(conn, stage, queries::GLOBAL_STATUS)?;
        let mut exported = HashSet::new();

        for row in rows {
            let row = row.map_err(|source| ScrapeError::Scan { stage, source })?;
            state.rows_seen += 1;

            let (Some(Some(key)), Some(value)) = (row.first(), row.get(1)) else {
                return Err(scan_error(
                    stage,
                    format!("expected a variable name and a value, got {} column(s)", row.len()),
                ));
            };
            let key = std::str::from_utf8(key)
                .map_err(|_| scan_error(stage, "variable name is not valid UTF-8"))?;

            let Some(value) = self.parser.parse_cell(value.as_deref()) else {
                trace!(variable = key, "unparseable global status value skipped");
                continue;
            };
            let classified = self.classifier.classify_global_status(key);
            let series = (
                classified.rule.identity.fq_name(),
                classified.label_values.clone(),
            );
            if !exported.insert(series) {
                warn!(variable = key, "variable maps to an already exported series, skipped");
                continue;
            }
            state.emit(classified.rule.observe(value, classified.label_values));
        }
        Ok(())
    }

    /// `SHOW SLAVE STATUS`: zero rows on a primary, one row on a replica.
    /// The column set depends on the server version.
    fn scrape_slave_status<C: StatusConnection, K: MetricSink>(
        &self,
        conn: &mut C,
        state: &mut ScrapeState<'_, K>,
    ) -> Result<(), ScrapeError> {
        let stage = ScrapeStage::SlaveStatus;
        let mut rows = run_query(conn, stage, queries::SLAVE_STATUS)?;

        let Some(row) = rows.next() else {
            debug!("no replication status, server is not a replica");
            return Ok(());
        };
        let row = row.map_err(|source| ScrapeError::Scan { stage, source })?;
        state.rows_seen += 1;

        let plan = self.classifier.slave_status_plan(rows.columns());
        if row.len() != plan.len() {
            return Err(scan_error(
                stage,
                format!("row has {} cells for {} columns", row.len(), plan.len()),
            ));
        }

        for (rule, cell) in plan.iter().zip(&row) {
            let Some(rule) = rule else { continue };
            match self.parser.parse_cell(cell.as_deref()) {
                Some(value) => state.emit(rule.observe(value, Vec::new())),
                None => trace!(column = %rule.identity.name, "unparseable slave status value skipped"),
            }
        }
        Ok(())
    }

    /// Table I/O waits: fixed columns, six counters per table.
    fn scrape_table_io_waits<C: StatusConnection, K: MetricSink>(
        &self,
        conn: &mut C,
        state: &mut ScrapeState<'_, K>,
    ) -> Result<(), ScrapeError> {
        let stage = ScrapeStage::PerfSchemaTableWaits;
        let rows = run_query(conn, stage, queries::PERF_SCHEMA_TABLE_IO_WAITS)?;
        let rule = self.classifier.table_io_waits();

        for row in rows {
            let row = row.map_err(|source| ScrapeError::Scan { stage, source })?;
            state.rows_seen += 1;

            if row.len() != 2 + TABLE_IO_OPERATIONS.len() {
                return Err(scan_error(
                    stage,
                    format!("expected {} columns, got {}", 2 + TABLE_IO_OPERATIONS.len(), row.len()),
                ));
            }
            let schema = text_cell(&row[0])
                .ok_or_else(|| scan_error(stage, "OBJECT_SCHEMA is NULL or not UTF-8"))?;
            let name = text_cell(&row[1])
                .ok_or_else(|| scan_error(stage, "OBJECT_NAME is NULL or not UTF-8"))?;

            let mut counts = [0u64; TABLE_IO_OPERATIONS.len()];
            for ((count, cell), op) in counts.iter_mut().zip(&row[2..]).zip(TABLE_IO_OPERATIONS) {
                *count = integer_cell(cell).ok_or_else(|| {
                    scan_error(stage, format!("COUNT_{} is not an integer", op.to_uppercase()))
                })?;
            }

            for (count, op) in counts.into_iter().zip(TABLE_IO_OPERATIONS) {
                let labels = vec![schema.to_string(), name.to_string(), op.to_string()];
                state.emit(rule.observe(count as f64, labels));
            }
        }
        Ok(())
    }

    /// `USER_STATISTICS`: user name first, then statistics whose set depends
    /// on the server build.
    ///
    /// A non-numeric statistic cell is skipped like any unparseable value;
    /// only a missing user name fails the scan.
    fn scrape_user_statistics<C: StatusConnection, K: MetricSink>(
        &self,
        conn: &mut C,
        state: &mut ScrapeState<'_, K>,
    ) -> Result<(), ScrapeError> {
        let stage = ScrapeStage::UserStatistics;
        let rows = run_query(conn, stage, queries::USER_STATISTICS)?;
        if rows.columns().is_empty() {
            return Err(scan_error(stage, "result has no columns"));
        }
        let plan = self.classifier.user_statistics_plan(rows.columns());

        for row in rows {
            let row = row.map_err(|source| ScrapeError::Scan { stage, source })?;
            state.rows_seen += 1;

            if row.len() != plan.len() + 1 {
                return Err(scan_error(
                    stage,
                    format!("row has {} cells for {} columns", row.len(), plan.len() + 1),
                ));
            }
            let user =
                text_cell(&row[0]).ok_or_else(|| scan_error(stage, "user name is NULL or not UTF-8"))?;

            for (rule, cell) in plan.iter().zip(&row[1..]) {
                let Some(rule) = rule else { continue };
                match self.parser.parse_cell(cell.as_deref()) {
                    Some(value) => state.emit(rule.observe(value, vec![user.to_string()])),
                    None => trace!(user, metric = %rule.identity.name, "non-numeric user statistic skipped"),
                }
            }
        }
        Ok(())
    }
}

fn run_query<'c, C: StatusConnection>(
    conn: &'c mut C,
    stage: ScrapeStage,
    sql: &str,
) -> Result<ResultStream<'c>, ScrapeError> {
    trace!(%stage, "running query");
    conn.query(sql)
        .map_err(|source| ScrapeError::Query { stage, source })
}

fn scan_error(stage: ScrapeStage, msg: impl Into<String>) -> ScrapeError {
    ScrapeError::Scan {
        stage,
        source: SourceError::new(msg),
    }
}

fn text_cell(cell: &Option<Vec<u8>>) -> Option<&str> {
    cell.as_deref().and_then(|raw| std::str::from_utf8(raw).ok())
}

fn integer_cell(cell: &Option<Vec<u8>>) -> Option<u64> {
    text_cell(cell)?.parse().ok()
}
