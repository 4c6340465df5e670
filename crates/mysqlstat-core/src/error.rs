//! Error types.
//!
//! Only [`ScrapeError`] is poll-fatal. Parse failures and unknown columns are
//! absorbed by the collector and never surface as errors.

use std::time::Duration;

use thiserror::Error;

use crate::collector::ScrapeStage;

/// Failure reported by the database layer (driver message, already formatted).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SourceError(pub String);

impl SourceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<mysql::Error> for SourceError {
    fn from(e: mysql::Error) -> Self {
        Self(format_mysql_error(&e))
    }
}

/// Poll-fatal error: aborts the remaining query states and sets the error flag.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// Could not open a database connection.
    #[error("MySQL: connection failed: {0}")]
    Connect(#[source] SourceError),
    /// A fixed introspection query failed to execute.
    #[error("MySQL query error in {stage}: {source}")]
    Query {
        stage: ScrapeStage,
        #[source]
        source: SourceError,
    },
    /// Result metadata or a row could not be read, or a row had the wrong shape.
    #[error("MySQL scan error in {stage}: {source}")]
    Scan {
        stage: ScrapeStage,
        #[source]
        source: SourceError,
    },
    /// The per-poll deadline ran out before the stage could start.
    #[error("scrape deadline of {limit:?} exceeded before {stage}")]
    Deadline { stage: ScrapeStage, limit: Duration },
}

impl ScrapeError {
    /// The state the poll was in when it failed.
    pub fn stage(&self) -> ScrapeStage {
        match self {
            ScrapeError::Connect(_) => ScrapeStage::Connecting,
            ScrapeError::Query { stage, .. }
            | ScrapeError::Scan { stage, .. }
            | ScrapeError::Deadline { stage, .. } => *stage,
        }
    }
}

/// Construction-time error for the exporter and its sources.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid data source name: {0}")]
    DataSourceName(String),
    #[error("invalid classification pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("cannot create self-observation metric: {0}")]
    SelfMetric(#[from] prometheus::Error),
}

/// Shortens driver errors to what an operator needs in a log line.
pub(crate) fn format_mysql_error(e: &mysql::Error) -> String {
    match e {
        mysql::Error::MySqlError(server) => format!("{} ({})", server.message, server.code),
        mysql::Error::IoError(io) => match io.kind() {
            std::io::ErrorKind::ConnectionRefused => "connection refused".to_string(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                "i/o timeout".to_string()
            }
            _ => io.to_string(),
        },
        other => other.to_string(),
    }
}
