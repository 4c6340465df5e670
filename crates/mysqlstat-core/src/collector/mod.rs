//! MySQL status collector.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           Exporter                            │
//! │  connect ─► GLOBAL STATUS ─► SLAVE STATUS ─► [table waits]    │
//! │                                            ─► [user stats]    │
//! │        │ raw cells                                            │
//! │  ┌─────▼────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │ StatusParser │──►│  Classifier  │──►│    MetricSink    │   │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘   │
//! │  SelfMetrics: duration / scrapes_total / last_scrape_error    │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                │
//!                        ┌───────▼───────┐
//!                        │ StatusSource  │ (trait)
//!                        └───────┬───────┘
//!                   ┌────────────┴────────────┐
//!            ┌──────▼──────┐           ┌──────▼──────┐
//!            │ MysqlSource │           │ MockSource  │
//!            │ (server)    │           │ (testing)   │
//!            └─────────────┘           └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use mysqlstat_core::collector::{Exporter, MockSource, ScrapeConfig};
//! use mysqlstat_core::Observation;
//!
//! let exporter = Exporter::new(MockSource::typical_primary(), ScrapeConfig::default()).unwrap();
//! let mut observations: Vec<Observation> = Vec::new();
//! let report = exporter.collect(&mut observations);
//! assert!(report.is_success());
//! assert!(!observations.is_empty());
//! ```

pub mod classifier;
pub mod mock;
mod mysql_source;
pub mod parser;
pub mod queries;
mod scraper;
mod self_metrics;
pub mod source;

use std::fmt;
use std::time::Duration;

pub use classifier::{Classified, Classifier, ColumnRule};
pub use mock::MockSource;
pub use mysql_source::{MysqlConnection, MysqlSource};
pub use parser::StatusParser;
pub use scraper::{Exporter, ScrapeReport};
pub use self_metrics::SelfMetrics;
pub use source::{RawRow, ResultStream, StatusConnection, StatusSource};

/// Options fixed for the lifetime of an [`Exporter`].
#[derive(Debug, Clone, Default)]
pub struct ScrapeConfig {
    /// Collect `performance_schema.table_io_waits_summary_by_table`.
    pub perf_schema_table_waits: bool,
    /// Collect `information_schema.USER_STATISTICS`.
    pub user_statistics: bool,
    /// Upper bound on a whole poll. Checked before each query.
    pub deadline: Option<Duration>,
}

/// Where a poll is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeStage {
    Connecting,
    GlobalStatus,
    SlaveStatus,
    PerfSchemaTableWaits,
    UserStatistics,
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrapeStage::Connecting => "connect",
            ScrapeStage::GlobalStatus => "SHOW GLOBAL STATUS",
            ScrapeStage::SlaveStatus => "SHOW SLAVE STATUS",
            ScrapeStage::PerfSchemaTableWaits => "performance_schema.table_io_waits_summary_by_table",
            ScrapeStage::UserStatistics => "information_schema.USER_STATISTICS",
        })
    }
}
