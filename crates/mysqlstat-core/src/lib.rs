//! mysqlstat-core - scrape-and-classify pipeline for MySQL server status.
//!
//! Provides:
//! - `collector` - the scrape driver, value parser, column classifier,
//!   self-observation metrics and the database access seam (real + mock)
//! - `metric` - observation types and the emission sink
//! - `error` - error types shared by the collector and its callers

pub mod collector;
pub mod error;
pub mod metric;

pub use collector::{Exporter, ScrapeConfig, ScrapeReport, ScrapeStage};
pub use error::{ScrapeError, SetupError, SourceError};
pub use metric::{
    ChannelSink, MetricIdentity, MetricSink, NAMESPACE, Observation, ObservationStream, Subsystem,
    ValueKind, observation_channel,
};

/// Crate version, reported by the daemon at start-up.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
