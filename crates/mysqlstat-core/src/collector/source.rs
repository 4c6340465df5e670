//! Database access seam.
//!
//! The scrape driver only needs to open a connection, run a query and walk
//! its rows. [`MysqlSource`](super::MysqlSource) implements this against a
//! real server, [`MockSource`](super::mock::MockSource) in memory for tests.

use crate::error::SourceError;

/// One row of raw cells; `None` is SQL NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Opens connections to the monitored server.
pub trait StatusSource {
    type Connection: StatusConnection;

    fn connect(&self) -> Result<Self::Connection, SourceError>;
}

/// An open connection. Dropping it releases the connection.
pub trait StatusConnection {
    fn query(&mut self, sql: &str) -> Result<ResultStream<'_>, SourceError>;
}

/// Result of one query: column names from the result metadata and a lazy
/// row iterator. A row error ends the scan; rows before it are still valid.
pub struct ResultStream<'a> {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Result<RawRow, SourceError>> + 'a>,
}

impl<'a> ResultStream<'a> {
    pub fn new(
        columns: Vec<String>,
        rows: impl Iterator<Item = Result<RawRow, SourceError>> + 'a,
    ) -> Self {
        Self {
            columns,
            rows: Box::new(rows),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for ResultStream<'_> {
    type Item = Result<RawRow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}
