//! Mock status source.
//!
//! Holds canned results keyed by exact query text and records what the
//! collector asked for, so tests can assert on issued queries and on
//! connection release.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::collector::source::{RawRow, ResultStream, StatusConnection, StatusSource};
use crate::error::SourceError;

/// Canned outcome of one query.
#[derive(Debug, Clone)]
pub enum MockResult {
    Rows {
        columns: Vec<String>,
        rows: Vec<RawRow>,
        /// Yield this many rows, then a scan error.
        fail_after: Option<usize>,
    },
    Error(String),
}

/// In-memory [`StatusSource`].
///
/// Clones share the query log and the open-connection counter.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    results: HashMap<String, MockResult>,
    connect_error: Option<String>,
    issued: Arc<Mutex<Vec<String>>>,
    open_connections: Arc<AtomicUsize>,
}

impl MockSource {
    /// Creates a source that knows no queries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a result for `query`. Cells are given as text; `None` is NULL.
    pub fn with_rows(mut self, query: &str, columns: &[&str], rows: Vec<RawRow>) -> Self {
        self.results.insert(
            query.to_string(),
            MockResult::Rows {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
                fail_after: None,
            },
        );
        self
    }

    /// Registers a result whose cells are all non-NULL text.
    pub fn with_text_rows(self, query: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|cell| Some(cell.as_bytes().to_vec())).collect())
            .collect();
        self.with_rows(query, columns, rows)
    }

    /// Makes `query` fail to execute.
    pub fn with_query_error(mut self, query: &str, msg: &str) -> Self {
        self.results
            .insert(query.to_string(), MockResult::Error(msg.to_string()));
        self
    }

    /// Makes the already registered result of `query` fail after `rows` rows.
    pub fn with_scan_error_after(mut self, query: &str, rows: usize) -> Self {
        if let Some(MockResult::Rows { fail_after, .. }) = self.results.get_mut(query) {
            *fail_after = Some(rows);
        }
        self
    }

    /// Makes every connection attempt fail.
    pub fn refuse_connections(mut self, msg: &str) -> Self {
        self.connect_error = Some(msg.to_string());
        self
    }

    /// Queries issued so far, in order, across all connections.
    pub fn issued_queries(&self) -> Vec<String> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Connections currently open.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }
}

impl StatusSource for MockSource {
    type Connection = MockConnection;

    fn connect(&self) -> Result<MockConnection, SourceError> {
        if let Some(msg) = &self.connect_error {
            return Err(SourceError::new(msg.clone()));
        }
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            source: self.clone(),
        })
    }
}

/// Connection handed out by [`MockSource`].
pub struct MockConnection {
    source: MockSource,
}

impl StatusConnection for MockConnection {
    fn query(&mut self, sql: &str) -> Result<ResultStream<'_>, SourceError> {
        self.source
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());

        match self.source.results.get(sql) {
            Some(MockResult::Rows {
                columns,
                rows,
                fail_after,
            }) => {
                let limit = fail_after.unwrap_or(rows.len()).min(rows.len());
                let mut out: Vec<Result<RawRow, SourceError>> =
                    rows[..limit].iter().cloned().map(Ok).collect();
                if fail_after.is_some() {
                    out.push(Err(SourceError::new("lost connection during row fetch")));
                }
                Ok(ResultStream::new(columns.clone(), out.into_iter()))
            }
            Some(MockResult::Error(msg)) => Err(SourceError::new(msg.clone())),
            None => Err(SourceError::new(format!("no canned result for: {}", sql))),
        }
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.source.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builds a raw row from optional text cells.
pub fn row(cells: &[Option<&str>]) -> RawRow {
    cells
        .iter()
        .map(|cell| cell.map(|c| c.as_bytes().to_vec()))
        .collect()
}
