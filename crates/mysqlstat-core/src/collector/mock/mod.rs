//! In-memory status source for testing the collector without a MySQL server.

mod scenarios;
mod source;

pub use source::{MockConnection, MockResult, MockSource, row};
