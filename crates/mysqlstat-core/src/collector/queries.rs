//! Fixed introspection queries. The text is sent verbatim.

pub const GLOBAL_STATUS: &str = "SHOW GLOBAL STATUS";

/// Zero rows on a server that is not a replica, one row otherwise.
pub const SLAVE_STATUS: &str = "SHOW SLAVE STATUS";

/// Column order is fixed: schema, table, then the six operation counters in
/// the order of [`super::classifier::TABLE_IO_OPERATIONS`].
pub const PERF_SCHEMA_TABLE_IO_WAITS: &str = "SELECT OBJECT_SCHEMA, OBJECT_NAME, COUNT_READ, COUNT_WRITE, COUNT_FETCH, COUNT_INSERT, COUNT_UPDATE, COUNT_DELETE FROM performance_schema.table_io_waits_summary_by_table WHERE OBJECT_SCHEMA NOT IN ('mysql', 'performance_schema')";

/// Requires `userstat=1` on Percona Server / MariaDB.
pub const USER_STATISTICS: &str = "SELECT * FROM information_schema.USER_STATISTICS";
