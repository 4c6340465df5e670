//! Pre-built mock servers for testing.

use super::source::{MockSource, row};
use crate::collector::queries;

const SLAVE_STATUS_COLUMNS: &[&str] = &[
    "Slave_IO_State",
    "Master_Host",
    "Master_Port",
    "Master_Log_File",
    "Read_Master_Log_Pos",
    "Relay_Log_File",
    "Slave_IO_Running",
    "Slave_SQL_Running",
    "Last_Errno",
    "Seconds_Behind_Master",
];

const TABLE_IO_WAITS_COLUMNS: &[&str] = &[
    "OBJECT_SCHEMA",
    "OBJECT_NAME",
    "COUNT_READ",
    "COUNT_WRITE",
    "COUNT_FETCH",
    "COUNT_INSERT",
    "COUNT_UPDATE",
    "COUNT_DELETE",
];

impl MockSource {
    /// A primary server: a handful of global status variables and an empty
    /// `SHOW SLAVE STATUS`.
    ///
    /// 8 of the 9 status rows parse (`Ssl_cipher` is empty).
    pub fn typical_primary() -> Self {
        Self::new()
            .with_text_rows(
                queries::GLOBAL_STATUS,
                &["Variable_name", "Value"],
                &[
                    &["Aborted_clients", "3"],
                    &["Com_insert", "42"],
                    &["Com_select", "1200"],
                    &["Connection_errors_max_connections", "0"],
                    &["Innodb_rows_read", "98765"],
                    &["Performance_schema_users_lost", "0"],
                    &["Ssl_cipher", ""],
                    &["Slave_running", "OFF"],
                    &["Uptime", "86400"],
                ],
            )
            .with_rows(queries::SLAVE_STATUS, SLAVE_STATUS_COLUMNS, Vec::new())
    }

    /// A replica: same global status, plus one `SHOW SLAVE STATUS` row.
    ///
    /// 8 of the 10 slave columns parse (`Slave_IO_State` and `Master_Host`
    /// are free text).
    pub fn typical_replica() -> Self {
        Self::typical_primary().with_rows(
            queries::SLAVE_STATUS,
            SLAVE_STATUS_COLUMNS,
            vec![row(&[
                Some("Waiting for master to send event"),
                Some("primary.internal"),
                Some("3306"),
                Some("mysql-bin.000123"),
                Some("4567"),
                Some("relay-bin.000007"),
                Some("Yes"),
                Some("Yes"),
                Some("0"),
                Some("1"),
            ])],
        )
    }

    /// Primary with performance schema table waits and user statistics.
    pub fn with_optional_tables() -> Self {
        Self::typical_primary()
            .with_text_rows(
                queries::PERF_SCHEMA_TABLE_IO_WAITS,
                TABLE_IO_WAITS_COLUMNS,
                &[
                    &["shop", "orders", "10", "4", "10", "2", "1", "1"],
                    &["shop", "customers", "7", "0", "7", "0", "0", "0"],
                ],
            )
            .with_text_rows(
                queries::USER_STATISTICS,
                &["USER", "TOTAL_CONNECTIONS", "UNKNOWN_COL"],
                &[&["alice", "5", "9"]],
            )
    }
}
