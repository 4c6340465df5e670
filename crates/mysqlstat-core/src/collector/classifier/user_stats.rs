//! Known `information_schema.USER_STATISTICS` columns.
//!
//! Column names are matched case-sensitively, exactly as the server reports
//! them. Anything not listed here is still exported, as an untyped metric.

use crate::metric::ValueKind;

pub(super) struct UserStatColumn {
    pub column: &'static str,
    pub kind: ValueKind,
    pub help: &'static str,
}

const fn counter(column: &'static str, help: &'static str) -> UserStatColumn {
    UserStatColumn {
        column,
        kind: ValueKind::Counter,
        help,
    }
}

pub(super) const USER_STATISTICS_COLUMNS: &[UserStatColumn] = &[
    counter(
        "TOTAL_CONNECTIONS",
        "The number of connections created for this user.",
    ),
    UserStatColumn {
        column: "CONCURRENT_CONNECTIONS",
        kind: ValueKind::Gauge,
        help: "The number of concurrent connections for this user.",
    },
    counter(
        "CONNECTED_TIME",
        "The cumulative number of seconds elapsed while there were connections from this user.",
    ),
    counter(
        "BUSY_TIME",
        "The cumulative number of seconds there was activity on connections from this user.",
    ),
    counter(
        "CPU_TIME",
        "The cumulative CPU time elapsed, in seconds, while servicing this user's connections.",
    ),
    counter(
        "BYTES_RECEIVED",
        "The number of bytes received from this user's connections.",
    ),
    counter(
        "BYTES_SENT",
        "The number of bytes sent to this user's connections.",
    ),
    counter(
        "BINLOG_BYTES_WRITTEN",
        "The number of bytes written to the binary log from this user's connections.",
    ),
    counter(
        "ROWS_FETCHED",
        "The number of rows fetched by this user's connections.",
    ),
    counter(
        "ROWS_UPDATED",
        "The number of rows updated by this user's connections.",
    ),
    counter(
        "TABLE_ROWS_READ",
        "The number of rows read from tables by this user's connections. (It may be different from ROWS_FETCHED.)",
    ),
    counter(
        "SELECT_COMMANDS",
        "The number of SELECT commands executed from this user's connections.",
    ),
    counter(
        "UPDATE_COMMANDS",
        "The number of UPDATE commands executed from this user's connections.",
    ),
    counter(
        "OTHER_COMMANDS",
        "The number of other commands executed from this user's connections.",
    ),
    counter(
        "COMMIT_TRANSACTIONS",
        "The number of COMMIT commands issued by this user's connections.",
    ),
    counter(
        "ROLLBACK_TRANSACTIONS",
        "The number of ROLLBACK commands issued by this user's connections.",
    ),
    counter(
        "DENIED_CONNECTIONS",
        "The number of connections denied to this user.",
    ),
    counter(
        "LOST_CONNECTIONS",
        "The number of this user's connections that were terminated uncleanly.",
    ),
    counter(
        "ACCESS_DENIED",
        "The number of times this user's connections issued commands that were denied.",
    ),
    counter(
        "EMPTY_QUERIES",
        "The number of times this user's connections sent empty queries to the server.",
    ),
    counter(
        "TOTAL_SSL_CONNECTIONS",
        "The number of times this user's connections connected using SSL to the server.",
    ),
];
