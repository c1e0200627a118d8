//! Driver abstraction.
//!
//! The tool and resource handlers only talk to the database through these
//! traits: open a connection, run a row-returning statement or a mutating
//! statement, commit, close. [`MssqlDriver`](crate::db::MssqlDriver) is the
//! production implementation.

use crate::config::ConnectionConfig;
use crate::db::types::SqlValue;
use crate::error::DbResult;
use std::future::Future;

/// Columns and rows produced by a row-returning statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in the order the server reported them.
    pub columns: Vec<String>,
    /// Rows in the order the server returned them.
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    /// First column of every row, rendered as text.
    pub fn first_column(&self) -> impl Iterator<Item = String> + '_ {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(ToString::to_string)
    }
}

/// An open database connection.
///
/// One connection serves exactly one operation and is closed afterwards.
pub trait Connection: Send + 'static {
    /// Execute a statement and collect its first result set.
    fn query(&mut self, sql: &str) -> impl Future<Output = DbResult<ResultSet>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str) -> impl Future<Output = DbResult<u64>> + Send;

    /// Commit the open transaction, if any.
    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Close the connection. Uncommitted work is rolled back by the server.
    fn close(self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Factory for [`Connection`]s.
pub trait Driver: Send + Sync + 'static {
    type Conn: Connection;

    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = DbResult<Self::Conn>> + Send;
}
