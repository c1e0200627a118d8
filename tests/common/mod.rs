//! Shared helpers for integration tests.
//!
//! `MockDriver` stands in for SQL Server: it hands out connections that return
//! scripted results and record every statement, commit and close.

#![allow(dead_code)]

use mssql_mcp_server::ConnectionConfig;
use mssql_mcp_server::config::ConfigSource;
use mssql_mcp_server::db::{Connection, Driver, ResultSet, SqlValue};
use mssql_mcp_server::error::{DbError, DbResult};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// What the mock connections observed.
#[derive(Debug, Default)]
pub struct MockLog {
    pub connects: Vec<String>,
    pub statements: Vec<String>,
    pub commits: usize,
    pub closes: usize,
}

#[derive(Clone, Default)]
pub struct MockDriver {
    log: Arc<Mutex<MockLog>>,
    queued: Arc<Mutex<VecDeque<ResultSet>>>,
    result: ResultSet,
    rows_affected: u64,
    statement_error: Option<String>,
    connect_error: Option<String>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result returned by every row-returning statement.
    pub fn with_result(mut self, columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        self.result = ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        self
    }

    /// Result for the next row-returning statement only; queued results are
    /// consumed in order before falling back to `with_result`.
    pub fn then_result(self, columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        self.queued.lock().unwrap().push_back(ResultSet::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows,
        ));
        self
    }

    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Make every statement fail with a server error carrying `message`.
    pub fn failing_statements(mut self, message: &str) -> Self {
        self.statement_error = Some(message.to_string());
        self
    }

    /// Make every connection attempt fail.
    pub fn failing_connect(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, MockLog> {
        self.log.lock().unwrap()
    }
}

pub struct MockConnection {
    log: Arc<Mutex<MockLog>>,
    queued: Arc<Mutex<VecDeque<ResultSet>>>,
    result: ResultSet,
    rows_affected: u64,
    statement_error: Option<String>,
}

impl MockConnection {
    fn record(&self, sql: &str) -> DbResult<()> {
        self.log.lock().unwrap().statements.push(sql.to_string());
        match &self.statement_error {
            Some(message) => Err(DbError::database(message.clone(), Some(102), "")),
            None => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    async fn query(&mut self, sql: &str) -> DbResult<ResultSet> {
        self.record(sql)?;
        let next = self.queued.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.result.clone()))
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.record(sql)?;
        Ok(self.rows_affected)
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.log.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn close(self) -> DbResult<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

impl Driver for MockDriver {
    type Conn = MockConnection;

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<MockConnection> {
        self.log.lock().unwrap().connects.push(config.database.clone());
        if let Some(message) = &self.connect_error {
            return Err(DbError::connection(message.clone(), "Check MSSQL_SERVER"));
        }
        Ok(MockConnection {
            log: self.log.clone(),
            queued: self.queued.clone(),
            result: self.result.clone(),
            rows_affected: self.rows_affected,
            statement_error: self.statement_error.clone(),
        })
    }
}

/// A complete connection environment for database `database`.
pub fn env_for(database: &str) -> HashMap<String, String> {
    [
        ("MSSQL_USER", "sa"),
        ("MSSQL_PASSWORD", "secret"),
        ("MSSQL_DATABASE", database),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Environment that can be edited while handlers hold it.
#[derive(Default)]
pub struct SharedEnv(Mutex<HashMap<String, String>>);

impl SharedEnv {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self(Mutex::new(vars))
    }

    pub fn set(&self, key: &str, value: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl ConfigSource for SharedEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key).cloned()
    }
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::from(value)
}
