//! The `execute_sql` tool.
//!
//! Runs one caller-supplied statement per call on a fresh connection. The
//! statement text is executed verbatim. Database failures are reported back as
//! text (`Error executing query: ...`) so the calling assistant can read them;
//! malformed requests and missing configuration are returned as errors.

use crate::config::{ConfigSource, ConnectionConfig};
use crate::db::{Connection, Driver};
use crate::error::{DbError, DbResult};
use crate::tools::format::{format_as_csv, format_rows_affected, format_table_listing};
use rmcp::model::{JsonObject, Tool};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const EXECUTE_SQL: &str = "execute_sql";

/// Substring marking a statement as a table catalog query.
const TABLE_CATALOG_VIEW: &str = "INFORMATION_SCHEMA.TABLES";

/// Tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ExecuteSql,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecuteSql => EXECUTE_SQL,
        }
    }
}

impl FromStr for ToolName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            EXECUTE_SQL => Ok(Self::ExecuteSql),
            other => Err(DbError::unknown_tool(other)),
        }
    }
}

/// How a statement's result is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A SELECT against the table catalog view
    TableListing,
    Select,
    /// Anything else; committed after execution
    Mutation,
}

impl StatementKind {
    /// Classify by leading keyword, ignoring case and surrounding whitespace.
    ///
    /// Any SELECT whose text mentions the catalog view counts as a table
    /// listing, including queries that only reference it in a subquery.
    pub fn classify(sql: &str) -> Self {
        let upper = sql.trim().to_uppercase();
        if !upper.starts_with("SELECT") {
            Self::Mutation
        } else if upper.contains(TABLE_CATALOG_VIEW) {
            Self::TableListing
        } else {
            Self::Select
        }
    }
}

/// Arguments of the `execute_sql` tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteSqlInput {
    /// The SQL query to execute
    #[serde(default)]
    pub query: Option<String>,
}

impl ExecuteSqlInput {
    /// Extract the non-empty `query` argument.
    pub fn query_from(arguments: Option<JsonObject>) -> DbResult<String> {
        let input: Self = serde_json::from_value(serde_json::Value::Object(
            arguments.unwrap_or_default(),
        ))
        .map_err(|e| DbError::invalid_input(format!("Invalid arguments for {}: {}", EXECUTE_SQL, e)))?;

        match input.query {
            Some(query) if !query.is_empty() => Ok(query),
            _ => Err(DbError::MissingQuery),
        }
    }
}

/// Descriptor advertised in `tools/list`.
pub fn execute_sql_tool() -> Tool {
    let schema = rmcp::model::object(json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The SQL query to execute"
            }
        },
        "required": ["query"]
    }));
    Tool::new(
        EXECUTE_SQL,
        "Execute an SQL query on the MSSQL server",
        Arc::new(schema),
    )
}

/// Handler for the `execute_sql` tool.
pub struct ExecuteSqlHandler<D: Driver> {
    driver: Arc<D>,
    config_source: Arc<dyn ConfigSource>,
}

impl<D: Driver> Clone for ExecuteSqlHandler<D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            config_source: self.config_source.clone(),
        }
    }
}

impl<D: Driver> ExecuteSqlHandler<D> {
    pub fn new(driver: Arc<D>, config_source: Arc<dyn ConfigSource>) -> Self {
        Self {
            driver,
            config_source,
        }
    }

    /// Handle a tool call.
    ///
    /// Returns `Err` only for requests that cannot be served at all (unknown
    /// tool, missing query, missing configuration). Everything that goes wrong
    /// on the database side is folded into the returned text.
    pub async fn call(&self, tool_name: &str, arguments: Option<JsonObject>) -> DbResult<String> {
        debug!(tool = tool_name, arguments = ?arguments, "Calling tool");

        let ToolName::ExecuteSql = tool_name.parse::<ToolName>()?;
        let query = ExecuteSqlInput::query_from(arguments)?;
        let config = ConnectionConfig::resolve(self.config_source.as_ref())?;

        match self.execute(&config, &query).await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!(query = %query, error = %e, "Error executing SQL");
                Ok(format!("Error executing query: {}", e.detail()))
            }
        }
    }

    /// Run one statement on a dedicated connection, closing it on every path.
    async fn execute(&self, config: &ConnectionConfig, query: &str) -> DbResult<String> {
        let mut conn = self.driver.connect(config).await?;
        let outcome = run_statement(&mut conn, &config.database, query).await;
        let closed = conn.close().await;

        match (outcome, closed) {
            (Ok(text), Ok(())) => Ok(text),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "Failed to close connection after error");
                }
                Err(e)
            }
        }
    }
}

async fn run_statement<C: Connection>(conn: &mut C, database: &str, query: &str) -> DbResult<String> {
    let kind = StatementKind::classify(query);
    debug!(kind = ?kind, "Executing statement");

    match kind {
        StatementKind::TableListing => {
            let result = conn.query(query).await?;
            Ok(format_table_listing(database, &result))
        }
        StatementKind::Select => {
            let result = conn.query(query).await?;
            Ok(format_as_csv(&result))
        }
        StatementKind::Mutation => {
            let rows_affected = conn.execute(query).await?;
            conn.commit().await?;
            Ok(format_rows_affected(rows_affected))
        }
    }
}
