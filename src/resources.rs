//! Tables exposed as MCP resources.
//!
//! Every base table is advertised as `mssql://<table>/data` with a plain text
//! body. Listing is advisory: failures are logged and produce an empty list so
//! the client's capability negotiation is never aborted.
//!
//! URIs carry only the table name. Reading resolves the owning schema first,
//! preferring the login's default schema when several schemas share the name.

use crate::config::{ConfigSource, ConnectionConfig};
use crate::db::{Connection, Driver, ResultSet};
use crate::error::{DbError, DbResult};
use crate::tools::format::format_as_csv;
use rmcp::model::{AnnotateAble, RawResource, Resource};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const URI_SCHEME: &str = "mssql://";
const URI_SUFFIX: &str = "/data";
pub const MIME_TYPE: &str = "text/plain";

/// Catalog query restricted to base tables (views are excluded).
pub const LIST_TABLES_SQL: &str =
    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'";

/// Schema lookup for one table name, default schema first.
pub fn table_schema_sql(table: &str) -> String {
    format!(
        "SELECT TABLE_SCHEMA FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = {} \
         ORDER BY CASE WHEN TABLE_SCHEMA = SCHEMA_NAME() THEN 0 ELSE 1 END, TABLE_SCHEMA",
        quote_literal(table)
    )
}

/// Rows returned when reading a table resource.
pub const READ_ROW_LIMIT: u32 = 100;

pub fn table_uri(table: &str) -> String {
    format!("{}{}{}", URI_SCHEME, table, URI_SUFFIX)
}

/// Extract the table name from a `mssql://<table>/data` URI.
pub fn table_from_uri(uri: &str) -> DbResult<&str> {
    uri.strip_prefix(URI_SCHEME)
        .and_then(|rest| rest.strip_suffix(URI_SUFFIX))
        .filter(|table| !table.is_empty())
        .ok_or_else(|| DbError::invalid_resource_uri(uri))
}

/// Bracket-quote an identifier, doubling any closing bracket inside it.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Unicode string literal, doubling any quote inside it.
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// `SELECT TOP n *` over a table, schema-qualified when the schema is known.
pub fn read_table_sql(schema: Option<&str>, table: &str) -> String {
    let target = match schema {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(table)),
        None => quote_identifier(table),
    };
    format!("SELECT TOP {} * FROM {}", READ_ROW_LIMIT, target)
}

/// Resource descriptor for one table.
pub fn table_resource(table: &str) -> Resource {
    let mut raw = RawResource::new(table_uri(table), format!("Table: {}", table));
    raw.description = Some(format!("Data in table: {}", table));
    raw.mime_type = Some(MIME_TYPE.to_string());
    raw.no_annotation()
}

/// Lists and reads table resources.
pub struct ResourceHandler<D: Driver> {
    driver: Arc<D>,
    config_source: Arc<dyn ConfigSource>,
}

impl<D: Driver> Clone for ResourceHandler<D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            config_source: self.config_source.clone(),
        }
    }
}

impl<D: Driver> ResourceHandler<D> {
    pub fn new(driver: Arc<D>, config_source: Arc<dyn ConfigSource>) -> Self {
        Self {
            driver,
            config_source,
        }
    }

    /// One resource per base table, in the order the server returns them.
    ///
    /// Never fails; any error yields an empty list.
    pub async fn list_resources(&self) -> Vec<Resource> {
        match self.query_once(LIST_TABLES_SQL).await {
            Ok(result) => {
                let resources: Vec<Resource> =
                    result.first_column().map(|t| table_resource(&t)).collect();
                debug!(count = resources.len(), "Listed table resources");
                resources
            }
            Err(e) => {
                error!(error = %e, "Failed to list resources");
                Vec::new()
            }
        }
    }

    /// Read the first rows of the table addressed by `uri` as comma-separated text.
    ///
    /// A table missing from the catalog is queried unqualified so the server
    /// reports the error.
    pub async fn read_resource(&self, uri: &str) -> DbResult<String> {
        let table = table_from_uri(uri)?;
        let config = ConnectionConfig::resolve(self.config_source.as_ref())?;
        let mut conn = self.driver.connect(&config).await?;
        let result = read_table(&mut conn, table).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close connection");
        }
        Ok(format_as_csv(&result?))
    }

    /// Resolve configuration, run one query on a fresh connection, close it.
    async fn query_once(&self, sql: &str) -> DbResult<ResultSet> {
        let config = ConnectionConfig::resolve(self.config_source.as_ref())?;
        let mut conn = self.driver.connect(&config).await?;
        let result = conn.query(sql).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close connection");
        }
        result
    }
}

async fn read_table<C: Connection>(conn: &mut C, table: &str) -> DbResult<ResultSet> {
    let schemas = conn.query(&table_schema_sql(table)).await?;
    let schema = schemas.first_column().next();
    let sql = read_table_sql(schema.as_deref(), table);
    debug!(table = %table, sql = %sql, "Reading table resource");
    conn.query(&sql).await
}
