//! MCP service implementation using rmcp.
//!
//! `MssqlService` answers `tools/list`, `tools/call`, `resources/list` and
//! `resources/read`. The tool descriptor is built once when the service is
//! created and served verbatim afterwards.

use crate::config::{ConfigSource, ProcessEnv};
use crate::db::{Driver, MssqlDriver};
use crate::resources::ResourceHandler;
use crate::tools::{ExecuteSqlHandler, execute_sql_tool};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListResourcesResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::sync::Arc;
use tracing::debug;

pub const SERVER_NAME: &str = "mssql-mcp-server";

pub struct MssqlService<D: Driver = MssqlDriver> {
    /// Static tool descriptors, built once
    tools: Arc<[Tool]>,
    execute_sql: ExecuteSqlHandler<D>,
    resources: ResourceHandler<D>,
}

impl<D: Driver> Clone for MssqlService<D> {
    fn clone(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            execute_sql: self.execute_sql.clone(),
            resources: self.resources.clone(),
        }
    }
}

impl MssqlService<MssqlDriver> {
    /// Service backed by SQL Server, configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(Arc::new(MssqlDriver::new()), Arc::new(ProcessEnv))
    }
}

impl<D: Driver> MssqlService<D> {
    /// Create a new MssqlService instance.
    ///
    /// # Arguments
    ///
    /// * `driver` - Opens one database connection per operation
    /// * `config_source` - Where connection settings are read from on each call
    pub fn new(driver: Arc<D>, config_source: Arc<dyn ConfigSource>) -> Self {
        Self {
            tools: Arc::from(vec![execute_sql_tool()]),
            execute_sql: ExecuteSqlHandler::new(driver.clone(), config_source.clone()),
            resources: ResourceHandler::new(driver, config_source),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

impl<D: Driver> ServerHandler for MssqlService<D> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_resources_list_changed()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                title: Some("MSSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SQL Server tools.\n\
                \n\
                - Call `execute_sql` with a `query` to run any statement. SELECT results come back\n\
                  as comma-separated lines with a header row; other statements are committed and\n\
                  report the number of affected rows.\n\
                - Each base table is listed as a resource `mssql://<table>/data`; reading it returns\n\
                  the first rows of the table.\n\
                - Failed statements return text starting with `Error executing query:`."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.to_vec()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .execute_sql
            .call(&request.name, request.arguments)
            .await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self.resources.list_resources().await;
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        debug!(uri = %request.uri, "Reading resource");
        let text = self.resources.read_resource(&request.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
