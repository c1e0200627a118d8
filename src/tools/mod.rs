//! MCP tool implementations.
//!
//! - `execute_sql`: run one SQL statement and return its result as text
//! - `format`: text rendering shared by tools and resources

pub mod execute_sql;
pub mod format;

pub use execute_sql::{
    EXECUTE_SQL, ExecuteSqlHandler, ExecuteSqlInput, StatementKind, ToolName, execute_sql_tool,
};
