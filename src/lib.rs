//! MSSQL MCP Server Library
//!
//! This library provides an MCP (Model Context Protocol) server that lets AI
//! assistants run SQL against Microsoft SQL Server and browse its tables.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod resources;
pub mod tools;
pub mod transport;

pub use config::{Config, ConnectionConfig};
pub use error::DbError;
pub use mcp::MssqlService;
