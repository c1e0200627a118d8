//! Transport layer for the MCP server.
//!
//! The server talks to a single client over standard input/output.

pub mod stdio;

pub use stdio::StdioTransport;
