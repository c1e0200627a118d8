//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Driver and connection traits used by the handlers
//! - The SQL Server implementation over tiberius
//! - Cell value decoding

pub mod driver;
pub mod mssql;
pub mod types;

pub use driver::{Connection, Driver, ResultSet};
pub use mssql::{MssqlConnection, MssqlDriver};
pub use types::SqlValue;
