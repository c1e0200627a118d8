//! Error types for the MSSQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Request and configuration errors surface to the client as protocol errors, while
//! database errors are usually caught at the tool boundary and reported as text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Missing required database configuration: {}", variables.join(", "))]
    MissingConfiguration { variables: Vec<String> },

    #[error("Invalid configuration for {variable}: {message}")]
    InvalidConfiguration { variable: String, message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Query is required")]
    MissingQuery,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Unknown resource: {uri}")]
    InvalidResourceUri { uri: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// SQL Server error number, e.g. 208 for an invalid object name
        code: Option<u32>,
        suggestion: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a missing configuration error naming the absent variables.
    pub fn missing_configuration<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        Self::MissingConfiguration {
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            variable: variable.into(),
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn invalid_resource_uri(uri: impl Into<String>) -> Self {
        Self::InvalidResourceUri { uri: uri.into() }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with an optional server error number.
    pub fn database(
        message: impl Into<String>,
        code: Option<u32>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code,
            suggestion: suggestion.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::MissingConfiguration { .. } => {
                Some("Set MSSQL_USER, MSSQL_PASSWORD and MSSQL_DATABASE in the server environment")
            }
            _ => None,
        }
    }

    /// The underlying message without the category prefix.
    ///
    /// This is the text reported back to the client when a statement fails.
    pub fn detail(&self) -> String {
        match self {
            Self::Connection { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Convert tiberius errors to DbError.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        use tiberius::error::Error as TdsError;

        match err {
            TdsError::Server(token) => DbError::database(
                token.message().to_string(),
                Some(token.code()),
                "Check the SQL syntax and referenced objects",
            ),
            TdsError::Io { message, .. } => DbError::connection(
                format!("I/O error: {}", message),
                "Check network connectivity and database server status",
            ),
            TdsError::Tls(message) => DbError::connection(
                format!("TLS error: {}", message),
                "Verify TLS configuration and certificates",
            ),
            TdsError::Protocol(message) => DbError::connection(
                format!("Protocol error: {}", message),
                "Check database server compatibility",
            ),
            TdsError::Routing { host, port } => DbError::connection(
                format!("Server requested routing to {}:{}", host, port),
                "Connect to the routed host directly",
            ),
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::MissingConfiguration { .. }
            | DbError::InvalidConfiguration { .. }
            | DbError::UnknownTool { .. }
            | DbError::MissingQuery
            | DbError::InvalidInput { .. } => rmcp::ErrorData::invalid_params(err.to_string(), data),

            DbError::InvalidResourceUri { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            DbError::Database { message, code, .. } => {
                let msg = match code {
                    Some(code) => format!("{} (error {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Connection { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
