//! Configuration handling for the MSSQL MCP Server.
//!
//! Process-level settings (logging) come from CLI arguments and environment
//! variables via `clap`. Connection parameters are resolved separately, fresh
//! for every operation, from a [`ConfigSource`].

use crate::error::{DbError, DbResult};
use clap::Parser;
use std::collections::HashMap;
use std::fmt;
use tracing::error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1433;
pub const DEFAULT_CHARSET: &str = "UTF-8";

pub const ENV_SERVER: &str = "MSSQL_SERVER";
pub const ENV_PORT: &str = "MSSQL_PORT";
pub const ENV_USER: &str = "MSSQL_USER";
pub const ENV_PASSWORD: &str = "MSSQL_PASSWORD";
pub const ENV_DATABASE: &str = "MSSQL_DATABASE";
pub const ENV_CHARSET: &str = "MSSQL_CHARSET";
pub const ENV_TRUST_SERVER_CERTIFICATE: &str = "MSSQL_TRUST_SERVER_CERTIFICATE";

/// A key/value source that connection settings are read from.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads settings from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Connection parameters for a single database round trip.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Client character set. TDS negotiates UTF-16 for Unicode columns, so
    /// this is informational for the driver.
    pub charset: String,
    /// Accept any server certificate when TLS is enabled.
    pub trust_server_certificate: bool,
}

impl ConnectionConfig {
    /// Resolve connection parameters from the given source.
    ///
    /// Empty values count as unset. Fails with `MissingConfiguration` when the
    /// user, password or database is absent.
    pub fn resolve(source: &dyn ConfigSource) -> DbResult<Self> {
        let lookup = |key: &str| source.get(key).filter(|v| !v.is_empty());

        let user = lookup(ENV_USER);
        let password = lookup(ENV_PASSWORD);
        let database = lookup(ENV_DATABASE);

        let (Some(user), Some(password), Some(database)) = (&user, &password, &database) else {
            let missing: Vec<&str> = [
                (ENV_USER, user.is_none()),
                (ENV_PASSWORD, password.is_none()),
                (ENV_DATABASE, database.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            error!(
                missing = ?missing,
                "Missing required database configuration. {}, {} and {} are required",
                ENV_USER,
                ENV_PASSWORD,
                ENV_DATABASE
            );
            return Err(DbError::missing_configuration(missing));
        };

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                DbError::invalid_configuration(ENV_PORT, format!("'{}' is not a valid port: {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let trust_server_certificate = match lookup(ENV_TRUST_SERVER_CERTIFICATE) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                DbError::invalid_configuration(
                    ENV_TRUST_SERVER_CERTIFICATE,
                    format!("'{}' is not a boolean (use true or false)", raw),
                )
            })?,
            None => false,
        };

        Ok(Self {
            host: lookup(ENV_SERVER).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            user: user.clone(),
            password: password.clone(),
            database: database.clone(),
            charset: lookup(ENV_CHARSET).unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            trust_server_certificate,
        })
    }

    /// Resolve connection parameters from the process environment.
    pub fn from_env() -> DbResult<Self> {
        Self::resolve(&ProcessEnv)
    }

    /// `host:port` address for the TCP connection.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

/// Process configuration for the MSSQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-mcp-server",
    about = "MCP server for Microsoft SQL Server - lets AI assistants run SQL and browse tables",
    long_about = "MCP server for Microsoft SQL Server.\n\n\
        Connection settings are read from the environment on every request:\n\
        MSSQL_SERVER (default localhost), MSSQL_PORT (default 1433), MSSQL_USER,\n\
        MSSQL_PASSWORD, MSSQL_DATABASE, MSSQL_CHARSET (default UTF-8) and\n\
        MSSQL_TRUST_SERVER_CERTIFICATE (default false, TLS builds only).",
    version,
    author
)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MSSQL_MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MSSQL_MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_USER, "sa"),
            (ENV_PASSWORD, "secret"),
            (ENV_DATABASE, "shop"),
        ]
    }

    #[test]
    fn test_defaults_applied_to_optional_fields() {
        let config = ConnectionConfig::resolve(&source(&required())).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1433);
        assert_eq!(config.charset, "UTF-8");
        assert_eq!(config.user, "sa");
        assert_eq!(config.password, "secret");
        assert_eq!(config.database, "shop");
        assert!(!config.trust_server_certificate);
    }

    #[test]
    fn test_trust_server_certificate_is_opt_in() {
        for (raw, expected) in [("true", true), ("YES", true), ("1", true), ("false", false), ("0", false)] {
            let mut pairs = required();
            pairs.push((ENV_TRUST_SERVER_CERTIFICATE, raw));
            let config = ConnectionConfig::resolve(&source(&pairs)).unwrap();
            assert_eq!(config.trust_server_certificate, expected, "{raw}");
        }

        let mut pairs = required();
        pairs.push((ENV_TRUST_SERVER_CERTIFICATE, "sometimes"));
        let err = ConnectionConfig::resolve(&source(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidConfiguration { ref variable, .. }
                if variable == ENV_TRUST_SERVER_CERTIFICATE
        ));
    }

    #[test]
    fn test_optional_fields_override_defaults() {
        let mut pairs = required();
        pairs.extend([
            (ENV_SERVER, "db.internal"),
            (ENV_PORT, "14330"),
            (ENV_CHARSET, "CP1252"),
        ]);
        let config = ConnectionConfig::resolve(&source(&pairs)).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 14330);
        assert_eq!(config.charset, "CP1252");
        assert_eq!(config.addr(), "db.internal:14330");
    }

    #[test]
    fn test_empty_optional_value_uses_default() {
        let mut pairs = required();
        pairs.extend([(ENV_SERVER, ""), (ENV_PORT, "")]);
        let config = ConnectionConfig::resolve(&source(&pairs)).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1433);
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        for name in [ENV_USER, ENV_PASSWORD, ENV_DATABASE] {
            let pairs: Vec<_> = required().into_iter().filter(|(k, _)| *k != name).collect();
            let err = ConnectionConfig::resolve(&source(&pairs)).unwrap_err();
            match err {
                DbError::MissingConfiguration { variables } => {
                    assert_eq!(variables, vec![name.to_string()]);
                }
                other => panic!("expected MissingConfiguration, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_required_field_is_missing() {
        let mut pairs = required();
        pairs.retain(|(k, _)| *k != ENV_PASSWORD);
        pairs.push((ENV_PASSWORD, ""));
        let err = ConnectionConfig::resolve(&source(&pairs)).unwrap_err();
        assert!(matches!(err, DbError::MissingConfiguration { .. }));
    }

    #[test]
    fn test_all_missing_reports_every_variable() {
        let err = ConnectionConfig::resolve(&source(&[])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MSSQL_USER"));
        assert!(msg.contains("MSSQL_PASSWORD"));
        assert!(msg.contains("MSSQL_DATABASE"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut pairs = required();
        pairs.push((ENV_PORT, "not-a-port"));
        let err = ConnectionConfig::resolve(&source(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidConfiguration { ref variable, .. } if variable == ENV_PORT
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::resolve(&source(&required())).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}
