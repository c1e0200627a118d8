//! SQL Server driver built on tiberius.
//!
//! Connections run with `IMPLICIT_TRANSACTIONS ON`, so any statement opens a
//! transaction that stays open until [`Connection::commit`]. Closing without a
//! commit lets the server roll the work back.

use crate::config::ConnectionConfig;
use crate::db::driver::{Connection, Driver, ResultSet};
use crate::db::types::SqlValue;
use crate::error::DbResult;
use tiberius::{AuthMethod, Client};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

/// Application name reported to the server at login.
pub const APPLICATION_NAME: &str = "mssql-mcp-server";

const ENABLE_IMPLICIT_TRANSACTIONS: &str = "SET IMPLICIT_TRANSACTIONS ON";
const COMMIT_OPEN_TRANSACTION: &str = "IF @@TRANCOUNT > 0 COMMIT TRANSACTION";

type TdsClient = Client<Compat<TcpStream>>;

/// Production [`Driver`] opening one TDS connection per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDriver;

impl MssqlDriver {
    pub fn new() -> Self {
        Self
    }

    fn tds_config(config: &ConnectionConfig, host: &str, port: u16) -> tiberius::Config {
        let mut tds = tiberius::Config::new();
        tds.host(host);
        tds.port(port);
        tds.database(&config.database);
        tds.authentication(AuthMethod::sql_server(&config.user, &config.password));
        tds.application_name(APPLICATION_NAME);

        #[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
        tds.encryption(tiberius::EncryptionLevel::NotSupported);
        #[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
        if config.trust_server_certificate {
            tds.trust_cert();
        }

        tds
    }

    async fn open(tds: tiberius::Config) -> Result<TdsClient, tiberius::error::Error> {
        let tcp = TcpStream::connect(tds.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(tds, tcp.compat_write()).await
    }
}

impl Driver for MssqlDriver {
    type Conn = MssqlConnection;

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<MssqlConnection> {
        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            charset = %config.charset,
            "Connecting to SQL Server"
        );

        let tds = Self::tds_config(config, &config.host, config.port);
        let mut client = match Self::open(tds).await {
            Ok(client) => client,
            // Azure SQL may redirect the login to another node
            Err(tiberius::error::Error::Routing { host, port }) => {
                info!(host = %host, port, "Following server routing redirect");
                Self::open(Self::tds_config(config, &host, port)).await?
            }
            Err(e) => return Err(e.into()),
        };

        client
            .simple_query(ENABLE_IMPLICIT_TRANSACTIONS)
            .await?
            .into_results()
            .await?;

        Ok(MssqlConnection { client })
    }
}

/// Row count of the final statement in a batch.
///
/// The server reports one count per statement, including statements run by
/// triggers, so only the last one belongs to the caller's statement.
fn last_row_count(counts: &[u64]) -> u64 {
    counts.last().copied().unwrap_or(0)
}

/// An open tiberius client.
pub struct MssqlConnection {
    client: TdsClient,
}

impl Connection for MssqlConnection {
    async fn query(&mut self, sql: &str) -> DbResult<ResultSet> {
        let mut stream = self.client.simple_query(sql).await?;

        let columns: Vec<String> = stream
            .columns()
            .await?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = stream
            .into_first_result()
            .await?
            .into_iter()
            .map(SqlValue::from_row)
            .collect::<DbResult<Vec<_>>>()?;

        debug!(columns = columns.len(), rows = rows.len(), "Fetched result set");
        Ok(ResultSet::new(columns, rows))
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let result = self.client.execute(sql, &[]).await?;
        Ok(last_row_count(result.rows_affected()))
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.client
            .simple_query(COMMIT_OPEN_TRANSACTION)
            .await?
            .into_results()
            .await?;
        Ok(())
    }

    async fn close(self) -> DbResult<()> {
        self.client.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: "db.internal".to_string(),
            port: 14330,
            user: "sa".to_string(),
            password: "secret".to_string(),
            database: "shop".to_string(),
            charset: "UTF-8".to_string(),
            trust_server_certificate: false,
        }
    }

    #[test]
    fn test_tds_config_targets_configured_address() {
        let config = config();
        let tds = MssqlDriver::tds_config(&config, &config.host, config.port);
        assert_eq!(tds.get_addr(), "db.internal:14330");
    }

    #[test]
    fn test_last_row_count_ignores_earlier_statements() {
        assert_eq!(last_row_count(&[]), 0);
        assert_eq!(last_row_count(&[3]), 3);
        // Trigger writes come before the outer statement's count
        assert_eq!(last_row_count(&[5, 1, 2]), 2);
    }

    #[test]
    fn test_tds_config_uses_routed_address() {
        let tds = MssqlDriver::tds_config(&config(), "node2.internal", 11000);
        assert_eq!(tds.get_addr(), "node2.internal:11000");
    }
}
