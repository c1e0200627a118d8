//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::Driver;
use crate::error::{DbError, DbResult};
use crate::mcp::MssqlService;
use rmcp::{
    RoleServer, ServiceExt,
    transport::{IntoTransport, stdio},
};
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The client closed the stream.
    StreamClosed,
    /// A process signal arrived first.
    Signal(&'static str),
}

/// Stdio transport implementation.
///
/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport<D: Driver> {
    service: MssqlService<D>,
}

impl<D: Driver> StdioTransport<D> {
    pub fn new(service: MssqlService<D>) -> Self {
        Self { service }
    }

    pub fn name(&self) -> &'static str {
        "stdio"
    }

    /// Serve requests until the client closes the stream or a shutdown signal arrives.
    pub async fn run(self) -> DbResult<()> {
        info!(transport = self.name(), "Starting MCP server");

        match serve_until(self.service, stdio(), shutdown_signal()).await? {
            Shutdown::StreamClosed => Ok(()),
            Shutdown::Signal(_) => {
                // A blocked stdin read cannot be cancelled from here
                info!("Exiting process");
                std::process::exit(0)
            }
        }
    }
}

/// Run one MCP session over `transport`, racing it against `shutdown`.
///
/// The handshake is covered too, so a signal that arrives before the client
/// initializes still ends the session.
pub async fn serve_until<D, T, E, A>(
    service: MssqlService<D>,
    transport: T,
    shutdown: impl Future<Output = &'static str>,
) -> DbResult<Shutdown>
where
    D: Driver,
    T: IntoTransport<RoleServer, E, A>,
    E: std::error::Error + Send + Sync + 'static,
{
    let session = async {
        let running = service
            .serve(transport)
            .await
            .map_err(|e| DbError::internal(format!("Failed to start MCP session: {}", e)))?;
        let reason = running
            .waiting()
            .await
            .map_err(|e| DbError::internal(format!("MCP session error: {}", e)))?;
        info!(reason = ?reason, "Client closed the stream");
        Ok::<_, DbError>(Shutdown::StreamClosed)
    };

    tokio::select! {
        outcome = session => outcome,
        received = shutdown => {
            info!(signal = received, "Shutdown signal received");
            Ok(Shutdown::Signal(received))
        }
    }
}

/// Resolve with the name of the first SIGINT or SIGTERM.
///
/// A signal that cannot be hooked is logged and never fires.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}
