//! Configuration management for the read-only MSSQL MCP server.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.

use crate::constants::{
    DEFAULT_APPLICATION_NAME, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_CONNECTION_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
};
use crate::error::ServerError;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection configuration
    pub database: DatabaseConfig,

    /// Query execution configuration
    pub query: QueryConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Where and how to connect
    pub endpoint: Endpoint,

    /// Connection limits
    pub pool: PoolConfig,

    /// Application name sent to SQL Server
    pub application_name: String,
}

/// The SQL Server to connect to.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// An ADO.NET style connection string (`Server=...;User Id=...;`).
    ConnectionString(String),

    /// Discrete connection settings.
    Server {
        /// SQL Server hostname or IP address
        host: String,
        /// SQL Server port (default: 1433)
        port: u16,
        /// Database selected at login (None = login default)
        database: Option<String>,
        /// Authentication configuration
        auth: AuthConfig,
        /// Enable TLS encryption
        encrypt: bool,
        /// Trust server certificate (for self-signed certs)
        trust_server_certificate: bool,
    },
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    /// SQL Server authentication (username/password)
    SqlServer { username: String, password: String },

    /// Windows authentication (Integrated Security)
    #[cfg(windows)]
    Windows,
}

/// Connection limits.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections open at the same time
    pub max_connections: usize,

    /// Bound on TCP connect plus login handshake
    pub connection_timeout: Duration,
}

/// Query execution configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryConfig {
    /// Maximum rows buffered per query (None = unbounded)
    pub max_rows: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Connection (one of)
    /// - `MSSQL_CONNECTION_STRING`: ADO.NET connection string, used as-is
    /// - `MSSQL_HOST` + `MSSQL_USER` + `MSSQL_PASSWORD`
    ///
    /// ## Optional
    /// - `MSSQL_PORT`: Port number (default: 1433)
    /// - `MSSQL_DATABASE`: Database selected at login
    /// - `MSSQL_ENCRYPT`: Enable TLS (default: true)
    /// - `MSSQL_TRUST_CERT`: Trust server certificate (default: false)
    /// - `MSSQL_POOL_MAX`: Maximum concurrent connections (default: 10)
    /// - `MSSQL_CONNECT_TIMEOUT`: Connection timeout in seconds (default: 30)
    /// - `MSSQL_MAX_ROWS`: Maximum result rows buffered per query (default: unbounded)
    /// - `MSSQL_APP_NAME`: Application name reported to the server
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = match lookup("MSSQL_CONNECTION_STRING").filter(|s| !s.trim().is_empty()) {
            Some(connection_string) => Endpoint::ConnectionString(connection_string),
            None => server_endpoint(&lookup)?,
        };

        let max_connections = lookup("MSSQL_POOL_MAX")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        if max_connections == 0 {
            return Err(ServerError::config("MSSQL_POOL_MAX must be at least 1"));
        }

        let connection_timeout_secs = lookup("MSSQL_CONNECT_TIMEOUT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS);

        let max_rows = lookup("MSSQL_MAX_ROWS")
            .and_then(|p| p.parse().ok())
            .filter(|rows: &usize| *rows > 0);

        let application_name =
            lookup("MSSQL_APP_NAME").unwrap_or_else(|| DEFAULT_APPLICATION_NAME.to_string());

        Ok(Config {
            database: DatabaseConfig {
                endpoint,
                pool: PoolConfig {
                    max_connections,
                    connection_timeout: Duration::from_secs(connection_timeout_secs),
                },
                application_name,
            },
            query: QueryConfig { max_rows },
        })
    }

    /// Get the database selected at login, if one was configured explicitly.
    pub fn current_database(&self) -> Option<&str> {
        match &self.database.endpoint {
            Endpoint::Server { database, .. } => database.as_deref(),
            Endpoint::ConnectionString(_) => None,
        }
    }
}

fn server_endpoint<F>(lookup: &F) -> Result<Endpoint, ServerError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("MSSQL_HOST").ok_or_else(|| {
        ServerError::config("MSSQL_HOST or MSSQL_CONNECTION_STRING environment variable is required")
    })?;

    let auth = match (lookup("MSSQL_USER"), lookup("MSSQL_PASSWORD")) {
        (Some(u), Some(p)) => AuthConfig::SqlServer {
            username: u,
            password: p,
        },
        (Some(_), None) => {
            return Err(ServerError::config(
                "MSSQL_PASSWORD is required when MSSQL_USER is set",
            ))
        }
        (None, Some(_)) => {
            return Err(ServerError::config(
                "MSSQL_USER is required when MSSQL_PASSWORD is set",
            ))
        }
        #[cfg(windows)]
        (None, None) => AuthConfig::Windows,
        #[cfg(not(windows))]
        (None, None) => {
            return Err(ServerError::config(
                "Authentication required: set MSSQL_USER and MSSQL_PASSWORD",
            ))
        }
    };

    let port = lookup("MSSQL_PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let database = lookup("MSSQL_DATABASE").filter(|d| !d.trim().is_empty());

    let encrypt = lookup("MSSQL_ENCRYPT")
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(true);

    let trust_server_certificate = lookup("MSSQL_TRUST_CERT")
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false);

    Ok(Endpoint::Server {
        host,
        port,
        database,
        auth,
        encrypt,
        trust_server_certificate,
    })
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}
