//! Connection setup for SQL Server.
//!
//! Builds the tiberius configuration from [`DatabaseConfig`] and performs the
//! TCP connect plus TDS login handshake.

use crate::config::{AuthConfig, DatabaseConfig, Endpoint};
use crate::error::ServerError;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// Type alias for a raw tiberius connection.
pub type RawConnection = Client<Compat<TcpStream>>;

/// Configure tiberius authentication method based on AuthConfig.
fn configure_auth(config: &mut Config, auth: &AuthConfig) {
    match auth {
        AuthConfig::SqlServer { username, password } => {
            config.authentication(AuthMethod::sql_server(username, password));
        }
        #[cfg(windows)]
        AuthConfig::Windows => {
            config.authentication(AuthMethod::Integrated);
        }
    }
}

/// Create a tiberius Config from the database configuration.
pub fn create_config(db_config: &DatabaseConfig) -> Result<Config, ServerError> {
    let mut config = match &db_config.endpoint {
        Endpoint::ConnectionString(connection_string) => Config::from_ado_string(connection_string)
            .map_err(|e| ServerError::config(format!("Invalid connection string: {}", e)))?,
        Endpoint::Server {
            host,
            port,
            database,
            auth,
            encrypt,
            trust_server_certificate,
        } => {
            let mut config = Config::new();
            config.host(host);
            config.port(*port);

            if let Some(database) = database {
                config.database(database);
            }

            if *encrypt {
                config.encryption(EncryptionLevel::Required);
            } else {
                config.encryption(EncryptionLevel::Off);
            }

            if *trust_server_certificate {
                config.trust_cert();
            }

            configure_auth(&mut config, auth);
            config
        }
    };

    config.application_name(&db_config.application_name);
    Ok(config)
}

/// Open a raw connection to SQL Server.
///
/// 1. Establishes the TCP connection
/// 2. Performs the TDS handshake and login
pub async fn create_connection(config: Config) -> Result<RawConnection, ServerError> {
    let address = config.get_addr();
    debug!("Creating connection to {}", address);

    let tcp = TcpStream::connect(&address).await.map_err(|e| {
        ServerError::connection_with_source(format!("Failed to connect to {}: {}", address, e), e)
    })?;

    tcp.set_nodelay(true)
        .map_err(|e| ServerError::connection(format!("Failed to set TCP_NODELAY: {}", e)))?;

    let client = Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| {
            ServerError::connection(format!("Failed to connect to SQL Server: {}", e))
        })?;

    debug!("Connection established successfully");
    Ok(client)
}

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary so multi-byte text never panics.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn test_db_config(endpoint: Endpoint) -> DatabaseConfig {
        DatabaseConfig {
            endpoint,
            pool: PoolConfig::default(),
            application_name: "test".to_string(),
        }
    }

    fn server_endpoint() -> Endpoint {
        Endpoint::Server {
            host: "localhost".to_string(),
            port: 14330,
            database: Some("master".to_string()),
            auth: AuthConfig::SqlServer {
                username: "sa".to_string(),
                password: "test".to_string(),
            },
            encrypt: false,
            trust_server_certificate: true,
        }
    }

    #[test]
    fn test_create_config_from_parts() {
        let config = create_config(&test_db_config(server_endpoint())).unwrap();
        assert_eq!(config.get_addr(), "localhost:14330");
    }

    #[test]
    fn test_create_config_from_connection_string() {
        let endpoint = Endpoint::ConnectionString(
            "Server=tcp:db.example,1444;Database=Sales;User Id=reader;Password=x;TrustServerCertificate=true"
                .to_string(),
        );
        let config = create_config(&test_db_config(endpoint)).unwrap();
        assert_eq!(config.get_addr(), "db.example:1444");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(
            truncate_for_log("this is a long string", 10),
            "this is a ..."
        );
        assert_eq!(truncate_for_log("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_for_log("ééé", 2), "éé...");
    }
}
