//! Connection pool management for SQL Server.
//!
//! Connections come from a bb8 pool. Each checkout is switched to the
//! requested database, or back to the login database when none is named, so
//! a switch made by one call never leaks into the next. A connection dropped
//! while a request is still in flight (a cancelled future, a broken socket)
//! is discarded instead of being returned to the pool.

use super::auth::{create_config, create_connection, truncate_for_log, RawConnection};
use super::result::ResultSet;
use super::types::SqlValue;
use crate::config::DatabaseConfig;
use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::error::ServerError;
use crate::security::quote_identifier;
use async_trait::async_trait;
use bb8::{ManageConnection, Pool, PooledConnection, RunError};
use futures_util::stream::TryStreamExt;
use std::time::Duration;
use tiberius::{Config, QueryItem, QueryStream, ToSql};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Opens connections, optionally switched to a named database.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    type Connection: QueryConnection;

    /// Open a connection. When `database` is non-blank the connection is
    /// switched to it before being returned.
    ///
    /// Every failure is a [`ServerError::Connection`]; a half-opened
    /// connection is dropped before the error is returned.
    async fn open(&self, database: Option<&str>) -> Result<Self::Connection, ServerError>;
}

/// A single open connection.
#[async_trait]
pub trait QueryConnection: Send {
    /// Run caller SQL as a raw batch and collect the first result set.
    async fn fetch_batch(&mut self, sql: &str) -> Result<ResultSet, ServerError>;

    /// Run a parameterized statement (`@P1`, `@P2`, ...) and collect the
    /// first result set.
    async fn fetch(&mut self, sql: &str, params: &[&str]) -> Result<ResultSet, ServerError>;
}

/// Returns the database name when it is present and not blank.
pub fn requested_database(database: Option<&str>) -> Option<&str> {
    database.filter(|name| !name.trim().is_empty())
}

/// A pooled tiberius client.
///
/// `in_flight` is set while a request runs and cleared once its response has
/// been read. The pool discards clients that come back with it still set.
pub struct PooledClient {
    client: RawConnection,
    in_flight: bool,
}

impl PooledClient {
    async fn run_batch(&mut self, sql: &str) -> tiberius::Result<()> {
        self.in_flight = true;
        self.client.simple_query(sql).await?.into_results().await?;
        self.in_flight = false;
        Ok(())
    }

    async fn login_database(&mut self) -> tiberius::Result<Option<String>> {
        self.in_flight = true;
        let row = self
            .client
            .simple_query("SELECT DB_NAME()")
            .await?
            .into_row()
            .await?;
        self.in_flight = false;

        match row {
            Some(row) => Ok(row.try_get::<&str, _>(0)?.map(str::to_string)),
            None => Ok(None),
        }
    }
}

/// bb8 manager that performs TCP connect + TDS login.
pub struct TdsConnectionManager {
    config: Config,
    connect_timeout: Duration,
}

#[async_trait]
impl ManageConnection for TdsConnectionManager {
    type Connection = PooledClient;
    type Error = ServerError;

    async fn connect(&self) -> Result<PooledClient, ServerError> {
        let client = tokio::time::timeout(
            self.connect_timeout,
            create_connection(self.config.clone()),
        )
        .await
        .map_err(|_| {
            ServerError::connection(format!(
                "Timed out after {}s connecting to {}",
                self.connect_timeout.as_secs(),
                self.config.get_addr()
            ))
        })??;

        Ok(PooledClient {
            client,
            in_flight: false,
        })
    }

    async fn is_valid(&self, conn: &mut PooledClient) -> Result<(), ServerError> {
        conn.run_batch("SELECT 1").await.map_err(ServerError::from)
    }

    fn has_broken(&self, conn: &mut PooledClient) -> bool {
        conn.in_flight
    }
}

/// Pool health status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections currently open, idle or checked out.
    pub total_connections: usize,
    /// Open connections waiting in the pool.
    pub idle_connections: usize,
    /// Connections checked out by a call.
    pub in_use_connections: usize,
    /// Maximum allowed connections.
    pub max_connections: usize,
}

/// The production gateway, backed by a bb8 pool of tiberius clients.
pub struct TdsGateway {
    pool: Pool<TdsConnectionManager>,
    login_database: OnceCell<String>,
    max_connections: usize,
    max_rows: Option<usize>,
}

impl TdsGateway {
    /// Create a gateway from configuration. No connection is opened yet.
    ///
    /// Must be called inside a tokio runtime; the pool spawns its reaper.
    pub fn new(config: &DatabaseConfig, max_rows: Option<usize>) -> Result<Self, ServerError> {
        info!(
            "Creating connection pool (max connections: {}, connect timeout: {}s)",
            config.pool.max_connections,
            config.pool.connection_timeout.as_secs()
        );

        let manager = TdsConnectionManager {
            config: create_config(config)?,
            connect_timeout: config.pool.connection_timeout,
        };
        let max_size = u32::try_from(config.pool.max_connections.max(1)).unwrap_or(u32::MAX);

        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(config.pool.connection_timeout)
            .test_on_check_out(false)
            .retry_connection(false)
            .build_unchecked(manager);

        Ok(Self {
            pool,
            login_database: OnceCell::new(),
            max_connections: max_size as usize,
            max_rows,
        })
    }

    /// Get pool health status.
    pub fn status(&self) -> PoolStatus {
        let state = self.pool.state();
        let total = state.connections as usize;
        let idle = state.idle_connections as usize;
        PoolStatus {
            total_connections: total,
            idle_connections: idle,
            in_use_connections: total.saturating_sub(idle),
            max_connections: self.max_connections,
        }
    }
}

#[async_trait]
impl ConnectionGateway for TdsGateway {
    type Connection = TdsConnection;

    async fn open(&self, database: Option<&str>) -> Result<TdsConnection, ServerError> {
        let mut conn = self.pool.get_owned().await.map_err(|e| match e {
            RunError::User(e) => e,
            RunError::TimedOut => ServerError::connection(format!(
                "Timed out waiting for a free connection ({} in use)",
                self.status().in_use_connections
            )),
        })?;

        // Every checkout runs USE before any switch can happen, so the client
        // used here is still in its login database.
        let client: &mut PooledClient = &mut conn;
        let login = self
            .login_database
            .get_or_try_init(|| async move {
                match client.login_database().await {
                    Ok(Some(name)) => Ok(name),
                    Ok(None) => Err(ServerError::connection(
                        "Cannot determine the login database",
                    )),
                    Err(e) => Err(ServerError::connection_with_source(
                        format!("Cannot determine the login database: {}", e),
                        e,
                    )),
                }
            })
            .await?;

        let target = requested_database(database).unwrap_or(login.as_str());

        // USE must run as a plain batch; through sp_executesql the switch
        // would only last for that call. A failed switch leaves the client
        // flagged in flight, so the pool discards it.
        let switch = format!("USE {};", quote_identifier(target));
        if let Err(e) = conn.run_batch(&switch).await {
            warn!("Switching to database '{}' failed: {}", target, e);
            drop(conn);
            return Err(ServerError::connection_with_source(
                format!("Cannot open database '{}': {}", target, e),
                e,
            ));
        }
        debug!("Connection set to database '{}'", target);

        Ok(TdsConnection {
            conn,
            max_rows: self.max_rows,
        })
    }
}

/// A checked-out client. Dropping it returns the client to the pool.
pub struct TdsConnection {
    conn: PooledConnection<'static, TdsConnectionManager>,
    max_rows: Option<usize>,
}

impl TdsConnection {
    /// A server-reported error leaves the client usable; a transport
    /// failure does not.
    fn settle(&mut self, result: &Result<ResultSet, ServerError>) {
        self.conn.in_flight = matches!(result, Err(ServerError::Connection { .. }));
    }
}

#[async_trait]
impl QueryConnection for TdsConnection {
    async fn fetch_batch(&mut self, sql: &str) -> Result<ResultSet, ServerError> {
        debug!(
            "Executing batch: {}",
            truncate_for_log(sql, LOG_QUERY_TRUNCATE_LENGTH)
        );
        let max_rows = self.max_rows;
        self.conn.in_flight = true;
        let result = match self.conn.client.simple_query(sql).await {
            Ok(stream) => collect_first_result(stream, max_rows).await,
            Err(e) => Err(e.into()),
        };
        self.settle(&result);
        result
    }

    async fn fetch(&mut self, sql: &str, params: &[&str]) -> Result<ResultSet, ServerError> {
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let max_rows = self.max_rows;
        self.conn.in_flight = true;
        let result = match self.conn.client.query(sql, &params).await {
            Ok(stream) => collect_first_result(stream, max_rows).await,
            Err(e) => Err(e.into()),
        };
        self.settle(&result);
        result
    }
}

/// Collect the first result set of a query stream.
///
/// Later result sets are not read; tiberius drains them before the next
/// request on the same client. Rows past `max_rows` are skipped and the
/// result is marked truncated.
async fn collect_first_result(
    mut stream: QueryStream<'_>,
    max_rows: Option<usize>,
) -> Result<ResultSet, ServerError> {
    let mut result = ResultSet::default();

    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                if meta.result_index() > 0 {
                    break;
                }
                result = ResultSet::new(meta.columns().iter().map(|col| col.name().to_string()));
            }
            QueryItem::Row(row) => {
                if row.result_index() > 0 {
                    break;
                }
                if max_rows.is_some_and(|max| result.row_count() >= max) {
                    result.mark_truncated();
                    continue;
                }
                let values = row
                    .into_iter()
                    .map(|data| SqlValue::from_column(&data))
                    .collect::<Result<Vec<_>, _>>()?;
                result.push_row(values)?;
            }
        }
    }

    debug!("Collected {} row(s)", result.row_count());
    Ok(result)
}
