//! MCP server struct definition and initialization.

use crate::config::Config;
use crate::database::{SafeQueryExecutor, SchemaCatalog, TdsGateway};
use crate::error::ServerError;
use rmcp::handler::server::router::tool::ToolRouter;
use std::sync::Arc;

/// The read-only MSSQL MCP server.
///
/// Cloned per request by rmcp; everything inside is shared through `Arc`.
#[derive(Clone)]
pub struct MssqlReadOnlyServer {
    /// Configuration.
    pub(crate) config: Arc<Config>,

    /// Classifies and runs caller SQL.
    pub(crate) executor: SafeQueryExecutor<TdsGateway>,

    /// Fixed catalog lookups.
    pub(crate) catalog: SchemaCatalog<TdsGateway>,

    /// Tool router for dispatching tool calls.
    pub(crate) tool_router: ToolRouter<Self>,
}

impl MssqlReadOnlyServer {
    /// Create a new server instance with the given configuration.
    ///
    /// No connection is opened here; the pool connects on the first tool
    /// call. Must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let gateway = Arc::new(TdsGateway::new(&config.database, config.query.max_rows)?);

        Ok(Self {
            executor: SafeQueryExecutor::new(Arc::clone(&gateway)),
            catalog: SchemaCatalog::new(gateway),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        })
    }

    /// Create a server from environment variables.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::new(Config::from_env()?)
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the query executor.
    pub fn executor(&self) -> &SafeQueryExecutor<TdsGateway> {
        &self.executor
    }

    /// Get a reference to the schema catalog.
    pub fn catalog(&self) -> &SchemaCatalog<TdsGateway> {
        &self.catalog
    }

    /// The database named in the configuration, if any.
    pub fn current_database(&self) -> Option<&str> {
        self.config.current_database()
    }
}
