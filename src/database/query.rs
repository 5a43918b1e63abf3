//! Read-only query execution.
//!
//! [`SafeQueryExecutor`] is the single entry point for caller SQL: classify,
//! open a connection, run the batch, render the rows. Every outcome, including
//! failures, comes back as text.

use super::auth::truncate_for_log;
use super::connection::{requested_database, ConnectionGateway, QueryConnection};
use super::result::{render, ResultSet};
use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::error::ServerError;
use crate::security::QueryClassifier;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executes caller SQL after it passes the read-only classifier.
pub struct SafeQueryExecutor<G> {
    gateway: Arc<G>,
    classifier: QueryClassifier,
}

impl<G> Clone for SafeQueryExecutor<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            classifier: self.classifier,
        }
    }
}

impl<G: ConnectionGateway> SafeQueryExecutor<G> {
    /// Create an executor over a gateway.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            classifier: QueryClassifier::new(),
        }
    }

    /// The gateway this executor opens connections through.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Run a read-only query and return the rendered result or an error text.
    ///
    /// A rejected query returns the classifier reason and never touches the
    /// database.
    pub async fn execute_read_only_query(&self, sql: &str, database: Option<&str>) -> String {
        self.execute_read_only_query_with_cancel(sql, database, CancellationToken::new())
            .await
    }

    /// Like [`execute_read_only_query`](Self::execute_read_only_query), but
    /// stops as soon as `cancel` fires.
    ///
    /// The in-flight future is dropped on cancellation, which closes its
    /// connection and frees the gateway slot.
    pub async fn execute_read_only_query_with_cancel(
        &self,
        sql: &str,
        database: Option<&str>,
        cancel: CancellationToken,
    ) -> String {
        if let Err(e) = self.classifier.validate(sql).into_result() {
            warn!(
                "Rejected query: {} ({})",
                truncate_for_log(sql.trim(), LOG_QUERY_TRUNCATE_LENGTH),
                e
            );
            return e.caller_message();
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ServerError::Cancelled),
            result = self.run(sql, database) => result,
        };

        match outcome {
            Ok(text) => text,
            Err(ServerError::Cancelled) => {
                info!("Query cancelled by caller");
                ServerError::Cancelled.caller_message()
            }
            Err(e) => {
                error!("Query failed: {}", e);
                e.caller_message()
            }
        }
    }

    async fn run(&self, sql: &str, database: Option<&str>) -> Result<String, ServerError> {
        let start = Instant::now();
        debug!(
            "Executing query: {}",
            truncate_for_log(sql, LOG_QUERY_TRUNCATE_LENGTH)
        );

        let result = {
            let mut conn = self.gateway.open(database).await?;
            conn.fetch_batch(sql).await?
        };

        debug!(
            "Query completed: {} row(s) in {}ms",
            result.row_count(),
            start.elapsed().as_millis()
        );

        Ok(decorate(&result, database))
    }
}

/// Render a result with the database banner and row-count footer.
fn decorate(result: &ResultSet, database: Option<&str>) -> String {
    let mut output = String::new();

    if let Some(name) = requested_database(database) {
        output.push_str(&format!("Database: {}\n\n", name));
    }

    output.push_str(&render(result));

    if !result.is_empty() {
        output.push_str(&format!("\n({} row(s) returned)\n", result.row_count()));
    }
    if result.is_truncated() {
        output.push_str(&format!(
            "(results truncated at {} rows; narrow the query to see more)\n",
            result.row_count()
        ));
    }

    output
}
