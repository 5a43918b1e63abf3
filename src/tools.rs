//! MCP tools for read-only SQL Server access.
//!
//! - `get_tables`: List base tables
//! - `get_columns`: Describe the columns of a table
//! - `get_relationships`: List foreign-key relationships
//! - `execute_sql`: Run a single read-only query
//! - `get_stored_procedure`: Show a stored procedure's source
//!
//! Every tool answers with text. Database failures come back as an error
//! result carrying a readable message, never as a protocol error.

mod inputs;

pub use inputs::*;

use crate::error::{McpError, ServerError};
use crate::server::MssqlReadOnlyServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router};
use tracing::{debug, error, info};

#[tool_router(vis = "pub(crate)")]
impl MssqlReadOnlyServer {
    /// List the base tables of a database.
    #[tool(description = "List all tables in the database as schema.table. Optionally pass database_name to inspect another database on the same server.")]
    pub async fn get_tables(
        &self,
        Parameters(input): Parameters<DatabaseInput>,
    ) -> Result<CallToolResult, McpError> {
        let database = input.database_name.as_deref();
        let db_info = format_database_info(database);
        debug!("Listing tables{}", db_info);

        match self.catalog.list_tables(database).await {
            Ok(tables) => Ok(text_result(format!(
                "Tables{}:\n\n{}",
                db_info,
                join_lines(&tables, "\n")
            ))),
            Err(e) => Ok(failure("get_tables", e)),
        }
    }

    /// Describe the columns of a table.
    #[tool(description = "Get the columns of a table: name, data type, nullability, identity and primary key. Accepts 'Users', 'sales.Orders' or phrases like 'table Users'.")]
    pub async fn get_columns(
        &self,
        Parameters(input): Parameters<GetColumnsInput>,
    ) -> Result<CallToolResult, McpError> {
        let table = extract_table_name(&input.table_name);
        if table.is_empty() {
            return Ok(text_result(
                "Please specify the table name to query its fields.",
            ));
        }

        let database = input.database_name.as_deref();
        let db_info = format_database_info(database);
        debug!("Listing columns of '{}'{}", table, db_info);

        match self.catalog.list_columns(&table, database).await {
            Ok(columns) if columns.is_empty() => Ok(text_result(format!(
                "No columns found for table '{}'{}. Verify the table name is correct.",
                table, db_info
            ))),
            Ok(columns) => Ok(text_result(format!(
                "Columns in the table {}{}:\n\n{}",
                table,
                db_info,
                join_lines(&columns, "\n")
            ))),
            Err(e) => Ok(failure("get_columns", e)),
        }
    }

    /// List the foreign-key relationships between tables.
    #[tool(description = "List foreign key relationships between tables as Table.Column -> ReferencedTable.Column.")]
    pub async fn get_relationships(
        &self,
        Parameters(input): Parameters<DatabaseInput>,
    ) -> Result<CallToolResult, McpError> {
        let database = input.database_name.as_deref();
        let db_info = format_database_info(database);

        match self.catalog.list_relationships(database).await {
            Ok(relationships) if relationships.is_empty() => Ok(text_result(format!(
                "No foreign key relationships found{}.",
                db_info
            ))),
            Ok(relationships) => Ok(text_result(format!(
                "Relationships between tables{}:\n\n{}",
                db_info,
                join_lines(&relationships, "\n")
            ))),
            Err(e) => Ok(failure("get_relationships", e)),
        }
    }

    /// Run a single read-only query.
    #[tool(description = "Execute a read-only SQL query. Only a single SELECT (or WITH ... SELECT) statement is accepted; anything that could modify data or schema is rejected before reaching the database.")]
    pub async fn execute_sql(
        &self,
        Parameters(input): Parameters<ExecuteSqlInput>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!("execute_sql called");

        let output = self
            .executor
            .execute_read_only_query_with_cancel(
                &input.sql_query,
                input.database_name.as_deref(),
                context.ct.clone(),
            )
            .await;

        Ok(text_result(output))
    }

    /// Show the source of a stored procedure.
    #[tool(description = "Get the definition (source code) of a stored procedure by name.")]
    pub async fn get_stored_procedure(
        &self,
        Parameters(input): Parameters<GetStoredProcedureInput>,
    ) -> Result<CallToolResult, McpError> {
        let name = input.sp_name.trim();
        if name.is_empty() {
            return Ok(text_result("Stored procedure name cannot be empty."));
        }

        let database = input.database_name.as_deref();
        let db_info = format_database_info(database);

        match self.catalog.procedure_definition(name, database).await {
            Ok(definitions) if definitions.is_empty() => Ok(text_result(format!(
                "Stored procedure '{}' not found{}.",
                name, db_info
            ))),
            Ok(definitions) => Ok(text_result(format!(
                "Stored procedure '{}'{}:\n\n{}",
                name,
                db_info,
                join_lines(&definitions, "\n\n")
            ))),
            Err(e) => Ok(failure("get_stored_procedure", e)),
        }
    }
}

fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

fn failure(tool: &str, e: ServerError) -> CallToolResult {
    error!("{} failed: {}", tool, e);
    if let Some(hint) = e.suggestion() {
        debug!("{}: {}", tool, hint);
    }
    CallToolResult::error(vec![Content::text(e.caller_message())])
}

fn join_lines<T: std::fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}
