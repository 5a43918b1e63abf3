//! ServerHandler implementation for the read-only MSSQL MCP server.

use crate::server::MssqlReadOnlyServer;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::tool_handler;
use tracing::info;

/// The `#[tool_handler]` macro generates `list_tools` and `call_tool` from the
/// router built in [`MssqlReadOnlyServer::new`].
#[tool_handler]
impl ServerHandler for MssqlReadOnlyServer {
    fn get_info(&self) -> ServerInfo {
        info!("MCP client requesting server info");

        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("MSSQL Read-Only MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(build_instructions(self)),
        }
    }
}

fn build_instructions(server: &MssqlReadOnlyServer) -> String {
    let mut instructions = String::new();

    instructions.push_str("# MSSQL Read-Only MCP Server\n\n");
    instructions.push_str("Read-only access to a Microsoft SQL Server instance.\n\n");

    if let Some(db) = server.current_database() {
        instructions.push_str(&format!("**Default database:** `{}`\n\n", db));
    }

    instructions.push_str("## Tools\n");
    instructions.push_str("- `get_tables`, `get_columns`, `get_relationships`: explore the schema\n");
    instructions.push_str("- `get_stored_procedure`: read a procedure's source\n");
    instructions.push_str("- `execute_sql`: run one SELECT or WITH query\n\n");
    instructions.push_str("Every tool accepts an optional `database_name`. ");
    instructions.push_str("Statements that modify data or schema are rejected.\n");

    instructions
}
