//! SQL Server identifier utilities.
//!
//! Uses SQL Server's bracket notation `[identifier]` to delimit identifiers.

use crate::constants::DEFAULT_SCHEMA;

/// Quote a name as a SQL Server delimited identifier.
///
/// The name is wrapped in brackets and every embedded `]` is doubled. No
/// trimming or validation happens here: the result is always a single
/// delimited identifier, whatever the input contains.
///
/// # Examples
///
/// ```
/// use mssql_readonly_mcp::security::quote_identifier;
///
/// assert_eq!(quote_identifier("Sales"), "[Sales]");
/// assert_eq!(quote_identifier("My]Db"), "[My]]Db]");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Split a possibly schema-qualified table name on its first dot.
///
/// Returns `(schema, table)`, with the schema defaulting to `dbo`. The parts
/// are meant to be bound as query parameters, never spliced into SQL text.
pub fn parse_qualified_name(identifier: &str) -> (String, String) {
    match identifier.split_once('.') {
        Some((schema, table)) => (schema.to_string(), table.to_string()),
        None => (DEFAULT_SCHEMA.to_string(), identifier.to_string()),
    }
}
