//! Tool input types with JSON Schema generation.

use schemars::JsonSchema;
use serde::Deserialize;

/// Input for the `get_tables` and `get_relationships` tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DatabaseInput {
    /// Database to inspect. Uses the connection's default database when omitted.
    #[serde(default)]
    pub database_name: Option<String>,
}

/// Input for the `get_columns` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetColumnsInput {
    /// Table to describe, e.g. `Users`, `sales.Orders` or `table Users`.
    #[serde(default)]
    pub table_name: String,

    /// Database containing the table.
    #[serde(default)]
    pub database_name: Option<String>,
}

/// Input for the `execute_sql` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteSqlInput {
    /// A single read-only query starting with SELECT or WITH.
    #[serde(default)]
    pub sql_query: String,

    /// Database to run the query in.
    #[serde(default)]
    pub database_name: Option<String>,
}

/// Input for the `get_stored_procedure` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetStoredProcedureInput {
    /// Name of the stored procedure, without schema.
    #[serde(default)]
    pub sp_name: String,

    /// Database containing the procedure.
    #[serde(default)]
    pub database_name: Option<String>,
}

const TABLE_KEYWORDS: [&str; 2] = ["table", "tabla"];
const NAME_PUNCTUATION: [char; 10] = [',', '.', ':', ';', '?', '!', '"', '\'', '[', ']'];

/// Pull a table name out of loosely phrased input.
///
/// `"table Users"` and `"the table Users?"` both give `Users`; otherwise the
/// first word is used. Surrounding punctuation and brackets are trimmed, dots
/// inside the name (`sales.Orders`) are kept.
pub fn extract_table_name(input: &str) -> String {
    let words: Vec<&str> = input.split_whitespace().collect();

    let word = words
        .iter()
        .position(|w| TABLE_KEYWORDS.contains(&w.to_lowercase().as_str()))
        .and_then(|idx| words.get(idx + 1))
        .or_else(|| words.first())
        .copied()
        .unwrap_or_default();

    word.trim_matches(NAME_PUNCTUATION.as_slice()).to_string()
}

/// `" (database 'x')"` when a database was named, empty otherwise.
pub fn format_database_info(database: Option<&str>) -> String {
    match database {
        Some(name) if !name.trim().is_empty() => format!(" (database '{}')", name),
        _ => String::new(),
    }
}
