//! Centralized constants for the read-only MSSQL MCP server.
//!
//! This module contains the default values and fixed text used throughout
//! the codebase, making them easy to find, understand, and modify.

use std::time::Duration;

// =============================================================================
// Connection Constants
// =============================================================================

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout as Duration.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration =
    Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS);

/// Default maximum number of connections open at the same time.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Application name reported to SQL Server.
pub const DEFAULT_APPLICATION_NAME: &str = "mssql-readonly-mcp";

/// Schema assumed when a table name has no schema prefix.
pub const DEFAULT_SCHEMA: &str = "dbo";

// =============================================================================
// Result Rendering Constants
// =============================================================================

/// Separator placed between columns in rendered results.
pub const COLUMN_SEPARATOR: &str = "\t|\t";

/// Dash-rule width contributed by each column.
pub const RULE_WIDTH_PER_COLUMN: usize = 20;

/// Upper bound on the dash-rule width.
pub const MAX_RULE_WIDTH: usize = 120;

/// Text rendered for a NULL cell.
pub const NULL_TEXT: &str = "NULL";

/// Sentence rendered for a result set without rows.
pub const NO_ROWS_MESSAGE: &str = "No rows returned from the query.";

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for query logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_durations() {
        assert_eq!(DEFAULT_CONNECTION_TIMEOUT, Duration::from_secs(30));
    }

    #[test]
    fn test_rule_bounds() {
        assert!(RULE_WIDTH_PER_COLUMN <= MAX_RULE_WIDTH);
        assert_eq!(MAX_RULE_WIDTH / RULE_WIDTH_PER_COLUMN, 6);
    }

    #[test]
    fn test_separator_is_three_characters() {
        assert_eq!(COLUMN_SEPARATOR.chars().count(), 3);
    }
}
