//! Error types for the read-only MSSQL MCP server.
//!
//! Every failure inside the crate is a [`ServerError`]. The query executor and
//! the tool layer are the only places where an error is turned into caller
//! text, via [`ServerError::caller_message`].

pub use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Domain-specific errors for the server.
///
/// Named `ServerError` to avoid collision with `rmcp::ErrorData`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be opened or the database switch failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Database not found
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Object not found (table, view, procedure, etc.)
    #[error("{object_type} not found: {name}")]
    ObjectNotFound { object_type: String, name: String },

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Query rejected by the read-only classifier
    #[error("{0}")]
    ValidationFailed(String),

    /// Query execution error
    #[error("Query execution error: {message}")]
    QueryExecution {
        message: String,
        sql_error_code: Option<i32>,
    },

    /// A result set could not be turned into text
    #[error("Formatting error: {0}")]
    Formatting(String),

    /// The caller cancelled the request while it was in flight
    #[error("Request cancelled")]
    Cancelled,
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an object not found error.
    pub fn object_not_found(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            object_type: object_type.into(),
            name: name.into(),
        }
    }

    /// Create a permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a query execution error.
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create a query execution error with a SQL Server error number.
    pub fn query_error_with_code(msg: impl Into<String>, code: i32) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: Some(code),
        }
    }

    /// Create a formatting error.
    pub fn formatting(msg: impl Into<String>) -> Self {
        Self::Formatting(msg.into())
    }

    /// The SQL Server error number, when the server reported one.
    pub fn sql_error_code(&self) -> Option<i32> {
        match self {
            Self::QueryExecution { sql_error_code, .. } => *sql_error_code,
            _ => None,
        }
    }

    /// Render this error as the text returned to a tool caller.
    ///
    /// Each failure class has its own prefix so callers parsing the text can
    /// tell them apart:
    ///
    /// | class        | text                                          |
    /// |--------------|-----------------------------------------------|
    /// | validation   | the classifier reason, verbatim               |
    /// | connection   | `Connection error: ...`                       |
    /// | formatting   | `Internal error: failed to format ...`        |
    /// | cancellation | `Query cancelled before completion.`          |
    /// | anything else| `SQL Error: ...`                               |
    pub fn caller_message(&self) -> String {
        match self {
            Self::ValidationFailed(reason) => reason.clone(),
            Self::Connection { message, .. } => format!("Connection error: {}", message),
            Self::Formatting(msg) => {
                format!("Internal error: failed to format query results: {}", msg)
            }
            Self::Cancelled => "Query cancelled before completion.".to_string(),
            Self::QueryExecution { message, .. } => format!("SQL Error: {}", message),
            other => format!("SQL Error: {}", other),
        }
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your environment variables and configuration"),
            Self::Connection { .. } => {
                Some("Check server hostname, port, database name and network connectivity")
            }
            Self::Authentication(_) => Some("Verify your username and password are correct"),
            Self::DatabaseNotFound(_) => Some("Check the database name and ensure it exists"),
            Self::ObjectNotFound { .. } => Some("Check the object name and schema"),
            Self::PermissionDenied(_) => {
                Some("Request appropriate permissions from your database administrator")
            }
            Self::ValidationFailed(_) => Some("Only a single SELECT or WITH query is accepted"),
            _ => None,
        }
    }
}

/// Map SQL Server error codes to semantic ServerError types.
pub fn from_sql_error(code: i32, message: &str) -> ServerError {
    match code {
        18456 => ServerError::auth(format!("Login failed: {}", message)),

        4060 | 911 => ServerError::DatabaseNotFound(message.to_string()),

        208 => ServerError::object_not_found("Object", message),
        2812 => ServerError::object_not_found("Stored procedure", message),

        229 | 230 => ServerError::permission_denied(message),

        102 => ServerError::query_error_with_code(format!("Syntax error: {}", message), code),
        207 => ServerError::query_error_with_code(format!("Invalid column: {}", message), code),

        8115 => {
            ServerError::query_error_with_code(format!("Arithmetic overflow: {}", message), code)
        }

        1205 => ServerError::query_error_with_code(
            "Transaction was deadlocked and has been rolled back",
            code,
        ),

        _ => ServerError::query_error_with_code(message, code),
    }
}

impl From<tiberius::error::Error> for ServerError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match &e {
            Error::Server(token) => from_sql_error(token.code() as i32, token.message()),
            Error::Io { .. } => ServerError::connection(format!("IO error: {}", e)),
            Error::Tls(_) => ServerError::connection(format!("TLS error: {}", e)),
            Error::Routing { .. } => ServerError::connection(e.to_string()),
            Error::Protocol(_) => ServerError::query_error(format!("Protocol error: {}", e)),
            Error::Conversion(_) => {
                ServerError::query_error(format!("Type conversion error: {}", e))
            }
            _ => ServerError::query_error(e.to_string()),
        }
    }
}
