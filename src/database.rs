//! Database connectivity and query execution.

mod auth;
mod connection;
pub mod metadata;
mod query;
pub mod result;
pub mod types;

pub use auth::truncate_for_log;
pub use connection::{ConnectionGateway, PoolStatus, QueryConnection, TdsConnection, TdsGateway};
pub use metadata::{ColumnInfo, ProcedureDefinition, Relationship, SchemaCatalog, TableName};
pub use query::SafeQueryExecutor;
pub use result::{render, ResultSet};
pub use types::SqlValue;
