//! SQL Server catalog queries for schema introspection.
//!
//! Every lookup is a fixed statement; caller-supplied names travel only as
//! bound parameters (`@P1`, `@P2`).

use super::connection::{ConnectionGateway, QueryConnection};
use super::result::ResultSet;
use super::types::SqlValue;
use crate::error::ServerError;
use crate::security::parse_qualified_name;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const TABLES_QUERY: &str = r#"
    SELECT TABLE_SCHEMA, TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_SCHEMA, TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        c.CHARACTER_MAXIMUM_LENGTH,
        c.IS_NULLABLE,
        COLUMNPROPERTY(OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME), c.COLUMN_NAME, 'IsIdentity') AS IS_IDENTITY,
        (
            SELECT COUNT(*)
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
            INNER JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                ON k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                AND k.TABLE_SCHEMA = tc.TABLE_SCHEMA
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                AND k.TABLE_SCHEMA = c.TABLE_SCHEMA
                AND k.TABLE_NAME = c.TABLE_NAME
                AND k.COLUMN_NAME = c.COLUMN_NAME
        ) AS IS_PRIMARY_KEY
    FROM INFORMATION_SCHEMA.COLUMNS c
    WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

const RELATIONSHIPS_QUERY: &str = r#"
    SELECT
        fk.name AS ForeignKey,
        OBJECT_NAME(fk.parent_object_id) AS TableName,
        COL_NAME(fkc.parent_object_id, fkc.parent_column_id) AS ColumnName,
        OBJECT_NAME(fk.referenced_object_id) AS ReferencedTableName,
        COL_NAME(fkc.referenced_object_id, fkc.referenced_column_id) AS ReferencedColumnName
    FROM sys.foreign_keys fk
    INNER JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id
    ORDER BY TableName, ReferencedTableName
"#;

const PROCEDURE_QUERY: &str = r#"
    SELECT name, OBJECT_DEFINITION(object_id) AS definition
    FROM sys.procedures
    WHERE name = @P1
"#;

/// A base table, rendered as `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub max_length: Option<i64>,
    pub is_nullable: bool,
    pub is_identity: bool,
    pub is_primary_key: bool,
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.name, self.data_type)?;
        if let Some(len) = self.max_length {
            write!(f, "({})", len)?;
        }
        f.write_str(if self.is_nullable { " | NULL" } else { " | NOT NULL" })?;
        if self.is_identity {
            f.write_str(" IDENTITY")?;
        }
        if self.is_primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        Ok(())
    }
}

/// A foreign-key column pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub foreign_key: String,
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} (FK: {})",
            self.table, self.column, self.referenced_table, self.referenced_column, self.foreign_key
        )
    }
}

/// Source text of a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDefinition {
    pub name: String,
    /// `None` when the definition is encrypted or not visible to the login.
    pub definition: Option<String>,
}

impl fmt::Display for ProcedureDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:\n{}",
            self.name,
            self.definition.as_deref().unwrap_or_default()
        )
    }
}

/// Catalog lookups over a connection gateway.
pub struct SchemaCatalog<G> {
    gateway: Arc<G>,
}

impl<G> Clone for SchemaCatalog<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: ConnectionGateway> SchemaCatalog<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    async fn fetch(
        &self,
        database: Option<&str>,
        sql: &str,
        params: &[&str],
    ) -> Result<ResultSet, ServerError> {
        let mut conn = self.gateway.open(database).await?;
        conn.fetch(sql, params).await
    }

    /// All base tables, ordered by schema then name.
    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<TableName>, ServerError> {
        let result = self.fetch(database, TABLES_QUERY, &[]).await?;
        debug!("Found {} table(s)", result.row_count());

        Ok(result
            .rows()
            .iter()
            .map(|row| TableName {
                schema: text(row, 0).unwrap_or_default(),
                name: text(row, 1).unwrap_or_default(),
            })
            .collect())
    }

    /// Columns of `table` (optionally `schema.table`) in ordinal order.
    pub async fn list_columns(
        &self,
        table: &str,
        database: Option<&str>,
    ) -> Result<Vec<ColumnInfo>, ServerError> {
        let (schema, name) = parse_qualified_name(table);
        let result = self
            .fetch(database, COLUMNS_QUERY, &[schema.as_str(), name.as_str()])
            .await?;

        Ok(result
            .rows()
            .iter()
            .map(|row| ColumnInfo {
                name: text(row, 0).unwrap_or_default(),
                data_type: text(row, 1).unwrap_or_default(),
                max_length: int(row, 2),
                is_nullable: text(row, 3).is_some_and(|v| v.eq_ignore_ascii_case("YES")),
                is_identity: int(row, 4) == Some(1),
                is_primary_key: int(row, 5).unwrap_or(0) > 0,
            })
            .collect())
    }

    /// Every foreign-key column pair, ordered by table then referenced table.
    pub async fn list_relationships(
        &self,
        database: Option<&str>,
    ) -> Result<Vec<Relationship>, ServerError> {
        let result = self.fetch(database, RELATIONSHIPS_QUERY, &[]).await?;

        Ok(result
            .rows()
            .iter()
            .map(|row| Relationship {
                foreign_key: text(row, 0).unwrap_or_default(),
                table: text(row, 1).unwrap_or_default(),
                column: text(row, 2).unwrap_or_default(),
                referenced_table: text(row, 3).unwrap_or_default(),
                referenced_column: text(row, 4).unwrap_or_default(),
            })
            .collect())
    }

    /// Definitions of every procedure called `name` (one per schema).
    pub async fn procedure_definition(
        &self,
        name: &str,
        database: Option<&str>,
    ) -> Result<Vec<ProcedureDefinition>, ServerError> {
        let result = self.fetch(database, PROCEDURE_QUERY, &[name]).await?;

        Ok(result
            .rows()
            .iter()
            .map(|row| ProcedureDefinition {
                name: text(row, 0).unwrap_or_default(),
                definition: text(row, 1),
            })
            .collect())
    }
}

fn text(row: &[SqlValue], idx: usize) -> Option<String> {
    match row.get(idx)? {
        SqlValue::Null => None,
        SqlValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn int(row: &[SqlValue], idx: usize) -> Option<i64> {
    row.get(idx)?.as_i64()
}
