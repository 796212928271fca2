//! Database plumbing for the vector store.
//!
//! `DbOps` is the three-call contract the store is written against:
//! execute-without-result, fetch-one and fetch-all, each taking SQL text with
//! `$n` placeholders and a positional parameter list. `PgPool` implements it
//! directly.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};

use crate::config::DatabaseConfig;
use crate::error::VectorStoreError;
use crate::store::validate_table_name;

/// A positional SQL parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::from)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

/// A result row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn text(&self, column: &str) -> Result<&str, VectorStoreError> {
        match self.get(column) {
            Some(SqlValue::Text(v)) => Ok(v),
            _ => Err(column_error(column, "text")),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64, VectorStoreError> {
        match self.get(column) {
            Some(SqlValue::Int(v)) => Ok(*v),
            _ => Err(column_error(column, "an integer")),
        }
    }

    /// Integer columns are widened, so `1 - distance` can come back as either.
    pub fn float(&self, column: &str) -> Result<f64, VectorStoreError> {
        match self.get(column) {
            Some(SqlValue::Float(v)) => Ok(*v),
            Some(SqlValue::Int(v)) => Ok(*v as f64),
            _ => Err(column_error(column, "a number")),
        }
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn column_error(column: &str, expected: &'static str) -> VectorStoreError {
    VectorStoreError::Column {
        column: column.to_string(),
        expected,
    }
}

/// Connection contract consumed by [`crate::store::PgVectorStore`].
///
/// Errors are returned exactly as the driver reports them.
#[async_trait]
pub trait DbOps: Send + Sync {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), sqlx::Error>;

    async fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, sqlx::Error>;

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, sqlx::Error>;
}

#[async_trait]
impl DbOps for PgPool {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<(), sqlx::Error> {
        bind_all(sql, params).execute(self).await?;
        Ok(())
    }

    async fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, sqlx::Error> {
        let row = bind_all(sql, params).fetch_optional(self).await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, sqlx::Error> {
        let rows = bind_all(sql, params).fetch_all(self).await?;
        rows.iter().map(decode_row).collect()
    }
}

fn bind_all<'q>(sql: &'q str, params: &'q [SqlValue]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text)
            }
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)?
                .map(|v| SqlValue::Int(v.into())),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)?
                .map(|v| SqlValue::Int(v.into())),
            "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::Int),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(idx)?
                .map(|v| SqlValue::Float(v.into())),
            "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Float),
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: column.name().to_string(),
                    source: format!("unsupported column type {other}").into(),
                })
            }
        };
        columns.push((column.name().to_string(), value.unwrap_or(SqlValue::Null)));
    }
    Ok(Row::new(columns))
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

pub async fn check_pgvector(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) =
        sqlx::query_as("SELECT extversion FROM pg_extension WHERE extname = 'vector'")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

/// Create the pgvector extension and the vector table if they are missing.
///
/// The `v` column is an unsized `vector` so rows of different dimensionality
/// can share a table. No ANN index is created.
pub async fn ensure_schema(pool: &PgPool, table: &str) -> Result<(), VectorStoreError> {
    validate_table_name(table)?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    let create_table = format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
            id TEXT NOT NULL,
            sector TEXT NOT NULL,
            user_id TEXT,
            agent_id TEXT,
            session_id TEXT,
            v vector NOT NULL,
            dim INTEGER NOT NULL,
            PRIMARY KEY (id, sector)
        )"#
    );
    sqlx::query(&create_table).execute(pool).await?;

    tracing::info!(table = %table, "Vector table ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::from_iter([
            ("id", SqlValue::from("m1")),
            ("dim", SqlValue::Int(3)),
            ("score", SqlValue::Float(0.75)),
            ("agent_id", SqlValue::Null),
        ])
    }

    #[test]
    fn test_row_typed_accessors() {
        let row = sample_row();
        assert_eq!(row.text("id").unwrap(), "m1");
        assert_eq!(row.int("dim").unwrap(), 3);
        assert_eq!(row.float("score").unwrap(), 0.75);
        assert_eq!(row.float("dim").unwrap(), 3.0);
        assert_eq!(row.get("agent_id"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_row_reports_missing_and_mistyped_columns() {
        let row = sample_row();

        match row.text("sector") {
            Err(VectorStoreError::Column { column, expected }) => {
                assert_eq!(column, "sector");
                assert_eq!(expected, "text");
            }
            other => panic!("expected column error, got {:?}", other),
        }

        assert!(row.int("id").is_err());
        assert!(row.text("agent_id").is_err());
    }

    #[test]
    fn test_optional_text_maps_to_null() {
        assert_eq!(SqlValue::from(None::<&str>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("u1")),
            SqlValue::Text("u1".to_string())
        );
    }
}
