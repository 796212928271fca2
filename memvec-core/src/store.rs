//! pgvector-backed sector store.
//!
//! Rows are keyed on `(id, sector)`. Ranking, distance and filtering all run
//! inside PostgreSQL; this module only builds SQL, marshals parameters and
//! converts vectors to and from pgvector's text form.

use async_trait::async_trait;

use crate::codec::{format_vector, parse_vector};
use crate::db::{DbOps, Row, SqlValue};
use crate::error::VectorStoreError;
use crate::filter::Filters;
use crate::models::{IdVector, Scope, SearchHit, SectorVector, StoredVector};

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "vectors";

/// Stored in `user_id` when a write carries no user.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Storage interface for per-sector embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite the vector for `(id, sector)`.
    async fn store_vector(
        &self,
        id: &str,
        sector: &str,
        vector: &[f32],
        dim: i64,
        scope: &Scope,
    ) -> Result<(), VectorStoreError>;

    async fn delete_vector(&self, id: &str, sector: &str) -> Result<(), VectorStoreError>;

    /// Remove `id` from every sector.
    async fn delete_vectors(&self, id: &str) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `query` within `sector`, best first, at most `top_k`.
    async fn search_similar(
        &self,
        sector: &str,
        query: &[f32],
        top_k: usize,
        scope: &Scope,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    async fn get_vector(
        &self,
        id: &str,
        sector: &str,
    ) -> Result<Option<StoredVector>, VectorStoreError>;

    async fn get_vectors_by_id(&self, id: &str) -> Result<Vec<SectorVector>, VectorStoreError>;

    async fn get_vectors_by_sector(&self, sector: &str)
        -> Result<Vec<IdVector>, VectorStoreError>;
}

/// [`VectorStore`] over any [`DbOps`] handle, usually a `PgPool`.
///
/// Expects a table with columns `id, sector, user_id, agent_id, session_id,
/// v, dim` and a uniqueness constraint on `(id, sector)`; see
/// [`crate::db::ensure_schema`].
pub struct PgVectorStore<D> {
    db: D,
    table: String,
}

impl<D: DbOps> PgVectorStore<D> {
    /// Store over the default `vectors` table.
    pub fn new(db: D) -> Self {
        Self {
            db,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Store over a named table. The name is spliced into SQL, so it is checked.
    pub fn with_table(db: D, table: impl Into<String>) -> Result<Self, VectorStoreError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { db, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn db(&self) -> &D {
        &self.db
    }
}

#[async_trait]
impl<D: DbOps> VectorStore for PgVectorStore<D> {
    async fn store_vector(
        &self,
        id: &str,
        sector: &str,
        vector: &[f32],
        dim: i64,
        scope: &Scope,
    ) -> Result<(), VectorStoreError> {
        tracing::debug!(id = %id, sector = %sector, dim = dim, "Storing vector");

        let sql = format!(
            "INSERT INTO {table} (id, sector, user_id, agent_id, session_id, v, dim) \
             VALUES ($1, $2, $3, $4, $5, $6::vector, $7) \
             ON CONFLICT (id, sector) DO UPDATE SET \
             user_id = EXCLUDED.user_id, agent_id = EXCLUDED.agent_id, \
             session_id = EXCLUDED.session_id, v = EXCLUDED.v, dim = EXCLUDED.dim",
            table = self.table,
        );
        let params = [
            SqlValue::from(id),
            SqlValue::from(sector),
            SqlValue::from(scope.user_id().unwrap_or(ANONYMOUS_USER)),
            SqlValue::from(scope.agent_id()),
            SqlValue::from(scope.session_id()),
            SqlValue::Text(format_vector(vector)),
            SqlValue::Int(dim),
        ];
        self.db.execute(&sql, &params).await?;
        Ok(())
    }

    async fn delete_vector(&self, id: &str, sector: &str) -> Result<(), VectorStoreError> {
        let sql = format!(
            "DELETE FROM {table} WHERE id = $1 AND sector = $2",
            table = self.table
        );
        self.db
            .execute(&sql, &[SqlValue::from(id), SqlValue::from(sector)])
            .await?;
        Ok(())
    }

    async fn delete_vectors(&self, id: &str) -> Result<(), VectorStoreError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1", table = self.table);
        self.db.execute(&sql, &[SqlValue::from(id)]).await?;
        Ok(())
    }

    async fn search_similar(
        &self,
        sector: &str,
        query: &[f32],
        top_k: usize,
        scope: &Scope,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        // $1 is the query vector; filters are numbered after it
        let mut params = vec![SqlValue::Text(format_vector(query))];
        let conditions = Filters::new()
            .eq("sector", sector)
            .scope(scope)
            .render(&mut params);
        params.push(SqlValue::Int(i64::try_from(top_k).unwrap_or(i64::MAX)));

        let sql = format!(
            "SELECT id, 1 - (v <=> $1::vector) AS score \
             FROM {table} \
             WHERE {conditions} \
             ORDER BY v <=> $1::vector \
             LIMIT ${limit}",
            table = self.table,
            limit = params.len(),
        );

        tracing::debug!(
            sector = %sector,
            user = scope.user_id().unwrap_or("all"),
            agent = scope.agent_id().unwrap_or("all"),
            session = scope.session_id().unwrap_or("all"),
            top_k = top_k,
            "Searching vectors"
        );

        let rows = self.db.fetch_all(&sql, &params).await?;
        let hits = rows
            .iter()
            .map(search_hit)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(sector = %sector, hits = hits.len(), "Search complete");
        Ok(hits)
    }

    async fn get_vector(
        &self,
        id: &str,
        sector: &str,
    ) -> Result<Option<StoredVector>, VectorStoreError> {
        let sql = format!(
            "SELECT v::text AS v_text, dim FROM {table} WHERE id = $1 AND sector = $2",
            table = self.table
        );
        let row = self
            .db
            .fetch_one(&sql, &[SqlValue::from(id), SqlValue::from(sector)])
            .await?;

        row.as_ref().map(stored_vector).transpose()
    }

    async fn get_vectors_by_id(&self, id: &str) -> Result<Vec<SectorVector>, VectorStoreError> {
        let sql = format!(
            "SELECT sector, v::text AS v_text, dim FROM {table} WHERE id = $1",
            table = self.table
        );
        let rows = self.db.fetch_all(&sql, &[SqlValue::from(id)]).await?;

        rows.iter().map(sector_vector).collect()
    }

    async fn get_vectors_by_sector(
        &self,
        sector: &str,
    ) -> Result<Vec<IdVector>, VectorStoreError> {
        let sql = format!(
            "SELECT id, v::text AS v_text, dim FROM {table} WHERE sector = $1",
            table = self.table
        );
        let rows = self.db.fetch_all(&sql, &[SqlValue::from(sector)]).await?;

        rows.iter().map(id_vector).collect()
    }
}

fn search_hit(row: &Row) -> Result<SearchHit, VectorStoreError> {
    Ok(SearchHit {
        id: row.text("id")?.to_string(),
        score: row.float("score")?,
    })
}

fn stored_vector(row: &Row) -> Result<StoredVector, VectorStoreError> {
    Ok(StoredVector {
        vector: parse_vector(row.text("v_text")?),
        dim: row.int("dim")?,
    })
}

fn sector_vector(row: &Row) -> Result<SectorVector, VectorStoreError> {
    Ok(SectorVector {
        sector: row.text("sector")?.to_string(),
        vector: parse_vector(row.text("v_text")?),
        dim: row.int("dim")?,
    })
}

fn id_vector(row: &Row) -> Result<IdVector, VectorStoreError> {
    Ok(IdVector {
        id: row.text("id")?.to_string(),
        vector: parse_vector(row.text("v_text")?),
        dim: row.int("dim")?,
    })
}

/// Table names may contain ASCII alphanumerics, `_` and `.` (schema-qualified).
pub fn validate_table_name(name: &str) -> Result<(), VectorStoreError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(VectorStoreError::InvalidTableName(name.to_string()));
    }
    Ok(())
}
