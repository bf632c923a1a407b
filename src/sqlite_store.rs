//! SQLite-backed [`ChunkStore`] and [`IndexStateStore`].
//!
//! Vectors are stored as little-endian `f32` BLOBs and chunk metadata as a
//! JSON column. Timestamps are RFC 3339 text with microsecond precision.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use knowledge_index_core::embedding::{blob_to_vec, vec_to_blob};
use knowledge_index_core::models::{Chunk, ChunkMetadata, IndexRecord, IndexUpdate};
use knowledge_index_core::store::{ChunkStore, IndexStateStore};

/// SQLite implementation of both store traits over one pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp in store: {}", raw))?
        .with_timezone(&Utc))
}

fn row_to_chunk(row: &SqliteRow) -> Result<Chunk> {
    let blob: Vec<u8> = row.try_get("embedding")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
        .with_context(|| "invalid chunk metadata_json")?;

    Ok(Chunk {
        collection: row.try_get("collection")?,
        source_file_id: row.try_get("source_file_id")?,
        chunk_index: row.try_get("chunk_index")?,
        text: row.try_get("text")?,
        embedding: blob_to_vec(&blob),
        metadata,
    })
}

fn row_to_record(row: &SqliteRow) -> Result<IndexRecord> {
    let status: String = row.try_get("status")?;
    let last_indexed_at: String = row.try_get("last_indexed_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(IndexRecord {
        collection: row.try_get("collection")?,
        source_file_id: row.try_get("source_file_id")?,
        status: status.parse()?,
        chunk_count: row.try_get("chunk_count")?,
        last_indexed_at: parse_ts(&last_indexed_at)?,
        updated_at: parse_ts(&updated_at)?,
        error: row.try_get("error")?,
        file_path: row.try_get("file_path")?,
    })
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn replace_chunks(
        &self,
        collection: &str,
        source_file_id: &str,
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM knowledge_chunks WHERE collection = ? AND source_file_id = ?")
            .bind(collection)
            .bind(source_file_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO knowledge_chunks
                    (collection, source_file_id, chunk_index, text, embedding, metadata_json)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(collection)
            .bind(source_file_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_chunks(&self, collection: &str, source_file_id: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM knowledge_chunks WHERE collection = ? AND source_file_id = ?")
                .bind(collection)
                .bind(source_file_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn list_chunks(&self, collection: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT collection, source_file_id, chunk_index, text, embedding, metadata_json
            FROM knowledge_chunks
            WHERE collection = ?
            ORDER BY source_file_id ASC, chunk_index ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_chunk).collect()
    }

    async fn count_chunks(&self, collection: &str, source_file_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE collection = ? AND source_file_id = ?",
        )
        .bind(collection)
        .bind(source_file_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl IndexStateStore for SqliteStore {
    async fn upsert_record(&self, update: &IndexUpdate<'_>) -> Result<IndexRecord> {
        let at = format_ts(&update.at);

        sqlx::query(
            r#"
            INSERT INTO knowledge_index_meta
                (collection, source_file_id, status, chunk_count,
                 last_indexed_at, updated_at, error, file_path)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, source_file_id) DO UPDATE SET
                status = excluded.status,
                chunk_count = excluded.chunk_count,
                last_indexed_at = excluded.last_indexed_at,
                updated_at = excluded.updated_at,
                error = excluded.error,
                file_path = COALESCE(excluded.file_path, knowledge_index_meta.file_path)
            "#,
        )
        .bind(update.collection)
        .bind(update.source_file_id)
        .bind(update.status.as_str())
        .bind(update.chunk_count)
        .bind(&at)
        .bind(&at)
        .bind(&update.error)
        .bind(update.file_path)
        .execute(&self.pool)
        .await?;

        self.get_record(update.collection, update.source_file_id)
            .await?
            .ok_or_else(|| anyhow!("index record vanished after upsert"))
    }

    async fn get_record(
        &self,
        collection: &str,
        source_file_id: &str,
    ) -> Result<Option<IndexRecord>> {
        let row = sqlx::query(
            r#"
            SELECT collection, source_file_id, status, chunk_count,
                   last_indexed_at, updated_at, error, file_path
            FROM knowledge_index_meta
            WHERE collection = ? AND source_file_id = ?
            "#,
        )
        .bind(collection)
        .bind(source_file_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_records(&self, collection: Option<&str>) -> Result<Vec<IndexRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT collection, source_file_id, status, chunk_count,
                   last_indexed_at, updated_at, error, file_path
            FROM knowledge_index_meta
            WHERE ? IS NULL OR collection = ?
            ORDER BY collection ASC, source_file_id ASC
            "#,
        )
        .bind(collection)
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }
}
