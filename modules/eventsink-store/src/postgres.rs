//! Named tables backed by two Postgres tables.
//!
//! `sink_tables` holds each table's header as a JSONB array; `sink_rows` holds
//! rows as JSONB cell arrays ordered by a BIGSERIAL. Oldest rows are the lowest seq.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use eventsink_common::Row;

use crate::error::{Result, StoreError};
use crate::store::{check_header_cell, check_initial_header, check_row_arity, TableRef, TableStore};

#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn get_table(&self, name: &str) -> Result<Option<TableRef>> {
        let found = sqlx::query_scalar::<_, String>("SELECT name FROM sink_tables WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.map(TableRef::new))
    }

    async fn create_table(&self, name: &str, header: &[String]) -> Result<TableRef> {
        check_initial_header(name, header)?;

        let created = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO sink_tables (name, header)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING name
            "#,
        )
        .bind(name)
        .bind(Json(header))
        .fetch_optional(&self.pool)
        .await?;

        match created {
            Some(name) => Ok(TableRef::new(name)),
            None => Err(StoreError::TableExists(name.to_string())),
        }
    }

    async fn header(&self, table: &TableRef) -> Result<Vec<String>> {
        let header = sqlx::query_scalar::<_, Json<Vec<String>>>(
            "SELECT header FROM sink_tables WHERE name = $1",
        )
        .bind(table.name())
        .fetch_optional(&self.pool)
        .await?;

        header
            .map(|Json(h)| h)
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))
    }

    async fn set_header_cell(&self, table: &TableRef, index: usize, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let Json(mut header) = sqlx::query_scalar::<_, Json<Vec<String>>>(
            "SELECT header FROM sink_tables WHERE name = $1 FOR UPDATE",
        )
        .bind(table.name())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        check_header_cell(table.name(), &header, index, name)?;
        if index == header.len() {
            header.push(name.to_string());
        } else {
            header[index] = name.to_string();
        }

        sqlx::query("UPDATE sink_tables SET header = $2 WHERE name = $1")
            .bind(table.name())
            .bind(Json(&header))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_row(&self, table: &TableRef, row: &Row) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE keeps a concurrent header write from landing between the
        // arity check and the insert.
        let header_len = sqlx::query_scalar::<_, i32>(
            "SELECT jsonb_array_length(header) FROM sink_tables WHERE name = $1 FOR SHARE",
        )
        .bind(table.name())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        check_row_arity(table.name(), header_len as usize, row)?;

        sqlx::query("INSERT INTO sink_rows (table_name, cells) VALUES ($1, $2)")
            .bind(table.name())
            .bind(Json(row))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM sink_rows WHERE table_name = $1)
            FROM sink_tables
            WHERE name = $1
            "#,
        )
        .bind(table.name())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        Ok(count.max(0) as u64)
    }

    async fn delete_oldest_rows(&self, table: &TableRef, count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        sqlx::query(
            r#"
            DELETE FROM sink_rows
            WHERE seq IN (
                SELECT seq FROM sink_rows
                WHERE table_name = $1
                ORDER BY seq ASC
                LIMIT $2
            )
            "#,
        )
        .bind(table.name())
        .bind(i64::try_from(count).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ---------------------------------------------------------------------------
// Test utilities
// ---------------------------------------------------------------------------

#[cfg(feature = "test-utils")]
impl PgTableStore {
    /// Read every row of a table in append order (for tests).
    pub async fn read_rows(&self, name: &str) -> Result<Vec<Row>> {
        let rows = sqlx::query_scalar::<_, Json<Row>>(
            "SELECT cells FROM sink_rows WHERE table_name = $1 ORDER BY seq ASC",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }
}
