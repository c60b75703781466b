//! Statement execution over a Postgres pool, feeding results into an [`Output`].

use crate::config::DbConfig;
use crate::error::AppError;
use crate::output::{ColumnDesc, Output};
use axum::response::Response;
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};

#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

/// sqlx has no idle ceiling; `max_idle_conn` becomes the floor of connections
/// the pool opens eagerly and keeps warm.
fn pool_options(cfg: &DbConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(cfg.max_open_conn)
        .min_connections(cfg.max_idle_conn.min(cfg.max_open_conn))
        .max_lifetime(cfg.max_lifetime)
        .acquire_timeout(cfg.acquire_timeout)
}

impl Database {
    /// Open the pool and check one connection.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, AppError> {
        tracing::info!("connecting to {}", cfg.masked_url());
        let pool = pool_options(cfg).connect(&cfg.url).await?;
        Ok(Database { pool })
    }

    /// Build the pool without connecting; the first statement opens a connection.
    pub fn connect_lazy(cfg: &DbConfig) -> Result<Self, AppError> {
        let pool = pool_options(cfg).connect_lazy(&cfg.url)?;
        Ok(Database { pool })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run a row-returning statement: `columns`, one `row` per result row, then
    /// `end`. Any failure goes to `error` instead.
    pub async fn query(&self, out: &mut dyn Output) -> Response {
        match self.stream(out).await {
            Ok(()) => out.end(),
            Err(e) => out.error(e),
        }
    }

    /// Run a statement and report the affected row count.
    pub async fn exec(&self, out: &mut dyn Output) -> Response {
        let result = match out.sql() {
            Ok(sql) => sqlx::raw_sql(&sql).execute(&self.pool).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(done) => {
                // Postgres reports no last-insert-id.
                out.affected(0, done.rows_affected());
                out.end()
            }
            Err(e) => out.error(e),
        }
    }

    async fn stream(&self, out: &mut dyn Output) -> Result<(), AppError> {
        let sql = out.sql()?;
        let mut conn = self.pool.acquire().await?;

        // Describe first so an empty result still has a header.
        let cols: Vec<ColumnDesc> = {
            let stmt = (&mut *conn).prepare(&sql).await?;
            stmt.columns()
                .iter()
                .map(|c| ColumnDesc::new(c.name(), c.type_info().name()))
                .collect()
        };
        out.columns(&cols)?;

        // The simple protocol returns every value in text form.
        let mut rows = sqlx::raw_sql(&sql).fetch(&mut *conn);
        let mut buf: Vec<Vec<u8>> = vec![Vec::new(); cols.len()];
        while let Some(row) = rows.try_next().await? {
            buf.resize_with(row.len(), Vec::new);
            for (i, cell) in buf.iter_mut().enumerate() {
                cell.clear();
                let value = row.try_get_raw(i)?;
                if !value.is_null() {
                    cell.extend_from_slice(value.as_bytes().map_err(sqlx::Error::Decode)?);
                }
            }
            out.row(&buf)?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}
