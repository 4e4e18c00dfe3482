/*
 * Responsibility
 * - sc_user テーブルから access_mask を読む (read-only)
 * - session = pool から借りた 1 接続。drop で pool に返却される
 * - gate からは trait 越しに使う (テストでは in-memory 実装に差し替え)
 */
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, pool::PoolConnection, postgres::PgPoolOptions};

use crate::api::v1::dto::query::QueryParams;
use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserAccessRow {
    pub sc_user_id: String,
    pub access_mask: i64,
}

/// Opens request-scoped sessions against the user-access table.
#[async_trait]
pub trait UserAccessStore: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn UserAccessSession>, RepoError>;
}

/// A single borrowed connection. Dropping it releases the connection.
#[async_trait]
pub trait UserAccessSession: Send {
    async fn fetch_user_rows(
        &mut self,
        lookup: &QueryParams,
        user_id: &str,
    ) -> Result<Vec<UserAccessRow>, RepoError>;
}

#[derive(Clone, Debug)]
pub struct PgUserAccessStore {
    pool: PgPool,
}

impl PgUserAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl UserAccessStore for PgUserAccessStore {
    async fn open_session(&self) -> Result<Box<dyn UserAccessSession>, RepoError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgUserAccessSession { conn }))
    }
}

struct PgUserAccessSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl UserAccessSession for PgUserAccessSession {
    async fn fetch_user_rows(
        &mut self,
        lookup: &QueryParams,
        user_id: &str,
    ) -> Result<Vec<UserAccessRow>, RepoError> {
        let rows = sqlx::query_as::<_, UserAccessRow>(
            r#"
            SELECT sc_user_id, access_mask
            FROM sc_user
            WHERE sc_user_id = $1
            ORDER BY sc_user_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(lookup.limit.unwrap_or(1).max(1))
        .bind(lookup.offset.unwrap_or(0).max(0))
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}
