//! src/repositories/sqlite/codes.rs

use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

use frostbot_common::models::code::{CodeStatus, GiftCode};
use frostbot_common::traits::repository_traits::CodeRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteCodeRepository {
    pool: Pool<Sqlite>,
}

impl SqliteCodeRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CodeRepository for SqliteCodeRepository {
    async fn insert_pending(&self, code: &str) -> Result<bool, Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO gift_codes (code, discovered_at, status)
            VALUES (?, ?, ?)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(code)
        .bind(Utc::now())
        .bind(CodeStatus::Pending)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn get(&self, code: &str) -> Result<Option<GiftCode>, Error> {
        let row = sqlx::query(
            r#"
            SELECT code, discovered_at, status
            FROM gift_codes
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            Ok(Some(GiftCode {
                code: r.try_get("code")?,
                discovered_at: r.try_get::<DateTime<Utc>, _>("discovered_at")?,
                status: r.try_get("status")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn set_status(&self, code: &str, status: CodeStatus) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE gift_codes
            SET status = ?
            WHERE code = ?
            "#,
        )
        .bind(status)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_status(&self, status: CodeStatus) -> Result<Vec<GiftCode>, Error> {
        let rows = sqlx::query_as::<_, GiftCode>(
            r#"
            SELECT code, discovered_at, status
            FROM gift_codes
            WHERE status = ?
            ORDER BY discovered_at ASC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
