//! src/repositories/sqlite/claims.rs

use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

use frostbot_common::models::claim::ClaimRecord;
use frostbot_common::traits::repository_traits::ClaimRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteClaimRepository {
    pool: Pool<Sqlite>,
}

impl SqliteClaimRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ClaimRepository for SqliteClaimRepository {
    async fn upsert(&self, record: &ClaimRecord) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO claim_records (fid, code, status, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (fid, code) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.fid)
        .bind(&record.code)
        .bind(record.status)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, fid: i64, code: &str) -> Result<Option<ClaimRecord>, Error> {
        let row = sqlx::query(
            r#"
            SELECT fid, code, status, updated_at
            FROM claim_records
            WHERE fid = ? AND code = ?
            "#,
        )
        .bind(fid)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            Ok(Some(ClaimRecord {
                fid: r.try_get("fid")?,
                code: r.try_get("code")?,
                status: r.try_get("status")?,
                updated_at: r.try_get::<DateTime<Utc>, _>("updated_at")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, fid: i64, code: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM claim_records WHERE fid = ? AND code = ?")
            .bind(fid)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
