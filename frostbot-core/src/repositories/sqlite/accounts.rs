//! src/repositories/sqlite/accounts.rs
//!
//! Read-only view of the account store. Account rows are owned by the
//! surrounding application (member management lives there); the redemption
//! core only ever reads them.

use sqlx::{Pool, Sqlite};

use frostbot_common::models::account::{Account, AllianceSettings};
use frostbot_common::traits::repository_traits::AccountRepository;

use crate::Error;

#[derive(Clone)]
pub struct SqliteAccountRepository {
    pool: Pool<Sqlite>,
}

impl SqliteAccountRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn get(&self, fid: i64) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT fid, nickname, alliance_id, level
            FROM accounts
            WHERE fid = ?
            "#,
        )
        .bind(fid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_by_alliance(&self, alliance_id: i64) -> Result<Vec<Account>, Error> {
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT fid, nickname, alliance_id, level
            FROM accounts
            WHERE alliance_id = ?
            ORDER BY fid ASC
            "#,
        )
        .bind(alliance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn alliance_settings(&self, alliance_id: i64) -> Result<Option<AllianceSettings>, Error> {
        let row = sqlx::query_as::<_, AllianceSettings>(
            r#"
            SELECT alliance_id, auto_redeem, probe_fid
            FROM alliances
            WHERE alliance_id = ?
            "#,
        )
        .bind(alliance_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_alliances(&self) -> Result<Vec<AllianceSettings>, Error> {
        let rows = sqlx::query_as::<_, AllianceSettings>(
            r#"
            SELECT alliance_id, auto_redeem, probe_fid
            FROM alliances
            ORDER BY alliance_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_auto_redeem_alliances(&self) -> Result<Vec<AllianceSettings>, Error> {
        let rows = sqlx::query_as::<_, AllianceSettings>(
            r#"
            SELECT alliance_id, auto_redeem, probe_fid
            FROM alliances
            WHERE auto_redeem = 1
            ORDER BY alliance_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
