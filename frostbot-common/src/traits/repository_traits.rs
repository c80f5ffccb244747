use async_trait::async_trait;

use crate::error::Error;
use crate::models::account::{Account, AllianceSettings};
use crate::models::claim::ClaimRecord;
use crate::models::code::{CodeStatus, GiftCode};

/// Durable registry of known gift codes and their validation lifecycle.
/// Single writer: only the orchestrator (or the validation sweep acting on a
/// probe outcome) mutates status.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Insert a newly discovered code as `Pending`. Returns false if the
    /// code text was already known (dedup).
    async fn insert_pending(&self, code: &str) -> Result<bool, Error>;

    async fn get(&self, code: &str) -> Result<Option<GiftCode>, Error>;

    async fn set_status(&self, code: &str, status: CodeStatus) -> Result<(), Error>;

    async fn list_by_status(&self, status: CodeStatus) -> Result<Vec<GiftCode>, Error>;
}

/// Durable (account, code) → last terminal outcome table. Rows are written
/// only for cache-worthy outcomes and overwrite on conflict.
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    async fn upsert(&self, record: &ClaimRecord) -> Result<(), Error>;

    async fn get(&self, fid: i64, code: &str) -> Result<Option<ClaimRecord>, Error>;

    /// Remove any cached row for one (account, code) pair. Used to clear a
    /// probe account's history once a probe settles a code's status.
    async fn delete(&self, fid: i64, code: &str) -> Result<(), Error>;
}

/// Read-only view of the externally owned account store.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get(&self, fid: i64) -> Result<Option<Account>, Error>;

    async fn list_by_alliance(&self, alliance_id: i64) -> Result<Vec<Account>, Error>;

    async fn alliance_settings(&self, alliance_id: i64) -> Result<Option<AllianceSettings>, Error>;

    async fn list_alliances(&self) -> Result<Vec<AllianceSettings>, Error>;

    async fn list_auto_redeem_alliances(&self) -> Result<Vec<AllianceSettings>, Error>;
}
