// tests/repository_tests.rs

mod common;

use common::*;
use frostbot_common::models::claim::{ClaimRecord, RedeemStatus};
use frostbot_common::models::code::CodeStatus;
use frostbot_common::traits::repository_traits::{
    AccountRepository, ClaimRepository, CodeRepository,
};
use frostbot_core::repositories::{
    SqliteAccountRepository, SqliteClaimRepository, SqliteCodeRepository,
};
use frostbot_core::Error;

#[tokio::test]
async fn code_repository_deduplicates_and_tracks_status() -> Result<(), Error> {
    let db = setup_test_db().await;
    let repo = SqliteCodeRepository::new(db.pool().clone());

    assert!(repo.insert_pending("ABCD1").await?);
    assert!(!repo.insert_pending("ABCD1").await?, "duplicate insert must be a no-op");

    let code = repo.get("ABCD1").await?.expect("code should exist");
    assert_eq!(code.status, CodeStatus::Pending);

    repo.set_status("ABCD1", CodeStatus::Validated).await?;
    assert_eq!(repo.get("ABCD1").await?.unwrap().status, CodeStatus::Validated);

    repo.insert_pending("ZZZZ9").await?;
    let pending = repo.list_by_status(CodeStatus::Pending).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].code, "ZZZZ9");

    assert!(repo.get("MISSING").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn claim_repository_upserts_and_deletes() -> Result<(), Error> {
    let db = setup_test_db().await;
    let repo = SqliteClaimRepository::new(db.pool().clone());

    repo.upsert(&ClaimRecord::new(1, "ABCD1", RedeemStatus::Success)).await?;
    repo.upsert(&ClaimRecord::new(2, "ABCD1", RedeemStatus::Received)).await?;

    // Overwrite on conflict.
    repo.upsert(&ClaimRecord::new(2, "ABCD1", RedeemStatus::Success)).await?;
    assert_eq!(
        repo.get(2, "ABCD1").await?.unwrap().status,
        RedeemStatus::Success
    );

    // Deletes are per (fid, code); the neighbour row survives.
    repo.delete(1, "ABCD1").await?;
    assert!(repo.get(1, "ABCD1").await?.is_none());
    assert_eq!(
        repo.get(2, "ABCD1").await?.unwrap().status,
        RedeemStatus::Success
    );
    Ok(())
}

#[tokio::test]
async fn account_repository_reads_roster_and_settings() -> Result<(), Error> {
    let db = setup_test_db().await;
    seed_alliance(&db, 1, true, &[10, 11]).await;
    seed_alliance(&db, 2, false, &[20]).await;

    let repo = SqliteAccountRepository::new(db.pool().clone());

    let roster = repo.list_by_alliance(1).await?;
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].fid, 10);
    assert_eq!(roster[1].fid, 11);

    let account = repo.get(20).await?.expect("account should exist");
    assert_eq!(account.alliance_id, 2);
    assert!(repo.get(999).await?.is_none());

    let settings = repo.alliance_settings(1).await?.unwrap();
    assert!(settings.auto_redeem);
    assert_eq!(settings.probe_fid, Some(10));

    let auto = repo.list_auto_redeem_alliances().await?;
    assert_eq!(auto.len(), 1);
    assert_eq!(auto[0].alliance_id, 1);

    let all = repo.list_alliances().await?;
    assert_eq!(all.len(), 2);
    Ok(())
}
