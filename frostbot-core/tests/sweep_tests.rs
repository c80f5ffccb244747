// tests/sweep_tests.rs
//
// Discovery sweep (insert pending, dedup, auto-redeem fan-out) and the
// validation sweep (probe promotes pending codes and notifies the
// aggregator exactly once).

mod common;

use async_trait::async_trait;
use common::*;
use frostbot_common::models::claim::{ClaimRecord, RedeemStatus};
use frostbot_common::models::code::CodeStatus;
use frostbot_common::traits::repository_traits::{ClaimRepository, CodeRepository};
use frostbot_core::platforms::aggregator::AggregatorClient;
use frostbot_core::repositories::{
    SqliteAccountRepository, SqliteClaimRepository, SqliteCodeRepository,
};
use frostbot_core::tasks::code_sweep::{run_discovery_sweep, CodeSource};
use frostbot_core::tasks::validation_sweep::run_validation_sweep;
use frostbot_core::Error;

struct StaticSource(Vec<&'static str>);

#[async_trait]
impl CodeSource for StaticSource {
    async fn recent_codes(&self) -> Result<Vec<String>, Error> {
        Ok(self.0.iter().map(|s| s.to_string()).collect())
    }
}

#[tokio::test]
async fn discovery_inserts_new_codes_once() -> Result<(), Error> {
    let db = setup_test_db().await;
    let http = MockHttp::unreachable();
    let rig = build_service(db, http, working_solver(), test_config()).await;

    let codes = SqliteCodeRepository::new(rig.db.pool().clone());
    let accounts = SqliteAccountRepository::new(rig.db.pool().clone());
    let source = StaticSource(vec!["ABCD1", "ABCD1", "  ", "XYZ99"]);

    let fresh =
        run_discovery_sweep(&source, None, &codes, &accounts, &rig.service).await?;
    assert_eq!(fresh, vec!["ABCD1".to_string(), "XYZ99".to_string()]);

    let pending = codes.list_by_status(CodeStatus::Pending).await?;
    assert_eq!(pending.len(), 2);

    // Second pass discovers nothing new.
    let fresh =
        run_discovery_sweep(&source, None, &codes, &accounts, &rig.service).await?;
    assert!(fresh.is_empty());
    Ok(())
}

#[tokio::test]
async fn discovery_auto_redeems_for_configured_alliances() -> Result<(), Error> {
    let db = setup_test_db().await;
    seed_alliance(&db, 1, true, &[42]).await;
    seed_alliance(&db, 2, false, &[77]).await;

    let http = MockHttp::new(|url, body| {
        if url.contains("/player") {
            return Ok(player_ok());
        }
        if url.contains("/captcha") {
            return Ok(captcha_ok());
        }
        match fid_from_body(body) {
            42 => Ok(redeem_success()),
            other => panic!("alliance without auto_redeem ran account {other}"),
        }
    });

    let rig = build_service(db, http.clone(), working_solver(), test_config()).await;
    let codes = SqliteCodeRepository::new(rig.db.pool().clone());
    let accounts = SqliteAccountRepository::new(rig.db.pool().clone());

    let source = StaticSource(vec!["NEWCODE1"]);
    run_discovery_sweep(&source, None, &codes, &accounts, &rig.service).await?;

    let claims = SqliteClaimRepository::new(rig.db.pool().clone());
    assert_eq!(
        claims.get(42, "NEWCODE1").await?.unwrap().status,
        RedeemStatus::Success
    );
    assert!(claims.get(77, "NEWCODE1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn probe_success_validates_and_pushes_once() -> Result<(), Error> {
    let db = setup_test_db().await;

    let http = MockHttp::new(|url, _| {
        if url.contains("/player") {
            Ok(player_ok())
        } else if url.contains("/captcha") {
            Ok(captcha_ok())
        } else if url.contains("/gift_code") {
            Ok(redeem_success())
        } else {
            // aggregator push
            Ok("{}".to_string())
        }
    });

    let rig = build_service(db, http.clone(), working_solver(), test_config()).await;
    let codes = SqliteCodeRepository::new(rig.db.pool().clone());
    codes.insert_pending("ABCD1").await?;

    let aggregator =
        AggregatorClient::new(http.clone(), "http://agg.test");
    run_validation_sweep(&codes, &rig.service, Some(&aggregator), 999).await?;

    assert_eq!(codes.get("ABCD1").await?.unwrap().status, CodeStatus::Validated);
    assert_eq!(
        http.calls_to("agg.test/giftcode").len(),
        1,
        "exactly one sync push per settled code"
    );

    // The probe's own outcome is cached like any other success.
    let claims = SqliteClaimRepository::new(rig.db.pool().clone());
    assert_eq!(
        claims.get(999, "ABCD1").await?.unwrap().status,
        RedeemStatus::Success
    );
    Ok(())
}

#[tokio::test]
async fn probe_invalidation_clears_probe_cache_rows() -> Result<(), Error> {
    let db = setup_test_db().await;

    let http = MockHttp::new(|url, _| {
        if url.contains("/player") {
            Ok(player_ok())
        } else if url.contains("/captcha") {
            Ok(captcha_ok())
        } else if url.contains("/gift_code") {
            Ok(redeem_response("TIME ERROR.", 40007))
        } else {
            Ok("{}".to_string())
        }
    });

    let rig = build_service(db, http.clone(), working_solver(), test_config()).await;
    let codes = SqliteCodeRepository::new(rig.db.pool().clone());
    let claims = SqliteClaimRepository::new(rig.db.pool().clone());

    codes.insert_pending("OLDCODE").await?;
    // Stale row from an earlier probe of the same code.
    claims
        .upsert(&ClaimRecord::new(999, "OLDCODE", RedeemStatus::Received))
        .await?;
    // Another account's history must be left alone.
    claims
        .upsert(&ClaimRecord::new(42, "OLDCODE", RedeemStatus::Success))
        .await?;

    let aggregator =
        AggregatorClient::new(http.clone(), "http://agg.test");
    run_validation_sweep(&codes, &rig.service, Some(&aggregator), 999).await?;

    assert_eq!(codes.get("OLDCODE").await?.unwrap().status, CodeStatus::Invalid);
    assert!(claims.get(999, "OLDCODE").await?.is_none());
    assert_eq!(
        claims.get(42, "OLDCODE").await?.unwrap().status,
        RedeemStatus::Success
    );
    assert_eq!(http.calls_to("agg.test/giftcode").len(), 1);
    Ok(())
}

#[tokio::test]
async fn aggregator_pull_feeds_discovery() -> Result<(), Error> {
    let db = setup_test_db().await;

    let http = MockHttp::new(|url, _| {
        if url.contains("/giftcodes") {
            Ok(serde_json::json!({ "codes": ["REMOTE1"] }).to_string())
        } else {
            panic!("unexpected call to {url}")
        }
    });

    let rig = build_service(db, MockHttp::unreachable(), working_solver(), test_config()).await;
    let codes = SqliteCodeRepository::new(rig.db.pool().clone());
    let accounts = SqliteAccountRepository::new(rig.db.pool().clone());

    let aggregator =
        AggregatorClient::new(http.clone(), "http://agg.test");
    let source = StaticSource(vec![]);

    let fresh = run_discovery_sweep(&source, Some(&aggregator), &codes, &accounts, &rig.service)
        .await?;
    assert_eq!(fresh, vec!["REMOTE1".to_string()]);
    assert_eq!(codes.get("REMOTE1").await?.unwrap().status, CodeStatus::Pending);
    Ok(())
}
