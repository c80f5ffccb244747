//! Periodic code-discovery sweep.
//!
//! Collects candidate code strings from the producer (chat scanning lives
//! outside this core; we only see its output) and from the shared
//! aggregator, inserts unseen ones as pending, and immediately fires the
//! orchestrator for every alliance configured for auto-redeem.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use frostbot_common::traits::repository_traits::{AccountRepository, CodeRepository};

use crate::platforms::aggregator::AggregatorClient;
use crate::services::RedemptionService;
use crate::Error;

/// Pure producer of candidate code strings. The chat-message scanner (or
/// anything else upstream) implements this; the sweep never cares where the
/// strings came from.
#[async_trait]
pub trait CodeSource: Send + Sync {
    async fn recent_codes(&self) -> Result<Vec<String>, Error>;
}

/// One discovery pass. Returns the codes that were new this time around.
pub async fn run_discovery_sweep(
    source: &dyn CodeSource,
    aggregator: Option<&AggregatorClient>,
    codes: &dyn CodeRepository,
    accounts: &dyn AccountRepository,
    redemption: &RedemptionService,
) -> Result<Vec<String>, Error> {
    let mut candidates = source.recent_codes().await?;

    if let Some(agg) = aggregator {
        match agg.fetch_codes().await {
            Ok(mut remote) => candidates.append(&mut remote),
            Err(e) => warn!("aggregator pull failed; continuing with local codes: {e}"),
        }
    }

    let mut fresh = Vec::new();
    for candidate in candidates {
        let code = candidate.trim();
        if code.is_empty() {
            continue;
        }
        if codes.insert_pending(code).await? {
            info!("discovered new code: {code}");
            fresh.push(code.to_string());
        }
    }

    if fresh.is_empty() {
        return Ok(fresh);
    }

    let auto = accounts.list_auto_redeem_alliances().await?;
    for code in &fresh {
        for alliance in &auto {
            match redemption
                .redeem_for_alliance(code, alliance.alliance_id)
                .await
            {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        "auto-redeem of {code} for alliance {} failed: {e}",
                        alliance.alliance_id
                    );
                }
            }
        }
    }

    Ok(fresh)
}

/// Spawns the sweep on its interval. Fatal configuration errors stop the
/// loop; everything else is logged and retried next round.
pub fn spawn_discovery_sweep(
    source: Arc<dyn CodeSource>,
    aggregator: Option<Arc<AggregatorClient>>,
    codes: Arc<dyn CodeRepository>,
    accounts: Arc<dyn AccountRepository>,
    redemption: Arc<RedemptionService>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match run_discovery_sweep(
                source.as_ref(),
                aggregator.as_deref(),
                codes.as_ref(),
                accounts.as_ref(),
                redemption.as_ref(),
            )
            .await
            {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!("discovery sweep stopped: {e}");
                    break;
                }
                Err(e) => error!("discovery sweep failed: {e}"),
            }
        }
    })
}
