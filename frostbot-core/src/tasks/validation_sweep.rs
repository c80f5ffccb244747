//! Pending-code validation sweep.
//!
//! Re-validates `pending` codes with the designated probe account. The
//! per-code pacing lives inside `RedemptionService::probe_code`, so this
//! sweep can be dumb: walk the pending list, probe, and push settled codes
//! to the aggregator exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use frostbot_common::models::code::CodeStatus;
use frostbot_common::traits::repository_traits::CodeRepository;

use crate::platforms::aggregator::AggregatorClient;
use crate::services::RedemptionService;
use crate::Error;

/// One validation pass over every pending code.
pub async fn run_validation_sweep(
    codes: &dyn CodeRepository,
    redemption: &RedemptionService,
    aggregator: Option<&AggregatorClient>,
    probe_fid: i64,
) -> Result<(), Error> {
    let pending = codes.list_by_status(CodeStatus::Pending).await?;
    if pending.is_empty() {
        return Ok(());
    }
    info!("validation sweep: {} pending code(s)", pending.len());

    for gift_code in pending {
        let outcome = redemption.probe_code(&gift_code.code, probe_fid).await?;

        if outcome.is_success_equivalent() {
            if let Some(agg) = aggregator {
                agg.push_code(&gift_code.code, true).await;
            }
        } else if outcome.is_invalidating() {
            if let Some(agg) = aggregator {
                agg.push_code(&gift_code.code, false).await;
            }
        } else {
            // Transient or account-level trouble; the code stays pending
            // and the next sweep tries again.
            warn!(
                "probe of {} inconclusive ({outcome}); leaving pending",
                gift_code.code
            );
        }
    }

    Ok(())
}

/// Spawns the sweep on its interval. The probe pacing mutex inside the
/// service keeps this from overlapping interactive runs.
pub fn spawn_validation_sweep(
    codes: Arc<dyn CodeRepository>,
    redemption: Arc<RedemptionService>,
    aggregator: Option<Arc<AggregatorClient>>,
    probe_fid: i64,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match run_validation_sweep(
                codes.as_ref(),
                redemption.as_ref(),
                aggregator.as_deref(),
                probe_fid,
            )
            .await
            {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!("validation sweep stopped: {e}");
                    break;
                }
                Err(e) => error!("validation sweep failed: {e}"),
            }
        }
    })
}
