//! Redemption orchestrator.
//!
//! Drives the claim protocol over every account in an alliance for one code:
//! cache probe first (at most one real network attempt per terminal
//! outcome), then a cooperative single-task loop over an active queue plus a
//! delay-ordered retry heap. Invalidating outcomes cancel the rest of the
//! code's work by draining the queues; a signature mismatch aborts the whole
//! batch. Accounts are processed strictly one at a time with a jittered
//! inter-claim delay, which is the entire back-pressure story against the
//! rate-limited remote API.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use frostbot_common::models::claim::{ClaimRecord, RedeemStatus};
use frostbot_common::models::code::CodeStatus;
use frostbot_common::models::report::{RedeemReport, RedeemSummary};
use frostbot_common::traits::repository_traits::{
    AccountRepository, ClaimRepository, CodeRepository,
};

use crate::captcha::CaptchaSolver;
use crate::config::Config;
use crate::platforms::wos::WosClient;
use crate::services::report::ReportSink;
use crate::Error;

/// An account waiting out a cooldown before its next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryEntry {
    not_before: Instant,
    cycle_count: u32,
    fid: i64,
}

// BinaryHeap is a max-heap; invert the ordering so the earliest `not_before`
// pops first. Ordering beyond "not before time T" is not required.
impl Ord for RetryEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .not_before
            .cmp(&self.not_before)
            .then_with(|| other.fid.cmp(&self.fid))
    }
}

impl PartialOrd for RetryEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct RedemptionService {
    codes: Arc<dyn CodeRepository>,
    claims: Arc<dyn ClaimRepository>,
    accounts: Arc<dyn AccountRepository>,
    client: Arc<WosClient>,
    solver: Arc<CaptchaSolver>,
    sink: Arc<dyn ReportSink>,
    config: Config,
    /// Throttles validation-sweep probes and keeps them from overlapping an
    /// interactive run. Held across the pacing sleep on purpose.
    probe_gate: Mutex<Option<Instant>>,
}

impl RedemptionService {
    pub fn new(
        codes: Arc<dyn CodeRepository>,
        claims: Arc<dyn ClaimRepository>,
        accounts: Arc<dyn AccountRepository>,
        client: Arc<WosClient>,
        solver: Arc<CaptchaSolver>,
        sink: Arc<dyn ReportSink>,
        config: Config,
    ) -> Self {
        Self {
            codes,
            claims,
            accounts,
            client,
            solver,
            sink,
            config,
            probe_gate: Mutex::new(None),
        }
    }

    /// Run one code over every alliance, sequentially. Concurrent alliance
    /// runs would multiply load on the rate-limited API, so the batch is a
    /// plain loop; a fatal configuration error stops it cold.
    pub async fn redeem_for_all_alliances(&self, code: &str) -> Result<(), Error> {
        let alliances = self.accounts.list_alliances().await?;
        for alliance in alliances {
            match self.redeem_for_alliance(code, alliance.alliance_id).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!("aborting batch for code {code}: {e}");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
            // A mid-run invalidation settles the code for every alliance.
            if let Some(registry) = self.codes.get(code).await? {
                if registry.status == CodeStatus::Invalid {
                    info!("code {code} invalidated; skipping remaining alliances");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Redeem `code` for every account in one alliance.
    pub async fn redeem_for_alliance(
        &self,
        code: &str,
        alliance_id: i64,
    ) -> Result<RedeemSummary, Error> {
        // The registry row must exist before anything is attempted.
        self.codes.insert_pending(code).await?;
        if let Some(registry) = self.codes.get(code).await? {
            if registry.status == CodeStatus::Invalid {
                self.sink
                    .publish(RedeemReport::CodeInvalid { code: code.to_string() })
                    .await;
                return Ok(RedeemSummary::new(code, alliance_id, 0));
            }
        }

        let roster = self.accounts.list_by_alliance(alliance_id).await?;
        let mut summary = RedeemSummary::new(code, alliance_id, roster.len());

        // Cache probe: terminal outcomes tally without a network call.
        let mut active: VecDeque<(i64, u32)> = VecDeque::new();
        for account in &roster {
            match self.claims.get(account.fid, code).await? {
                Some(rec) if rec.status.is_success_equivalent() => {
                    summary.already_claimed += 1;
                }
                Some(rec) if rec.status.is_invalidating() => {
                    summary.failed += 1;
                }
                _ => active.push_back((account.fid, 0)),
            }
        }

        if !self.solver.is_ready() && !active.is_empty() {
            // Submitting without a captcha is guaranteed to fail, so no
            // network call is made for any of these accounts.
            error!(
                "captcha solver unavailable; {} account(s) for code {code} marked solver_error",
                active.len()
            );
            summary.failed += active.len();
            active.clear();
            self.sink
                .publish(RedeemReport::Completed(summary.clone()))
                .await;
            return Ok(summary);
        }

        let mut retries: BinaryHeap<RetryEntry> = BinaryHeap::new();
        let mut last_progress = Instant::now();

        while !active.is_empty() || !retries.is_empty() {
            if last_progress.elapsed() >= self.config.progress_interval {
                // Only cooldown entries are "retrying"; accounts still in
                // the active queue are implied by the remaining total.
                summary.retrying = retries.len();
                self.sink
                    .publish(RedeemReport::Progress(summary.clone()))
                    .await;
                last_progress = Instant::now();
            }

            let now = Instant::now();
            while retries.peek().is_some_and(|e| e.not_before <= now) {
                let e = retries.pop().expect("peeked entry exists");
                active.push_back((e.fid, e.cycle_count));
            }

            let Some((fid, cycle_count)) = active.pop_front() else {
                // Only cooldown entries remain; sleep until the earliest one
                // is due (capped so progress keeps flowing).
                let until = retries.peek().expect("retry heap non-empty").not_before;
                let wait = until
                    .saturating_duration_since(Instant::now())
                    .min(self.config.progress_interval);
                sleep(wait).await;
                continue;
            };

            self.jitter_delay().await;

            let outcome = match self.client.claim_cycle(fid, code, &self.solver).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    // Not a code problem; do not mark the registry. Drain
                    // everything and surface for an operator.
                    self.sink
                        .publish(RedeemReport::ConfigError { detail: e.to_string() })
                        .await;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

            match outcome {
                s if s.is_success_equivalent() => {
                    self.claims
                        .upsert(&ClaimRecord::new(fid, code, s))
                        .await?;
                    if s == RedeemStatus::Success {
                        summary.success += 1;
                    } else {
                        summary.already_claimed += 1;
                    }
                }
                s if s.is_invalidating() => {
                    self.claims
                        .upsert(&ClaimRecord::new(fid, code, s))
                        .await?;
                    self.codes.set_status(code, CodeStatus::Invalid).await?;
                    summary.failed += 1;
                    // The code is dead for everyone; drop all remaining work.
                    active.clear();
                    retries.clear();
                    summary.retrying = 0;
                    self.sink
                        .publish(RedeemReport::Invalidated {
                            summary: summary.clone(),
                            triggered_by: fid,
                            status: s,
                        })
                        .await;
                    return Ok(summary);
                }
                RedeemStatus::CaptchaInvalid | RedeemStatus::MaxCaptchaAttempts => {
                    if cycle_count + 1 < self.config.max_retry_cycles {
                        retries.push(RetryEntry {
                            not_before: Instant::now() + self.config.captcha_cycle_cooldown,
                            cycle_count: cycle_count + 1,
                            fid,
                        });
                        debug!(
                            "fid={fid} code={code} requeued for cycle {} after {outcome}",
                            cycle_count + 1
                        );
                    } else {
                        warn!("fid={fid} code={code} exhausted {} cycles", self.config.max_retry_cycles);
                        summary.failed += 1;
                    }
                }
                RedeemStatus::TimeoutRetry => {
                    // Rate limit: revisit at the same cycle count.
                    retries.push(RetryEntry {
                        not_before: Instant::now() + self.config.api_rate_limit_cooldown,
                        cycle_count,
                        fid,
                    });
                }
                s => {
                    // Account-terminal. Nothing cached, so a later run may
                    // retry this account.
                    debug!("fid={fid} code={code} terminal outcome {s}");
                    summary.failed += 1;
                }
            }
        }

        summary.retrying = 0;
        self.sink
            .publish(RedeemReport::Completed(summary.clone()))
            .await;
        Ok(summary)
    }

    /// Confirm a pending code's true validity with the designated probe
    /// account. Bypasses the cache read (an invalid registry entry is
    /// exactly what we are double-checking) but obeys the same outcome
    /// semantics, and is paced so sweeps never pile onto a live run.
    pub async fn probe_code(&self, code: &str, probe_fid: i64) -> Result<RedeemStatus, Error> {
        {
            let mut last = self.probe_gate.lock().await;
            if let Some(t) = *last {
                let since = t.elapsed();
                if since < self.config.validation_pacing {
                    sleep(self.config.validation_pacing - since).await;
                }
            }
            *last = Some(Instant::now());
        }

        let outcome = self.client.claim_cycle(probe_fid, code, &self.solver).await?;
        info!("probe fid={probe_fid} code={code} => {outcome}");

        if outcome.is_invalidating() {
            self.codes.set_status(code, CodeStatus::Invalid).await?;
            // Clear the probe's stale history so it can be reused; everyone
            // else's cached successes are left alone.
            self.claims.delete(probe_fid, code).await?;
        } else if outcome.is_success_equivalent() {
            self.codes.set_status(code, CodeStatus::Validated).await?;
            self.claims
                .upsert(&ClaimRecord::new(probe_fid, code, outcome))
                .await?;
        }

        Ok(outcome)
    }

    /// 0.7x-1.3x of the base delay, so bursts against the remote API stay
    /// ragged.
    async fn jitter_delay(&self) {
        let factor: f64 = rand::rng().random_range(0.7..1.3);
        let delay = self.config.claim_delay.mul_f64(factor);
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn retry_heap_pops_earliest_first() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(RetryEntry { not_before: now + Duration::from_secs(60), cycle_count: 1, fid: 1 });
        heap.push(RetryEntry { not_before: now + Duration::from_secs(5), cycle_count: 3, fid: 2 });
        heap.push(RetryEntry { not_before: now + Duration::from_secs(30), cycle_count: 0, fid: 3 });

        assert_eq!(heap.pop().unwrap().fid, 2);
        assert_eq!(heap.pop().unwrap().fid, 3);
        assert_eq!(heap.pop().unwrap().fid, 1);
    }
}
