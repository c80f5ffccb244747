//! Progress/completion reporting seam.
//!
//! The orchestrator only counts; whatever surface hosts the core (chat bot,
//! TUI, logs) decides how reports look. Sinks must not block redemption for
//! long, so the channel sink drops nothing but also never awaits a slow
//! consumer's rendering.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use frostbot_common::models::report::RedeemReport;

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: RedeemReport);
}

/// Default sink: structured logs only.
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn publish(&self, report: RedeemReport) {
        match &report {
            RedeemReport::Progress(s) => info!(
                "redeem progress code={} alliance={} {}/{} (ok={} already={} failed={} retrying={})",
                s.code, s.alliance_id, s.settled(), s.total,
                s.success, s.already_claimed, s.failed, s.retrying
            ),
            RedeemReport::Completed(s) => info!(
                "redeem complete code={} alliance={} ok={} already={} failed={}",
                s.code, s.alliance_id, s.success, s.already_claimed, s.failed
            ),
            RedeemReport::CodeInvalid { code } => {
                warn!("code {code} is invalid; nothing attempted")
            }
            RedeemReport::Invalidated {
                summary,
                triggered_by,
                status,
            } => warn!(
                "code {} invalidated by fid={} ({}) after {}/{} accounts",
                summary.code, triggered_by, status, summary.settled(), summary.total
            ),
            RedeemReport::ConfigError { detail } => {
                error!("redemption aborted by configuration error: {detail}")
            }
        }
    }
}

/// Forwards reports into an unbounded channel for the hosting surface (or a
/// test) to drain.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RedeemReport>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RedeemReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    async fn publish(&self, report: RedeemReport) {
        // Receiver gone means nobody cares anymore; not an error.
        let _ = self.tx.send(report);
    }
}
