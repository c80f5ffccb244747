use serde::{Deserialize, Serialize};

use crate::models::claim::RedeemStatus;

/// Aggregate counters for one orchestrator run (one code, one alliance).
/// Consumed by whatever surface renders progress; the core only counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedeemSummary {
    pub code: String,
    pub alliance_id: i64,
    pub total: usize,
    pub success: usize,
    pub already_claimed: usize,
    pub failed: usize,
    pub retrying: usize,
}

impl RedeemSummary {
    pub fn new(code: &str, alliance_id: i64, total: usize) -> Self {
        Self {
            code: code.to_string(),
            alliance_id,
            total,
            ..Default::default()
        }
    }

    pub fn settled(&self) -> usize {
        self.success + self.already_claimed + self.failed
    }
}

/// Events the orchestrator pushes through the report sink. The surrounding
/// application renders these however it likes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RedeemReport {
    /// Periodic progress snapshot during a run.
    Progress(RedeemSummary),
    /// The run finished normally.
    Completed(RedeemSummary),
    /// The code was already invalid in the registry; nothing was attempted.
    CodeInvalid { code: String },
    /// An account's outcome proved the code dead mid-run; remaining
    /// accounts were skipped.
    Invalidated {
        summary: RedeemSummary,
        triggered_by: i64,
        status: RedeemStatus,
    },
    /// Signing mismatch: the whole batch was aborted and needs an operator.
    ConfigError { detail: String },
}
