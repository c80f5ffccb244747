use serde::{Deserialize, Serialize};

/// A managed game identity ("fid") capable of claiming a code. Owned by the
/// external account store; read-only from the redemption core.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub fid: i64,
    pub nickname: String,
    pub alliance_id: i64,
    pub level: i32,
}

/// Per-alliance knobs the sweeps care about. `auto_redeem` alliances get new
/// codes applied as soon as discovery sees them; `probe_fid` names the single
/// account used to confirm a pending code's validity.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllianceSettings {
    pub alliance_id: i64,
    pub auto_redeem: bool,
    pub probe_fid: Option<i64>,
}
