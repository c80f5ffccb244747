use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a gift code in the registry. A code starts out `Pending`
/// when the discovery producer first sees it, and is promoted exactly once:
/// either to `Validated` (a probe or real claim succeeded) or to `Invalid`
/// (expired, unknown, or usage-exhausted). `Invalid` codes are never sent to
/// the remote API again, except by the designated probe account.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum CodeStatus {
    Pending,
    Validated,
    Invalid,
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeStatus::Pending => write!(f, "pending"),
            CodeStatus::Validated => write!(f, "validated"),
            CodeStatus::Invalid => write!(f, "invalid"),
        }
    }
}

impl FromStr for CodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CodeStatus::Pending),
            "validated" => Ok(CodeStatus::Validated),
            "invalid" => Ok(CodeStatus::Invalid),
            _ => Err(format!("Invalid code status: {}", s)),
        }
    }
}

/// A promotional redemption string, unique on `code`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GiftCode {
    pub code: String,
    pub discovered_at: DateTime<Utc>,
    pub status: CodeStatus,
}

impl GiftCode {
    pub fn new_pending(code: &str) -> Self {
        Self {
            code: code.to_string(),
            discovered_at: Utc::now(),
            status: CodeStatus::Pending,
        }
    }
}
