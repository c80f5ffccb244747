use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of results a redemption attempt can produce. The raw
/// `(msg, err_code)` pairs from the remote API are mapped into this enum at
/// the client boundary and never propagate past it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "snake_case")]
pub enum RedeemStatus {
    /// Redeemed on this attempt.
    Success,
    /// Already redeemed by this account (err 40008).
    Received,
    /// Already holds a reward of the same type (err 40011).
    SameTypeExchange,
    /// Code expired (err 40007). Invalidates the code globally.
    TimeError,
    /// Code does not exist (err 40014). Invalidates the code globally.
    CdkNotFound,
    /// Code usage limit reached (err 40005). Invalidates the code globally.
    UsageLimit,
    /// Captcha answer rejected (err 40103). Eligible for a new cycle.
    CaptchaInvalid,
    /// Rate-limited by the remote API. Retry after a cooldown.
    TimeoutRetry,
    /// All captcha fetch/solve attempts in one cycle failed.
    MaxCaptchaAttempts,
    /// Player-info login rejected. Terminal for this account.
    LoginFailed,
    /// Session dropped between login and submit. Terminal for this account.
    LoginExpired,
    /// Captcha endpoint returned an unrecognized error. Terminal.
    CaptchaFetchError,
    /// OCR engine unavailable; no network call was made.
    SolverError,
    /// Response matched nothing we know. Terminal for this account.
    UnknownApiResponse,
}

impl RedeemStatus {
    /// Success or the already-claimed shapes, all of which count as a win
    /// for the account and are cache-worthy.
    pub fn is_success_equivalent(&self) -> bool {
        matches!(
            self,
            RedeemStatus::Success | RedeemStatus::Received | RedeemStatus::SameTypeExchange
        )
    }

    /// Outcomes proving the code itself is dead, as opposed to an
    /// account-specific or transient failure.
    pub fn is_invalidating(&self) -> bool {
        matches!(
            self,
            RedeemStatus::TimeError | RedeemStatus::CdkNotFound | RedeemStatus::UsageLimit
        )
    }

    /// Only success-equivalent and invalidating outcomes are persisted to
    /// the claim cache; everything transient stays unrecorded so a later
    /// run may retry.
    pub fn is_cacheable(&self) -> bool {
        self.is_success_equivalent() || self.is_invalidating()
    }

    /// Outcomes that send the account back through the retry queue instead
    /// of tallying it immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RedeemStatus::CaptchaInvalid
                | RedeemStatus::TimeoutRetry
                | RedeemStatus::MaxCaptchaAttempts
        )
    }
}

impl fmt::Display for RedeemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedeemStatus::Success => write!(f, "success"),
            RedeemStatus::Received => write!(f, "received"),
            RedeemStatus::SameTypeExchange => write!(f, "same_type_exchange"),
            RedeemStatus::TimeError => write!(f, "time_error"),
            RedeemStatus::CdkNotFound => write!(f, "cdk_not_found"),
            RedeemStatus::UsageLimit => write!(f, "usage_limit"),
            RedeemStatus::CaptchaInvalid => write!(f, "captcha_invalid"),
            RedeemStatus::TimeoutRetry => write!(f, "timeout_retry"),
            RedeemStatus::MaxCaptchaAttempts => write!(f, "max_captcha_attempts"),
            RedeemStatus::LoginFailed => write!(f, "login_failed"),
            RedeemStatus::LoginExpired => write!(f, "login_expired"),
            RedeemStatus::CaptchaFetchError => write!(f, "captcha_fetch_error"),
            RedeemStatus::SolverError => write!(f, "solver_error"),
            RedeemStatus::UnknownApiResponse => write!(f, "unknown_api_response"),
        }
    }
}

impl FromStr for RedeemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(RedeemStatus::Success),
            "received" => Ok(RedeemStatus::Received),
            "same_type_exchange" => Ok(RedeemStatus::SameTypeExchange),
            "time_error" => Ok(RedeemStatus::TimeError),
            "cdk_not_found" => Ok(RedeemStatus::CdkNotFound),
            "usage_limit" => Ok(RedeemStatus::UsageLimit),
            "captcha_invalid" => Ok(RedeemStatus::CaptchaInvalid),
            "timeout_retry" => Ok(RedeemStatus::TimeoutRetry),
            "max_captcha_attempts" => Ok(RedeemStatus::MaxCaptchaAttempts),
            "login_failed" => Ok(RedeemStatus::LoginFailed),
            "login_expired" => Ok(RedeemStatus::LoginExpired),
            "captcha_fetch_error" => Ok(RedeemStatus::CaptchaFetchError),
            "solver_error" => Ok(RedeemStatus::SolverError),
            "unknown_api_response" => Ok(RedeemStatus::UnknownApiResponse),
            _ => Err(format!("Invalid redeem status: {}", s)),
        }
    }
}

/// Last known terminal outcome for one (account, code) pair. Acts as an
/// idempotency guard: a later run for the same pair short-circuits to the
/// cached status with no network call.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClaimRecord {
    pub fid: i64,
    pub code: String,
    pub status: RedeemStatus,
    pub updated_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(fid: i64, code: &str, status: RedeemStatus) -> Self {
        Self {
            fid,
            code: code.to_string(),
            status,
            updated_at: Utc::now(),
        }
    }
}
