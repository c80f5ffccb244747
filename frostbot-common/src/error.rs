// ================================================================
// File: frostbot-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The remote API rejected our request signature. This is a shared-secret
    /// or signing-algorithm mismatch and dooms every account in the batch,
    /// so callers must abort the whole run rather than skip one account.
    #[error("Signature rejected by remote API: {0}")]
    SignatureMismatch(String),

    /// The OCR engine failed to initialize. No captcha can be solved, so no
    /// redemption may issue network calls until an operator intervenes.
    #[error("Captcha solver unavailable: {0}")]
    SolverUnavailable(String),
}

impl Error {
    /// True for errors that must terminate the surrounding batch instead of
    /// being recovered per-account.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SignatureMismatch(_) | Error::SolverUnavailable(_))
    }
}
