// frostbot-core/src/config.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::captcha::SavePolicy;
use crate::Error;

/// Default shared secret the remote API signs requests with. Overridable via
/// `WOS_API_SECRET` for the day it rotates.
const DEFAULT_API_SECRET: &str = "tB87#kPtkxqOS2";

const DEFAULT_API_BASE: &str = "https://wos-giftcode-api.centurygame.com/api";

/// Runtime knobs for the redemption core. Every timing constant lives here so
/// tests can run with millisecond cooldowns instead of wall-clock minutes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the gift-code API (player/captcha/gift_code endpoints).
    pub api_base: String,
    /// Shared signing secret appended before the MD5 pass.
    pub api_secret: String,
    /// Optional base URL of the shared code aggregator. `None` disables the
    /// discovery-sync push/pull entirely.
    pub aggregator_base: Option<String>,

    /// Captcha fetch/solve attempts inside one claim cycle.
    pub max_captcha_attempts: u32,
    /// Cycles an account may burn on captcha failures before counting as failed.
    pub max_retry_cycles: u32,
    /// Cooldown before an account re-enters the queue after a failed cycle.
    pub captcha_cycle_cooldown: Duration,
    /// Cooldown after the remote API signals a rate limit.
    pub api_rate_limit_cooldown: Duration,
    /// Base inter-account delay; jittered 0.7x-1.3x per claim.
    pub claim_delay: Duration,
    /// How often the orchestrator emits progress reports.
    pub progress_interval: Duration,
    /// Minimum spacing between validation-sweep probe requests.
    pub validation_pacing: Duration,
    /// How often the discovery sweep scans for new codes.
    pub discovery_interval: Duration,

    /// Which captcha images get persisted for diagnostics.
    pub captcha_save_policy: SavePolicy,
    /// Where persisted captcha images land.
    pub captcha_save_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_secret: DEFAULT_API_SECRET.to_string(),
            aggregator_base: None,
            max_captcha_attempts: 4,
            max_retry_cycles: 10,
            captcha_cycle_cooldown: Duration::from_secs(60),
            api_rate_limit_cooldown: Duration::from_secs(60),
            claim_delay: Duration::from_secs(1),
            progress_interval: Duration::from_secs(5),
            validation_pacing: Duration::from_secs(60),
            discovery_interval: Duration::from_secs(1800),
            captcha_save_policy: SavePolicy::None,
            captcha_save_dir: PathBuf::from("captcha_images"),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults.
    /// `.env` is honored when present.
    pub fn from_env() -> Result<Self, Error> {
        let _ = dotenv::dotenv();

        let mut cfg = Config::default();

        if let Ok(v) = std::env::var("WOS_API_BASE") {
            cfg.api_base = v;
        }
        if let Ok(v) = std::env::var("WOS_API_SECRET") {
            cfg.api_secret = v;
        }
        if let Ok(v) = std::env::var("CODE_AGGREGATOR_BASE") {
            if !v.is_empty() {
                cfg.aggregator_base = Some(v);
            }
        }
        if let Ok(v) = std::env::var("CAPTCHA_SAVE_POLICY") {
            cfg.captcha_save_policy = v
                .parse()
                .map_err(|e: String| Error::Parse(e))?;
        }
        if let Ok(v) = std::env::var("CAPTCHA_SAVE_DIR") {
            cfg.captcha_save_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MAX_RETRY_CYCLES") {
            cfg.max_retry_cycles = v
                .parse()
                .map_err(|e| Error::Parse(format!("MAX_RETRY_CYCLES: {e}")))?;
        }

        Ok(cfg)
    }
}
